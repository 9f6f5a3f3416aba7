//! Streaming AES-128-CBC decryption for transfers that arrive encrypted.

use aes::Aes128;
use cipher::{BlockDecryptMut, KeyIvInit, generic_array::GenericArray};

use crate::DownloadError;

type Aes128CbcDec = cbc::Decryptor<Aes128>;

const BLOCK_SIZE: usize = 16;

/// Decrypts a CBC stream chunk by chunk.
///
/// The IV is the key itself. Network chunks are not block aligned, so the
/// tail of each chunk is held back until the next one completes the block;
/// the chaining state carries over between calls, which makes the output
/// identical to decrypting the whole body at once. Padding is not stripped.
pub struct StreamDecryptor {
    cipher: Aes128CbcDec,
    pending: Vec<u8>,
}

impl StreamDecryptor {
    pub fn new(key: &[u8; 16]) -> Result<Self, DownloadError> {
        let cipher = Aes128CbcDec::new_from_slices(key, key).map_err(|e| {
            DownloadError::decryption(format!("Failed to initialize AES decryptor: {e}"))
        })?;
        Ok(Self {
            cipher,
            pending: Vec::with_capacity(BLOCK_SIZE),
        })
    }

    /// Feed the next ciphertext chunk, returning every plaintext byte that
    /// can be produced so far.
    pub fn update(&mut self, chunk: &[u8]) -> Vec<u8> {
        self.pending.extend_from_slice(chunk);
        let aligned = self.pending.len() - self.pending.len() % BLOCK_SIZE;

        let mut out: Vec<u8> = self.pending.drain(..aligned).collect();
        for block in out.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher
                .decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        out
    }

    /// Number of ciphertext bytes waiting for a complete block.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Finish the stream. A ciphertext that is not a whole number of blocks
    /// is corrupt or truncated.
    pub fn finish(self) -> Result<(), DownloadError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(DownloadError::decryption(format!(
                "ciphertext ends with {} bytes, not a multiple of the {BLOCK_SIZE}-byte block size",
                self.pending.len()
            )))
        }
    }
}
