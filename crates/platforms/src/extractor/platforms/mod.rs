pub mod bilibili;
