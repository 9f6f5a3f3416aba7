use regex::Regex;

#[inline]
pub fn capture_group_1<'a>(re: &Regex, input: &'a str) -> Option<&'a str> {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// First group 1 captured by any of `patterns`, tried in order.
pub fn first_capture<'a>(patterns: &[Regex], input: &'a str) -> Option<&'a str> {
    patterns.iter().find_map(|re| capture_group_1(re, input))
}

/// Decode the handful of HTML entities that show up in page titles.
pub fn unescape_html(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    input
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
