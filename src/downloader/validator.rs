// Syntactic filter for inbound post URLs

use regex::Regex;

lazy_static::lazy_static! {
    // Post, reel and story-highlight paths all vary, so anything under the host passes
    static ref INSTAGRAM_RE: Regex =
        Regex::new(r"(?i)^https?://(www\.)?instagram\.com/.*").expect("static regex");
}

/// True when `url` looks like an Instagram URL. Does not check reachability.
pub fn is_acceptable(url: &str) -> bool {
    !url.is_empty() && INSTAGRAM_RE.is_match(url)
}
