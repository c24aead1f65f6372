//! Video identifier extraction for the supported share-link shapes.

use regex::Regex;
use std::sync::OnceLock;

fn patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"youtu\.be/([^?&/#]+)").expect("valid short-link pattern"),
            Regex::new(r"youtube\.com/watch\?(?:.*&)?v=([^&#]+)").expect("valid watch pattern"),
        ]
    })
}

/// Returns the video id from a `youtu.be/<id>` or `youtube.com/watch?v=<id>` URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    patterns()
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}
