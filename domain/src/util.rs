//! Shared utility functions.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Shorten `s` to at most `max_bytes` for log and diagnostic previews.
///
/// Cuts on a UTF-8 character boundary and appends `...` when anything was
/// removed.
pub fn preview(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes.saturating_sub(3);
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_keeps_short_strings() {
        assert_eq!(preview("step 1 done", 64), "step 1 done");
    }

    #[test]
    fn preview_cuts_long_strings() {
        let long = "x".repeat(100);
        let cut = preview(&long, 20);
        assert_eq!(cut.len(), 20);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn preview_respects_char_boundaries() {
        // 'é' is 2 bytes; cutting at 5 would split the third one
        let s = "éééééé";
        assert_eq!(preview(s, 8), "éé...");
    }

    #[test]
    fn now_millis_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
