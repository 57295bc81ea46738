use chrono::{DateTime, Local, TimeZone};
use serde_json::Value;

/// Characters kept on each side when a public key is shortened.
pub const KEY_EDGE: usize = 15;

/// Cut `s` to `max` characters followed by "...".
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max).collect();
    format!("{head}...")
}

/// Shorten a PEM public key to its first and last `edge` characters.
///
/// Line breaks inside the PEM block are dropped first so the result fits on
/// one terminal line.
pub fn truncate_key(key: &str, edge: usize) -> String {
    let flat: Vec<char> = key.chars().filter(|c| !c.is_control()).collect();
    if flat.len() <= edge * 2 + 3 {
        return flat.into_iter().collect();
    }
    let head: String = flat[..edge].iter().collect();
    let tail: String = flat[flat.len() - edge..].iter().collect();
    format!("{head}...{tail}")
}

/// Unix seconds as local date and time. Zero and out-of-range values render empty.
pub fn format_timestamp(secs: i64) -> String {
    if secs == 0 {
        return String::new();
    }
    match Local.timestamp_opt(secs, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => String::new(),
    }
}

pub fn format_clock(t: &DateTime<Local>) -> String {
    t.format("%H:%M:%S").to_string()
}

/// Pretty-printed JSON, capped at `max_bytes` on a line boundary.
pub fn pretty_json(v: &Value, max_bytes: usize) -> String {
    let formatted = serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string());
    if formatted.len() <= max_bytes {
        return formatted;
    }
    let mut cut = max_bytes;
    while !formatted.is_char_boundary(cut) {
        cut -= 1;
    }
    let end = formatted[..cut].rfind('\n').unwrap_or(cut);
    format!(
        "{}\n... (truncated, {} bytes total)",
        &formatted[..end],
        formatted.len()
    )
}

/// "1 block" / "3 blocks"
pub fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 20), "short");
        assert_eq!(truncate("abcdefghij", 4), "abcd...");
        // multibyte safe
        assert_eq!(truncate("ééééé", 2), "éé...");
    }

    #[test]
    fn test_truncate_key() {
        let key = "-----BEGIN PUBLIC KEY-----\nMFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAE\n-----END PUBLIC KEY-----";
        let short = truncate_key(key, KEY_EDGE);
        assert_eq!(short, "-----BEGIN PUBL...PUBLIC KEY-----");
        assert!(!short.contains('\n'));
        assert_eq!(truncate_key("abc", KEY_EDGE), "abc");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "");
        assert_eq!(format_timestamp(1_700_000_000).len(), "2023-11-14 22:13:20".len());
    }

    #[test]
    fn test_pretty_json_caps_output() {
        let v = json!({"a": "x".repeat(100), "b": "y".repeat(100)});
        let out = pretty_json(&v, 64);
        assert!(out.contains("truncated"));
        assert!(pretty_json(&json!([1]), 1024).starts_with('['));
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "block", "blocks"), "1 block");
        assert_eq!(plural(0, "block", "blocks"), "0 blocks");
    }
}
