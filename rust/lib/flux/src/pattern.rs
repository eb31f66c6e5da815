//! MQTT-style path patterns.
//!
//! - `feed/state` matches only itself.
//! - `card/+/caption` matches `card/p1/caption`, not `card/p1/x/caption`.
//! - `card/#` matches everything under `card/`; `#` matches every path.

/// Whether `pattern` matches the concrete `path`.
pub fn matches(pattern: &str, path: &str) -> bool {
    let mut pat = pattern.split('/');
    let mut segs = path.split('/');
    loop {
        match (pat.next(), segs.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(p), Some(s)) if p == s => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
