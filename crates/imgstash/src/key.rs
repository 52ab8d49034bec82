//! Cache key sanitization

use std::fmt;

/// Characters that are mapped to `_` when a key becomes a filename.
const REPLACED: &[char] = &['.', ':', '/', ',', '%', '?', '&', '='];

/// Filesystem-safe form of a caller-supplied cache key.
///
/// Sanitization is pure and deterministic, so the same key always maps to
/// the same storage key. It is also lossy: `"a.b"` and `"a:b"` collide, and
/// callers are expected to keep their key space collision-free.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Sanitize a raw cache key.
    ///
    /// Every character in `.:/,%?&=` becomes `_`, then runs of consecutive
    /// `_` collapse to a single `_`. The transform is idempotent.
    pub fn new(key: &str) -> Self {
        let mut out = String::with_capacity(key.len());
        let mut prev_underscore = false;
        for c in key.chars() {
            let c = if REPLACED.contains(&c) { '_' } else { c };
            if c == '_' {
                if !prev_underscore {
                    out.push('_');
                }
                prev_underscore = true;
            } else {
                out.push(c);
                prev_underscore = false;
            }
        }
        StorageKey(out)
    }

    /// The sanitized key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_reserved_characters() {
        assert_eq!(StorageKey::new("a.b").as_str(), "a_b");
        assert_eq!(StorageKey::new("a:b").as_str(), "a_b");
        assert_eq!(StorageKey::new("a,b?c&d=e").as_str(), "a_b_c_d_e");
        assert_eq!(StorageKey::new("50%").as_str(), "50_");
    }

    #[test]
    fn test_collapses_runs() {
        assert_eq!(StorageKey::new("a::b").as_str(), "a_b");
        assert_eq!(StorageKey::new("a:/b").as_str(), "a_b");
        assert_eq!(StorageKey::new("a..b").as_str(), "a_b");
        // Pre-existing underscores collapse too.
        assert_eq!(StorageKey::new("a__b").as_str(), "a_b");
        assert_eq!(StorageKey::new("a_._b").as_str(), "a_b");
    }

    #[test]
    fn test_url_key() {
        assert_eq!(
            StorageKey::new("http://x/a.png").as_str(),
            "http_x_a_png"
        );
    }

    #[test]
    fn test_safe_characters_pass_through() {
        assert_eq!(StorageKey::new("poster-1080 (hd)").as_str(), "poster-1080 (hd)");
    }

    #[test]
    fn test_idempotent() {
        let once = StorageKey::new("http://x/a.png?res=720&v=2");
        let twice = StorageKey::new(once.as_str());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_key() {
        assert_eq!(StorageKey::new("").as_str(), "");
    }
}
