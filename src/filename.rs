//! Deterministic local filenames for mirrored URLs.
//!
//! A filename is the URL with every character outside `[A-Za-z0-9]` replaced
//! by `_`, cut to [`MAX_STEM_LEN`] characters, followed by `_` and the first
//! [`FINGERPRINT_LEN`] hex digits of the URL's SHA-256. The stem keeps names
//! readable; the fingerprint keeps URLs that share a long prefix apart.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use url::Url;

pub const SEPARATOR: char = '_';
pub const MAX_STEM_LEN: usize = 100;
pub const FINGERPRINT_LEN: usize = 16;
pub const DOCUMENT_EXTENSION: &str = "html";

fn unsafe_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9]").expect("static pattern is valid"))
}

/// Replaces every non-alphanumeric character with [`SEPARATOR`].
pub fn sanitize(input: &str) -> String {
    unsafe_chars()
        .replace_all(input, SEPARATOR.to_string().as_str())
        .into_owned()
}

/// Stable short hash of the full URL string.
pub fn fingerprint(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// Local filename for a resource URL.
pub fn derive_filename(url: &Url) -> String {
    let full = url.as_str();
    let mut stem = sanitize(full);
    // sanitize leaves only ASCII, so byte truncation is char-safe
    stem.truncate(MAX_STEM_LEN);
    format!("{stem}{SEPARATOR}{}", fingerprint(full))
}

/// Local filename for the mirrored page itself.
pub fn document_filename(url: &Url, is_html: bool) -> String {
    let name = derive_filename(url);
    if is_html {
        format!("{name}.{DOCUMENT_EXTENSION}")
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_sanitize() {
        let test_cases = vec![
            ("normal/path", "normal_path"),
            ("path with spaces", "path_with_spaces"),
            ("path?with=query", "path_with_query"),
            ("path#fragment", "path_fragment"),
            ("caf\u{e9}.css", "caf__css"),
        ];

        for (input, expected) in test_cases {
            assert_eq!(sanitize(input), expected, "Failed for input: {}", input);
        }
    }

    #[test]
    fn test_derive_is_deterministic() {
        let u = url("https://example.test/logo.png");
        assert_eq!(derive_filename(&u), derive_filename(&u));
        assert_eq!(
            derive_filename(&u),
            format!("https___example_test_logo_png_{}", fingerprint(u.as_str()))
        );
    }

    #[test]
    fn test_fingerprint_is_stable_sha256_prefix() {
        // sha256("abc") = ba7816bf8f01cfea...
        assert_eq!(fingerprint("abc"), "ba7816bf8f01cfea");
    }

    #[test]
    fn test_same_sanitized_form_does_not_collide() {
        let a = url("https://example.test/a-b.css");
        let b = url("https://example.test/a_b.css");
        assert_eq!(sanitize(a.as_str()), sanitize(b.as_str()));
        assert_ne!(derive_filename(&a), derive_filename(&b));
    }

    #[test]
    fn test_long_urls_differing_past_truncation_do_not_collide() {
        let prefix = format!("https://example.test/{}", "x".repeat(150));
        let a = url(&format!("{prefix}/one.js"));
        let b = url(&format!("{prefix}/two.js"));

        let name_a = derive_filename(&a);
        let name_b = derive_filename(&b);
        assert_ne!(name_a, name_b);
        assert_eq!(name_a[..MAX_STEM_LEN], name_b[..MAX_STEM_LEN]);
        assert_eq!(name_a.len(), MAX_STEM_LEN + 1 + FINGERPRINT_LEN);
    }

    #[test]
    fn test_filenames_are_filesystem_safe() {
        let name = derive_filename(&url("https://example.test/a/../b?c=d&e=%20f"));
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn test_document_filename_extension() {
        let u = url("https://example.test/index.html");
        assert_eq!(document_filename(&u, true), format!("{}.html", derive_filename(&u)));
        assert_eq!(document_filename(&u, false), derive_filename(&u));
    }
}
