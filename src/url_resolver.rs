use std::fmt;
use url::Url;

/// Why a reference is left alone instead of being mirrored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    Empty,
    DataUri,
    UnsupportedScheme(String),
    Unparsable(String),
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusion::Empty => write!(f, "empty reference"),
            Exclusion::DataUri => write!(f, "inline data URI"),
            Exclusion::UnsupportedScheme(scheme) => write!(f, "unsupported scheme {scheme:?}"),
            Exclusion::Unparsable(reason) => write!(f, "unparsable reference: {reason}"),
        }
    }
}

/// An absolute, fetchable URL. The fragment never reaches the server, so it
/// is kept apart from the URL used for fetching and deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub url: Url,
    pub fragment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Fetchable(ResolvedUrl),
    Excluded(Exclusion),
}

/// Resolves a raw attribute value against the page URL.
pub fn resolve(raw: &str, base: &Url) -> Resolution {
    let raw = raw.trim_matches(|c: char| c.is_ascii_whitespace());
    if raw.is_empty() {
        return Resolution::Excluded(Exclusion::Empty);
    }
    if raw
        .get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
    {
        return Resolution::Excluded(Exclusion::DataUri);
    }

    // Url::join covers protocol-relative, root-relative, path-relative and
    // fragment-only references.
    let mut url = match base.join(raw) {
        Ok(url) => url,
        Err(e) => return Resolution::Excluded(Exclusion::Unparsable(e.to_string())),
    };

    match url.scheme() {
        "http" | "https" => {}
        "data" => return Resolution::Excluded(Exclusion::DataUri),
        other => return Resolution::Excluded(Exclusion::UnsupportedScheme(other.to_string())),
    }

    let fragment = url.fragment().map(str::to_owned);
    url.set_fragment(None);
    Resolution::Fetchable(ResolvedUrl { url, fragment })
}
