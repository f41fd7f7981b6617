//! URL canonicalization for consistent request keys.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for showbell_core::Error {
    fn from(err: UrlError) -> Self {
        showbell_core::Error::InvalidUrl(err.to_string())
    }
}

/// Canonicalize a URL string so equal resources share a request key.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve paths starting with `/` against `base` when one is given
/// 3. Default scheme to https:// if missing
/// 4. Lowercase the host
/// 5. Remove fragment (#...)
/// 6. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str, base: Option<&url::Url>) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match base {
        Some(base) if trimmed.starts_with('/') && !trimmed.starts_with("//") => {
            base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
        _ => {
            let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };
            url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> url::Url {
        url::Url::parse("http://localhost:3000").unwrap()
    }

    #[test]
    fn test_canonicalize_default_scheme() {
        let url = canonicalize("image.tmdb.org/t/p/w500/a.jpg", None).unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("image.tmdb.org"));
    }

    #[test]
    fn test_canonicalize_lowercase_host_and_drop_fragment() {
        let url = canonicalize("https://IMAGE.TMDB.ORG/a.jpg#top", None).unwrap();
        assert_eq!(url.as_str(), "https://image.tmdb.org/a.jpg");
    }

    #[test]
    fn test_canonicalize_preserve_query() {
        let url = canonicalize("https://api.themoviedb.org/3/tv/42?b=2&a=1", None).unwrap();
        assert_eq!(url.query(), Some("b=2&a=1"));
    }

    #[test]
    fn test_canonicalize_relative_against_base() {
        let url = canonicalize("/icons/icon-192x192.png", Some(&origin())).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/icons/icon-192x192.png");
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd", Some(&origin()));
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_empty() {
        assert!(matches!(canonicalize("   ", None), Err(UrlError::Empty)));
    }
}
