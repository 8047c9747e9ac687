//! Target URL validation and normalization.
//!
//! Only absolute `http`/`https` URLs with a host are accepted. Normalization
//! lowercases the host, drops default ports and removes the fragment; path and
//! query are preserved byte-for-byte.

use url::Url;

/// Longest target URL accepted, in bytes after normalization.
pub const MAX_URL_LENGTH: usize = 8192;

#[derive(Debug, thiserror::Error)]
pub enum UrlNormalizationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL must contain a host")]
    MissingHost,

    #[error("URL exceeds {MAX_URL_LENGTH} bytes")]
    TooLong,
}

/// Normalizes a target URL to its canonical form.
///
/// ```ignore
/// assert_eq!(
///     normalize_url("HTTPS://EXAMPLE.COM:443/Path?q=1#top").unwrap(),
///     "https://example.com/Path?q=1"
/// );
/// ```
///
/// # Errors
///
/// Rejects malformed input, non-HTTP(S) schemes (`javascript:`, `data:`,
/// `file:`, ...), host-less URLs and URLs longer than [`MAX_URL_LENGTH`].
pub fn normalize_url(input: &str) -> Result<String, UrlNormalizationError> {
    let mut url =
        Url::parse(input.trim()).map_err(|e| UrlNormalizationError::InvalidFormat(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlNormalizationError::UnsupportedProtocol);
    }

    // `Url` already lowercases registered domain names for special schemes.
    if url.host_str().is_none_or(str::is_empty) {
        return Err(UrlNormalizationError::MissingHost);
    }

    // Default ports are dropped by the parser itself.
    url.set_fragment(None);

    let normalized = String::from(url);
    if normalized.len() > MAX_URL_LENGTH {
        return Err(UrlNormalizationError::TooLong);
    }

    Ok(normalized)
}
