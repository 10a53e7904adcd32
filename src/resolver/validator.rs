// Link validation - classifies raw input text

use url::Url;

use super::models::Validation;
use crate::config::SUPPORTED_HOSTS;

/// Classify raw link text. Pure and infallible: anything that does not
/// parse is `InvalidSyntax`, never an error.
///
/// Order matters: empty input wins over syntax, syntax over platform
/// support. Only a `Valid` result may spawn a metadata fetch.
pub fn classify(raw: &str) -> Validation {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Validation::Empty;
    }

    let parsed = match Url::parse(trimmed) {
        Ok(u) => u,
        Err(_) => return Validation::InvalidSyntax,
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return Validation::InvalidSyntax;
    }

    let host = match parsed.host_str() {
        Some(h) => h.to_ascii_lowercase(),
        None => return Validation::InvalidSyntax,
    };

    if !SUPPORTED_HOSTS.iter().any(|&d| d == host) {
        return Validation::UnsupportedPlatform;
    }

    Validation::Valid
}

/// Status line shown for a classification.
pub fn status_text(validation: Validation) -> &'static str {
    match validation {
        Validation::Empty => "Waiting for link...",
        Validation::Verifying => "Verifying link...",
        Validation::InvalidSyntax => "Invalid URL format.",
        Validation::UnsupportedPlatform => "Not a supported media site.",
        Validation::Valid => "Link fetched!",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(classify(""), Validation::Empty);
        assert_eq!(classify("   "), Validation::Empty);
    }

    #[test]
    fn test_malformed_text() {
        assert_eq!(classify("not a url"), Validation::InvalidSyntax);
        assert_eq!(classify("youtu.be/abc"), Validation::InvalidSyntax); // no scheme
        assert_eq!(classify("ftp://youtube.com/watch"), Validation::InvalidSyntax);
    }

    #[test]
    fn test_unsupported_hosts() {
        assert_eq!(
            classify("https://vimeo.com/12345"),
            Validation::UnsupportedPlatform
        );
        assert_eq!(
            classify("https://example.com/watch?v=abc"),
            Validation::UnsupportedPlatform
        );
    }

    #[test]
    fn test_supported_hosts() {
        assert_eq!(classify("https://youtu.be/abc"), Validation::Valid);
        assert_eq!(
            classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Validation::Valid
        );
        assert_eq!(
            classify("https://music.youtube.com/watch?v=abc"),
            Validation::Valid
        );
        // Host matching is case-insensitive, scheme either http or https.
        assert_eq!(classify("http://YouTube.com/watch?v=abc"), Validation::Valid);
    }

    #[test]
    fn test_lookalike_host_is_not_supported() {
        assert_eq!(
            classify("https://notyoutube.com/watch?v=abc"),
            Validation::UnsupportedPlatform
        );
    }
}
