//! Data URI handling and download naming.
//!
//! Images travel through the whole app as self-contained data URIs
//! (`data:<mime>;base64,<payload>`), never as separate byte buffers with
//! out-of-band MIME. Everything that needs to look inside one goes through
//! here.

use base64::Engine;

use crate::{AppError, ErrorKind};

pub const DOWNLOAD_FILENAME_PREFIX: &str = "ak_ai_";
pub const DOWNLOAD_STEM_MAX_CHARS: usize = 30;
pub const DOWNLOAD_FALLBACK_STEM: &str = "generated";

/// MIME type and base64 payload recovered from a data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUriParts {
    pub mime_type: String,
    pub base64_payload: String,
}

#[must_use]
pub fn data_uri(mime_type: &str, base64_payload: &str) -> String {
    format!("data:{mime_type};base64,{base64_payload}")
}

#[must_use]
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Splits a data URI back into MIME type and payload.
///
/// Mirrors what the upscale path needs: the header up to the first `,` must
/// carry a `data:<mime>;...` shape with a non-empty MIME, and the payload
/// must be non-empty.
pub fn parse_data_uri(uri: &str) -> Result<DataUriParts, AppError> {
    let malformed = || {
        AppError::new(
            ErrorKind::Validation,
            "The image data is not in a recognized format.",
        )
    };

    let (header, payload) = uri.split_once(',').ok_or_else(malformed)?;
    if payload.is_empty() {
        return Err(malformed());
    }

    let meta = header.strip_prefix("data:").ok_or_else(malformed)?;
    let mime_type = meta.split(';').next().unwrap_or_default();
    if mime_type.is_empty() {
        return Err(AppError::new(
            ErrorKind::Validation,
            "Could not determine the image type.",
        ));
    }

    Ok(DataUriParts {
        mime_type: mime_type.to_string(),
        base64_payload: payload.to_string(),
    })
}

/// Extension for a client-side save, sniffed from the URI prefix.
/// Everything that is not JPEG is written as PNG.
#[must_use]
pub fn file_extension(uri: &str) -> &'static str {
    if uri.starts_with("data:image/jpeg") {
        "jpeg"
    } else {
        "png"
    }
}

/// Filename for a downloaded image: `ak_ai_<stem>.<ext>` where the stem is
/// the prompt stripped to `[A-Za-z0-9_]` and cut to 30 characters.
#[must_use]
pub fn download_filename(prompt: &str, image_uri: &str) -> String {
    let stem: String = prompt
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(DOWNLOAD_STEM_MAX_CHARS)
        .collect();

    let stem = if stem.is_empty() {
        DOWNLOAD_FALLBACK_STEM
    } else {
        &stem
    };

    format!(
        "{DOWNLOAD_FILENAME_PREFIX}{stem}.{}",
        file_extension(image_uri)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn round_trips_a_data_uri() {
        let uri = data_uri("image/png", "aGVsbG8=");
        assert_eq!(uri, "data:image/png;base64,aGVsbG8=");

        let parts = parse_data_uri(&uri).unwrap();
        assert_eq!(parts.mime_type, "image/png");
        assert_eq!(parts.base64_payload, "aGVsbG8=");
    }

    #[test]
    fn rejects_uri_without_payload_separator() {
        let err = parse_data_uri("data:image/png;base64").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn rejects_empty_payload() {
        assert!(parse_data_uri("data:image/png;base64,").is_err());
    }

    #[test]
    fn rejects_missing_scheme_or_mime() {
        assert!(parse_data_uri("image/png;base64,aGVsbG8=").is_err());
        assert!(parse_data_uri("data:;base64,aGVsbG8=").is_err());
    }

    #[test]
    fn extension_sniffs_jpeg_and_defaults_to_png() {
        assert_eq!(file_extension("data:image/jpeg;base64,xx"), "jpeg");
        assert_eq!(file_extension("data:image/png;base64,xx"), "png");
        assert_eq!(file_extension("data:image/webp;base64,xx"), "png");
    }

    #[test]
    fn filename_strips_disallowed_characters() {
        let name = download_filename("a red fox!", "data:image/jpeg;base64,xx");
        assert_eq!(name, "ak_ai_aredfox.jpeg");
    }

    #[test]
    fn filename_falls_back_when_nothing_survives() {
        let name = download_filename("!!! ???", "data:image/png;base64,xx");
        assert_eq!(name, "ak_ai_generated.png");
    }

    #[test]
    fn filename_truncates_long_prompts() {
        let prompt = "x".repeat(100);
        let name = download_filename(&prompt, "data:image/png;base64,xx");
        assert_eq!(name, format!("ak_ai_{}.png", "x".repeat(30)));
    }

    #[test]
    fn encode_base64_matches_known_vector() {
        assert_eq!(encode_base64(b"hello"), "aGVsbG8=");
    }

    proptest! {
        #[test]
        fn filename_is_always_well_formed(prompt in ".*", jpeg in proptest::bool::ANY) {
            let uri = if jpeg { "data:image/jpeg;base64,xx" } else { "data:image/png;base64,xx" };
            let name = download_filename(&prompt, uri);

            let stem = name
                .strip_prefix(DOWNLOAD_FILENAME_PREFIX)
                .and_then(|rest| rest.rsplit_once('.'))
                .map(|(stem, _)| stem)
                .unwrap();

            prop_assert!(!stem.is_empty());
            prop_assert!(stem.chars().count() <= DOWNLOAD_STEM_MAX_CHARS);
            prop_assert!(stem == DOWNLOAD_FALLBACK_STEM
                || stem.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        }

        #[test]
        fn parse_never_panics(uri in ".*") {
            let _ = parse_data_uri(&uri);
        }
    }
}
