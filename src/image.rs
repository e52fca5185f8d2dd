//! Validation of the optional image attachment.
//!
//! The image is checked for well-formed base64 and then discarded; it is
//! not forwarded to the model. A bad image never fails the request.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Outcome of inspecting an attached image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageCheck {
    /// Decoded successfully; holds the decoded size in bytes.
    Valid { bytes: usize },
    /// Not decodable; holds the decoder's message.
    Invalid(String),
}

/// Decodes `data` as standard base64, accepting a `data:<mime>;base64,`
/// prefix and ignoring embedded whitespace.
pub fn inspect_image(data: &str) -> ImageCheck {
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    match STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => ImageCheck::Valid { bytes: bytes.len() },
        Err(e) => ImageCheck::Invalid(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_raw_base64() {
        let encoded = STANDARD.encode(b"\x89PNG fake image");
        assert_eq!(inspect_image(&encoded), ImageCheck::Valid { bytes: 15 });
    }

    #[test]
    fn test_valid_data_url() {
        let encoded = format!("data:image/png;base64,{}", STANDARD.encode(b"abc"));
        assert_eq!(inspect_image(&encoded), ImageCheck::Valid { bytes: 3 });
    }

    #[test]
    fn test_whitespace_is_ignored() {
        let encoded = STANDARD.encode(b"hello world, this is long");
        let wrapped = format!("{}\n{}", &encoded[..8], &encoded[8..]);
        assert!(matches!(inspect_image(&wrapped), ImageCheck::Valid { .. }));
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(
            inspect_image("not base64 at all!!"),
            ImageCheck::Invalid(_)
        ));
    }
}
