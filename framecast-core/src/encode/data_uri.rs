//! `data:` URI packing for transmitted frames

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{FramecastError, Result};

/// A parsed base64 `data:` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// MIME type from the header (e.g. `image/jpeg`)
    pub mime_type: String,
    /// Decoded payload
    pub data: Vec<u8>,
}

impl DataUri {
    /// Build a `data:<mime>;base64,<payload>` string
    pub fn encode(mime_type: &str, data: &[u8]) -> String {
        format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
    }

    /// Parse a base64 `data:` URI
    pub fn parse(uri: &str) -> Result<Self> {
        let (header, payload) = uri
            .split_once(',')
            .ok_or_else(|| FramecastError::transport("Data URI has no payload separator"))?;

        let meta = header
            .strip_prefix("data:")
            .ok_or_else(|| FramecastError::transport("Not a data URI"))?;

        let mime_type = meta
            .strip_suffix(";base64")
            .ok_or_else(|| FramecastError::transport("Data URI is not base64-encoded"))?;

        let mime_type = if mime_type.is_empty() {
            "text/plain".to_string()
        } else {
            mime_type.to_string()
        };

        let data = STANDARD
            .decode(payload.trim())
            .map_err(|e| FramecastError::transport(format!("Invalid base64 payload: {}", e)))?;

        Ok(Self { mime_type, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jpeg_uri() {
        let uri = DataUri::encode("image/jpeg", &[0xFF, 0xD8, 0xFF]);
        assert_eq!(uri, "data:image/jpeg;base64,/9j/");

        let parsed = DataUri::parse(&uri).unwrap();
        assert_eq!(parsed.mime_type, "image/jpeg");
        assert_eq!(parsed.data, vec![0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(DataUri::parse("image/jpeg;base64,AAAA").is_err());
        assert!(DataUri::parse("data:image/jpeg,AAAA").is_err());
        assert!(DataUri::parse("data:image/jpeg;base64").is_err());
        assert!(DataUri::parse("data:image/jpeg;base64,@@@").is_err());
    }
}
