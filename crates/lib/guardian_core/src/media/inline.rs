//! Inline (base64) image payloads for the degraded upload path.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use uuid::Uuid;

use super::{MediaError, MediaLimits, canonical_content_type};
use crate::models::media::MediaHandle;

/// Identify an allowed image format from its leading bytes.
pub fn sniff_content_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Split `data:<mime>;base64,<data>` into its MIME type and data; raw base64
/// comes back with no declared type.
fn split_data_url(payload: &str) -> Result<(Option<&str>, &str), MediaError> {
    let Some(rest) = payload.strip_prefix("data:") else {
        return Ok((None, payload));
    };
    let (meta, data) = rest
        .split_once(',')
        .ok_or_else(|| MediaError::Validation("Malformed data URL".into()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| MediaError::Validation("Data URL must be base64 encoded".into()))?;
    Ok((Some(mime), data))
}

/// Decode one payload and validate it, returning the canonical type and bytes.
pub fn decode_inline(
    payload: &str,
    label: &str,
    limits: &MediaLimits,
) -> Result<(&'static str, Vec<u8>), MediaError> {
    let (declared, data) = split_data_url(payload.trim())?;
    let data: String = data.chars().filter(|c| !c.is_whitespace()).collect();

    // Cheap pre-check on the encoded length before allocating the decode buffer.
    let approx = data.len() / 4 * 3;
    if approx > limits.max_file_bytes + 3 {
        return Err(MediaError::TooLarge {
            filename: label.to_string(),
            size: approx,
            limit: limits.max_file_bytes,
        });
    }

    let bytes = STANDARD
        .decode(data.as_bytes())
        .map_err(|e| MediaError::Validation(format!("{label}: invalid base64: {e}")))?;

    let sniffed = sniff_content_type(&bytes).ok_or_else(|| MediaError::InvalidType {
        filename: label.to_string(),
        content_type: declared.unwrap_or("unknown").to_string(),
    })?;
    if let Some(mime) = declared {
        // The declared type must be allowed and agree with the bytes.
        if canonical_content_type(mime) != Some(sniffed) {
            return Err(MediaError::InvalidType {
                filename: label.to_string(),
                content_type: mime.to_string(),
            });
        }
    }
    let content_type = sniffed;

    if bytes.len() > limits.max_file_bytes {
        return Err(MediaError::TooLarge {
            filename: label.to_string(),
            size: bytes.len(),
            limit: limits.max_file_bytes,
        });
    }
    Ok((content_type, bytes))
}

/// Validate a payload and wrap it as an opaque handle. No transformation is
/// applied; the handle URL is the normalized data URL itself.
pub fn store_inline(
    payload: &str,
    label: &str,
    limits: &MediaLimits,
) -> Result<MediaHandle, MediaError> {
    let (content_type, bytes) = decode_inline(payload, label, limits)?;
    let mut handle = MediaHandle::new(
        format!("data:{content_type};base64,{}", STANDARD.encode(&bytes)),
        format!("inline-{}", Uuid::new_v4()),
    );
    handle.format = content_type.strip_prefix("image/").map(str::to_string);
    handle.byte_size = Some(bytes.len() as u64);
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn limits(max: usize) -> MediaLimits {
        MediaLimits {
            max_file_bytes: max,
            max_files: 5,
        }
    }

    #[test]
    fn sniffs_known_formats() {
        assert_eq!(sniff_content_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_content_type(&PNG_HEADER), Some("image/png"));
        assert_eq!(sniff_content_type(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_content_type(b"GIF89a"), None);
    }

    #[test]
    fn data_url_is_normalized_into_handle() {
        let payload = format!("data:image/PNG;base64,{}", STANDARD.encode(PNG_HEADER));
        let handle = store_inline(&payload, "image-1", &limits(1024)).unwrap();
        assert!(handle.media_id.starts_with("inline-"));
        assert!(handle.url.starts_with("data:image/png;base64,"));
        assert_eq!(handle.format.as_deref(), Some("png"));
        assert_eq!(handle.byte_size, Some(8));
    }

    #[test]
    fn raw_base64_is_typed_by_magic_bytes() {
        let payload = STANDARD.encode([0xFF, 0xD8, 0xFF, 0xDB, 0x00]);
        let (ct, bytes) = decode_inline(&payload, "image-1", &limits(1024)).unwrap();
        assert_eq!(ct, "image/jpeg");
        assert_eq!(bytes.len(), 5);
    }

    #[test]
    fn disallowed_declared_type_is_rejected() {
        let payload = format!("data:image/gif;base64,{}", STANDARD.encode(b"GIF89a"));
        assert!(matches!(
            decode_inline(&payload, "image-1", &limits(1024)),
            Err(MediaError::InvalidType { .. })
        ));
    }

    #[test]
    fn declared_type_must_match_the_bytes() {
        let pdf = format!("data:image/png;base64,{}", STANDARD.encode(b"%PDF-1.7 fake"));
        assert!(matches!(
            decode_inline(&pdf, "image-1", &limits(1024)),
            Err(MediaError::InvalidType { content_type, .. }) if content_type == "image/png"
        ));

        let jpeg_as_png = format!(
            "data:image/png;base64,{}",
            STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0])
        );
        assert!(matches!(
            decode_inline(&jpeg_as_png, "image-1", &limits(1024)),
            Err(MediaError::InvalidType { .. })
        ));
    }

    #[test]
    fn oversize_payload_is_rejected() {
        let mut bytes = PNG_HEADER.to_vec();
        bytes.resize(64, 0);
        let payload = STANDARD.encode(&bytes);
        assert!(matches!(
            decode_inline(&payload, "image-1", &limits(32)),
            Err(MediaError::TooLarge { .. })
        ));
    }

    #[test]
    fn garbage_is_a_validation_error() {
        assert!(matches!(
            decode_inline("data:image/png,notbase64", "image-1", &limits(1024)),
            Err(MediaError::Validation(_))
        ));
        assert!(matches!(
            decode_inline("!!!", "image-1", &limits(1024)),
            Err(MediaError::Validation(_))
        ));
    }
}
