//! Pre-network validation for selected files.

use crate::api::FilePayload;

use super::types::{UploadLimits, ValidateError};

/// Content types the processing service accepts.
pub const ACCEPTED_CONTENT_TYPES: [&str; 5] = [
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/tiff",
];

/// Check a file against the accepted-type and size rules.
///
/// Runs before any network activity; a rejected file never enters the queue.
pub fn validate_file(file: &FilePayload, limits: &UploadLimits) -> Result<(), ValidateError> {
    let content_type = file.content_type.trim().to_lowercase();
    if !ACCEPTED_CONTENT_TYPES.contains(&content_type.as_str()) {
        return Err(ValidateError::UnsupportedType(file.content_type.clone()));
    }

    if file.bytes.is_empty() {
        return Err(ValidateError::EmptyFile);
    }

    if file.bytes.len() > limits.max_file_bytes {
        return Err(ValidateError::TooLarge {
            size_bytes: file.bytes.len(),
            max_bytes: limits.max_file_bytes,
        });
    }

    Ok(())
}

/// Guess a MIME content type from a filename extension.
///
/// Covers the accepted-type set only; anything else returns `None` and is
/// left to the caller to reject or override.
pub fn guess_content_type(filename: &str) -> Option<&'static str> {
    let extension = filename.rsplit_once('.')?.1.to_lowercase();
    match extension.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(content_type: &str, size: usize) -> FilePayload {
        FilePayload {
            filename: "sample.pdf".into(),
            content_type: content_type.into(),
            bytes: vec![0_u8; size],
        }
    }

    #[test]
    fn accepts_supported_types_within_limits() {
        let limits = UploadLimits::default();
        for content_type in ACCEPTED_CONTENT_TYPES {
            assert_eq!(validate_file(&payload(content_type, 128), &limits), Ok(()));
        }
    }

    #[test]
    fn rejects_unsupported_type() {
        let limits = UploadLimits::default();
        assert_eq!(
            validate_file(&payload("application/zip", 128), &limits),
            Err(ValidateError::UnsupportedType("application/zip".into()))
        );
    }

    #[test]
    fn rejects_empty_and_oversized_files() {
        let limits = UploadLimits {
            max_file_bytes: 1024,
            max_files: 10,
        };
        assert_eq!(
            validate_file(&payload("application/pdf", 0), &limits),
            Err(ValidateError::EmptyFile)
        );
        assert_eq!(
            validate_file(&payload("application/pdf", 2048), &limits),
            Err(ValidateError::TooLarge {
                size_bytes: 2048,
                max_bytes: 1024
            })
        );
    }

    #[test]
    fn content_type_is_matched_case_insensitively() {
        let limits = UploadLimits::default();
        assert_eq!(
            validate_file(&payload("Application/PDF", 16), &limits),
            Ok(())
        );
    }

    #[test]
    fn guesses_types_from_extensions() {
        assert_eq!(guess_content_type("scan.PDF"), Some("application/pdf"));
        assert_eq!(guess_content_type("page.tiff"), Some("image/tiff"));
        assert_eq!(guess_content_type("photo.jpeg"), Some("image/jpeg"));
        assert_eq!(guess_content_type("archive.zip"), None);
        assert_eq!(guess_content_type("no-extension"), None);
    }
}
