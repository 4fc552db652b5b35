//! Error types for prompt relay and artifact storage.

/// Errors that can occur while generating, storing or serving images.
#[derive(Debug, thiserror::Error)]
pub enum GenStudioError {
    /// Request was missing a required field.
    #[error("{0}")]
    Validation(String),

    /// Provider returned a non-success response.
    #[error("provider error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Network or HTTP error talking to the provider.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Downloaded bytes were not a valid image.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// Unknown operation id, or its file is gone.
    #[error("{0}")]
    NotFound(String),

    /// Provider was configured with unusable parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// I/O error (e.g., saving file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenStudioError {
    /// Returns true if the error came from the external provider.
    pub fn is_provider_error(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::Network(_))
    }

    /// Returns true for unknown ids and missing files.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<::image::ImageError> for GenStudioError {
    fn from(err: ::image::ImageError) -> Self {
        match err {
            ::image::ImageError::IoError(e) => Self::Io(e),
            other => Self::Decode(other.to_string()),
        }
    }
}

/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, GenStudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_provider_error() {
        let api = GenStudioError::Api {
            status: 502,
            message: "bad gateway".into(),
        };
        assert!(api.is_provider_error());

        assert!(!GenStudioError::Validation("prompt is required".into()).is_provider_error());
        assert!(!GenStudioError::Decode("truncated".into()).is_provider_error());
        assert!(!GenStudioError::NotFound("Image not found".into()).is_provider_error());
    }

    #[test]
    fn test_is_not_found() {
        assert!(GenStudioError::NotFound("Image not found".into()).is_not_found());
        assert!(!GenStudioError::Validation("x".into()).is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = GenStudioError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "provider error: 404 - Not found");

        let err = GenStudioError::Validation("prompt is required".into());
        assert_eq!(err.to_string(), "prompt is required");

        let err = GenStudioError::NotFound("Image file not found".into());
        assert_eq!(err.to_string(), "Image file not found");
    }

    #[test]
    fn test_image_error_maps_to_decode() {
        let err = ::image::load_from_memory(b"definitely not an image").unwrap_err();
        let err: GenStudioError = err.into();
        assert!(matches!(err, GenStudioError::Decode(_)));
    }
}
