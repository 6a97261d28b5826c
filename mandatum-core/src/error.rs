use thiserror::Error;

/// All errors produced by mandatum-core.
///
/// The activation variants mirror the classified failures surfaced by the
/// native engine's licensing service; their `Display` strings are shown
/// verbatim in the app's error banner.
#[derive(Debug, Error)]
pub enum MandatumError {
    #[error("{detail}\nPlease make sure your accessKey '{access_key}' is valid")]
    InvalidAccessKey { access_key: String, detail: String },

    #[error("AccessKey activation error")]
    ActivationFailed,

    #[error("AccessKey reached its device limit")]
    ActivationLimitReached,

    #[error("AccessKey refused")]
    ActivationRefused,

    #[error("AccessKey has been throttled")]
    ActivationThrottled,

    #[error("unsupported platform: {os}")]
    UnsupportedPlatform { os: String },

    #[error("model artifact not found: {path}")]
    ModelNotFound { path: std::path::PathBuf },

    #[error("a listening cycle is already in flight")]
    AlreadyListening,

    #[error("no listening cycle is in flight")]
    NotListening,

    #[error("engine is not ready")]
    NotReady,

    #[error("recognizer error: {0}")]
    Recognizer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MandatumError {
    /// Whether this error came from the engine's activation/licensing step.
    pub fn is_activation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAccessKey { .. }
                | Self::ActivationFailed
                | Self::ActivationLimitReached
                | Self::ActivationRefused
                | Self::ActivationThrottled
        )
    }
}

pub type Result<T> = std::result::Result<T, MandatumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_messages_match_banner_wording() {
        assert_eq!(
            MandatumError::ActivationLimitReached.to_string(),
            "AccessKey reached its device limit"
        );
        assert_eq!(
            MandatumError::ActivationRefused.to_string(),
            "AccessKey refused"
        );
        assert_eq!(
            MandatumError::ActivationThrottled.to_string(),
            "AccessKey has been throttled"
        );
        assert_eq!(
            MandatumError::ActivationFailed.to_string(),
            "AccessKey activation error"
        );
    }

    #[test]
    fn invalid_access_key_embeds_the_offending_key() {
        let err = MandatumError::InvalidAccessKey {
            access_key: "BAD-KEY==".into(),
            detail: "activation returned INVALID_ARGUMENT".into(),
        };
        let message = err.to_string();
        assert!(message.contains("accessKey 'BAD-KEY=='"), "{message}");
        assert!(message.starts_with("activation returned INVALID_ARGUMENT"));
    }

    #[test]
    fn is_activation_covers_exactly_the_licensing_kinds() {
        assert!(MandatumError::ActivationLimitReached.is_activation());
        assert!(MandatumError::InvalidAccessKey {
            access_key: String::new(),
            detail: String::new(),
        }
        .is_activation());
        assert!(!MandatumError::AlreadyListening.is_activation());
        assert!(!MandatumError::Recognizer("boom".into()).is_activation());
    }
}
