use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrontoError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("state error: {0}")]
    State(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type BrontoResult<T> = Result<T, BrontoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_message() {
        let err = BrontoError::Config("BRONTO_API_TOKEN is required but not set".to_owned());
        assert_eq!(
            err.to_string(),
            "configuration error: BRONTO_API_TOKEN is required but not set"
        );
    }

    #[test]
    fn serde_error_converts() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: BrontoError = parse.into();
        assert!(matches!(err, BrontoError::Serialization(_)));
    }
}
