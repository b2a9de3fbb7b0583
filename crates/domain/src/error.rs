/// Shared error type used across all DMFY crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// A flow definition failed validation at publish time.
    #[error("invalid flow: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    /// An outbound message could not be delivered to the platform.
    #[error("delivery to {recipient} failed: {message}")]
    Delivery { recipient: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] naming the offending field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The field path of a validation error, if this is one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_names_field() {
        let err = Error::validation("entryNodeId", "node \"x\" does not exist");
        assert_eq!(
            err.to_string(),
            "invalid flow: entryNodeId: node \"x\" does not exist"
        );
        assert_eq!(err.field(), Some("entryNodeId"));
    }

    #[test]
    fn non_validation_has_no_field() {
        assert!(Error::Other("boom".into()).field().is_none());
    }
}
