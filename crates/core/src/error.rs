use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A referenced load, article or vehicle does not exist.
    NotFound { entity: &'static str, key: String },
    /// Malformed input: caller must correct it, nothing is retried.
    Validation(String),
    /// Storage failure. Any open transaction has been rolled back.
    Persistence(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, key: impl fmt::Display) -> Self {
        Self::NotFound { entity, key: key.to_string() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { entity, key } => write!(f, "{entity} '{key}' not found"),
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
            Self::Persistence(msg) => write!(f, "persistence error: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_entity_and_key() {
        let err = CoreError::not_found("load", 42);
        assert_eq!(err.to_string(), "load '42' not found");
        assert!(CoreError::validation("no invoices provided")
            .to_string()
            .contains("no invoices provided"));
    }
}
