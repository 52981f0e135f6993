use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// A schema file is not valid JSON
    #[error("Failed to parse JSON schema: {0}")]
    SchemaParseError(#[from] serde_json::Error),

    /// Schema file could not be read
    #[error("Failed to read schema file: {0}")]
    SchemaFileReadError(#[from] std::io::Error),

    /// The schema parses but does not compile into a validator
    #[error("Invalid JSON schema provided: {0}")]
    InvalidSchemaError(String),

    /// The schema reference cannot be turned into a file location
    #[error("Cannot resolve schema reference {reference:?} from {base}")]
    UnresolvableSchemaReference { reference: String, base: PathBuf },
}

// Helper type alias for Results using this error type
pub type ValidationResult<T> = Result<T, SchemaValidationError>;

impl SchemaValidationError {
    /// Whether the document itself is at fault rather than the schema setup
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            SchemaValidationError::UnresolvableSchemaReference { .. }
        )
    }
}
