use crate::{
    bucket::ValidationIssue,
    error::{SchemaValidationError, ValidationResult},
    json_pointer,
};

use tracing::{debug, info, instrument, trace, warn};

/// Runs the JSON schema validator and converts its errors into [`ValidationIssue`]s
pub struct SchemaValidator<'a> {
    json_schema: &'a serde_json::Value,
    file_as_json: &'a serde_json::Value,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(json_schema: &'a serde_json::Value, file_as_json: &'a serde_json::Value) -> Self {
        Self {
            json_schema,
            file_as_json,
        }
    }

    /// Issues in the order the validator reports them
    #[instrument(skip(self))]
    pub fn issues(self) -> ValidationResult<Vec<ValidationIssue>> {
        trace!("Creating schema validator");
        let validator = jsonschema::validator_for(self.json_schema)
            .map_err(|e| SchemaValidationError::InvalidSchemaError(e.to_string()))?;

        debug!("Schema validator created successfully");

        let issues: Vec<ValidationIssue> = validator
            .iter_errors(self.file_as_json)
            .map(|e| into_issue(&e, self.file_as_json))
            .collect();

        if issues.is_empty() {
            info!("Schema validation passed with no errors");
        } else {
            warn!(error_count = issues.len(), "Schema validation found errors");
        }

        Ok(issues)
    }
}

#[instrument(skip(error, instance), fields(instance_path = %error.instance_path()))]
fn into_issue(error: &jsonschema::ValidationError<'_>, instance: &serde_json::Value) -> ValidationIssue {
    let path = json_pointer::into_path(error.instance_path().as_str(), instance);
    let message = error.to_string();

    trace!(path = %path, error = %message, "Converted validation error");

    ValidationIssue::new(path, message)
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn issues_carry_structural_paths() -> Result<(), Box<dyn std::error::Error>> {
        let schema = json!({
            "type": "object",
            "properties": {
                "a": { "type": "object", "properties": { "b": { "type": "string" } } },
                "c": { "type": "array", "items": { "type": "integer", "maximum": 2 } }
            }
        });
        let instance = json!({"a": {"b": 1}, "c": [2, 3]});

        let issues = SchemaValidator::new(&schema, &instance).issues()?;
        let paths: Vec<_> = issues.iter().map(|i| i.path.clone()).collect();

        assert_eq!(issues.len(), 2);
        assert!(paths.contains(&path!["a", "b"]));
        assert!(paths.contains(&path!["c", 1]));
        Ok(())
    }

    #[test]
    fn valid_document_has_no_issues() -> Result<(), Box<dyn std::error::Error>> {
        let schema = json!({"type": "object"});
        let instance = json!({});

        assert!(SchemaValidator::new(&schema, &instance).issues()?.is_empty());
        Ok(())
    }

    #[test]
    fn invalid_schema_is_an_error() {
        let schema = json!({"type": 12});
        let instance = json!({});

        let result = SchemaValidator::new(&schema, &instance).issues();
        assert!(matches!(
            result,
            Err(SchemaValidationError::InvalidSchemaError(_))
        ));
    }

    #[test]
    fn missing_property_lands_on_parent_object() -> Result<(), Box<dyn std::error::Error>> {
        let schema = json!({"type": "object", "required": ["missing"]});
        let instance = json!({});

        let issues = SchemaValidator::new(&schema, &instance).issues()?;
        assert_eq!(issues.len(), 1);
        assert!(issues[0].path.is_root());
        Ok(())
    }
}
