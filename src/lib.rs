pub mod bucket;
pub mod config;
pub mod correlate;
pub mod diagnostic;
pub mod diagnostic_range;
pub mod error;
pub mod json_pointer;
pub mod locator;
pub mod parsing;
pub mod path;
pub mod sink;
pub mod validation;

use tracing::{debug, info, instrument, warn};

use crate::{
    bucket::ValidationIssue, diagnostic::Diagnostic, error::SchemaValidationError,
    parsing::ParsedContent, validation::SchemaValidator,
};

/// Anchors validation issues to the source text they were produced from.
///
/// `source` must be the text the issues' document was parsed from. Yields one
/// diagnostic per distinct issue path, in the order paths first appear in
/// `issues`.
#[instrument(skip(issues, source), fields(content_len = source.len()))]
pub fn correlate_issues<I>(issues: I, source: &str) -> Vec<Diagnostic>
where
    I: IntoIterator<Item = ValidationIssue>,
{
    let buckets = bucket::bucket(issues);
    if buckets.is_empty() {
        return Vec::new();
    }

    correlate::correlate(buckets, locator::locate(source))
}

/// Validates raw file text against a JSON schema.
///
/// Text that is not JSON yields a single whole-file diagnostic. Only a schema
/// that fails to compile is an error.
#[instrument(skip(json_schema, file_contents), fields(content_len = file_contents.len()))]
pub fn validate_document(
    json_schema: &serde_json::Value,
    file_contents: &str,
) -> Result<Vec<Diagnostic>, SchemaValidationError> {
    info!("Starting schema validation");

    match ParsedContent::new(file_contents) {
        ParsedContent::Valid(json) => {
            debug!("JSON parsing successful, proceeding with schema validation");
            validate_parsed(json_schema, &json, file_contents)
        }
        ParsedContent::Unparsable(diagnostic) => {
            warn!("JSON parse error detected, skipping correlation");
            Ok(vec![diagnostic])
        }
    }
}

/// Validates an already parsed document, `file_contents` being the text it was
/// parsed from
pub fn validate_parsed(
    json_schema: &serde_json::Value,
    file_as_json: &serde_json::Value,
    file_contents: &str,
) -> Result<Vec<Diagnostic>, SchemaValidationError> {
    let issues = SchemaValidator::new(json_schema, file_as_json).issues()?;
    Ok(correlate_issues(issues, file_contents))
}
