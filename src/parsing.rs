use tracing::{debug, error, instrument, trace};

use crate::diagnostic::Diagnostic;

/// Returns the schema a document declares, from `$schema` or a plain `schema` field
pub fn schema_reference(content: &serde_json::Value) -> Option<String> {
    ["$schema", "schema"]
        .into_iter()
        .find_map(|field| content.get(field)?.as_str())
        .map(str::to_owned)
}

/// Parse outcome of a document's raw text
#[derive(Debug)]
pub enum ParsedContent {
    Valid(serde_json::Value),
    /// The text is not JSON, reported as one whole-file diagnostic
    Unparsable(Diagnostic),
}

impl ParsedContent {
    #[instrument(skip(file_contents), fields(content_len = file_contents.len()))]
    pub fn new(file_contents: &str) -> Self {
        trace!("Attempting to parse file contents as JSON");

        match serde_json::from_str(file_contents) {
            Ok(json) => {
                debug!("Successfully parsed JSON content");
                ParsedContent::Valid(json)
            }
            Err(e) => {
                error!(error = %e, line = e.line(), column = e.column(), "JSON parsing failed");
                ParsedContent::Unparsable(Diagnostic::whole_file(e.to_string()))
            }
        }
    }
}
