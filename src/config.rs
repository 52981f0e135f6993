use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

/// Server settings, read from the client's `initializationOptions`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Where schema references are resolved. Defaults to the document's directory.
    pub schema_directory: Option<PathBuf>,
    /// Revalidate on every edit, not only on open and save
    pub validate_on_change: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_directory: None,
            validate_on_change: true,
        }
    }
}

impl Settings {
    /// Falls back to defaults when the options are absent or malformed
    pub fn from_options(options: Option<serde_json::Value>) -> Self {
        let Some(options) = options else {
            return Self::default();
        };

        serde_json::from_value(options).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring malformed initialization options");
            Self::default()
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_camel_case_options() {
        let settings = Settings::from_options(Some(json!({
            "schemaDirectory": "schemas",
            "validateOnChange": false
        })));

        assert_eq!(settings.schema_directory, Some(PathBuf::from("schemas")));
        assert!(!settings.validate_on_change);
    }

    #[test]
    fn partial_options_keep_defaults() {
        let settings = Settings::from_options(Some(json!({"schemaDirectory": "/etc/schemas"})));
        assert!(settings.validate_on_change);
    }

    #[test]
    fn malformed_options_fall_back() {
        assert_eq!(
            Settings::from_options(Some(json!({"validateOnChange": "sometimes"}))),
            Settings::default()
        );
        assert_eq!(Settings::from_options(None), Settings::default());
    }
}
