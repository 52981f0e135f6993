use crate::{locator::SourceLiteral, path::Path};

/// All validation messages for one path, anchored to the literal at that path
/// when the document has one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: Path,
    pub messages: Vec<String>,
    pub location: Option<SourceLiteral>,
}

impl Diagnostic {
    /// Diagnostic for a whole file, e.g. when the text is not JSON at all
    pub fn whole_file(message: impl Into<String>) -> Self {
        Self {
            path: Path::root(),
            messages: vec![message.into()],
            location: None,
        }
    }

    pub fn is_located(&self) -> bool {
        self.location.is_some()
    }

    /// `2 validation errors at runtime/type`
    pub fn headline(&self) -> String {
        let count = self.messages.len();
        let plural = if count == 1 { "" } else { "s" };
        if self.path.is_root() {
            format!("{count} validation error{plural}")
        } else {
            format!("{count} validation error{plural} at {}", self.path)
        }
    }
}
