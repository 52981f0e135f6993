use tower_lsp::lsp_types::{Position, Range};
use tracing::{debug, instrument, trace};

use crate::locator::SourceLiteral;

/// Resolves the LSP range for a diagnostic location.
///
/// LSP lines are 0-based where literal lines are 1-based, and characters are
/// UTF-16 code units. Literals never span a newline, so the range ends on the
/// start line. A missing location maps to the default range at the top of the
/// file.
#[instrument(skip_all)]
pub fn from_location(location: Option<&SourceLiteral>) -> Range {
    match location {
        Some(literal) => {
            let line = literal.start_line.saturating_sub(1);
            let character = literal.start_utf16_column;
            let length = u32::try_from(literal.utf16_length).unwrap_or(u32::MAX);

            trace!(line, character, length, "Resolved diagnostic range");

            Range {
                start: Position { line, character },
                end: Position {
                    line,
                    character: character.saturating_add(length),
                },
            }
        }
        None => {
            debug!("No source location, using default range");
            Range::default()
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::locator::locate;

    #[test]
    fn literal_range_is_zero_based() {
        let source = "{\n  \"tag\": \"1.25\"\n}";
        let literal = locate(source).next().expect("tag is a literal");

        let range = from_location(Some(&literal));
        assert_eq!(range.start, Position { line: 1, character: 9 });
        assert_eq!(range.end, Position { line: 1, character: 15 });
    }

    #[test]
    fn characters_are_utf16_code_units() {
        let source = r#"{"m": {"0": 5}, "\u0041": 1, "g": [["x", 2]], "😀": 1, "e": "😀x"}"#;
        let literal = locate(source)
            .find(|l| l.path.to_string() == "e")
            .expect("e is a literal");

        assert_eq!(literal.start_column, 59);
        let range = from_location(Some(&literal));
        assert_eq!(range.start, Position { line: 0, character: 60 });
        assert_eq!(range.end, Position { line: 0, character: 65 });
    }

    #[test]
    fn missing_location_is_default_range() {
        assert_eq!(from_location(None), Range::default());
    }
}
