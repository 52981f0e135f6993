use std::iter::Peekable;
use std::ops::Range;
use std::str::CharIndices;

use tracing::{instrument, trace};

use crate::path::{Path, Segment};

/// Position of one scalar value (string, number, boolean, null) in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLiteral {
    pub path: Path,
    /// 1-based
    pub start_line: u32,
    /// Characters since the last newline, 0-based
    pub start_column: u32,
    /// Characters since the start of the text
    pub start_offset: usize,
    /// Characters in the literal, quotes included for strings
    pub length: usize,
    /// `start_column` in UTF-16 code units, the default LSP position encoding
    pub start_utf16_column: u32,
    /// `length` in UTF-16 code units
    pub utf16_length: usize,
    /// Byte range of the literal, for slicing the source `&str`
    pub span: Range<usize>,
}

impl SourceLiteral {
    /// The literal's exact text, `None` if `source` is not the scanned text
    pub fn text<'s>(&self, source: &'s str) -> Option<&'s str> {
        source.get(self.span.clone())
    }
}

/// Scans `source` for literal positions. Each call starts a fresh scan.
///
/// `source` must already have parsed as JSON; what comes out for anything else
/// is unspecified (though the scan still terminates).
#[instrument(skip(source), fields(content_len = source.len()))]
pub fn locate(source: &str) -> Locator<'_> {
    trace!("Starting literal scan");
    Locator::new(source)
}

/// Line, column and offset tracking over a `&str`
struct Cursor<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: u32,
    column: u32,
    utf16_column: u32,
    offset: usize,
    utf16_offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 0,
            utf16_column: 0,
            offset: 0,
            utf16_offset: 0,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, ch)| ch)
    }

    fn byte_position(&mut self) -> usize {
        self.chars
            .peek()
            .map_or(self.source.len(), |&(index, _)| index)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        self.offset += 1;
        self.utf16_offset += ch.len_utf16();
        if ch == '\n' {
            self.line = self.line.saturating_add(1);
            self.column = 0;
            self.utf16_column = 0;
        } else {
            self.column = self.column.saturating_add(1);
            self.utf16_column = self.utf16_column.saturating_add(ch.len_utf16() as u32);
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\n' | '\r' | '\u{feff}')) {
            self.bump();
        }
    }

    /// Consumes a quoted string, the opening quote included
    fn consume_string(&mut self) {
        self.bump();
        while let Some(ch) = self.bump() {
            match ch {
                '\\' => {
                    self.bump();
                }
                '"' => break,
                _ => {}
            }
        }
    }

    /// Consumes a number, `true`, `false` or `null`
    fn consume_bare(&mut self) {
        self.bump();
        while let Some(ch) = self.peek() {
            if matches!(ch, ',' | ']' | '}' | ':' | '"' | '[' | '{') || ch.is_whitespace() {
                break;
            }
            self.bump();
        }
    }
}

enum Frame {
    Object {
        key: Option<String>,
        expecting_key: bool,
    },
    Array {
        index: usize,
    },
}

/// Lazy sequence of [`SourceLiteral`] in document order.
///
/// Containers update the path stack but yield nothing.
pub struct Locator<'a> {
    cursor: Cursor<'a>,
    stack: Vec<Frame>,
}

impl<'a> Locator<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            stack: Vec::new(),
        }
    }

    fn current_path(&self) -> Path {
        self.stack
            .iter()
            .filter_map(|frame| match frame {
                Frame::Object { key, .. } => key.clone().map(Segment::Key),
                Frame::Array { index } => Some(Segment::Index(*index)),
            })
            .collect()
    }

    fn expecting_key(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Frame::Object {
                expecting_key: true,
                ..
            })
        )
    }

    fn set_key(&mut self, raw: &str) {
        // Keys are compared decoded, so `"café"` matches `café`
        let decoded = serde_json::from_str::<String>(raw).unwrap_or_else(|_| {
            raw.trim_start_matches('"')
                .trim_end_matches('"')
                .to_owned()
        });

        if let Some(Frame::Object { key, expecting_key }) = self.stack.last_mut() {
            *key = Some(decoded);
            *expecting_key = false;
        }
    }

    fn next_element(&mut self) {
        match self.stack.last_mut() {
            Some(Frame::Array { index }) => *index += 1,
            Some(Frame::Object { key, expecting_key }) => {
                *key = None;
                *expecting_key = true;
            }
            None => {}
        }
    }

    fn literal(&mut self, is_string: bool) -> SourceLiteral {
        let start_line = self.cursor.line;
        let start_column = self.cursor.column;
        let start_offset = self.cursor.offset;
        let start_utf16_column = self.cursor.utf16_column;
        let start_utf16_offset = self.cursor.utf16_offset;
        let start_byte = self.cursor.byte_position();

        if is_string {
            self.cursor.consume_string();
        } else {
            self.cursor.consume_bare();
        }

        SourceLiteral {
            path: self.current_path(),
            start_line,
            start_column,
            start_offset,
            length: self.cursor.offset - start_offset,
            start_utf16_column,
            utf16_length: self.cursor.utf16_offset - start_utf16_offset,
            span: start_byte..self.cursor.byte_position(),
        }
    }
}

impl Iterator for Locator<'_> {
    type Item = SourceLiteral;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.cursor.skip_whitespace();

            match self.cursor.peek()? {
                '{' => {
                    self.cursor.bump();
                    self.stack.push(Frame::Object {
                        key: None,
                        expecting_key: true,
                    });
                }
                '[' => {
                    self.cursor.bump();
                    self.stack.push(Frame::Array { index: 0 });
                }
                '}' | ']' => {
                    self.cursor.bump();
                    self.stack.pop();
                }
                ',' => {
                    self.cursor.bump();
                    self.next_element();
                }
                ':' => {
                    self.cursor.bump();
                }
                '"' if self.expecting_key() => {
                    let start = self.cursor.byte_position();
                    self.cursor.consume_string();
                    let end = self.cursor.byte_position();
                    let source = self.cursor.source;
                    self.set_key(&source[start..end]);
                }
                '"' => {
                    let literal = self.literal(true);
                    trace!(path = %literal.path, line = literal.start_line, "Located string literal");
                    return Some(literal);
                }
                _ => {
                    let literal = self.literal(false);
                    trace!(path = %literal.path, line = literal.start_line, "Located literal");
                    return Some(literal);
                }
            }
        }
    }
}
