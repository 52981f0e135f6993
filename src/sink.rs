use tower_lsp::lsp_types::{self, DiagnosticSeverity};
use tracing::{error, instrument};

use crate::{diagnostic::Diagnostic, diagnostic_range};

pub const SOURCE_NAME: &str = "pinpoint";

/// Consumer of correlated diagnostics. File identity is supplied by the caller.
pub trait DiagnosticSink {
    fn emit(&mut self, file: &str, diagnostic: &Diagnostic);
}

/// Forwards every diagnostic to `sink`, in order
#[instrument(skip(diagnostics, sink), fields(count = diagnostics.len()))]
pub fn report<S>(file: &str, diagnostics: &[Diagnostic], sink: &mut S)
where
    S: DiagnosticSink + ?Sized,
{
    for diagnostic in diagnostics {
        sink.emit(file, diagnostic);
    }
}

/// Logs a headline per diagnostic, then one event per message
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, file: &str, diagnostic: &Diagnostic) {
        error!(file, path = %diagnostic.path, "{} in file {file}", diagnostic.headline());

        for message in &diagnostic.messages {
            match &diagnostic.location {
                Some(location) => error!(
                    file,
                    line = location.start_line,
                    column = location.start_column,
                    "{message}"
                ),
                None => error!(file, "{message}"),
            }
        }
    }
}

/// Collects diagnostics as LSP diagnostics for `textDocument/publishDiagnostics`
#[derive(Debug, Default)]
pub struct LspSink {
    diagnostics: Vec<lsp_types::Diagnostic>,
}

impl LspSink {
    pub fn into_diagnostics(self) -> Vec<lsp_types::Diagnostic> {
        self.diagnostics
    }
}

impl DiagnosticSink for LspSink {
    fn emit(&mut self, _file: &str, diagnostic: &Diagnostic) {
        self.diagnostics.push(lsp_types::Diagnostic {
            range: diagnostic_range::from_location(diagnostic.location.as_ref()),
            severity: Some(DiagnosticSeverity::ERROR),
            source: Some(SOURCE_NAME.to_owned()),
            message: format!(
                "Path {}, Error: {}",
                diagnostic.path,
                diagnostic.messages.join("\n")
            ),
            ..Default::default()
        });
    }
}
