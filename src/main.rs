use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pinpoint::{
    config::Settings,
    diagnostic::Diagnostic,
    error::{SchemaValidationError, ValidationResult},
    parsing::{self, ParsedContent},
    sink::{self, LspSink, TracingSink},
};
use serde_json::Value;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, info, instrument, trace, warn};
use tracing_subscriber::EnvFilter;

/// Parsed schemas keyed by canonical path
#[derive(Debug, Default)]
struct SchemaCache {
    entries: RwLock<HashMap<PathBuf, Value>>,
}

impl SchemaCache {
    async fn get_or_load(&self, path: &Path) -> ValidationResult<Value> {
        let key = tokio::fs::canonicalize(path).await?;

        if let Some(schema) = self.entries.read().await.get(&key) {
            debug!(path = %key.display(), "Using cached schema");
            return Ok(schema.clone());
        }

        let contents = tokio::fs::read_to_string(&key).await?;
        let schema: Value = serde_json::from_str(&contents)?;
        info!(path = %key.display(), "Loaded schema");

        self.entries.write().await.insert(key, schema.clone());

        Ok(schema)
    }

    /// Drops the cached copy of `path`. Returns whether one was cached.
    async fn evict(&self, path: &Path) -> bool {
        let Ok(key) = tokio::fs::canonicalize(path).await else {
            return false;
        };
        self.entries.write().await.remove(&key).is_some()
    }
}

/// What a document notification asks the server to do
#[derive(Debug, PartialEq, Eq)]
enum DocumentAction {
    Validate { text: String, version: Option<i32> },
    Clear,
    Skip,
}

fn on_open(params: DidOpenTextDocumentParams) -> (Url, DocumentAction) {
    let document = params.text_document;
    (
        document.uri,
        DocumentAction::Validate {
            text: document.text,
            version: Some(document.version),
        },
    )
}

fn on_change(settings: &Settings, params: DidChangeTextDocumentParams) -> (Url, DocumentAction) {
    let document = params.text_document;
    if !settings.validate_on_change {
        return (document.uri, DocumentAction::Skip);
    }

    // Full sync, the last change holds the whole text
    let action = match params.content_changes.into_iter().last() {
        Some(change) => DocumentAction::Validate {
            text: change.text,
            version: Some(document.version),
        },
        None => DocumentAction::Skip,
    };
    (document.uri, action)
}

fn on_save(params: DidSaveTextDocumentParams) -> (Url, DocumentAction) {
    let action = match params.text {
        Some(text) => DocumentAction::Validate {
            text,
            version: None,
        },
        None => DocumentAction::Skip,
    };
    (params.text_document.uri, action)
}

fn on_close(params: DidCloseTextDocumentParams) -> (Url, DocumentAction) {
    (params.text_document.uri, DocumentAction::Clear)
}

/// Validates one document's text against the schema it references.
///
/// Text that is not JSON gives its parse diagnostic, and a document without a
/// schema reference gives no diagnostics.
#[instrument(skip(schemas, text), fields(uri = %uri, content_len = text.len()))]
async fn diagnose_document(
    schemas: &SchemaCache,
    schema_directory: Option<&Path>,
    uri: &Url,
    text: &str,
) -> ValidationResult<Vec<Diagnostic>> {
    let json = match ParsedContent::new(text) {
        ParsedContent::Valid(json) => json,
        ParsedContent::Unparsable(diagnostic) => return Ok(vec![diagnostic]),
    };

    let Some(reference) = parsing::schema_reference(&json) else {
        info!("Document references no schema, nothing to validate");
        return Ok(Vec::new());
    };

    let base = match schema_directory {
        Some(directory) => directory.to_path_buf(),
        None => uri
            .to_file_path()
            .ok()
            .and_then(|path| path.parent().map(Path::to_path_buf))
            .unwrap_or_default(),
    };
    let schema_path = resolve_reference(&base, &reference)?;
    let schema = schemas.get_or_load(&schema_path).await?;

    pinpoint::validate_parsed(&schema, &json, text)
}

/// Joins a schema reference onto `base`. Remote references are not fetched.
fn resolve_reference(base: &Path, reference: &str) -> ValidationResult<PathBuf> {
    let local = reference.strip_prefix("file://").unwrap_or(reference);

    if local.contains("://") || local.is_empty() {
        return Err(SchemaValidationError::UnresolvableSchemaReference {
            reference: reference.to_owned(),
            base: base.to_path_buf(),
        });
    }

    Ok(base.join(local))
}

/// LSP server publishing schema diagnostics for JSON documents.
///
/// A document names its schema with a `$schema` (or `schema`) field. The schema
/// is resolved against the configured schema directory, or the document's own
/// directory, and cached until the schema file is saved.
#[derive(Debug)]
struct Backend {
    client: Client,
    settings: RwLock<Settings>,
    schemas: SchemaCache,
}

impl Backend {
    fn new(client: Client) -> Self {
        Self {
            client,
            settings: RwLock::new(Settings::default()),
            schemas: SchemaCache::default(),
        }
    }

    async fn apply(&self, uri: Url, action: DocumentAction) {
        match action {
            DocumentAction::Validate { text, version } => self.validate(uri, &text, version).await,
            DocumentAction::Clear => {
                self.client.publish_diagnostics(uri, Vec::new(), None).await;
            }
            DocumentAction::Skip => trace!(uri = %uri, "Nothing to do for notification"),
        }
    }

    async fn validate(&self, uri: Url, text: &str, version: Option<i32>) {
        let schema_directory = self.settings.read().await.schema_directory.clone();

        let diagnostics =
            match diagnose_document(&self.schemas, schema_directory.as_deref(), &uri, text).await {
                Ok(diagnostics) => diagnostics,
                Err(e) => {
                    let level = if e.is_document_error() {
                        MessageType::WARNING
                    } else {
                        MessageType::ERROR
                    };
                    warn!(error = %e, "Could not validate document");
                    self.client.log_message(level, format!("{uri}: {e}")).await;
                    return;
                }
            };

        sink::report(uri.as_str(), &diagnostics, &mut TracingSink);

        let mut lsp_sink = LspSink::default();
        sink::report(uri.as_str(), &diagnostics, &mut lsp_sink);

        self.client
            .publish_diagnostics(uri, lsp_sink.into_diagnostics(), version)
            .await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let settings = Settings::from_options(params.initialization_options);
        debug!(?settings, "Applying settings");
        *self.settings.write().await = settings;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(true),
                        })),
                        ..Default::default()
                    },
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: pinpoint::sink::SOURCE_NAME.to_owned(),
                version: Some(env!("CARGO_PKG_VERSION").to_owned()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "server initialized!")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let (uri, action) = on_open(params);
        self.apply(uri, action).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let (uri, action) = on_change(&*self.settings.read().await, params);
        self.apply(uri, action).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        // A saved schema is reloaded the next time a document needs it
        if let Ok(path) = params.text_document.uri.to_file_path()
            && self.schemas.evict(&path).await
        {
            info!(path = %path.display(), "Schema changed on disk, dropped cached copy");
        }

        let (uri, action) = on_save(params);
        self.apply(uri, action).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let (uri, action) = on_close(params);
        self.apply(uri, action).await;
    }
}

#[tokio::main]
async fn main() {
    // stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    const PORT_SCHEMA: &str = r#"{
  "type": "object",
  "properties": { "port": { "type": "integer", "maximum": 10 } }
}"#;

    fn scratch_dir(name: &str) -> std::io::Result<PathBuf> {
        let dir = std::env::temp_dir().join(format!("pinpoint-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn document_uri(dir: &Path) -> std::result::Result<Url, Box<dyn std::error::Error>> {
        Url::from_file_path(dir.join("device.json")).map_err(|()| "not an absolute path".into())
    }

    #[test]
    fn relative_references_join_base() -> TestResult {
        let base = Path::new("/work/devices");

        assert_eq!(
            resolve_reference(base, "devcap1.schema.json")?,
            PathBuf::from("/work/devices/devcap1.schema.json")
        );
        assert_eq!(
            resolve_reference(base, "file:///opt/schemas/a.json")?,
            PathBuf::from("/opt/schemas/a.json")
        );
        Ok(())
    }

    #[test]
    fn remote_references_are_unresolvable() {
        let result = resolve_reference(Path::new("/work"), "https://json-schema.org/x.json");
        assert!(matches!(
            result,
            Err(SchemaValidationError::UnresolvableSchemaReference { .. })
        ));
    }

    #[test]
    fn change_is_skipped_when_disabled() -> TestResult {
        let uri = Url::parse("file:///work/device.json")?;
        let params = || -> std::result::Result<DidChangeTextDocumentParams, Box<dyn std::error::Error>> {
            Ok(DidChangeTextDocumentParams {
                text_document: VersionedTextDocumentIdentifier {
                    uri: uri.clone(),
                    version: 3,
                },
                content_changes: vec![TextDocumentContentChangeEvent {
                    range: None,
                    range_length: None,
                    text: "{}".to_owned(),
                }],
            })
        };

        let disabled = Settings {
            validate_on_change: false,
            ..Settings::default()
        };
        assert_eq!(on_change(&disabled, params()?).1, DocumentAction::Skip);
        assert_eq!(
            on_change(&Settings::default(), params()?).1,
            DocumentAction::Validate {
                text: "{}".to_owned(),
                version: Some(3),
            }
        );
        Ok(())
    }

    #[test]
    fn close_clears_and_textless_save_skips() -> TestResult {
        let uri = Url::parse("file:///work/device.json")?;

        let (closed, action) = on_close(DidCloseTextDocumentParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
        });
        assert_eq!(closed, uri);
        assert_eq!(action, DocumentAction::Clear);

        let (_, action) = on_save(DidSaveTextDocumentParams {
            text_document: TextDocumentIdentifier { uri },
            text: None,
        });
        assert_eq!(action, DocumentAction::Skip);
        Ok(())
    }

    #[tokio::test]
    async fn document_without_schema_reference_has_no_diagnostics() -> TestResult {
        let uri = Url::parse("file:///work/device.json")?;
        let diagnostics =
            diagnose_document(&SchemaCache::default(), None, &uri, r#"{"port": 80}"#).await?;

        assert!(diagnostics.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unparsable_document_gets_one_whole_file_diagnostic() -> TestResult {
        let uri = Url::parse("file:///work/device.json")?;
        let diagnostics =
            diagnose_document(&SchemaCache::default(), None, &uri, r#"{"port" 80}"#).await?;

        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics[0].is_located());
        Ok(())
    }

    #[tokio::test]
    async fn remote_schema_is_an_error() -> TestResult {
        let uri = Url::parse("file:///work/device.json")?;
        let text = r#"{"$schema": "https://json-schema.org/draft/2020-12/schema"}"#;
        let result = diagnose_document(&SchemaCache::default(), None, &uri, text).await;

        assert!(matches!(
            result,
            Err(SchemaValidationError::UnresolvableSchemaReference { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn schema_is_reloaded_after_eviction() -> TestResult {
        let dir = scratch_dir("reload")?;
        let schema_path = dir.join("port.schema.json");
        std::fs::write(&schema_path, PORT_SCHEMA)?;

        let uri = document_uri(&dir)?;
        let text = r#"{"schema": "port.schema.json", "port": 80}"#;
        let schemas = SchemaCache::default();

        let diagnostics = diagnose_document(&schemas, None, &uri, text).await?;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].path.to_string(), "port");
        assert!(diagnostics[0].is_located());

        std::fs::write(&schema_path, PORT_SCHEMA.replace("10", "100"))?;
        let cached = diagnose_document(&schemas, None, &uri, text).await?;
        assert_eq!(cached.len(), 1);

        assert!(schemas.evict(&schema_path).await);
        assert!(!schemas.evict(&schema_path).await);
        let reloaded = diagnose_document(&schemas, None, &uri, text).await?;
        assert!(reloaded.is_empty());

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[tokio::test]
    async fn schema_directory_overrides_document_directory() -> TestResult {
        let dir = scratch_dir("schema-directory")?;
        std::fs::write(dir.join("port.schema.json"), PORT_SCHEMA)?;

        let uri = Url::parse("file:///elsewhere/device.json")?;
        let text = r#"{"$schema": "port.schema.json", "port": 11}"#;
        let diagnostics =
            diagnose_document(&SchemaCache::default(), Some(&dir), &uri, text).await?;

        assert_eq!(diagnostics.len(), 1);

        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
