use crate::config::Config;
use crate::document::{self, DocumentSnapshot};
use crate::service::LanguageService;
use crate::utils::{constants, logging, uri_helpers};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result as JsonrpcResult;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{info, warn};

pub struct ChartsLsp {
    client: Client,
    config: Config,
    service: Arc<RwLock<LanguageService>>,
    documents: Arc<RwLock<HashMap<Url, DocumentSnapshot>>>,
}

impl ChartsLsp {
    pub fn new(client: Client, config: Config, service: LanguageService) -> Self {
        ChartsLsp {
            client,
            config,
            service: Arc::new(RwLock::new(service)),
            documents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Snapshot of an open document, if the client opened it
    async fn snapshot(&self, uri: &Url) -> Option<DocumentSnapshot> {
        let documents = self.documents.read().await;
        let snapshot = documents.get(uri).cloned();
        if snapshot.is_none() {
            logging::log_document_missing(uri.as_str());
        }
        snapshot
    }

    /// Store a new version and publish its diagnostics. Versions older than
    /// the stored one are dropped.
    async fn store_and_validate(&self, snapshot: DocumentSnapshot) {
        let name = uri_helpers::extract_filename(&snapshot.uri).to_string();
        let uri = snapshot.uri.clone();
        let version = snapshot.version;
        logging::log_document_stored(&name, version, snapshot.text.len());

        let diagnostics: Vec<Diagnostic> = {
            let service = self.service.read().await;
            service
                .validate(&snapshot)
                .into_iter()
                .map(Diagnostic::from)
                .collect()
        };

        let stored = document::store_if_newer(&mut *self.documents.write().await, snapshot);
        if !stored {
            logging::log_stale_version(&name, version);
            return;
        }

        logging::log_diagnostics_published(&name, diagnostics.len());
        self.client
            .publish_diagnostics(uri, diagnostics, Some(version))
            .await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for ChartsLsp {
    async fn initialize(&self, params: InitializeParams) -> JsonrpcResult<InitializeResult> {
        if let Some(options) = params.initialization_options.as_ref() {
            match self.config.with_overrides(options) {
                Ok(config) => self.service.write().await.configure(&config),
                Err(e) => warn!("[ChartsLsp] Ignoring initializationOptions: {:#}", e),
            }
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                document_formatting_provider: Some(OneOf::Left(true)),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: None,
                    trigger_characters: Some(
                        constants::COMPLETION_TRIGGERS
                            .iter()
                            .map(|s| s.to_string())
                            .collect(),
                    ),
                    work_done_progress_options: Default::default(),
                    all_commit_characters: None,
                    completion_item: None,
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let count = self.service.read().await.catalog().len();
        self.client
            .log_message(
                MessageType::INFO,
                format!("Charts LSP initialized with {} settings", count),
            )
            .await;
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        if doc.language_id != constants::LANGUAGE_ID {
            info!(
                "[ChartsLsp] Opened {} with language id '{}'",
                uri_helpers::extract_filename(&doc.uri),
                doc.language_id
            );
        }
        self.store_and_validate(DocumentSnapshot::new(doc.uri, doc.version, doc.text))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // FULL sync: the last change carries the whole text
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        let doc = params.text_document;
        self.store_and_validate(DocumentSnapshot::new(doc.uri, doc.version, change.text))
            .await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.write().await.remove(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn hover(&self, params: HoverParams) -> JsonrpcResult<Option<Hover>> {
        let position = params.text_document_position_params.position;
        let uri = params.text_document_position_params.text_document.uri;
        logging::log_request_at_position("textDocument/hover", position.line, position.character);

        let Some(snapshot) = self.snapshot(&uri).await else {
            return Ok(None);
        };
        Ok(self.service.read().await.hover(&snapshot, position))
    }

    async fn completion(
        &self,
        params: CompletionParams,
    ) -> JsonrpcResult<Option<CompletionResponse>> {
        let position = params.text_document_position.position;
        let uri = params.text_document_position.text_document.uri;
        logging::log_request_at_position(
            "textDocument/completion",
            position.line,
            position.character,
        );

        let Some(snapshot) = self.snapshot(&uri).await else {
            return Ok(None);
        };
        let items = self.service.read().await.completions(&snapshot, position);
        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(CompletionResponse::Array(items)))
        }
    }

    async fn formatting(
        &self,
        params: DocumentFormattingParams,
    ) -> JsonrpcResult<Option<Vec<TextEdit>>> {
        let Some(snapshot) = self.snapshot(&params.text_document.uri).await else {
            return Ok(None);
        };
        Ok(Some(self.service.read().await.format(&snapshot)))
    }

    async fn shutdown(&self) -> JsonrpcResult<()> {
        info!("[ChartsLsp] Shutdown requested");
        self.documents.write().await.clear();
        Ok(())
    }
}
