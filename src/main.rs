use std::collections::HashMap;
use std::sync::Arc;

use sanny_lsp::bridge::{RpcBridge, method};
use sanny_lsp::commands::CommandMap;
use sanny_lsp::config::ServerConfig;
use sanny_lsp::errors::RpcError;
use sanny_lsp::service::{IndexService, RebuildOutcome};
use sanny_lsp::{completion, hover, navigation, semantic_tokens};
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionOptions, CompletionParams, CompletionResponse, DidChangeConfigurationParams,
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DocumentLink, DocumentLinkOptions, DocumentLinkParams, DocumentSymbolParams,
    DocumentSymbolResponse, GotoDefinitionParams, GotoDefinitionResponse, Hover, HoverParams,
    HoverProviderCapability, InitializeParams, InitializeResult, InitializedParams, Location,
    MessageType, OneOf, ReferenceParams, SemanticTokens, SemanticTokensFullOptions,
    SemanticTokensOptions, SemanticTokensParams, SemanticTokensResult,
    SemanticTokensServerCapabilities, ServerCapabilities, ServerInfo, SymbolInformation,
    TextDocumentContentChangeEvent, TextDocumentSyncCapability, TextDocumentSyncKind,
    TextDocumentSyncOptions, Url, WorkDoneProgressOptions, WorkspaceSymbolParams,
};
use tower_lsp::{Client, LanguageServer, LspService, Server, async_trait};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SANNY_LSP_LOG";

#[derive(Clone)]
struct Backend {
    client: Client,
    documents: Arc<RwLock<HashMap<Url, String>>>,
    config: Arc<RwLock<ServerConfig>>,
    index: Arc<IndexService>,
    bridge: Arc<RpcBridge<Client>>,
}

impl Backend {
    fn new(client: Client) -> Self {
        let config = ServerConfig::default();
        Self {
            bridge: Arc::new(RpcBridge::new(client.clone(), config.request_timeout())),
            client,
            documents: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(RwLock::new(config)),
            index: Arc::new(IndexService::new()),
        }
    }

    async fn get_document(&self, uri: &Url) -> Option<String> {
        let store = self.documents.read().await;
        store.get(uri).cloned()
    }

    async fn apply_config(&self, config: ServerConfig) {
        self.bridge.set_timeout(config.request_timeout());
        *self.config.write().await = config;
    }

    /// Ask the client where the definitions live, then reload them.
    /// A newer call cancels any older one still waiting on the client.
    async fn refresh_index(&self) {
        let ticket = self.index.begin_rebuild();
        let config = self.config.read().await.clone();

        let selection = match self.bridge.selection(&config, ticket.token()).await {
            Ok(selection) => selection,
            Err(RpcError::Cancelled { .. }) => {
                tracing::debug!(generation = ticket.generation(), "index refresh superseded");
                return;
            },
            Err(err) => {
                tracing::warn!(error = %err, "could not resolve definitions folder");
                self.index.abandon_rebuild(&ticket);
                self.client
                    .log_message(MessageType::WARNING, format!("Index refresh skipped: {err}"))
                    .await;
                return;
            },
        };

        match self.index.complete_rebuild(ticket, selection).await {
            Ok(RebuildOutcome::Published {
                opcodes,
                classes,
                enums,
            }) => {
                self.client
                    .log_message(
                        MessageType::INFO,
                        format!("Indexed {opcodes} opcodes, {classes} classes and {enums} enums."),
                    )
                    .await;
            },
            Ok(RebuildOutcome::NotConfigured) => {
                self.client
                    .log_message(
                        MessageType::INFO,
                        "Sanny Builder folder or game version is not set; completions are disabled.",
                    )
                    .await;
            },
            Ok(RebuildOutcome::Superseded) => {},
            Err(err) => {
                self.client
                    .show_message(MessageType::ERROR, format!("Failed to load definitions: {err}"))
                    .await;
            },
        }
    }

    fn spawn_refresh(&self) {
        let backend = self.clone();
        tokio::spawn(async move { backend.refresh_index().await });
    }

    async fn get_opcodes(&self) -> Result<CommandMap> {
        Ok(self.index.snapshot().commands_by_name().clone())
    }

    async fn get_classes_members(&self) -> Result<CommandMap> {
        Ok(self.index.snapshot().commands_by_class().clone())
    }
}

#[async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        match ServerConfig::from_value(params.initialization_options) {
            Ok(config) => self.apply_config(config).await,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring initialization options");
                self.client
                    .log_message(MessageType::WARNING, err.to_string())
                    .await;
            },
        }

        let capabilities = ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(
                TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::FULL),
                    ..Default::default()
                },
            )),
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            completion_provider: Some(CompletionOptions {
                trigger_characters: Some(
                    completion::TRIGGER_CHARACTERS
                        .iter()
                        .map(ToString::to_string)
                        .collect(),
                ),
                ..Default::default()
            }),
            semantic_tokens_provider: Some(
                SemanticTokensServerCapabilities::SemanticTokensOptions(SemanticTokensOptions {
                    legend: semantic_tokens::legend(),
                    full: Some(SemanticTokensFullOptions::Bool(true)),
                    range: Some(false),
                    ..Default::default()
                }),
            ),
            definition_provider: Some(OneOf::Left(true)),
            references_provider: Some(OneOf::Left(true)),
            document_link_provider: Some(DocumentLinkOptions {
                resolve_provider: Some(false),
                work_done_progress_options: WorkDoneProgressOptions::default(),
            }),
            document_symbol_provider: Some(OneOf::Left(true)),
            workspace_symbol_provider: Some(OneOf::Left(true)),
            ..ServerCapabilities::default()
        };

        Ok(InitializeResult {
            capabilities,
            server_info: Some(ServerInfo {
                name: "sanny-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "Sanny LSP initialized. Loading definitions...")
            .await;
        self.spawn_refresh();
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        match ServerConfig::from_value(Some(params.settings)) {
            Ok(config) => {
                self.apply_config(config).await;
                self.spawn_refresh();
            },
            Err(err) => {
                tracing::warn!(error = %err, "ignoring configuration change");
                self.client
                    .show_message(MessageType::WARNING, err.to_string())
                    .await;
            },
        }
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let mut store = self.documents.write().await;
        store.insert(params.text_document.uri, params.text_document.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let mut store = self.documents.write().await;
        if let Some(entry) = store.get_mut(&params.text_document.uri)
            && let Some(TextDocumentContentChangeEvent { text, .. }) =
                params.content_changes.into_iter().next_back()
        {
            *entry = text;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let mut store = self.documents.write().await;
        store.remove(&params.text_document.uri);
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(text) = self.get_document(&uri).await else {
            return Ok(None);
        };

        let index = self.index.snapshot();
        Ok(hover::hover(&index, &text, position))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let Some(text) = self.get_document(&uri).await else {
            return Ok(None);
        };

        let index = self.index.snapshot();
        let items = completion::completion(&index, &text, position);
        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(CompletionResponse::Array(items)))
        }
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(text) = self.get_document(&uri).await else {
            return Ok(None);
        };

        let mut locations = navigation::find_definition(&text, position, &uri);
        match locations.len() {
            0 => Ok(None),
            1 => Ok(locations.pop().map(GotoDefinitionResponse::Scalar)),
            _ => Ok(Some(GotoDefinitionResponse::Array(locations))),
        }
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let Some(text) = self.get_document(&uri).await else {
            return Ok(None);
        };

        let locations = navigation::find_references(
            &text,
            position,
            &uri,
            params.context.include_declaration,
        );
        Ok((!locations.is_empty()).then_some(locations))
    }

    async fn document_link(&self, params: DocumentLinkParams) -> Result<Option<Vec<DocumentLink>>> {
        let uri = params.text_document.uri;
        let Some(text) = self.get_document(&uri).await else {
            return Ok(None);
        };
        let Ok(path) = uri.to_file_path() else {
            return Ok(None);
        };

        Ok(Some(navigation::document_links(&text, &path)))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let Some(text) = self.get_document(&params.text_document.uri).await else {
            return Ok(None);
        };

        let symbols = navigation::get_document_symbols(&text);
        if symbols.is_empty() {
            Ok(None)
        } else {
            Ok(Some(DocumentSymbolResponse::Nested(symbols)))
        }
    }

    async fn symbol(
        &self,
        params: WorkspaceSymbolParams,
    ) -> Result<Option<Vec<SymbolInformation>>> {
        let index = self.index.snapshot();
        let symbols = navigation::get_workspace_symbols(&params.query, &index);

        if symbols.is_empty() {
            Ok(None)
        } else {
            Ok(Some(symbols))
        }
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let Some(text) = self.get_document(&params.text_document.uri).await else {
            return Ok(None);
        };

        let index = self.index.snapshot();
        Ok(Some(SemanticTokensResult::Tokens(SemanticTokens {
            result_id: None,
            data: semantic_tokens::compute_semantic_tokens(&text, &index),
        })))
    }
}

#[tokio::main]
async fn main() {
    // stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("starting sanny-lsp");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(Backend::new)
        .custom_method(method::GET_OPCODES, Backend::get_opcodes)
        .custom_method(method::GET_CLASSES_MEMBERS, Backend::get_classes_members)
        .finish();
    Server::new(stdin, stdout, socket).serve(service).await;
}
