use std::path::PathBuf;
use std::sync::Arc;

use lsp_types::notification::Progress;
use lsp_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DocumentSymbolParams, DocumentSymbolResponse, GotoDefinitionParams, GotoDefinitionResponse,
    InitializeParams, InitializeResult, InitializedParams, Location, MessageType, OneOf,
    ProgressParams, ProgressParamsValue, ProgressToken, ReferenceParams, ServerCapabilities,
    ServerInfo, TextDocumentSyncCapability, TextDocumentSyncKind, WorkDoneProgress,
    WorkDoneProgressBegin, WorkDoneProgressEnd, WorkDoneProgressReport,
};
use querynav_ide::{discover_files, AnalysisHost, CancellationToken, Language, ScanProgress};
use tokio::sync::{mpsc, Mutex};
use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::{Client, LanguageServer};

use crate::conversions::{
    convert_definition_result, convert_ide_location, uri_to_file, IntoIde, IntoLsp,
};
use crate::workspace::{load_workspace_config, workspace_roots};

pub struct QueryNavLanguageServer {
    client: Client,
    /// Workspace folders from initialization, loaded in `initialized`
    init_workspace_folders: Arc<parking_lot::Mutex<Vec<PathBuf>>>,
    /// Client-supplied configuration, consumed in `initialized`
    init_options: Arc<parking_lot::Mutex<Option<serde_json::Value>>>,
    host: Arc<Mutex<AnalysisHost>>,
}

impl QueryNavLanguageServer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            init_workspace_folders: Arc::default(),
            init_options: Arc::default(),
            host: Arc::new(Mutex::new(AnalysisHost::new())),
        }
    }

    /// Apply the configuration and index every matching workspace file.
    ///
    /// Files are read on a blocking worker before the host lock is taken, so
    /// requests keep being answered while the workspace loads.
    #[tracing::instrument(skip(self))]
    async fn load_workspace(&self, roots: Vec<PathBuf>, options: Option<serde_json::Value>) {
        let config = match load_workspace_config(&roots, options) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "Falling back to default configuration");
                self.client
                    .show_message(
                        MessageType::WARNING,
                        format!("querynav: {e:#}. Using default configuration."),
                    )
                    .await;
                querynav_config::NavConfig::default()
            }
        };

        self.host.lock().await.set_config(config.clone(), roots.clone());

        let start = std::time::Instant::now();
        let files = match tokio::task::spawn_blocking(move || discover_files(&roots, &config)).await
        {
            Ok(files) => files,
            Err(e) => {
                tracing::error!(error = %e, "Workspace discovery failed");
                return;
            }
        };

        let indexed = self.host.lock().await.add_discovered_files(&files);
        tracing::info!(
            indexed,
            elapsed_ms = start.elapsed().as_millis(),
            "Workspace loaded"
        );
        self.client
            .log_message(
                MessageType::INFO,
                format!("querynav indexed {indexed} workspace file(s)"),
            )
            .await;
    }

    /// Run a reference scan on a blocking worker.
    ///
    /// The scan is cancelled when this future is dropped, which is what
    /// happens to a request the client cancels. Per-file progress goes to the
    /// client as work-done reports when it supplied a token.
    async fn run_scan<T, F>(&self, token: Option<ProgressToken>, title: &str, scan: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken, &mut dyn FnMut(ScanProgress)) -> T + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let _cancel_on_drop = cancel.clone().drop_guard();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let worker = tokio::task::spawn_blocking(move || {
            let mut report = |progress: ScanProgress| {
                let _ = tx.send(progress);
            };
            scan(&cancel, &mut report)
        });

        if let Some(token) = &token {
            self.send_progress(
                token,
                WorkDoneProgress::Begin(WorkDoneProgressBegin {
                    title: title.to_string(),
                    cancellable: Some(true),
                    message: None,
                    percentage: Some(0),
                }),
            )
            .await;
        }

        // The channel closes when the worker returns
        while let Some(progress) = rx.recv().await {
            if let Some(token) = &token {
                self.send_progress(
                    token,
                    WorkDoneProgress::Report(WorkDoneProgressReport {
                        cancellable: Some(true),
                        message: Some(format!("{}/{}", progress.scanned, progress.total)),
                        percentage: Some(progress.percentage()),
                    }),
                )
                .await;
            }
        }

        if let Some(token) = &token {
            self.send_progress(token, WorkDoneProgress::End(WorkDoneProgressEnd { message: None }))
                .await;
        }

        match worker.await {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::error!(error = %e, "Reference scan worker failed");
                None
            }
        }
    }

    async fn send_progress(&self, token: &ProgressToken, value: WorkDoneProgress) {
        self.client
            .send_notification::<Progress>(ProgressParams {
                token: token.clone(),
                value: ProgressParamsValue::WorkDone(value),
            })
            .await;
    }
}

impl LanguageServer for QueryNavLanguageServer {
    #[tracing::instrument(skip(self, params))]
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("Initializing querynav language server");

        let roots = workspace_roots(&params);
        tracing::info!(count = roots.len(), "Workspace folders");
        *self.init_workspace_folders.lock() = roots;
        *self.init_options.lock() = params.initialization_options;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "querynav".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        let version = env!("CARGO_PKG_VERSION");
        tracing::info!(version, "querynav language server initialized");

        let roots = self.init_workspace_folders.lock().clone();
        let options = self.init_options.lock().take();
        self.load_workspace(roots, options).await;
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down querynav language server");
        Ok(())
    }

    #[tracing::instrument(skip(self, params), fields(uri = params.text_document.uri.as_str()))]
    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let file = uri_to_file(&params.text_document.uri);
        let language = Language::from_language_id(&params.text_document.language_id).or_else(|| {
            file.to_path()
                .and_then(|path| Language::from_path(&path))
        });
        let Some(language) = language else {
            tracing::debug!(
                language_id = %params.text_document.language_id,
                "Ignoring document in unsupported language"
            );
            return;
        };

        tracing::info!(language = language.as_str(), "Document opened");
        self.host
            .lock()
            .await
            .open_document(&file, &params.text_document.text, language);
    }

    #[tracing::instrument(skip(self, params), fields(uri = params.text_document.uri.as_str()))]
    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let file = uri_to_file(&params.text_document.uri);

        // Full sync: the last change carries the whole document
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };

        let start = std::time::Instant::now();
        let parsed = self.host.lock().await.change_document(&file, &change.text);
        tracing::debug!(
            parsed,
            elapsed_ms = start.elapsed().as_millis(),
            "Document changed"
        );
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        tracing::info!(uri = params.text_document.uri.as_str(), "Document closed");
        let file = uri_to_file(&params.text_document.uri);
        self.host.lock().await.close_document(&file);
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let start = std::time::Instant::now();
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position.into_ide();
        let file = uri_to_file(&uri);

        tracing::info!(
            uri = uri.as_str(),
            line = position.line,
            character = position.character,
            "Go to definition requested"
        );

        let analysis = self.host.lock().await.snapshot();
        let result = self
            .run_scan(
                params.work_done_progress_params.work_done_token,
                "Finding references",
                move |cancel, progress| analysis.goto_definition_with(&file, position, cancel, progress),
            )
            .await
            .flatten();

        let response = result.and_then(convert_definition_result);
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            found = response.is_some(),
            "Go to definition completed"
        );
        Ok(response)
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let start = std::time::Instant::now();
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position.into_ide();
        let include_declaration = params.context.include_declaration;
        let file = uri_to_file(&uri);

        tracing::info!(
            uri = uri.as_str(),
            line = position.line,
            character = position.character,
            include_declaration,
            "Find references requested"
        );

        let analysis = self.host.lock().await.snapshot();
        let locations = self
            .run_scan(
                params.work_done_progress_params.work_done_token,
                "Finding references",
                move |cancel, progress| {
                    analysis.find_references_with(
                        &file,
                        position,
                        include_declaration,
                        cancel,
                        progress,
                    )
                },
            )
            .await
            .unwrap_or_default();

        let lsp_locations: Vec<Location> = locations.iter().filter_map(convert_ide_location).collect();
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis(),
            count = lsp_locations.len(),
            "Find references completed"
        );

        if lsp_locations.is_empty() {
            Ok(None)
        } else {
            Ok(Some(lsp_locations))
        }
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        tracing::debug!(uri = params.text_document.uri.as_str(), "Document symbols requested");
        let file = uri_to_file(&params.text_document.uri);
        let analysis = self.host.lock().await.snapshot();

        let symbols: Vec<_> = analysis
            .document_symbols(&file)
            .into_iter()
            .map(IntoLsp::into_lsp)
            .collect();

        if symbols.is_empty() {
            Ok(None)
        } else {
            Ok(Some(DocumentSymbolResponse::Nested(symbols)))
        }
    }
}
