//! querynav Language Server Protocol implementation.
//!
//! Serves go-to-definition, find-references and document outlines for
//! GraphQL and SQL files over stdio.

mod conversions;
mod server;
mod workspace;

use server::QueryNavLanguageServer;
use tower_lsp_server::{LspService, Server};

/// Initialize tracing for the LSP server.
///
/// Safe to call when a global subscriber is already set; initialization is
/// then skipped. Returns whether this call installed the subscriber.
pub fn init_tracing() -> bool {
    // LSP uses stdin/stdout for JSON-RPC, so all logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .is_ok()
}

/// Run the querynav language server over stdio.
///
/// ```ignore
/// #[tokio::main]
/// async fn main() {
///     querynav_lsp::run_server().await;
/// }
/// ```
pub async fn run_server() {
    init_tracing();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(QueryNavLanguageServer::new).finish();

    Server::new(stdin, stdout, socket).serve(service).await;
}
