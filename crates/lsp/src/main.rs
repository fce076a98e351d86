//! querynav language server binary entry point.

#[tokio::main]
async fn main() {
    querynav_lsp::run_server().await;
}
