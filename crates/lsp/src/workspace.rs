//! Workspace roots and configuration for a session.

use std::path::PathBuf;

use anyhow::Context;
use lsp_types::InitializeParams;
use querynav_config::{find_config, load_config, load_config_from_value, NavConfig};
use tower_lsp_server::UriExt;

/// File system roots of the workspace folders, falling back to the legacy `rootUri`.
pub fn workspace_roots(params: &InitializeParams) -> Vec<PathBuf> {
    if let Some(folders) = &params.workspace_folders {
        return folders
            .iter()
            .filter_map(|folder| folder.uri.to_file_path().map(|path| path.into_owned()))
            .collect();
    }

    #[allow(deprecated)] // Older clients only send rootUri
    params
        .root_uri
        .as_ref()
        .and_then(|uri| uri.to_file_path())
        .map(|path| vec![path.into_owned()])
        .unwrap_or_default()
}

/// Resolve the configuration for a session.
///
/// Client `initializationOptions` win over a config file; the first root
/// with a config file (searching upwards) supplies it otherwise.
pub fn load_workspace_config(
    roots: &[PathBuf],
    options: Option<serde_json::Value>,
) -> anyhow::Result<NavConfig> {
    if let Some(options) = options.filter(|value| !value.is_null()) {
        tracing::info!("Using configuration from initializationOptions");
        return load_config_from_value(options).context("invalid initializationOptions");
    }

    for root in roots {
        if let Some(path) = find_config(root)? {
            return load_config(&path)
                .with_context(|| format!("failed to load {}", path.display()));
        }
    }

    tracing::info!("No config file found, using defaults");
    Ok(NavConfig::default())
}
