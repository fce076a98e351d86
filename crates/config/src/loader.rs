use crate::{ConfigError, NavConfig, PatternList, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file names to search for, in order of preference
pub const CONFIG_FILES: &[&str] = &[
    ".querynavrc.yml",
    ".querynavrc.yaml",
    ".querynavrc.json",
    ".querynavrc.toml",
    "querynav.config.yml",
    "querynav.config.yaml",
    "querynav.config.json",
    "querynav.config.toml",
];

/// Find a config file by walking up the directory tree from `start_dir`.
#[tracing::instrument(fields(start = %start_dir.display()))]
pub fn find_config(start_dir: &Path) -> Result<Option<PathBuf>> {
    let mut current_dir = start_dir.to_path_buf();
    let mut checked_dirs = 0;

    loop {
        tracing::trace!(dir = %current_dir.display(), "Checking directory for config files");
        for file_name in CONFIG_FILES {
            let config_path = current_dir.join(file_name);
            if config_path.is_file() {
                tracing::info!(path = %config_path.display(), checked_dirs, "Found config file");
                return Ok(Some(config_path));
            }
        }

        checked_dirs += 1;
        if !current_dir.pop() {
            tracing::debug!(checked_dirs, "No config file found");
            break;
        }
    }

    Ok(None)
}

/// Load a config file, detecting the format from its extension.
#[tracing::instrument(fields(path = %path.display()))]
pub fn load_config(path: &Path) -> Result<NavConfig> {
    tracing::debug!("Reading config file");
    let contents = fs::read_to_string(path)?;
    let config = load_config_from_str(&contents, path)?;
    tracing::info!(
        graphql_patterns = config.graphql.include_patterns().len(),
        sql_patterns = config.sql.include_patterns().len(),
        "Config loaded successfully"
    );
    Ok(config)
}

/// Load a config from a string. The path is used for error messages and
/// format detection.
#[tracing::instrument(skip(contents), fields(path = %path.display(), size = contents.len()))]
pub fn load_config_from_str(contents: &str, path: &Path) -> Result<NavConfig> {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    let config: NavConfig = match extension {
        "yml" | "yaml" => {
            // An empty YAML file is a valid "all defaults" config
            if contents.trim().is_empty() {
                NavConfig::default()
            } else {
                serde_yaml::from_str(contents)
                    .map_err(|e| invalid(path, format!("YAML parse error: {e}")))?
            }
        }
        "json" => serde_json::from_str(contents)
            .map_err(|e| invalid(path, format!("JSON parse error: {e}")))?,
        "toml" => {
            toml::from_str(contents).map_err(|e| invalid(path, format!("TOML parse error: {e}")))?
        }
        _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    };

    validate(&config, path)?;
    Ok(config)
}

/// Load a config sent by the client (e.g. LSP `initializationOptions`).
pub fn load_config_from_value(value: serde_json::Value) -> Result<NavConfig> {
    let origin = Path::new("<initializationOptions>");
    let config: NavConfig = serde_json::from_value(value)
        .map_err(|e| invalid(origin, format!("JSON parse error: {e}")))?;
    validate(&config, origin)?;
    Ok(config)
}

/// Validate a loaded configuration.
///
/// `origin` names where the config came from and is only used in errors.
#[tracing::instrument(skip(config), fields(origin = %origin.display()))]
pub fn validate(config: &NavConfig, origin: &Path) -> Result<()> {
    check_patterns("graphql.include", &config.graphql.include, origin, true)?;
    check_patterns("graphql.exclude", &config.graphql.exclude, origin, false)?;
    check_patterns("sql.include", &config.sql.include, origin, true)?;
    check_patterns("sql.exclude", &config.sql.exclude, origin, false)?;

    if config.sql.comment_marker.trim().is_empty() {
        return Err(invalid(origin, "sql.commentMarker must not be empty"));
    }

    tracing::debug!("Config validation passed");
    Ok(())
}

fn check_patterns(key: &str, patterns: &PatternList, origin: &Path, required: bool) -> Result<()> {
    let patterns = patterns.patterns();
    if required && patterns.is_empty() {
        return Err(invalid(origin, format!("{key} must list at least one pattern")));
    }
    if patterns.iter().any(|p| p.trim().trim_start_matches('!').is_empty()) {
        return Err(invalid(origin, format!("{key} contains an empty pattern")));
    }
    Ok(())
}

fn invalid(path: &Path, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        path: path.to_path_buf(),
        message: message.into(),
    }
}
