//! Configuration for querynav.
//!
//! An optional `.querynavrc.yml` (or `.yaml`, `.json`, `.toml`, or the
//! `querynav.config.*` spellings) lists which files each engine indexes:
//!
//! ```yaml
//! graphql:
//!   include: ["**/*.{graphql,gql,graphqls}"]
//!   exclude: ["**/node_modules/**"]
//! sql:
//!   include: ["**/*.sql"]
//!   comment_marker: "--"
//! ```
//!
//! Every key is optional. A missing file means [`NavConfig::default`].

mod config;
mod error;
mod loader;

pub use config::{GraphQLConfig, NavConfig, PatternList, SqlConfig};
pub use error::{ConfigError, Result};
pub use loader::{
    find_config, load_config, load_config_from_str, load_config_from_value, validate, CONFIG_FILES,
};
