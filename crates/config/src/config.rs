use serde::{Deserialize, Serialize};

/// Root configuration: one section per document family.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    pub graphql: GraphQLConfig,
    pub sql: SqlConfig,
}

/// Files indexed and scanned by the GraphQL engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphQLConfig {
    pub include: PatternList,
    pub exclude: PatternList,
}

impl Default for GraphQLConfig {
    fn default() -> Self {
        Self {
            include: PatternList::One("**/*.{graphql,gql,graphqls}".to_string()),
            exclude: default_exclude(),
        }
    }
}

/// Files indexed by the SQL engine, and its line-comment marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SqlConfig {
    pub include: PatternList,
    pub exclude: PatternList,
    /// Lines starting with this marker are skipped by the reference scanner
    #[serde(alias = "comment_marker")]
    pub comment_marker: String,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            include: PatternList::One("**/*.sql".to_string()),
            exclude: default_exclude(),
            comment_marker: "--".to_string(),
        }
    }
}

fn default_exclude() -> PatternList {
    PatternList::One("**/node_modules/**".to_string())
}

/// A glob pattern or list of glob patterns.
///
/// Patterns starting with `!` are treated as excludes wherever they appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternList {
    One(String),
    Many(Vec<String>),
}

impl PatternList {
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            Self::One(pattern) => vec![pattern.as_str()],
            Self::Many(patterns) => patterns.iter().map(String::as_str).collect(),
        }
    }
}

impl GraphQLConfig {
    /// Positive include patterns.
    #[must_use]
    pub fn include_patterns(&self) -> Vec<String> {
        split_patterns(&self.include, &self.exclude).0
    }

    /// Exclude patterns, including negated entries of `include`.
    #[must_use]
    pub fn exclude_patterns(&self) -> Vec<String> {
        split_patterns(&self.include, &self.exclude).1
    }
}

impl SqlConfig {
    #[must_use]
    pub fn include_patterns(&self) -> Vec<String> {
        split_patterns(&self.include, &self.exclude).0
    }

    #[must_use]
    pub fn exclude_patterns(&self) -> Vec<String> {
        split_patterns(&self.include, &self.exclude).1
    }
}

fn split_patterns(include: &PatternList, exclude: &PatternList) -> (Vec<String>, Vec<String>) {
    let mut includes = Vec::new();
    let mut excludes = Vec::new();

    for pattern in include.patterns() {
        let pattern = pattern.trim();
        match pattern.strip_prefix('!') {
            Some(negated) => excludes.push(negated.to_string()),
            None => includes.push(pattern.to_string()),
        }
    }
    for pattern in exclude.patterns() {
        let pattern = pattern.trim();
        excludes.push(pattern.strip_prefix('!').unwrap_or(pattern).to_string());
    }

    (includes, excludes)
}
