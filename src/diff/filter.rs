//! Class filter configuration.
//!
//! Loads include/exclude rules from TOML and turns them into the predicate
//! the ranking engine applies to every class:
//!
//! ```toml
//! [filter]
//! include = ["java.lang.String"]
//! exclude = ["^java\\.util\\.", "\\[\\]$"]
//! ```

use crate::parser::schema::ObjectData;
use crate::utils::error::ConfigError;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Filter file layout
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub filter: FilterRules,
}

/// Raw include/exclude rules
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FilterRules {
    /// Exact class names to keep; empty keeps everything
    #[serde(default)]
    pub include: Vec<String>,

    /// Regexes on the class name; a match drops the class
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Compiled class filter
#[derive(Debug, Clone, Default)]
pub struct ClassFilter {
    include: HashSet<String>,
    exclude: Vec<Regex>,
}

impl ClassFilter {
    /// Compile rules
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidFilterPattern` for the first bad regex
    pub fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude = rules
            .exclude
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidFilterPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include: rules.include.iter().cloned().collect(),
            exclude,
        })
    }

    /// Whether `object` passes the filter
    pub fn matches(&self, object: &ObjectData) -> bool {
        let name = object.name();
        (self.include.is_empty() || self.include.contains(name))
            && !self.exclude.iter().any(|re| re.is_match(name))
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

/// Load and compile a filter from a TOML file
///
/// # Errors
/// * `ConfigError::FilterFile` - If file cannot be read
/// * `ConfigError::FilterParse` - If TOML is invalid
/// * `ConfigError::InvalidFilterPattern` - If an exclude regex is invalid
///
/// # Example
/// ```ignore
/// let filter = load_filter("filter.toml")?;
/// let predicate = |o: &ObjectData| filter.matches(o);
/// ```
pub fn load_filter(path: impl AsRef<Path>) -> Result<ClassFilter, ConfigError> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: FilterConfig = toml::from_str(&contents)?;

    debug!(
        "Loaded filter from {}: {} include, {} exclude rules",
        path.as_ref().display(),
        config.filter.include.len(),
        config.filter.exclude.len()
    );

    ClassFilter::new(&config.filter)
}
