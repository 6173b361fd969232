//! Cache namespace and asset manifest types.

use std::fmt;

use url::Url;

use crate::error::NetworkError;

/// A versioned cache bucket name, e.g. `familyvault-v2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheNamespace(String);

impl CacheNamespace {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for every namespace left behind by an older version
    pub fn supersedes(&self, other: &str) -> bool {
        self.0 != other
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// URLs that must be in the current namespace right after install.
#[derive(Debug, Clone, Default)]
pub struct AssetManifest {
    entries: Vec<String>,
}

impl AssetManifest {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve every entry against `scope`, dropping duplicates while
    /// keeping first-seen order.
    pub fn resolve(&self, scope: &Url) -> Result<Vec<String>, NetworkError> {
        let mut resolved: Vec<String> = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let url = scope
                .join(entry)
                .map_err(|e| NetworkError::InvalidUrl(format!("{}: {}", entry, e)))?;
            let url = url.to_string();
            if !resolved.contains(&url) {
                resolved.push(url);
            }
        }
        Ok(resolved)
    }
}
