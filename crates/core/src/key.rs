//! Object key construction
//!
//! Maps local paths (relative to the upload root) onto object keys below an
//! optional prefix. Keys always use `/` as separator, whatever the host OS.

use std::path::{Component, Path};

use crate::error::{Error, Result};

/// Normalized key prefix that every uploaded object is placed under
///
/// Stored without leading or trailing slashes. Empty means bucket root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPrefix(String);

impl KeyPrefix {
    /// Parse and normalize a user-supplied prefix
    ///
    /// Accepts `/` or `\` separators, drops empty and `.` segments and
    /// rejects `..`.
    pub fn new(raw: &str) -> Result<Self> {
        let mut segments = Vec::new();
        for segment in raw.split(['/', '\\']) {
            match segment {
                "" | "." => continue,
                ".." => {
                    return Err(Error::InvalidKey(format!(
                        "Prefix '{raw}' must not contain '..'"
                    )));
                }
                s => segments.push(s),
            }
        }
        Ok(Self(segments.join("/")))
    }

    /// The normalized prefix, without slashes at either end
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key for a file at `relative` (a path relative to the upload root)
    pub fn object_key(&self, relative: &Path) -> Result<String> {
        let relative = relative_key(relative)?;
        Ok(self.join(&relative))
    }

    /// Key for the directory marker of `relative`
    ///
    /// Returns `None` for the root directory when no prefix is set, since a
    /// bare `/` key would not name anything.
    pub fn marker_key(&self, relative: &Path) -> Result<Option<String>> {
        let key = self.object_key(relative)?;
        if key.is_empty() {
            Ok(None)
        } else {
            Ok(Some(format!("{key}/")))
        }
    }

    fn join(&self, relative: &str) -> String {
        match (self.0.is_empty(), relative.is_empty()) {
            (true, _) => relative.to_string(),
            (false, true) => self.0.clone(),
            (false, false) => format!("{}/{relative}", self.0),
        }
    }
}

impl std::fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Convert a root-relative path into `/`-separated key segments
fn relative_key(relative: &Path) -> Result<String> {
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                let name = name.to_str().ok_or_else(|| {
                    Error::InvalidKey(format!(
                        "Path '{}' is not valid UTF-8",
                        relative.display()
                    ))
                })?;
                segments.push(name);
            }
            Component::CurDir => continue,
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::InvalidKey(format!(
                    "Path '{}' is not relative to the upload root",
                    relative.display()
                )));
            }
        }
    }
    Ok(segments.join("/"))
}
