use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Stable curriculum identifier for a module (e.g. `1-react-fundamentals`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleKey(String);

impl ModuleKey {
    /// Creates a new `ModuleKey`.
    ///
    /// # Errors
    ///
    /// Returns `ParseKeyError` if the key is empty or whitespace-only.
    pub fn new(key: impl Into<String>) -> Result<Self, ParseKeyError> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(ParseKeyError {
                kind: "ModuleKey".to_string(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ModuleKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ModuleKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque reference to the renderable content of one step.
///
/// Navigation never looks inside a handle; the content layer resolves it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHandle(String);

impl ContentHandle {
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleKey({})", self.0)
    }
}

impl fmt::Debug for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHandle({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing a key from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKeyError {
    kind: String,
}

impl fmt::Display for ParseKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseKeyError {}

impl FromStr for ModuleKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleKey::new(s)
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
