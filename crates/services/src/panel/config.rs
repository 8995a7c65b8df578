use crate::error::PanelConfigError;

/// Namespace used when the host does not configure one.
pub const DEFAULT_NAMESPACE: &str = "project-react";

/// Panel settings supplied by the host application.
///
/// The namespace prefixes both durable keys so they cannot collide with
/// unrelated entries in a shared store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelConfig {
    namespace: String,
}

impl PanelConfig {
    /// # Errors
    ///
    /// Returns `PanelConfigError::EmptyNamespace` for blank namespaces.
    pub fn new(namespace: impl Into<String>) -> Result<Self, PanelConfigError> {
        let namespace = namespace.into().trim().to_owned();
        if namespace.is_empty() {
            return Err(PanelConfigError::EmptyNamespace);
        }
        Ok(Self { namespace })
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key holding the current module.
    #[must_use]
    pub fn module_key(&self) -> String {
        format!("{}-module", self.namespace)
    }

    /// Key holding the progress map.
    #[must_use]
    pub fn progress_key(&self) -> String {
        format!("{}-moduleProgress", self.namespace)
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_owned(),
        }
    }
}
