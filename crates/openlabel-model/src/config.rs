//! Document and serializer configuration.

/// Behaviour of a [`crate::Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentConfig {
    /// Generate UUIDs instead of sequential integers for new UIDs.
    pub use_uuid: bool,
    /// Run the schema validator before building a document from JSON.
    pub validate_on_load: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            use_uuid: false,
            validate_on_load: true,
        }
    }
}

/// Options for writing a document out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SerializeOptions {
    /// Indent the output. Keys are sorted either way.
    pub pretty: bool,
    /// Validate the canonical tree before returning it.
    pub validate: bool,
}

impl SerializeOptions {
    pub fn pretty() -> Self {
        Self {
            pretty: true,
            ..Self::default()
        }
    }
}
