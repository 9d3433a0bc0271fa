//! Open-request descriptors.

/// Version used when an open request does not name one.
pub const DEFAULT_VERSION: u32 = 1;

/// Describes a named, versioned database to open.
///
/// Identity is the name; the version only ever moves upward over a
/// descriptor's lifetime (downgrades are rejected at open time).
///
/// # Example
///
/// ```rust
/// use relaydb_core::Descriptor;
///
/// let descriptor = Descriptor::new("app").version(2);
/// assert_eq!(descriptor.name(), "app");
/// assert_eq!(descriptor.target_version(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    name: String,
    version: u32,
}

impl Descriptor {
    /// Creates a descriptor at the default version.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: DEFAULT_VERSION,
        }
    }

    /// Sets the target schema version.
    #[must_use]
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// The database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema version this descriptor opens at.
    #[must_use]
    pub fn target_version(&self) -> u32 {
        self.version
    }
}
