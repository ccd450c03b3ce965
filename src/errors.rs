//! # Registry Errors
//!
//! Error types shared by every storage backend and the query compilers.

use thiserror::Error;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Coarse error classification used by callers that map errors to transport responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    DuplicateSubmodelIds,
    InvalidQuery,
    StorageUnavailable,
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    // ==================
    // Lookup Errors
    // ==================

    /// No shell descriptor with this id
    #[error("Shell descriptor '{0}' not found")]
    AasDescriptorNotFound(String),

    /// Shell exists but holds no submodel descriptor with this id
    #[error("Submodel descriptor '{submodel_id}' not found in shell descriptor '{aas_id}'")]
    SubmodelNotFound { aas_id: String, submodel_id: String },

    // ==================
    // Conflict Errors
    // ==================

    /// Insert with an id that is already registered
    #[error("Shell descriptor '{0}' already exists")]
    AasDescriptorAlreadyExists(String),

    /// Submodel insert with an id already present in the shell
    #[error("Submodel descriptor '{submodel_id}' already exists in shell descriptor '{aas_id}'")]
    SubmodelAlreadyExists { aas_id: String, submodel_id: String },

    /// The submodel list of a single shell repeats an id
    #[error("Submodel id '{0}' is used more than once in the same shell descriptor")]
    DuplicateSubmodelIds(String),

    // ==================
    // Query Errors
    // ==================

    /// A query or sort path does not resolve against the descriptor schema
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    // ==================
    // Backend Errors
    // ==================

    /// Backend connectivity, lock or transaction failure
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A stored document could not be decoded into a descriptor
    #[error("Stored document is invalid: {0}")]
    InvalidDocument(String),
}

impl RegistryError {
    /// Path is not a known path to a leaf of the schema
    pub fn unknown_leaf(path: &str) -> Self {
        Self::InvalidQuery(format!("'{}' is not a known path to a leaf", path))
    }

    /// Regex pattern failed to compile
    pub fn invalid_pattern(pattern: &str, reason: impl std::fmt::Display) -> Self {
        Self::InvalidQuery(format!("invalid pattern '{}': {}", pattern, reason))
    }

    pub fn lock_poisoned() -> Self {
        Self::StorageUnavailable("lock poisoned".to_string())
    }

    /// Returns the taxonomy kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AasDescriptorNotFound(_) | Self::SubmodelNotFound { .. } => ErrorKind::NotFound,
            Self::AasDescriptorAlreadyExists(_) | Self::SubmodelAlreadyExists { .. } => {
                ErrorKind::AlreadyExists
            }
            Self::DuplicateSubmodelIds(_) => ErrorKind::DuplicateSubmodelIds,
            Self::InvalidQuery(_) => ErrorKind::InvalidQuery,
            Self::StorageUnavailable(_) | Self::InvalidDocument(_) => ErrorKind::StorageUnavailable,
        }
    }

    /// Returns the stable error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::AasDescriptorNotFound(_) => "AAS_REGISTRY_DESCRIPTOR_NOT_FOUND",
            Self::SubmodelNotFound { .. } => "AAS_REGISTRY_SUBMODEL_NOT_FOUND",
            Self::AasDescriptorAlreadyExists(_) => "AAS_REGISTRY_DESCRIPTOR_ALREADY_EXISTS",
            Self::SubmodelAlreadyExists { .. } => "AAS_REGISTRY_SUBMODEL_ALREADY_EXISTS",
            Self::DuplicateSubmodelIds(_) => "AAS_REGISTRY_DUPLICATE_SUBMODEL_IDS",
            Self::InvalidQuery(_) => "AAS_REGISTRY_INVALID_QUERY",
            Self::StorageUnavailable(_) => "AAS_REGISTRY_STORAGE_UNAVAILABLE",
            Self::InvalidDocument(_) => "AAS_REGISTRY_INVALID_DOCUMENT",
        }
    }

    /// True when the caller sent something the registry rejects
    pub fn is_client_error(&self) -> bool {
        self.kind() != ErrorKind::StorageUnavailable
    }
}
