use thiserror::Error;

/// Internal error type for store-level operations
///
/// Infrastructure errors (Database, Parse, Crypto) are shared by all
/// stores; domain errors are specific to one store. This type is never
/// exposed via the API — endpoints convert to AuthError or AdminError.
#[derive(Error, Debug)]
pub enum InternalError {
    /// Database query or operation failed
    #[error("Database error: {operation} failed: {source}")]
    Database {
        operation: String,
        #[source]
        source: sea_orm::DbErr,
    },

    /// Database transaction failed
    #[error("Transaction error: {operation} failed: {source}")]
    Transaction {
        operation: String,
        #[source]
        source: sea_orm::DbErr,
    },

    /// Failed to parse a value (JSON, timestamp, etc.)
    #[error("Parse error: failed to parse {value_type}: {message}")]
    Parse { value_type: String, message: String },

    /// Cryptographic operation failed (hashing, verification)
    #[error("Crypto error: {operation} failed: {message}")]
    Crypto { operation: String, message: String },

    /// User store errors
    #[error(transparent)]
    User(#[from] UserStoreError),

    /// Role/permission store errors
    #[error(transparent)]
    Access(#[from] AccessStoreError),

    /// Settings store errors
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Audit store errors
    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl InternalError {
    /// Create a database error with context
    pub fn database(operation: impl Into<String>, source: sea_orm::DbErr) -> Self {
        Self::Database {
            operation: operation.into(),
            source,
        }
    }

    /// Create a transaction error with context
    pub fn transaction(operation: impl Into<String>, source: sea_orm::DbErr) -> Self {
        Self::Transaction {
            operation: operation.into(),
            source,
        }
    }

    /// Create a parse error with context
    pub fn parse(value_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            value_type: value_type.into(),
            message: message.into(),
        }
    }

    /// Create a crypto error with context
    pub fn crypto(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Crypto {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// User store specific errors
#[derive(Error, Debug)]
pub enum UserStoreError {
    /// Email already registered
    #[error("Email already exists: {0}")]
    DuplicateEmail(String),

    /// User not found (or soft-deleted)
    #[error("User not found: {0}")]
    UserNotFound(String),
}

/// Role/permission store specific errors
#[derive(Error, Debug)]
pub enum AccessStoreError {
    /// Role or permission name already taken
    #[error("Name already exists: {0}")]
    DuplicateName(String),

    /// Role not found
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// Permission not found
    #[error("Permission not found: {0}")]
    PermissionNotFound(String),
}

/// Settings store specific errors
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Singleton settings row missing after ensure
    #[error("Settings row not found")]
    SettingsNotFound,
}

/// Audit store specific errors
#[derive(Error, Debug)]
pub enum AuditError {
    /// Failed to write audit log entry
    #[error("Failed to write audit log: {0}")]
    LogWriteFailed(String),
}
