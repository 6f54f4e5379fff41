//! # CLI Error Type
//!
//! Unified error type for commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in stockroom                              │
//! │                                                                         │
//! │  DbError ─────────┐                                                     │
//! │  CoreError ───────┤                                                     │
//! │  ValidationError ─┼──► CliError { code, message } ──► stderr + exit code│
//! │  VendorError ─────┤         (logged with tracing first)                 │
//! │  ScanError ───────┘                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! With `--json` the error is printed as:
//! ```json
//! { "code": "NOT_FOUND", "message": "Component not found: 0000042" }
//! ```

use serde::Serialize;
use stockroom_core::{CoreError, ValidationError};
use stockroom_db::DbError;
use stockroom_scan::ScanError;
use stockroom_vendor::VendorError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Clone, Serialize)]
pub struct CliError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No record with that barcode
    NotFound,

    /// Input failed a save rule or could not be parsed
    ValidationError,

    /// Barcode already stored
    Duplicate,

    /// Checkout larger than the stock on hand
    InsufficientStock,

    /// Database operation failed
    DatabaseError,

    /// Vendor login needed
    AuthRequired,

    /// Vendor call failed
    VendorError,

    /// Config file or credentials problem
    ConfigError,

    /// Payload input failed
    ScanError,

    Internal,
}

impl ErrorCode {
    /// Process exit status for this code.
    pub fn exit_status(self) -> u8 {
        match self {
            ErrorCode::NotFound => 2,
            ErrorCode::ValidationError | ErrorCode::Duplicate | ErrorCode::InsufficientStock => 3,
            ErrorCode::AuthRequired => 4,
            ErrorCode::VendorError | ErrorCode::ConfigError => 5,
            ErrorCode::DatabaseError | ErrorCode::ScanError | ErrorCode::Internal => 1,
        }
    }
}

impl CliError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        CliError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        CliError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::Internal, message)
    }

    /// Adds a hint line after the message.
    pub fn with_hint(mut self, hint: &str) -> Self {
        self.message = format!("{}\nhint: {}", self.message, hint);
        self
    }
}

impl From<DbError> for CliError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CliError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                CliError::new(ErrorCode::Duplicate, format!("{} '{}' already exists", field, value))
            }
            DbError::CheckViolation(message) => {
                CliError::validation(format!("Rejected by database constraint: {}", message))
            }
            DbError::Domain(e) => CliError::from(e),
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                CliError::new(ErrorCode::DatabaseError, format!("Database connection failed: {}", e))
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                CliError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) | DbError::TransactionFailed(e) | DbError::Internal(e) => {
                tracing::error!("Database operation failed: {}", e);
                CliError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => CliError::new(ErrorCode::DatabaseError, "Database pool exhausted"),
            DbError::CorruptValue { key, value } => CliError::new(
                ErrorCode::DatabaseError,
                format!("Stored setting '{}' is corrupt: {}", key, value),
            ),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock { .. } => CliError::new(ErrorCode::InsufficientStock, err.to_string()),
            CoreError::NonPositiveQuantity(_) | CoreError::QuantityOverflow { .. } => {
                CliError::validation(err.to_string())
            }
            CoreError::Validation(e) => CliError::from(e),
        }
    }
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        CliError::validation(err.to_string())
    }
}

impl From<VendorError> for CliError {
    fn from(err: VendorError) -> Self {
        let code = if err.is_auth_required() {
            ErrorCode::AuthRequired
        } else if err.is_config_error() {
            ErrorCode::ConfigError
        } else {
            ErrorCode::VendorError
        };
        CliError::new(code, err.to_string())
    }
}

impl From<ScanError> for CliError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::Payload(e) => CliError::from(e),
            other => CliError::new(ErrorCode::ScanError, other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::internal(format!("JSON output failed: {}", err))
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::internal(format!("I/O error: {}", err))
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for CliError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_errors_map_to_codes() {
        let err = CliError::from(DbError::duplicate("barcode", "0000001"));
        assert_eq!(err.code, ErrorCode::Duplicate);
        assert!(err.message.contains("0000001"));

        let err = CliError::from(DbError::Domain(CoreError::InsufficientStock {
            barcode: "0000001".into(),
            available: 2,
            requested: 5,
        }));
        assert_eq!(err.code, ErrorCode::InsufficientStock);
    }

    #[test]
    fn test_vendor_errors_map_to_codes() {
        assert_eq!(CliError::from(VendorError::AuthorizationRequired).code, ErrorCode::AuthRequired);
        assert_eq!(CliError::from(VendorError::MissingCredentials).code, ErrorCode::ConfigError);
        assert_eq!(CliError::from(VendorError::Timeout).code, ErrorCode::VendorError);
    }

    #[test]
    fn test_json_shape() {
        let err = CliError::not_found("Component", "0000042");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Component not found: 0000042");
    }
}
