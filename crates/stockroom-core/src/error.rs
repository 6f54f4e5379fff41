//! # Error Types
//!
//! Domain-specific error types for stockroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockroom-core errors (this file)                                     │
//! │  ├── CoreError        - Stock rule violations                          │
//! │  └── ValidationError  - Record fails the save rules                    │
//! │                                                                         │
//! │  stockroom-db       └── DbError      - Record store failures           │
//! │  stockroom-vendor   └── VendorError  - OAuth2 / HTTP failures          │
//! │  stockroom-scan     └── ScanError    - Camera / decoder failures       │
//! │                                                                         │
//! │  apps/cli           └── CliError     - What the operator sees          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A malformed barcode payload is NOT an error anywhere in this crate:
//! unknown or missing tags simply produce empty fields.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Stock rule errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Checkout would drive the quantity below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// checkout 0000042 --qty 5
    ///      │
    ///      ▼
    /// available = 3
    ///      │
    ///      ▼
    /// InsufficientStock { barcode: "0000042", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {barcode}: available {available}, requested {requested}")]
    InsufficientStock {
        barcode: String,
        available: i64,
        requested: i64,
    },

    /// Checkout/checkin amount must be at least one.
    #[error("Quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),

    /// Checkin would overflow the quantity column.
    #[error("Quantity overflow for {barcode}")]
    QuantityOverflow { barcode: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Save-rule failures for a component record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// None of name / supplier P/N / manufacturer P/N was given.
    #[error("At least one of name, supplier part number or manufacturer part number is required")]
    MissingIdentity,

    /// Value must not be negative.
    #[error("{field} must not be negative, got {value}")]
    Negative { field: String, value: i64 },

    /// Field value has invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_display() {
        let err = CoreError::InsufficientStock {
            barcode: "0000042".into(),
            available: 3,
            requested: 5,
        };
        let msg = err.to_string();
        assert!(msg.contains("0000042"));
        assert!(msg.contains("available 3"));
    }

    #[test]
    fn test_validation_wraps_into_core() {
        let err: CoreError = ValidationError::MissingIdentity.into();
        assert!(matches!(err, CoreError::Validation(ValidationError::MissingIdentity)));
    }
}
