//! # Validation Module
//!
//! Rules a component record must satisfy before it is saved.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI argument parsing (clap)                                  │
//! │  ├── Types: quantity is an integer                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── location present                                                  │
//! │  ├── some identity (name / supplier P/N / manufacturer P/N)            │
//! │  └── quantity ≥ 0                                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── PRIMARY KEY on barcode                                            │
//! │  ├── NOT NULL location                                                 │
//! │  └── CHECK (quantity >= 0)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::ComponentRecord;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Location must name a shelf or bin.
pub fn validate_location(location: &str) -> ValidationResult<()> {
    if location.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "location".to_string(),
        });
    }
    Ok(())
}

/// At least one of name, supplier P/N or manufacturer P/N.
pub fn validate_identity(record: &ComponentRecord) -> ValidationResult<()> {
    let has_identity = [&record.name, &record.supplier_pn, &record.manufacturer_pn]
        .iter()
        .any(|s| !s.trim().is_empty());

    if !has_identity {
        return Err(ValidationError::MissingIdentity);
    }
    Ok(())
}

/// Stock can't go negative.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 0 {
        return Err(ValidationError::Negative {
            field: "quantity".to_string(),
            value: quantity,
        });
    }
    Ok(())
}

/// Runs every save rule, reporting the first failure.
///
/// ## Arguments
/// * `record` - Record about to be added or updated
/// * `scanned` - The record came from a scan, so it must carry the payload
///
/// ## Example
/// ```rust
/// use stockroom_core::validation::validate_record;
/// use stockroom_core::ComponentRecord;
///
/// let mut rec = ComponentRecord { name: "LM358".into(), ..Default::default() };
/// assert!(validate_record(&rec, false).is_err()); // no location
///
/// rec.location = "Drawer B3".into();
/// assert!(validate_record(&rec, false).is_ok());
/// ```
pub fn validate_record(record: &ComponentRecord, scanned: bool) -> ValidationResult<()> {
    if scanned && !record.has_barcode() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }
    validate_location(&record.location)?;
    validate_identity(record)?;
    validate_quantity(record.quantity)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ComponentRecord {
        ComponentRecord {
            manufacturer_pn: "LM358DR".into(),
            location: "Drawer B3".into(),
            quantity: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_record_passes() {
        assert!(validate_record(&valid(), false).is_ok());
    }

    #[test]
    fn test_location_required() {
        let rec = ComponentRecord {
            location: "  ".into(),
            ..valid()
        };
        assert_eq!(
            validate_record(&rec, false),
            Err(ValidationError::Required {
                field: "location".into()
            })
        );
    }

    #[test]
    fn test_identity_required() {
        let rec = ComponentRecord {
            manufacturer_pn: String::new(),
            description: "only a description".into(),
            ..valid()
        };
        assert_eq!(validate_record(&rec, false), Err(ValidationError::MissingIdentity));

        let rec = ComponentRecord {
            manufacturer_pn: String::new(),
            supplier_pn: "296-1234-ND".into(),
            ..valid()
        };
        assert!(validate_record(&rec, false).is_ok());
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let rec = ComponentRecord {
            quantity: -1,
            ..valid()
        };
        assert!(matches!(
            validate_record(&rec, false),
            Err(ValidationError::Negative { value: -1, .. })
        ));
    }

    #[test]
    fn test_scanned_record_needs_payload() {
        assert!(validate_record(&valid(), true).is_err());
    }
}
