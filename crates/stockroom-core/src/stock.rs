//! # Stock Movements
//!
//! Checkout and checkin rules. The record store reads the row, applies one
//! of these and writes the result back inside a single transaction.
//!
//! ```text
//! checkout(qty=3, project="rover")      checkin(qty=2)
//!   quantity 10 ──► 7                     quantity 7 ──► 9
//!   used_by_project ──► "rover"           used_by_project unchanged
//!
//! checkout(qty=12) on quantity 10 ──► InsufficientStock (nothing changes)
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::ComponentRecord;

/// Quantity left after taking `requested` out of `available`.
pub fn remaining_after_checkout(barcode: &str, available: i64, requested: i64) -> CoreResult<i64> {
    if requested <= 0 {
        return Err(CoreError::NonPositiveQuantity(requested));
    }
    if requested > available {
        return Err(CoreError::InsufficientStock {
            barcode: barcode.to_string(),
            available,
            requested,
        });
    }
    Ok(available - requested)
}

/// Quantity after returning `returned` parts.
pub fn total_after_checkin(barcode: &str, available: i64, returned: i64) -> CoreResult<i64> {
    if returned <= 0 {
        return Err(CoreError::NonPositiveQuantity(returned));
    }
    available
        .checked_add(returned)
        .ok_or_else(|| CoreError::QuantityOverflow {
            barcode: barcode.to_string(),
        })
}

/// Applies a checkout to an in-memory record.
///
/// An empty `project` leaves `used_by_project` as it was.
pub fn apply_checkout(record: &mut ComponentRecord, requested: i64, project: &str) -> CoreResult<()> {
    record.quantity = remaining_after_checkout(&record.barcode.to_string(), record.quantity, requested)?;
    let project = project.trim();
    if !project.is_empty() {
        record.used_by_project = project.to_string();
    }
    Ok(())
}

/// Applies a checkin to an in-memory record.
pub fn apply_checkin(record: &mut ComponentRecord, returned: i64) -> CoreResult<()> {
    record.quantity = total_after_checkin(&record.barcode.to_string(), record.quantity, returned)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Barcode;

    fn bag(quantity: i64) -> ComponentRecord {
        ComponentRecord {
            quantity,
            ..ComponentRecord::with_barcode(Barcode::synthetic(7))
        }
    }

    #[test]
    fn test_checkout_decrements_and_tags_project() {
        let mut rec = bag(10);
        apply_checkout(&mut rec, 3, "rover").unwrap();
        assert_eq!(rec.quantity, 7);
        assert_eq!(rec.used_by_project, "rover");
    }

    #[test]
    fn test_checkout_entire_stock() {
        let mut rec = bag(4);
        apply_checkout(&mut rec, 4, "").unwrap();
        assert_eq!(rec.quantity, 0);
        assert_eq!(rec.used_by_project, "");
    }

    #[test]
    fn test_checkout_more_than_stock_is_rejected() {
        let mut rec = bag(10);
        let err = apply_checkout(&mut rec, 12, "rover").unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 10, requested: 12, .. }
        ));
        assert_eq!(rec.quantity, 10);
        assert_eq!(rec.used_by_project, "");
    }

    #[test]
    fn test_non_positive_amounts_are_rejected() {
        assert!(matches!(
            remaining_after_checkout("x", 5, 0),
            Err(CoreError::NonPositiveQuantity(0))
        ));
        assert!(matches!(
            total_after_checkin("x", 5, -2),
            Err(CoreError::NonPositiveQuantity(-2))
        ));
    }

    #[test]
    fn test_checkin_adds_and_guards_overflow() {
        let mut rec = bag(7);
        apply_checkin(&mut rec, 2).unwrap();
        assert_eq!(rec.quantity, 9);

        assert!(matches!(
            total_after_checkin("x", i64::MAX, 1),
            Err(CoreError::QuantityOverflow { .. })
        ));
    }
}
