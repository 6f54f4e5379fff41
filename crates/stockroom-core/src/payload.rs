//! # Barcode Payload Parsing
//!
//! Data-matrix labels on vendor bags carry several fields in one payload,
//! each introduced by an ASCII Group Separator and a short tag.
//!
//! ## Payload Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  [)>␞06 ␝P 296-1234-ND ␝1P LM358DR ␝K PO-77 ␝1K 55512345 ␝Q 10 ␝ …      │
//! │         ─┬──────────── ─┬───────── ─┬───── ─┬────────── ─┬──           │
//! │          │              │           │       │            └ quantity     │
//! │          │              │           │       └ sales order               │
//! │          │              │           └ purchase order                    │
//! │          │              └ manufacturer part number                      │
//! │          └ customer reference (or vendor part number)                   │
//! │                                                                         │
//! │  value = bytes after the tag, up to the next ␝ (or end of payload)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Missing tags produce empty strings; parsing never fails.

use std::collections::HashMap;

use crate::types::{Barcode, ComponentRecord, VendorProduct};
use crate::VENDOR_SUPPLIER_NAME;

/// ASCII Group Separator.
pub const GS: u8 = 0x1d;

/// Known field tags (without the leading separator).
pub mod tags {
    pub const MANUFACTURER_PART: &str = "1P";
    pub const QUANTITY: &str = "Q";
    pub const CUSTOMER_REFERENCE: &str = "P";
    pub const PURCHASE_ORDER: &str = "K";
    pub const SALES_ORDER: &str = "1K";
    pub const INVOICE: &str = "11K";
    pub const COUNTRY_OF_ORIGIN: &str = "4L";
    pub const LOT_CODE: &str = "1T";

    /// Every tag the parser knows about.
    pub const ALL: [&str; 8] = [
        MANUFACTURER_PART,
        QUANTITY,
        CUSTOMER_REFERENCE,
        PURCHASE_ORDER,
        SALES_ORDER,
        INVOICE,
        COUNTRY_OF_ORIGIN,
        LOT_CODE,
    ];
}

/// Extracts the value of each tag in `tags` from `payload`.
///
/// ## Rules
/// - A tag matches only right after `separator`
/// - The first occurrence wins
/// - The value runs to the next `separator` or the end of the payload
/// - A tag that never appears maps to `""`
/// - Non-UTF-8 bytes are replaced lossily
///
/// ## Example
/// ```rust
/// use stockroom_core::payload::{extract_fields, GS};
///
/// let fields = extract_fields(b"\x1d1P12345\x1dQ10\x1d", &["1P", "Q", "4L"], GS);
/// assert_eq!(fields["1P"], "12345");
/// assert_eq!(fields["Q"], "10");
/// assert_eq!(fields["4L"], "");
/// ```
pub fn extract_fields(payload: &[u8], tags: &[&str], separator: u8) -> HashMap<String, String> {
    tags.iter()
        .map(|tag| (tag.to_string(), extract_field(payload, tag, separator)))
        .collect()
}

/// Extracts a single tag's value (see [`extract_fields`]).
pub fn extract_field(payload: &[u8], tag: &str, separator: u8) -> String {
    let mut needle = Vec::with_capacity(tag.len() + 1);
    needle.push(separator);
    needle.extend_from_slice(tag.as_bytes());

    let Some(pos) = find(payload, &needle) else {
        return String::new();
    };

    let start = pos + needle.len();
    let end = payload[start..]
        .iter()
        .position(|&b| b == separator)
        .map(|off| start + off)
        .unwrap_or(payload.len());

    String::from_utf8_lossy(&payload[start..end]).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

// =============================================================================
// Record Drafts
// =============================================================================

/// Builds a record draft from the label alone (local decode mode).
///
/// Only the manufacturer part number and the quantity are taken from the
/// payload; a non-numeric quantity becomes 0. Location is left for the user.
pub fn draft_from_label(barcode: &Barcode) -> ComponentRecord {
    let payload = barcode.as_bytes();
    let quantity = extract_field(payload, tags::QUANTITY, GS)
        .trim()
        .parse::<i64>()
        .unwrap_or(0)
        .max(0);

    ComponentRecord {
        manufacturer_pn: extract_field(payload, tags::MANUFACTURER_PART, GS),
        quantity,
        ..ComponentRecord::with_barcode(barcode.clone())
    }
}

/// Builds a record draft from a vendor lookup (vendor decode mode).
///
/// ## Field Mapping
/// ```text
/// VendorProduct               ComponentRecord
/// ─────────────               ───────────────
/// vendor_part_number     ──►  supplier_pn
/// manufacturer_part_no   ──►  manufacturer_pn
/// manufacturer_name      ──►  manufacturer
/// product_description    ──►  description, category (first word)
/// quantity               ──►  quantity
/// sales_order_id         ──►  comment ("Sales Order ID: …")
/// (constant)             ──►  supplier = "Digi-Key"
/// label tag `P`          ──►  customer_ref, when it differs from supplier_pn
/// ```
pub fn draft_from_vendor(barcode: &Barcode, product: &VendorProduct) -> ComponentRecord {
    let label_ref = extract_field(barcode.as_bytes(), tags::CUSTOMER_REFERENCE, GS);
    let customer_ref = if label_ref != product.vendor_part_number {
        label_ref
    } else {
        String::new()
    };

    let category = product
        .product_description
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_string();

    ComponentRecord {
        supplier_pn: product.vendor_part_number.clone(),
        manufacturer_pn: product.manufacturer_part_number.clone(),
        manufacturer: product.manufacturer_name.clone(),
        description: product.product_description.clone(),
        category,
        quantity: product.quantity.max(0),
        comment: format!("Sales Order ID: {}", product.sales_order_id),
        supplier: VENDOR_SUPPLIER_NAME.to_string(),
        customer_ref,
        ..ComponentRecord::with_barcode(barcode.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABEL: &[u8] =
        b"[)>\x1e06\x1dPPROJ-ABC\x1d1P12345\x1dK\x1d1K55512345\x1d10K6789\x1dQ10\x1d11ZPICK\x1e\x04";

    #[test]
    fn test_extract_known_tags() {
        let fields = extract_fields(LABEL, &[tags::MANUFACTURER_PART, tags::QUANTITY], GS);
        assert_eq!(fields["1P"], "12345");
        assert_eq!(fields["Q"], "10");
    }

    #[test]
    fn test_missing_tag_is_empty() {
        let fields = extract_fields(LABEL, &[tags::LOT_CODE, tags::COUNTRY_OF_ORIGIN], GS);
        assert_eq!(fields["1T"], "");
        assert_eq!(fields["4L"], "");
    }

    #[test]
    fn test_tag_prefix_does_not_shadow_longer_tag() {
        // `P` must not match the `1P` field, and `K` must not match `1K`.
        assert_eq!(extract_field(LABEL, tags::CUSTOMER_REFERENCE, GS), "PROJ-ABC");
        assert_eq!(extract_field(LABEL, tags::PURCHASE_ORDER, GS), "");
        assert_eq!(extract_field(LABEL, tags::SALES_ORDER, GS), "55512345");
    }

    #[test]
    fn test_value_runs_to_end_without_trailing_separator() {
        assert_eq!(extract_field(b"\x1dQ42", tags::QUANTITY, GS), "42");
    }

    #[test]
    fn test_first_occurrence_wins() {
        assert_eq!(extract_field(b"\x1dQ1\x1dQ2\x1d", tags::QUANTITY, GS), "1");
    }

    #[test]
    fn test_garbage_payload_yields_empty_fields() {
        let fields = extract_fields(b"\xff\xfe not a label", &tags::ALL, GS);
        assert!(fields.values().all(|v| v.is_empty()));
        assert_eq!(fields.len(), tags::ALL.len());
    }

    #[test]
    fn test_draft_from_label() {
        let draft = draft_from_label(&Barcode::new(LABEL.to_vec()));
        assert_eq!(draft.manufacturer_pn, "12345");
        assert_eq!(draft.quantity, 10);
        assert!(draft.location.is_empty());
        assert_eq!(draft.barcode.as_bytes(), LABEL);
    }

    #[test]
    fn test_draft_from_label_non_numeric_quantity() {
        let draft = draft_from_label(&Barcode::new(b"\x1d1PX\x1dQten\x1d".to_vec()));
        assert_eq!(draft.quantity, 0);
    }

    #[test]
    fn test_draft_from_vendor_mapping() {
        let product = VendorProduct {
            vendor_part_number: "296-1234-ND".into(),
            manufacturer_part_number: "LM358DR".into(),
            manufacturer_name: "Texas Instruments".into(),
            product_description: "IC OPAMP GP 2 CIRCUIT 8SOIC".into(),
            quantity: 10,
            sales_order_id: 55512345,
        };
        let draft = draft_from_vendor(&Barcode::new(LABEL.to_vec()), &product);

        assert_eq!(draft.supplier_pn, "296-1234-ND");
        assert_eq!(draft.category, "IC");
        assert_eq!(draft.comment, "Sales Order ID: 55512345");
        assert_eq!(draft.supplier, "Digi-Key");
        assert_eq!(draft.customer_ref, "PROJ-ABC");
        assert_eq!(draft.quantity, 10);
    }

    #[test]
    fn test_draft_from_vendor_drops_ref_equal_to_part_number() {
        let product = VendorProduct {
            vendor_part_number: "296-1234-ND".into(),
            ..Default::default()
        };
        let code = Barcode::new(b"\x1dP296-1234-ND\x1d1PLM358DR\x1d".to_vec());
        let draft = draft_from_vendor(&code, &product);
        assert_eq!(draft.customer_ref, "");
    }
}
