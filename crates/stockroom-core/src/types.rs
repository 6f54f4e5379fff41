//! # Domain Types
//!
//! Core domain types used throughout the stockroom.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────┐              │
//! │  │   ComponentRecord    │        │    VendorProduct     │              │
//! │  │  ──────────────────  │        │  ──────────────────  │              │
//! │  │  barcode (PK bytes)  │◄───────│  vendor part number  │              │
//! │  │  name, part numbers  │ draft  │  mfg part number     │              │
//! │  │  location, quantity  │        │  description, qty    │              │
//! │  │  project, comment…   │        │  sales order id      │              │
//! │  └──────────────────────┘        └──────────────────────┘              │
//! │             ▲                                                           │
//! │             │ keyed by                                                  │
//! │  ┌──────────┴───────────┐                                              │
//! │  │       Barcode        │  raw decoded payload bytes, or a synthetic   │
//! │  │      Vec<u8>         │  7-digit ASCII id when nothing was scanned   │
//! │  └──────────────────────┘                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::SYNTHETIC_BARCODE_WIDTH;

// =============================================================================
// Barcode
// =============================================================================

/// Raw barcode payload, used as the record's primary key.
///
/// Payloads routinely contain control bytes (GS `0x1D`, RS `0x1E`, EOT
/// `0x04`), so the key is kept as bytes, never as a `String`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Barcode(Vec<u8>);

impl Barcode {
    /// Wraps raw payload bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Barcode(bytes.into())
    }

    /// Builds the synthetic id for serial `n`: zero-padded, 7 ASCII digits.
    ///
    /// ```rust
    /// use stockroom_core::Barcode;
    /// assert_eq!(Barcode::synthetic(42).as_bytes(), b"0000042");
    /// ```
    pub fn synthetic(serial: i64) -> Self {
        Barcode(format!("{:0width$}", serial, width = SYNTHETIC_BARCODE_WIDTH).into_bytes())
    }

    /// Parses the escaped form produced by `Display`.
    ///
    /// ## Accepted Escapes
    /// - `\xNN` - any byte as two hex digits
    /// - `\\` - a literal backslash
    /// - `<GS>`, `<RS>`, `<EOT>` - the data-matrix control bytes
    pub fn parse_escaped(input: &str) -> Result<Self, ValidationError> {
        let bytes = input.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] == b'\\' {
                match bytes.get(i + 1) {
                    Some(b'\\') => {
                        out.push(b'\\');
                        i += 2;
                    }
                    Some(b'x') | Some(b'X') => {
                        let hex = input.get(i + 2..i + 4).ok_or_else(|| bad_escape(i))?;
                        let byte = u8::from_str_radix(hex, 16).map_err(|_| bad_escape(i))?;
                        out.push(byte);
                        i += 4;
                    }
                    _ => return Err(bad_escape(i)),
                }
                continue;
            }

            if bytes[i] == b'<' {
                let placeholder = [("<GS>", 0x1d), ("<RS>", 0x1e), ("<EOT>", 0x04)]
                    .into_iter()
                    .find(|(tag, _)| bytes[i..].starts_with(tag.as_bytes()));
                if let Some((tag, byte)) = placeholder {
                    out.push(byte);
                    i += tag.len();
                    continue;
                }
            }

            out.push(bytes[i]);
            i += 1;
        }

        Ok(Barcode(out))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn bad_escape(offset: usize) -> ValidationError {
    ValidationError::InvalidFormat {
        field: "barcode".to_string(),
        reason: format!("bad escape sequence at byte {}", offset),
    }
}

impl From<Vec<u8>> for Barcode {
    fn from(bytes: Vec<u8>) -> Self {
        Barcode(bytes)
    }
}

impl From<&[u8]> for Barcode {
    fn from(bytes: &[u8]) -> Self {
        Barcode(bytes.to_vec())
    }
}

impl AsRef<[u8]> for Barcode {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Printable ASCII is shown as-is, everything else as `\xNN`.
impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            match b {
                b'\\' => f.write_str("\\\\")?,
                0x20..=0x7e => write!(f, "{}", b as char)?,
                _ => write!(f, "\\x{:02x}", b)?,
            }
        }
        Ok(())
    }
}

// =============================================================================
// Component Record
// =============================================================================

/// One row of the inventory: a bag of parts on a shelf.
///
/// ## Identity
/// `barcode` is the primary key. An empty barcode means "not scanned yet";
/// the store swaps it for a synthetic id on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ComponentRecord {
    pub barcode: Barcode,
    pub name: String,
    pub supplier_pn: String,
    pub manufacturer_pn: String,
    pub location: String,
    pub quantity: i64,
    pub category: String,
    pub description: String,
    pub supplier: String,
    pub manufacturer: String,
    pub used_by_project: String,
    pub customer_ref: String,
    pub comment: String,
}

impl ComponentRecord {
    /// Starts an empty record keyed by `barcode`.
    pub fn with_barcode(barcode: Barcode) -> Self {
        ComponentRecord {
            barcode,
            ..Default::default()
        }
    }

    /// Whether the record already has a key (scanned or synthetic).
    pub fn has_barcode(&self) -> bool {
        !self.barcode.is_empty()
    }

    /// Label shown in listings and scan reports.
    ///
    /// Manufacturer P/N, then supplier P/N, then name.
    pub fn display_name(&self) -> &str {
        [&self.manufacturer_pn, &self.supplier_pn, &self.name]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }
}

// =============================================================================
// Vendor Product
// =============================================================================

/// Product details returned by the vendor's 2D-barcode lookup.
///
/// Field names follow the vendor's JSON, so this deserializes straight
/// from the response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorProduct {
    #[serde(rename = "DigiKeyPartNumber", default)]
    pub vendor_part_number: String,

    #[serde(rename = "ManufacturerPartNumber", default)]
    pub manufacturer_part_number: String,

    #[serde(rename = "ManufacturerName", default)]
    pub manufacturer_name: String,

    #[serde(rename = "ProductDescription", default)]
    pub product_description: String,

    #[serde(rename = "Quantity", default)]
    pub quantity: i64,

    #[serde(rename = "SalesorderId", default)]
    pub sales_order_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_barcode_is_zero_padded() {
        assert_eq!(Barcode::synthetic(0).as_bytes(), b"0000000");
        assert_eq!(Barcode::synthetic(1234567).as_bytes(), b"1234567");
    }

    #[test]
    fn test_barcode_display_escapes_control_bytes() {
        let code = Barcode::new(b"[)>\x1e06\x1dP12\\".to_vec());
        assert_eq!(code.to_string(), "[)>\\x1e06\\x1dP12\\\\");
    }

    #[test]
    fn test_parse_escaped_inverts_display() {
        let code = Barcode::new(b"\x1dP296-ND\x1d1P12345\x04".to_vec());
        let parsed = Barcode::parse_escaped(&code.to_string()).unwrap();
        assert_eq!(parsed, code);
    }

    #[test]
    fn test_parse_escaped_placeholders() {
        let parsed = Barcode::parse_escaped("<GS>1PABC<GS>Q5<EOT>").unwrap();
        assert_eq!(parsed.as_bytes(), b"\x1d1PABC\x1dQ5\x04");
    }

    #[test]
    fn test_parse_escaped_rejects_bad_hex() {
        assert!(Barcode::parse_escaped("\\xZZ").is_err());
        assert!(Barcode::parse_escaped("trailing\\").is_err());
    }

    #[test]
    fn test_display_name_precedence() {
        let mut rec = ComponentRecord {
            name: "10k resistor".into(),
            ..Default::default()
        };
        assert_eq!(rec.display_name(), "10k resistor");

        rec.supplier_pn = "311-10KCRCT-ND".into();
        assert_eq!(rec.display_name(), "311-10KCRCT-ND");

        rec.manufacturer_pn = "RC0603FR-0710KL".into();
        assert_eq!(rec.display_name(), "RC0603FR-0710KL");
    }

    #[test]
    fn test_vendor_product_from_json() {
        let body = r#"{
            "DigiKeyPartNumber": "296-1234-ND",
            "ManufacturerPartNumber": "LM358DR",
            "ManufacturerName": "Texas Instruments",
            "ProductDescription": "IC OPAMP GP 2 CIRCUIT 8SOIC",
            "Quantity": 10,
            "SalesorderId": 55512345
        }"#;
        let product: VendorProduct = serde_json::from_str(body).unwrap();
        assert_eq!(product.vendor_part_number, "296-1234-ND");
        assert_eq!(product.quantity, 10);
        assert_eq!(product.sales_order_id, 55512345);
    }
}
