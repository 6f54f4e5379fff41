//! # Record Commands
//!
//! Manual entry, edit, show and delete of component records.
//!
//! ## Save Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  fields ──► validate_record (location, identity, quantity ≥ 0)          │
//! │                 │                                                       │
//! │                 ▼                                                       │
//! │        barcode given? ──no──► add (synthetic 0000042, same transaction) │
//! │                 │                                                       │
//! │                yes ──► stored? ──yes──► update                          │
//! │                           │                                             │
//! │                           no ───► add                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use clap::Args;
use serde::{Deserialize, Serialize};
use stockroom_core::validation::validate_record;
use stockroom_core::{Barcode, ComponentRecord};
use stockroom_db::SaveOutcome;
use tracing::info;

use crate::error::{CliError, CliResult};
use crate::state::AppContext;

/// Record as shown to the user.
///
/// The barcode is rendered in its escaped form (`\x1d` for the group
/// separator) so it can be pasted back into any command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDto {
    pub barcode: String,
    /// Manufacturer P/N, supplier P/N or name, whichever is set first.
    pub label: String,
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

impl From<ComponentRecord> for RecordDto {
    fn from(r: ComponentRecord) -> Self {
        let label = r.display_name().to_string();
        RecordDto {
            barcode: r.barcode.to_string(),
            label,
            name: r.name,
            supplier_pn: r.supplier_pn,
            manufacturer_pn: r.manufacturer_pn,
            location: r.location,
            quantity: r.quantity,
            category: r.category,
            description: r.description,
            supplier: r.supplier,
            manufacturer: r.manufacturer,
            used_by_project: r.used_by_project,
            customer_ref: r.customer_ref,
            comment: r.comment,
        }
    }
}

/// Editable record fields. Unset flags leave the field untouched.
#[derive(Debug, Clone, Default, Args)]
pub struct FieldArgs {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long = "supplier-pn")]
    pub supplier_pn: Option<String>,

    #[arg(long = "mfg-pn")]
    pub manufacturer_pn: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long = "qty", allow_negative_numbers = true)]
    pub quantity: Option<i64>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub supplier: Option<String>,

    #[arg(long)]
    pub manufacturer: Option<String>,

    #[arg(long)]
    pub project: Option<String>,

    #[arg(long = "customer-ref")]
    pub customer_ref: Option<String>,

    #[arg(long)]
    pub comment: Option<String>,
}

impl FieldArgs {
    pub fn apply(&self, record: &mut ComponentRecord) {
        fn set(target: &mut String, value: &Option<String>) {
            if let Some(v) = value {
                *target = v.trim().to_string();
            }
        }

        set(&mut record.name, &self.name);
        set(&mut record.supplier_pn, &self.supplier_pn);
        set(&mut record.manufacturer_pn, &self.manufacturer_pn);
        set(&mut record.location, &self.location);
        set(&mut record.category, &self.category);
        set(&mut record.description, &self.description);
        set(&mut record.supplier, &self.supplier);
        set(&mut record.manufacturer, &self.manufacturer);
        set(&mut record.used_by_project, &self.project);
        set(&mut record.customer_ref, &self.customer_ref);
        set(&mut record.comment, &self.comment);
        if let Some(q) = self.quantity {
            record.quantity = q;
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Adds a record. Without a barcode the store assigns a synthetic id.
pub async fn add(ctx: &AppContext, barcode: Option<Barcode>, fields: &FieldArgs) -> CliResult<RecordDto> {
    let scanned = barcode.is_some();
    let mut record = ComponentRecord::with_barcode(barcode.unwrap_or_default());
    fields.apply(&mut record);

    validate_record(&record, scanned)?;
    let stored = ctx.db().components().add(&record).await?;
    Ok(stored.into())
}

/// Validates and saves a record, updating it if its barcode is stored.
pub async fn save(ctx: &AppContext, record: &ComponentRecord, scanned: bool) -> CliResult<SaveOutcome> {
    validate_record(record, scanned)?;
    let outcome = ctx.db().components().save(record).await?;
    match &outcome {
        SaveOutcome::Added(r) => info!(barcode = %r.barcode, "Record added"),
        SaveOutcome::Updated(r) => info!(barcode = %r.barcode, "Record updated"),
    }
    Ok(outcome)
}

/// Changes the given fields of a stored record.
pub async fn edit(ctx: &AppContext, barcode: &Barcode, fields: &FieldArgs) -> CliResult<RecordDto> {
    let repo = ctx.db().components();
    let mut record = repo
        .get_by_barcode(barcode)
        .await?
        .ok_or_else(|| CliError::not_found("Component", &barcode.to_string()))?;

    fields.apply(&mut record);
    validate_record(&record, true)?;
    repo.update(&record).await?;
    Ok(record.into())
}

pub async fn show(ctx: &AppContext, barcode: &Barcode) -> CliResult<RecordDto> {
    ctx.db()
        .components()
        .get_by_barcode(barcode)
        .await?
        .map(RecordDto::from)
        .ok_or_else(|| CliError::not_found("Component", &barcode.to_string()))
}

/// Deletes a record; `confirmed` must be set explicitly.
pub async fn delete(ctx: &AppContext, barcode: &Barcode, confirmed: bool) -> CliResult<()> {
    if !confirmed {
        return Err(CliError::validation(format!(
            "Refusing to delete {} without --yes",
            barcode
        )));
    }

    if !ctx.db().components().delete(barcode).await? {
        return Err(CliError::not_found("Component", &barcode.to_string()));
    }
    info!(barcode = %barcode, "Record deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::resolve::DecodeMode;
    use crate::error::ErrorCode;
    use crate::state::testing::test_context;

    fn fields(name: &str, location: &str, qty: i64) -> FieldArgs {
        FieldArgs {
            name: Some(name.into()),
            location: Some(location.into()),
            quantity: Some(qty),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_manual_add_gets_synthetic_ids() {
        let ctx = test_context(DecodeMode::Local).await;

        let first = add(&ctx, None, &fields("10k resistor", "Drawer A1", 100)).await.unwrap();
        let second = add(&ctx, None, &fields("1uF cap", "Drawer A2", 50)).await.unwrap();
        assert_eq!(first.barcode, "0000000");
        assert_eq!(second.barcode, "0000001");
    }

    #[tokio::test]
    async fn test_add_requires_location_and_identity() {
        let ctx = test_context(DecodeMode::Local).await;

        let err = add(&ctx, None, &fields("thing", " ", 1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let no_identity = FieldArgs {
            location: Some("Shelf".into()),
            ..Default::default()
        };
        let err = add(&ctx, None, &no_identity).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(ctx.db().components().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_scanned_add_is_rejected() {
        let ctx = test_context(DecodeMode::Local).await;
        let code = Barcode::new(b"\x1dP1\x1d1PX".to_vec());

        add(&ctx, Some(code.clone()), &fields("a", "B1", 1)).await.unwrap();
        let err = add(&ctx, Some(code), &fields("b", "B2", 2)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Duplicate);
    }

    #[tokio::test]
    async fn test_edit_changes_only_given_fields() {
        let ctx = test_context(DecodeMode::Local).await;
        let added = add(&ctx, None, &fields("LM358", "Drawer B3", 10)).await.unwrap();
        let code = Barcode::parse_escaped(&added.barcode).unwrap();

        let change = FieldArgs {
            location: Some("Drawer C1".into()),
            ..Default::default()
        };
        let edited = edit(&ctx, &code, &change).await.unwrap();
        assert_eq!(edited.location, "Drawer C1");
        assert_eq!(edited.name, "LM358");
        assert_eq!(edited.quantity, 10);

        let negative = FieldArgs {
            quantity: Some(-1),
            ..Default::default()
        };
        assert_eq!(
            edit(&ctx, &code, &negative).await.unwrap_err().code,
            ErrorCode::ValidationError
        );
    }

    #[tokio::test]
    async fn test_save_updates_existing_scan() {
        let ctx = test_context(DecodeMode::Local).await;
        let code = Barcode::new(b"\x1dP77\x1dQ5".to_vec());
        let mut record = ComponentRecord {
            name: "Header".into(),
            location: "Bin 4".into(),
            quantity: 5,
            ..ComponentRecord::with_barcode(code.clone())
        };

        assert!(matches!(save(&ctx, &record, true).await.unwrap(), SaveOutcome::Added(_)));
        record.quantity = 9;
        assert!(matches!(save(&ctx, &record, true).await.unwrap(), SaveOutcome::Updated(_)));
        assert_eq!(show(&ctx, &code).await.unwrap().quantity, 9);
    }

    #[tokio::test]
    async fn test_delete_needs_confirmation() {
        let ctx = test_context(DecodeMode::Local).await;
        let added = add(&ctx, None, &fields("LED", "Bin 1", 3)).await.unwrap();
        let code = Barcode::parse_escaped(&added.barcode).unwrap();

        assert_eq!(delete(&ctx, &code, false).await.unwrap_err().code, ErrorCode::ValidationError);
        delete(&ctx, &code, true).await.unwrap();
        assert_eq!(delete(&ctx, &code, true).await.unwrap_err().code, ErrorCode::NotFound);
        assert_eq!(show(&ctx, &code).await.unwrap_err().code, ErrorCode::NotFound);
    }

    #[test]
    fn test_dto_escapes_barcode() {
        let dto = RecordDto::from(ComponentRecord {
            supplier_pn: "296-1-ND".into(),
            ..ComponentRecord::with_barcode(Barcode::new(b"\x1dP1".to_vec()))
        });
        assert_eq!(dto.barcode, "\\x1dP1");
        assert_eq!(dto.label, "296-1-ND");
    }
}
