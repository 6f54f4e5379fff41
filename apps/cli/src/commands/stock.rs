//! Checkout and check-in of parts against a stored record.

use stockroom_core::Barcode;

use super::record::RecordDto;
use crate::error::CliResult;
use crate::state::AppContext;

/// Takes parts out of stock. A blank `project` keeps the current one.
pub async fn checkout(ctx: &AppContext, barcode: &Barcode, quantity: i64, project: &str) -> CliResult<RecordDto> {
    let record = ctx.db().components().checkout(barcode, quantity, project).await?;
    Ok(record.into())
}

pub async fn checkin(ctx: &AppContext, barcode: &Barcode, quantity: i64) -> CliResult<RecordDto> {
    let record = ctx.db().components().checkin(barcode, quantity).await?;
    Ok(record.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::record::{add, FieldArgs};
    use crate::commands::resolve::DecodeMode;
    use crate::error::ErrorCode;
    use crate::state::testing::test_context;

    async fn stocked(ctx: &AppContext, qty: i64) -> Barcode {
        let fields = FieldArgs {
            name: Some("2N3904".into()),
            location: Some("Bin 7".into()),
            quantity: Some(qty),
            ..Default::default()
        };
        let added = add(ctx, None, &fields).await.unwrap();
        Barcode::parse_escaped(&added.barcode).unwrap()
    }

    #[tokio::test]
    async fn test_checkout_then_checkin() {
        let ctx = test_context(DecodeMode::Local).await;
        let code = stocked(&ctx, 20).await;

        let out = checkout(&ctx, &code, 5, "robot arm").await.unwrap();
        assert_eq!(out.quantity, 15);
        assert_eq!(out.used_by_project, "robot arm");

        let back = checkin(&ctx, &code, 3).await.unwrap();
        assert_eq!(back.quantity, 18);
        assert_eq!(back.used_by_project, "robot arm");
    }

    #[tokio::test]
    async fn test_checkout_beyond_stock_rejected() {
        let ctx = test_context(DecodeMode::Local).await;
        let code = stocked(&ctx, 2).await;

        let err = checkout(&ctx, &code, 3, "").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let err = checkout(&ctx, &code, 0, "").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_checkin_overflow_keeps_record_readable() {
        let ctx = test_context(DecodeMode::Local).await;
        let code = stocked(&ctx, i64::MAX).await;

        let err = checkin(&ctx, &code, 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("overflow"));

        let out = checkout(&ctx, &code, 1, "").await.unwrap();
        assert_eq!(out.quantity, i64::MAX - 1);
    }

    #[tokio::test]
    async fn test_unknown_barcode() {
        let ctx = test_context(DecodeMode::Local).await;
        let err = checkin(&ctx, &Barcode::new(b"nope".to_vec()), 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
