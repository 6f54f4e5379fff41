//! # Search Commands
//!
//! Basic keyword search, predicate search and the recent-records list.
//!
//! Predicate search takes its clauses as plain words:
//! ```text
//! stockroom adv-search location "drawer b" and qty 10 or project robot
//! ```

use stockroom_core::{Conjunction, SearchField, SearchQuery, ValidationError};

use super::record::RecordDto;
use crate::error::CliResult;
use crate::state::AppContext;

/// Every field containing `keyword`. A blank keyword lists everything.
pub async fn search(ctx: &AppContext, keyword: &str) -> CliResult<Vec<RecordDto>> {
    let records = ctx.db().components().search(keyword.trim()).await?;
    Ok(records.into_iter().map(RecordDto::from).collect())
}

pub async fn advanced_search(ctx: &AppContext, terms: &[String]) -> CliResult<Vec<RecordDto>> {
    let query = parse_query(terms)?;
    let records = ctx.db().components().advanced_search(&query).await?;
    Ok(records.into_iter().map(RecordDto::from).collect())
}

pub async fn recent(ctx: &AppContext, limit: u32) -> CliResult<Vec<RecordDto>> {
    let records = ctx.db().components().recent(limit).await?;
    Ok(records.into_iter().map(RecordDto::from).collect())
}

/// Parses `FIELD KEYWORD [(and|or) FIELD KEYWORD]...`.
pub fn parse_query(terms: &[String]) -> Result<SearchQuery, ValidationError> {
    let malformed = |reason: &str| ValidationError::InvalidFormat {
        field: "query".to_string(),
        reason: reason.to_string(),
    };

    let (first, rest) = match terms {
        [field, keyword, rest @ ..] => ((field, keyword), rest),
        _ => return Err(malformed("expected FIELD KEYWORD")),
    };

    let mut query = SearchQuery::new().with(first.0.parse::<SearchField>()?, first.1.as_str());

    for chunk in rest.chunks(3) {
        let [conjunction, field, keyword] = chunk else {
            return Err(malformed("each extra clause needs 'and|or FIELD KEYWORD'"));
        };
        query = query.push(
            conjunction.parse::<Conjunction>()?,
            field.parse::<SearchField>()?,
            keyword.as_str(),
        );
    }

    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::record::{add, FieldArgs};
    use crate::commands::resolve::DecodeMode;
    use crate::state::testing::test_context;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_parse_query_clauses() {
        let query = parse_query(&words("location drawer and qty 10 or project robot")).unwrap();
        let clauses: Vec<_> = query.clauses().collect();
        assert_eq!(clauses.len(), 3);
        assert_eq!(clauses[0].field, SearchField::Location);
        assert_eq!(clauses[1].conjunction, Conjunction::And);
        assert_eq!(clauses[1].field, SearchField::Quantity);
        assert_eq!(clauses[2].conjunction, Conjunction::Or);
        assert_eq!(clauses[2].keyword, "robot");
    }

    #[test]
    fn test_parse_query_rejects_malformed() {
        assert!(parse_query(&words("location")).is_err());
        assert!(parse_query(&words("colour red")).is_err());
        assert!(parse_query(&words("name a xor name b")).is_err());
        assert!(parse_query(&words("name a and name")).is_err());
    }

    async fn seeded() -> AppContext {
        let ctx = test_context(DecodeMode::Local).await;
        for (name, location, qty) in [
            ("10k resistor", "Drawer A1", 100),
            ("100nF cap", "Drawer A2", 10),
            ("LM358 op-amp", "Shelf 3", 10),
        ] {
            let fields = FieldArgs {
                name: Some(name.into()),
                location: Some(location.into()),
                quantity: Some(qty),
                ..Default::default()
            };
            add(&ctx, None, &fields).await.unwrap();
        }
        ctx
    }

    #[tokio::test]
    async fn test_basic_search_and_blank_keyword() {
        let ctx = seeded().await;

        let hits = search(&ctx, "drawer").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(search(&ctx, "  ").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_advanced_search_combines_clauses() {
        let ctx = seeded().await;

        let hits = advanced_search(&ctx, &words("location drawer and name cap or location shelf")).await.unwrap();
        let names: Vec<_> = hits.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["100nF cap", "LM358 op-amp"]);
    }

    #[tokio::test]
    async fn test_recent_newest_first() {
        let ctx = seeded().await;

        let list = recent(&ctx, 2).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "LM358 op-amp");
        assert_eq!(list[1].name, "100nF cap");
    }
}
