//! # Search Predicates
//!
//! Types for the two search flavours of the record store.
//!
//! ```text
//! basic:     keyword ──► LIKE '%kw%' on every field, OR-ed
//!
//! advanced:  [ (-,   Name,     "opamp") ,
//!              (And, Location, "B3")    ,
//!              (Or,  Category, "IC")    ]
//!            ──► name LIKE ? AND location LIKE ? OR category LIKE ?
//! ```
//!
//! Clauses combine left to right with normal SQL precedence (AND binds
//! tighter than OR). The conjunction on the first clause is ignored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

// =============================================================================
// Search Field
// =============================================================================

/// A searchable column of the component table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Name,
    SupplierPn,
    ManufacturerPn,
    Location,
    Quantity,
    Category,
    Description,
    Supplier,
    Manufacturer,
    UsedByProject,
    CustomerRef,
    Comment,
}

impl SearchField {
    /// Every searchable field, in display order.
    pub const ALL: [SearchField; 12] = [
        SearchField::Name,
        SearchField::SupplierPn,
        SearchField::ManufacturerPn,
        SearchField::Location,
        SearchField::Quantity,
        SearchField::Category,
        SearchField::Description,
        SearchField::Supplier,
        SearchField::Manufacturer,
        SearchField::UsedByProject,
        SearchField::CustomerRef,
        SearchField::Comment,
    ];

    /// Column name in the `components` table.
    ///
    /// Only these static names are ever spliced into SQL.
    pub const fn column(&self) -> &'static str {
        match self {
            SearchField::Name => "name",
            SearchField::SupplierPn => "supplier_pn",
            SearchField::ManufacturerPn => "manufacturer_pn",
            SearchField::Location => "location",
            SearchField::Quantity => "quantity",
            SearchField::Category => "category",
            SearchField::Description => "description",
            SearchField::Supplier => "supplier",
            SearchField::Manufacturer => "manufacturer",
            SearchField::UsedByProject => "used_by_project",
            SearchField::CustomerRef => "customer_ref",
            SearchField::Comment => "comment",
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for SearchField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', ' ', '/'], "_");
        match key.as_str() {
            "name" => Ok(SearchField::Name),
            "supplier_pn" | "supplier_p_n" | "spn" => Ok(SearchField::SupplierPn),
            "manufacturer_pn" | "manufacturer_p_n" | "mpn" => Ok(SearchField::ManufacturerPn),
            "location" => Ok(SearchField::Location),
            "quantity" | "qty" => Ok(SearchField::Quantity),
            "category" => Ok(SearchField::Category),
            "description" => Ok(SearchField::Description),
            "supplier" => Ok(SearchField::Supplier),
            "manufacturer" => Ok(SearchField::Manufacturer),
            "used_by_project" | "project" => Ok(SearchField::UsedByProject),
            "customer_ref" | "customer_reference" => Ok(SearchField::CustomerRef),
            "comment" => Ok(SearchField::Comment),
            other => Err(ValidationError::InvalidFormat {
                field: "search field".to_string(),
                reason: format!("unknown field '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Conjunction
// =============================================================================

/// How a clause joins the clauses before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub const fn sql(&self) -> &'static str {
        match self {
            Conjunction::And => " AND ",
            Conjunction::Or => " OR ",
        }
    }
}

impl FromStr for Conjunction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "and" | "&" => Ok(Conjunction::And),
            "or" | "|" => Ok(Conjunction::Or),
            other => Err(ValidationError::InvalidFormat {
                field: "conjunction".to_string(),
                reason: format!("expected 'and' or 'or', got '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Search Query
// =============================================================================

/// One `(conjunction, field, keyword)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchClause {
    pub conjunction: Conjunction,
    pub field: SearchField,
    pub keyword: String,
}

/// An ordered list of clauses for the advanced search.
///
/// ## Example
/// ```rust
/// use stockroom_core::{SearchField, SearchQuery};
///
/// let query = SearchQuery::new()
///     .with(SearchField::Name, "opamp")
///     .and(SearchField::Location, "")      // dropped: empty keyword
///     .or(SearchField::Category, "IC");
///
/// assert_eq!(query.clauses().count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    clauses: Vec<SearchClause>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the first clause (its conjunction is irrelevant).
    pub fn with(self, field: SearchField, keyword: impl Into<String>) -> Self {
        self.push(Conjunction::And, field, keyword)
    }

    pub fn and(self, field: SearchField, keyword: impl Into<String>) -> Self {
        self.push(Conjunction::And, field, keyword)
    }

    pub fn or(self, field: SearchField, keyword: impl Into<String>) -> Self {
        self.push(Conjunction::Or, field, keyword)
    }

    pub fn push(mut self, conjunction: Conjunction, field: SearchField, keyword: impl Into<String>) -> Self {
        self.clauses.push(SearchClause {
            conjunction,
            field,
            keyword: keyword.into(),
        });
        self
    }

    /// Clauses with a non-blank keyword, in order.
    pub fn clauses(&self) -> impl Iterator<Item = &SearchClause> {
        self.clauses.iter().filter(|c| !c.keyword.trim().is_empty())
    }

    /// True when no clause would reach the database.
    pub fn is_empty(&self) -> bool {
        self.clauses().next().is_none()
    }
}

impl FromIterator<SearchClause> for SearchQuery {
    fn from_iter<I: IntoIterator<Item = SearchClause>>(iter: I) -> Self {
        SearchQuery {
            clauses: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// LIKE Escaping
// =============================================================================

/// Escape character used with `LIKE ... ESCAPE '\'`.
pub const LIKE_ESCAPE: char = '\\';

/// Wraps a keyword as a contains-pattern, escaping `%`, `_` and `\`.
///
/// ```rust
/// use stockroom_core::search::like_pattern;
/// assert_eq!(like_pattern("10%"), "%10\\%%");
/// ```
pub fn like_pattern(keyword: &str) -> String {
    let mut out = String::with_capacity(keyword.len() + 2);
    out.push('%');
    for c in keyword.trim().chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_parsing() {
        assert_eq!("mpn".parse::<SearchField>().unwrap(), SearchField::ManufacturerPn);
        assert_eq!("Used by Project".parse::<SearchField>().unwrap(), SearchField::UsedByProject);
        assert_eq!("supplier-pn".parse::<SearchField>().unwrap(), SearchField::SupplierPn);
        assert!("price".parse::<SearchField>().is_err());
    }

    #[test]
    fn test_every_field_round_trips_through_column() {
        for field in SearchField::ALL {
            assert_eq!(field.column().parse::<SearchField>().unwrap(), field);
        }
    }

    #[test]
    fn test_conjunction_parsing() {
        assert_eq!("OR".parse::<Conjunction>().unwrap(), Conjunction::Or);
        assert!("xor".parse::<Conjunction>().is_err());
    }

    #[test]
    fn test_blank_keywords_are_dropped() {
        let query = SearchQuery::new()
            .with(SearchField::Name, "   ")
            .and(SearchField::Location, "");
        assert!(query.is_empty());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\tmp"), "%c:\\\\tmp%");
        assert_eq!(like_pattern("  cap "), "%cap%");
    }
}
