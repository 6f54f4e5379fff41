//! # Component Repository
//!
//! Database operations for component records.
//!
//! ## Key Operations
//! - Add / update / save (add-or-update) keyed by barcode bytes
//! - Point lookup and delete
//! - Free-text search and predicate-list search (both capped)
//! - Transactional checkout / checkin
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  search("lm358")                                                        │
//! │    name LIKE '%lm358%' ESCAPE '\' OR supplier_pn LIKE … OR … comment    │
//! │                                                                         │
//! │  advanced_search([Name "opamp", And Location "B3", Or Category "IC"])   │
//! │    name LIKE ? AND location LIKE ? OR category LIKE ?                   │
//! │    (built with QueryBuilder; keywords always bound, never spliced)      │
//! │                                                                         │
//! │  both: LIMIT 200                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use stockroom_core::search::like_pattern;
use stockroom_core::stock;
use stockroom_core::{Barcode, ComponentRecord, CoreResult, SearchField, SearchQuery, SEARCH_LIMIT};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::settings::SettingsRepository;

const SELECT_COLUMNS: &str = r#"
    SELECT
        barcode, name, supplier_pn, manufacturer_pn, location, quantity,
        category, description, supplier, manufacturer, used_by_project,
        customer_ref, comment
    FROM components
"#;

/// Whether [`ComponentRepository::save`] inserted or updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Added(ComponentRecord),
    Updated(ComponentRecord),
}

impl SaveOutcome {
    pub fn record(&self) -> &ComponentRecord {
        match self {
            SaveOutcome::Added(r) | SaveOutcome::Updated(r) => r,
        }
    }
}

/// Repository for the `components` table.
#[derive(Debug, Clone)]
pub struct ComponentRepository {
    pool: SqlitePool,
}

impl ComponentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ComponentRepository { pool }
    }

    /// Inserts a new record.
    ///
    /// A record without a barcode gets the next synthetic id; the serial
    /// bump and the insert share one transaction.
    ///
    /// ## Returns
    /// * `Ok(ComponentRecord)` - the stored record, with its final barcode
    /// * `Err(DbError::UniqueViolation)` - barcode already stored
    pub async fn add(&self, record: &ComponentRecord) -> DbResult<ComponentRecord> {
        let mut tx = self.pool.begin().await?;
        let mut record = record.clone();

        if !record.has_barcode() {
            let serial = SettingsRepository::next_serial(&mut tx).await?;
            record.barcode = Barcode::synthetic(serial);
        }

        debug!(barcode = %record.barcode, "Inserting component");

        sqlx::query(
            r#"
            INSERT INTO components (
                barcode, name, supplier_pn, manufacturer_pn, location, quantity,
                category, description, supplier, manufacturer, used_by_project,
                customer_ref, comment
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(record.barcode.as_bytes())
        .bind(&record.name)
        .bind(&record.supplier_pn)
        .bind(&record.manufacturer_pn)
        .bind(&record.location)
        .bind(record.quantity)
        .bind(&record.category)
        .bind(&record.description)
        .bind(&record.supplier)
        .bind(&record.manufacturer)
        .bind(&record.used_by_project)
        .bind(&record.customer_ref)
        .bind(&record.comment)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("barcode", record.barcode.to_string()),
            other => other,
        })?;

        tx.commit().await?;

        info!(barcode = %record.barcode, "Component added");
        Ok(record)
    }

    /// Overwrites every field of the record with the same barcode.
    ///
    /// ## Returns
    /// * `Ok(())` - row updated
    /// * `Err(DbError::NotFound)` - no such barcode
    pub async fn update(&self, record: &ComponentRecord) -> DbResult<()> {
        debug!(barcode = %record.barcode, "Updating component");

        let result = sqlx::query(
            r#"
            UPDATE components SET
                name = ?2,
                supplier_pn = ?3,
                manufacturer_pn = ?4,
                location = ?5,
                quantity = ?6,
                category = ?7,
                description = ?8,
                supplier = ?9,
                manufacturer = ?10,
                used_by_project = ?11,
                customer_ref = ?12,
                comment = ?13
            WHERE barcode = ?1
            "#,
        )
        .bind(record.barcode.as_bytes())
        .bind(&record.name)
        .bind(&record.supplier_pn)
        .bind(&record.manufacturer_pn)
        .bind(&record.location)
        .bind(record.quantity)
        .bind(&record.category)
        .bind(&record.description)
        .bind(&record.supplier)
        .bind(&record.manufacturer)
        .bind(&record.used_by_project)
        .bind(&record.customer_ref)
        .bind(&record.comment)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Component", record.barcode.to_string()));
        }

        Ok(())
    }

    /// Updates when the barcode is already stored, inserts otherwise.
    pub async fn save(&self, record: &ComponentRecord) -> DbResult<SaveOutcome> {
        if record.has_barcode() && self.exists(&record.barcode).await? {
            self.update(record).await?;
            return Ok(SaveOutcome::Updated(record.clone()));
        }
        self.add(record).await.map(SaveOutcome::Added)
    }

    pub async fn get_by_barcode(&self, barcode: &Barcode) -> DbResult<Option<ComponentRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE barcode = ?1");
        let record = sqlx::query_as::<_, ComponentRecord>(&sql)
            .bind(barcode.as_bytes())
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    pub async fn exists(&self, barcode: &Barcode) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM components WHERE barcode = ?1")
            .bind(barcode.as_bytes())
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Deletes a record. Returns `false` when nothing matched.
    pub async fn delete(&self, barcode: &Barcode) -> DbResult<bool> {
        debug!(barcode = %barcode, "Deleting component");

        let result = sqlx::query("DELETE FROM components WHERE barcode = ?1")
            .bind(barcode.as_bytes())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Free-text search across every field, capped at [`SEARCH_LIMIT`].
    ///
    /// A blank keyword matches everything.
    pub async fn search(&self, keyword: &str) -> DbResult<Vec<ComponentRecord>> {
        debug!(keyword = %keyword, "Searching components");

        let pattern = like_pattern(keyword);
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        qb.push(" WHERE ");
        for (i, field) in SearchField::ALL.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            push_like(&mut qb, *field, pattern.clone());
        }
        qb.push(" ORDER BY rowid LIMIT ").push_bind(i64::from(SEARCH_LIMIT));

        let records = qb.build_query_as::<ComponentRecord>().fetch_all(&self.pool).await?;

        debug!(count = records.len(), "Search returned components");
        Ok(records)
    }

    /// Predicate-list search, capped at [`SEARCH_LIMIT`].
    ///
    /// Clauses with blank keywords are skipped; a query with no usable
    /// clause returns nothing.
    pub async fn advanced_search(&self, query: &SearchQuery) -> DbResult<Vec<ComponentRecord>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        qb.push(" WHERE ");
        for (i, clause) in query.clauses().enumerate() {
            if i > 0 {
                qb.push(clause.conjunction.sql());
            }
            push_like(&mut qb, clause.field, like_pattern(&clause.keyword));
        }
        qb.push(" ORDER BY rowid LIMIT ").push_bind(i64::from(SEARCH_LIMIT));

        debug!(sql = %qb.sql(), "Advanced search");

        let records = qb.build_query_as::<ComponentRecord>().fetch_all(&self.pool).await?;
        Ok(records)
    }

    /// Most recently added records first.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<ComponentRecord>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY rowid DESC LIMIT ?1");
        let records = sqlx::query_as::<_, ComponentRecord>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    /// Takes `quantity` parts out and records the project using them.
    ///
    /// The row is read, changed with [`stock::apply_checkout`] and written
    /// back in one transaction. An empty `project` keeps the current
    /// `used_by_project`.
    ///
    /// ## Returns
    /// * `Ok(ComponentRecord)` - record after the checkout
    /// * `Err(DbError::NotFound)` - no such barcode
    /// * `Err(DbError::Domain(InsufficientStock))` - not enough parts
    pub async fn checkout(&self, barcode: &Barcode, quantity: i64, project: &str) -> DbResult<ComponentRecord> {
        debug!(barcode = %barcode, quantity, project = %project, "Checking out");

        let record = self
            .move_stock(barcode, |record| stock::apply_checkout(record, quantity, project))
            .await?;

        info!(barcode = %barcode, remaining = record.quantity, "Checked out");
        Ok(record)
    }

    /// Returns `quantity` parts to stock.
    ///
    /// ## Returns
    /// * `Err(DbError::Domain(QuantityOverflow))` - the total would not fit
    pub async fn checkin(&self, barcode: &Barcode, quantity: i64) -> DbResult<ComponentRecord> {
        debug!(barcode = %barcode, quantity, "Checking in");

        let record = self
            .move_stock(barcode, |record| stock::apply_checkin(record, quantity))
            .await?;

        info!(barcode = %barcode, quantity = record.quantity, "Checked in");
        Ok(record)
    }

    /// Read-modify-write of one row's stock fields.
    ///
    /// The write is guarded on the quantity that was read, so a row changed
    /// by another connection in between is reported instead of overwritten.
    async fn move_stock<F>(&self, barcode: &Barcode, apply: F) -> DbResult<ComponentRecord>
    where
        F: FnOnce(&mut ComponentRecord) -> CoreResult<()>,
    {
        let mut tx = self.pool.begin().await?;

        let sql = format!("{SELECT_COLUMNS} WHERE barcode = ?1");
        let mut record = sqlx::query_as::<_, ComponentRecord>(&sql)
            .bind(barcode.as_bytes())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Component", barcode.to_string()))?;

        let previous = record.quantity;
        apply(&mut record)?;

        let result = sqlx::query(
            r#"
            UPDATE components SET quantity = ?2, used_by_project = ?3
            WHERE barcode = ?1 AND quantity = ?4
            "#,
        )
        .bind(barcode.as_bytes())
        .bind(record.quantity)
        .bind(&record.used_by_project)
        .bind(previous)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::TransactionFailed(format!(
                "stock of {} changed during the update",
                barcode
            )));
        }

        tx.commit().await?;
        Ok(record)
    }

    /// Counts stored records (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM components")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

fn push_like(qb: &mut QueryBuilder<'_, Sqlite>, field: SearchField, pattern: String) {
    qb.push(field.column())
        .push(" LIKE ")
        .push_bind(pattern)
        .push(" ESCAPE '\\'");
}

// =============================================================================
// Unit Tests
// =============================================================================
