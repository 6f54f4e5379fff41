//! # Repository Module
//!
//! ```text
//! db.components()                      db.settings()
//!   ├── add / update / save              ├── get / set
//!   ├── get_by_barcode / delete          └── next_serial (synthetic ids)
//!   ├── search / advanced_search
//!   ├── recent / count
//!   └── checkout / checkin
//! ```
//!
//! - [`ComponentRepository`](component::ComponentRepository) - the `components` table
//! - [`SettingsRepository`](settings::SettingsRepository) - the `db_config` table

pub mod component;
pub mod settings;
