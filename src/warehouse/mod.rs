pub mod bench;
pub mod db;
pub mod loader;
pub mod olap;
pub mod schema;

pub use db::{Warehouse, WarehouseConfig};
pub use loader::{load, replace, LoadError, LoadSummary};
pub use olap::{OlapQuery, OlapResult, Platform, QueryError};
pub use schema::{create_schema, drop_schema, table_counts, TableCounts};
