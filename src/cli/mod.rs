//! `warehouse` subcommand implementations. Each takes a plain config struct so
//! the binary only parses flags and the commands stay testable.

pub mod bench;
pub mod clean;
pub mod counts;
pub mod etl;
pub mod load;

use std::path::Path;

use crate::warehouse::{Warehouse, WarehouseConfig};

/// Environment settings with an optional `--db` override applied.
pub fn warehouse_for(db: Option<&Path>) -> Warehouse {
    Warehouse::new(WarehouseConfig::from_env().with_path_override(db))
}
