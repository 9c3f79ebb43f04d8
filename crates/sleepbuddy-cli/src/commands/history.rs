use sleepbuddy_core::storage::Database;
use sleepbuddy_core::SessionHistory;

use super::{print_json, CliResult};

pub fn run(limit: usize) -> CliResult {
    let db = Database::open()?;
    print_json(&db.recent(limit)?)
}
