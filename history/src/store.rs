mod csv;
mod json;
mod sqlite;

pub use csv::CsvStore;
pub use json::{JsonStore, TRIAL_FILES_DIR};
pub use sqlite::SqliteStore;
