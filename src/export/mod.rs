//! CSV and JSON output of a parsing result. Failures are
//! [`ExportError`](crate::error::ExportError)s.

pub mod csv;
pub mod json;

pub use csv::export_csv;
pub use json::export_json;
