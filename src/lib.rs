//! # IFC Reader
//!
//! A best-effort reader for IFC (STEP, ISO 10303-21) building models.
//!
//! ## Features
//!
//! - Decode `#id=TYPE(params);` instances into a typed, id-keyed table
//! - Rebuild the project → site → building → storey → space tree
//! - Extract physical elements with discipline, placement and a coarse shape
//! - Resolve property and quantity sets attached through relationships
//! - Keep going past malformed lines, reporting them next to the result
//! - Export to CSV and JSON
//!
//! ## Example
//!
//! ```no_run
//! use ifc_reader::parser::parse_ifc_file;
//!
//! let result = parse_ifc_file("model.ifc").expect("Failed to parse");
//! println!("Project: {}", result.project_name());
//! println!("Elements: {}", result.elements.len());
//! println!("Problems: {}", result.errors.len());
//! ```

pub mod error;
pub mod export;
pub mod model;
pub mod parser;
