pub mod elements;
pub mod geometry;
pub mod header;
pub mod ifc;
pub mod properties;
pub mod spatial;
pub mod step;

pub use crate::error::{ParseError, ParsingError};
pub use ifc::{parse_ifc_file, parse_ifc_str, IfcParser, ParserOptions};
pub use step::{InstanceId, InstanceTable, Parameter, RawInstance};
