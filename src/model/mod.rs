pub mod element;
pub mod property;
pub mod result;
pub mod spatial;

pub use element::{Discipline, ElementGeometry, ParsedElement, Shape};
pub use property::{PropertySet, PropertyValue};
pub use result::{IfcHeader, ParsingResult};
pub use spatial::{SpatialElement, SpatialKind};
