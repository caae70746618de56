use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use super::PropertyValue;
use crate::parser::step::InstanceId;

/// A physical building element read from the DATA section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedElement {
    pub id: InstanceId,
    pub guid: String,
    pub type_name: String,
    pub name: String,
    pub discipline: Discipline,
    pub geometry: Option<ElementGeometry>,
    pub properties: HashMap<String, PropertyValue>,
    /// Spatial element that contains this element, if any.
    pub container: Option<InstanceId>,
    /// Name of the type object this element is an occurrence of.
    pub type_object: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Discipline {
    Structural,
    Architectural,
    Mechanical,
    Electrical,
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Discipline::Structural => "Structural",
            Discipline::Architectural => "Architectural",
            Discipline::Mechanical => "Mechanical",
            Discipline::Electrical => "Electrical",
        };
        f.pad(name)
    }
}

/// World placement and a coarse shape of an element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementGeometry {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub scale: Vector3<f64>,
    pub shape: Shape,
}

/// Placeholder shape descriptor. Not an evaluated solid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    Box {
        width: f64,
        height: f64,
        depth: f64,
    },
    Cylinder {
        radius: f64,
        height: f64,
    },
    Mesh {
        vertices: Vec<Point3<f64>>,
        indices: Vec<u32>,
    },
}

impl Shape {
    #[must_use]
    pub fn unit_box() -> Self {
        Shape::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        }
    }
}
