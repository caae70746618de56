use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::parser::step::{InstanceId, Parameter};

/// A property value resolved to its underlying primitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Reference(InstanceId),
    List(Vec<PropertyValue>),
    Null,
}

impl PropertyValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&Parameter> for PropertyValue {
    fn from(param: &Parameter) -> Self {
        match param {
            Parameter::String(s) => PropertyValue::Text(s.clone()),
            Parameter::Integer(i) => PropertyValue::Integer(*i),
            Parameter::Real(f) => PropertyValue::Real(*f),
            Parameter::Boolean(b) => PropertyValue::Boolean(*b),
            Parameter::Reference(id) => PropertyValue::Reference(*id),
            // IFCLOGICAL(.U.) and enumerated values read as their bare keyword
            Parameter::Enumeration(e) => PropertyValue::Text(e.trim_matches('.').to_string()),
            Parameter::Typed { value, .. } => PropertyValue::from(value.as_ref()),
            Parameter::List(items) => PropertyValue::List(items.iter().map(Self::from).collect()),
            Parameter::Null | Parameter::Derived => PropertyValue::Null,
        }
    }
}

impl PartialEq<&str> for PropertyValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(s) => f.write_str(s),
            PropertyValue::Real(v) => write!(f, "{v:.2}"),
            PropertyValue::Integer(i) => write!(f, "{i}"),
            PropertyValue::Boolean(b) => f.write_str(if *b { "Yes" } else { "No" }),
            PropertyValue::Reference(id) => write!(f, "{id}"),
            PropertyValue::List(list) => {
                let parts: Vec<String> = list.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(", "))
            }
            PropertyValue::Null => f.write_str("-"),
        }
    }
}

/// A named bundle of properties or quantities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySet {
    pub id: InstanceId,
    pub name: String,
    pub properties: HashMap<String, PropertyValue>,
}
