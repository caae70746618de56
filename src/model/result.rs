use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::{Discipline, ParsedElement, PropertySet, SpatialElement};
use crate::error::ParsingError;
use crate::parser::step::InstanceId;

/// Descriptive metadata from the HEADER section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IfcHeader {
    pub file_name: String,
    pub time_stamp: DateTime<Utc>,
    pub author: Vec<String>,
    pub organization: Vec<String>,
    pub preprocessor_version: String,
    pub originating_system: String,
    pub authorization: String,
    pub description: Vec<String>,
    pub implementation_level: String,
    pub schema_identifiers: Vec<String>,
}

impl Default for IfcHeader {
    fn default() -> Self {
        Self {
            file_name: String::new(),
            time_stamp: Utc::now(),
            author: Vec::new(),
            organization: Vec::new(),
            preprocessor_version: String::new(),
            originating_system: String::new(),
            authorization: String::new(),
            description: Vec::new(),
            implementation_level: String::new(),
            schema_identifiers: Vec::new(),
        }
    }
}

/// Everything read from one IFC file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsingResult {
    pub header: IfcHeader,
    pub elements: Vec<ParsedElement>,
    pub spatial_structure: SpatialElement,
    pub property_sets: HashMap<InstanceId, PropertySet>,
    /// Recoverable problems, in the order they were found.
    pub errors: Vec<ParsingError>,
}

impl ParsingResult {
    #[must_use]
    pub fn project_name(&self) -> &str {
        &self.spatial_structure.name
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        self.header
            .schema_identifiers
            .first()
            .map_or("", String::as_str)
    }

    #[must_use]
    pub fn element_by_guid(&self, guid: &str) -> Option<&ParsedElement> {
        self.elements.iter().find(|e| e.guid == guid)
    }

    #[must_use]
    pub fn discipline_counts(&self) -> BTreeMap<Discipline, usize> {
        let mut counts = BTreeMap::new();
        for element in &self.elements {
            *counts.entry(element.discipline).or_insert(0) += 1;
        }
        counts
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
