use std::collections::HashMap;

use crate::error::ParsingError;
use crate::model::{Discipline, ParsedElement};
use crate::parser::geometry::extract_geometry;
use crate::parser::properties::PropertyIndex;
use crate::parser::spatial::{element_containers, relating_and_related};
use crate::parser::step::{InstanceId, InstanceTable, Parameter, RawInstance};
use crate::parser::ParserOptions;

const PHYSICAL_ELEMENTS: &[&str] = &[
    // Building elements
    "IFCWALL",
    "IFCWALLSTANDARDCASE",
    "IFCCURTAINWALL",
    "IFCSLAB",
    "IFCROOF",
    "IFCBEAM",
    "IFCCOLUMN",
    "IFCMEMBER",
    "IFCPLATE",
    "IFCFOOTING",
    "IFCPILE",
    "IFCDOOR",
    "IFCWINDOW",
    "IFCSTAIR",
    "IFCSTAIRFLIGHT",
    "IFCRAILING",
    "IFCCHIMNEY",
    "IFCCOVERING",
    "IFCBUILDINGELEMENTPROXY",
    "IFCFURNISHINGELEMENT",
    "IFCFURNITURE",
    // Distribution elements
    "IFCDUCTSEGMENT",
    "IFCDUCTFITTING",
    "IFCPIPESEGMENT",
    "IFCPIPEFITTING",
    "IFCFLOWSEGMENT",
    "IFCFLOWFITTING",
    "IFCFLOWTERMINAL",
    "IFCAIRTERMINAL",
    "IFCSANITARYTERMINAL",
    "IFCCABLESEGMENT",
    "IFCCABLECARRIERSEGMENT",
    "IFCLIGHTFIXTURE",
    "IFCELECTRICAPPLIANCE",
    "IFCOUTLET",
    "IFCSWITCHINGDEVICE",
];

// First match wins, so overlapping keywords are ordered by priority.
const DISCIPLINE_KEYWORDS: &[(&str, Discipline)] = &[
    ("WALL", Discipline::Structural),
    ("SLAB", Discipline::Structural),
    ("COLUMN", Discipline::Structural),
    ("BEAM", Discipline::Structural),
    ("FOOTING", Discipline::Structural),
    ("PILE", Discipline::Structural),
    ("MEMBER", Discipline::Structural),
    ("PLATE", Discipline::Structural),
    ("DOOR", Discipline::Architectural),
    ("WINDOW", Discipline::Architectural),
    ("STAIR", Discipline::Architectural),
    ("RAILING", Discipline::Architectural),
    ("ROOF", Discipline::Architectural),
    ("COVERING", Discipline::Architectural),
    ("FURNISHING", Discipline::Architectural),
    ("FURNITURE", Discipline::Architectural),
    ("CHIMNEY", Discipline::Architectural),
    ("DUCT", Discipline::Mechanical),
    ("PIPE", Discipline::Mechanical),
    ("FLOW", Discipline::Mechanical),
    ("AIRTERMINAL", Discipline::Mechanical),
    ("SANITARY", Discipline::Mechanical),
    ("CABLE", Discipline::Electrical),
    ("LIGHT", Discipline::Electrical),
    ("ELECTRIC", Discipline::Electrical),
    ("OUTLET", Discipline::Electrical),
    ("SWITCHING", Discipline::Electrical),
];

/// Whether an entity type is a physical element worth extracting.
///
/// Relationship and property types never qualify.
#[must_use]
pub fn is_physical_element(type_name: &str) -> bool {
    !type_name.contains("REL")
        && !type_name.contains("PROPERTY")
        && PHYSICAL_ELEMENTS.contains(&type_name)
}

/// Discipline from the entity type name alone.
#[must_use]
pub fn discipline_for(type_name: &str) -> Discipline {
    DISCIPLINE_KEYWORDS
        .iter()
        .find(|(keyword, _)| type_name.contains(keyword))
        .map_or(Discipline::Architectural, |(_, discipline)| *discipline)
}

/// Extracts every physical element in ascending id order.
///
/// An element whose geometry cannot be resolved is reported and skipped;
/// the rest of the batch is unaffected.
#[must_use]
pub fn extract_elements(
    table: &InstanceTable,
    properties: &PropertyIndex,
    options: &ParserOptions,
) -> (Vec<ParsedElement>, Vec<ParsingError>) {
    let containers = element_containers(table);
    let types = extract_type_relationships(table);

    let mut elements = Vec::new();
    let mut errors = Vec::new();

    for instance in table.iter().filter(|i| is_physical_element(&i.type_name)) {
        match parse_element(table, instance, properties, options) {
            Ok(mut element) => {
                element.container = containers.get(&instance.id).copied();
                if let Some(type_object) = types.get(&instance.id).and_then(|id| table.get(*id)) {
                    element.type_object = type_object.name().map(str::to_string);
                    // Occurrence sets win over the ones inherited from the type.
                    let mut inherited = type_property_sets(type_object, properties);
                    inherited.extend_from_slice(properties.assigned_to(instance.id));
                    element.properties = properties.merged(&inherited);
                }
                elements.push(element);
            }
            Err(cause) => {
                tracing::warn!(id = %instance.id, %cause, "skipping element");
                errors.push(ParsingError::ElementExtractionFailed {
                    id: instance.id,
                    cause: Box::new(cause),
                });
            }
        }
    }

    (elements, errors)
}

fn parse_element(
    table: &InstanceTable,
    instance: &RawInstance,
    properties: &PropertyIndex,
    options: &ParserOptions,
) -> Result<ParsedElement, ParsingError> {
    let guid = instance
        .string_at(0)
        .map_or_else(|| instance.id.to_string(), str::to_string);

    let geometry = extract_geometry(
        table,
        instance,
        options.max_placement_depth,
        options.extract_shapes,
    )?;

    Ok(ParsedElement {
        id: instance.id,
        guid,
        type_name: instance.type_name.clone(),
        name: instance.name().unwrap_or("Unnamed").to_string(),
        discipline: discipline_for(&instance.type_name),
        geometry,
        properties: properties.properties_of(instance.id),
        container: None,
        type_object: None,
    })
}

/// Element id → type object id, from IFCRELDEFINESBYTYPE
/// (`RelatedObjects` at 4, `RelatingType` at 5).
fn extract_type_relationships(table: &InstanceTable) -> HashMap<InstanceId, InstanceId> {
    let mut element_types = HashMap::new();

    for rel in table.of_type("IFCRELDEFINESBYTYPE") {
        if let Some((type_id, instances)) = relating_and_related(rel, 5, 4) {
            for instance in instances {
                element_types.insert(instance, type_id);
            }
        }
    }

    element_types
}

/// Sets a type object carries itself (`HasPropertySets` at 5) followed by
/// the ones related to it.
fn type_property_sets(type_object: &RawInstance, properties: &PropertyIndex) -> Vec<InstanceId> {
    let mut set_ids = type_object
        .get(5)
        .map(Parameter::references)
        .unwrap_or_default();
    set_ids.extend_from_slice(properties.assigned_to(type_object.id));
    set_ids
}
