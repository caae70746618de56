use std::collections::HashMap;

use crate::model::{PropertySet, PropertyValue};
use crate::parser::spatial::relating_and_related;
use crate::parser::step::{InstanceId, InstanceTable, Parameter, RawInstance};

/// Property and quantity sets of a file, and which objects they describe.
#[derive(Debug, Default)]
pub struct PropertyIndex {
    pub sets: HashMap<InstanceId, PropertySet>,
    /// Object id → set ids, in relationship id order.
    assignments: HashMap<InstanceId, Vec<InstanceId>>,
}

impl PropertyIndex {
    /// Reads every property set, then links them to objects through
    /// IFCRELDEFINESBYPROPERTIES.
    #[must_use]
    pub fn build(table: &InstanceTable) -> Self {
        let sets = extract_property_sets(table);
        let mut assignments: HashMap<InstanceId, Vec<InstanceId>> = HashMap::new();

        for rel in table.of_type("IFCRELDEFINESBYPROPERTIES") {
            // RelatedObjects at 4, RelatingPropertyDefinition at 5 (a set in IFC4)
            let (related, definitions) = match rel.get(5) {
                Some(list @ Parameter::List(_)) => (
                    rel.get(4).map(Parameter::references).unwrap_or_default(),
                    list.references(),
                ),
                _ => match relating_and_related(rel, 5, 4) {
                    Some((definition, related)) => (related, vec![definition]),
                    None => continue,
                },
            };

            let definitions: Vec<InstanceId> = definitions
                .into_iter()
                .filter(|id| sets.contains_key(id))
                .collect();
            for object in related {
                assignments
                    .entry(object)
                    .or_default()
                    .extend(definitions.iter().copied());
            }
        }

        tracing::debug!(
            sets = sets.len(),
            objects = assignments.len(),
            "indexed property sets"
        );
        Self { sets, assignments }
    }

    /// Set ids assigned to an object through relationships.
    #[must_use]
    pub fn assigned_to(&self, object: InstanceId) -> &[InstanceId] {
        self.assignments
            .get(&object)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Merges the named sets in order; later sets win on key collision.
    #[must_use]
    pub fn merged(&self, set_ids: &[InstanceId]) -> HashMap<String, PropertyValue> {
        let mut properties = HashMap::new();
        for set in set_ids.iter().filter_map(|id| self.sets.get(id)) {
            properties.extend(
                set.properties
                    .iter()
                    .map(|(name, value)| (name.clone(), value.clone())),
            );
        }
        properties
    }

    /// Name → value map of everything assigned to one object.
    #[must_use]
    pub fn properties_of(&self, object: InstanceId) -> HashMap<String, PropertyValue> {
        self.merged(self.assigned_to(object))
    }
}

/// Reads IFCPROPERTYSET and IFCELEMENTQUANTITY instances keyed by set id.
#[must_use]
pub fn extract_property_sets(table: &InstanceTable) -> HashMap<InstanceId, PropertySet> {
    let mut sets = HashMap::new();

    for set in table.iter() {
        // Name at 2; HasProperties at 4, Quantities at 5
        let members_index = match set.type_name.as_str() {
            "IFCPROPERTYSET" => 4,
            "IFCELEMENTQUANTITY" => 5,
            _ => continue,
        };
        let members = match set.get(members_index) {
            Some(list @ Parameter::List(_)) => list.references(),
            _ => set
                .parameters
                .iter()
                .rev()
                .find(|p| p.as_list().is_some())
                .map(Parameter::references)
                .unwrap_or_default(),
        };

        let mut properties = HashMap::new();
        for member_id in members {
            match table.get(member_id).and_then(read_property) {
                Some((name, value)) => {
                    properties.insert(name, value);
                }
                None => {
                    tracing::debug!(set = %set.id, member = %member_id, "skipping unreadable property");
                }
            }
        }

        sets.insert(
            set.id,
            PropertySet {
                id: set.id,
                name: set.name().unwrap_or("Unnamed").to_string(),
                properties,
            },
        );
    }

    sets
}

fn read_property(property: &RawInstance) -> Option<(String, PropertyValue)> {
    let name = property.string_at(0).filter(|name| !name.is_empty())?;
    let value = match property.type_name.as_str() {
        // Name, Description, NominalValue, Unit
        "IFCPROPERTYSINGLEVALUE" => property
            .get(2)
            .map_or(PropertyValue::Null, PropertyValue::from),
        // Name, Description, EnumerationValues / ListValues, ...
        "IFCPROPERTYENUMERATEDVALUE" | "IFCPROPERTYLISTVALUE" => match property.get(2) {
            Some(Parameter::List(values)) if values.len() == 1 => PropertyValue::from(&values[0]),
            Some(values) => PropertyValue::from(values),
            None => PropertyValue::Null,
        },
        // Name, Description, Unit, Value, ...
        t if t.starts_with("IFCQUANTITY") => property
            .get(3)
            .map_or(PropertyValue::Null, PropertyValue::from),
        _ => return None,
    };
    Some((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::step::decode_instances;
    use pretty_assertions::assert_eq;

    fn table(lines: &[&str]) -> InstanceTable {
        let numbered: Vec<(usize, &str)> = lines.iter().copied().enumerate().collect();
        let (table, errors) = decode_instances(&numbered);
        assert!(errors.is_empty(), "{errors:?}");
        table
    }

    #[test]
    fn resolves_properties_through_the_relationship() {
        let table = table(&[
            "#10=IFCWALL('w',$,'Wall',$,$,$,$,$);",
            "#50=IFCPROPERTYSET('ps',$,'Pset_WallCommon',$,(#51,#52,#53));",
            "#51=IFCPROPERTYSINGLEVALUE('FireRating',$,IFCLABEL('2HR'),$);",
            "#52=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.T.),$);",
            "#53=IFCPROPERTYSINGLEVALUE('ThermalTransmittance',$,IFCTHERMALTRANSMITTANCEMEASURE(0.24),$);",
            "#60=IFCRELDEFINESBYPROPERTIES('r',$,$,$,(#10),#50);",
        ]);
        let index = PropertyIndex::build(&table);
        let properties = index.properties_of(InstanceId(10));

        assert_eq!(properties["FireRating"], "2HR");
        assert_eq!(properties["IsExternal"], PropertyValue::Boolean(true));
        assert_eq!(properties["ThermalTransmittance"], PropertyValue::Real(0.24));
        assert_eq!(index.sets[&InstanceId(50)].name, "Pset_WallCommon");
    }

    #[test]
    fn later_sets_override_earlier_ones() {
        let table = table(&[
            "#50=IFCPROPERTYSET('a',$,'First',$,(#51));",
            "#51=IFCPROPERTYSINGLEVALUE('Status',$,IFCLABEL('New'),$);",
            "#52=IFCPROPERTYSET('b',$,'Second',$,(#53));",
            "#53=IFCPROPERTYSINGLEVALUE('Status',$,IFCLABEL('Existing'),$);",
            "#60=IFCRELDEFINESBYPROPERTIES('r1',$,$,$,(#10,#11),#50);",
            "#61=IFCRELDEFINESBYPROPERTIES('r2',$,$,$,(#10),#52);",
        ]);
        let index = PropertyIndex::build(&table);

        assert_eq!(index.properties_of(InstanceId(10))["Status"], "Existing");
        assert_eq!(index.properties_of(InstanceId(11))["Status"], "New");
        assert!(index.properties_of(InstanceId(12)).is_empty());
    }

    #[test]
    fn reads_quantities_and_multi_valued_properties() {
        let table = table(&[
            "#50=IFCELEMENTQUANTITY('q',$,'BaseQuantities',$,$,(#51,#52));",
            "#51=IFCQUANTITYLENGTH('Height',$,$,3.,$);",
            "#52=IFCQUANTITYCOUNT('Panels',$,$,4,$);",
            "#53=IFCPROPERTYSET('p',$,'Pset_Finish',$,(#54,#55));",
            "#54=IFCPROPERTYENUMERATEDVALUE('Finish',$,(IFCLABEL('Matte')),$);",
            "#55=IFCPROPERTYLISTVALUE('Colours',$,(IFCLABEL('Red'),IFCLABEL('Blue')),$);",
            "#60=IFCRELDEFINESBYPROPERTIES('r',$,$,$,(#10),(#50,#53));",
        ]);
        let properties = PropertyIndex::build(&table).properties_of(InstanceId(10));

        assert_eq!(properties["Height"], PropertyValue::Real(3.0));
        assert_eq!(properties["Panels"], PropertyValue::Integer(4));
        assert_eq!(properties["Finish"], "Matte");
        assert_eq!(
            properties["Colours"],
            PropertyValue::List(vec![
                PropertyValue::Text("Red".into()),
                PropertyValue::Text("Blue".into()),
            ])
        );
    }

    #[test]
    fn skips_nameless_and_unknown_properties() {
        let table = table(&[
            "#50=IFCPROPERTYSET('p',$,'Pset',$,(#51,#52,#99));",
            "#51=IFCPROPERTYSINGLEVALUE('',$,IFCLABEL('x'),$);",
            "#52=IFCCOMPLEXPROPERTY('Layers',$,'u',(#51));",
        ]);
        let sets = extract_property_sets(&table);
        assert!(sets[&InstanceId(50)].properties.is_empty());
    }
}
