use std::collections::{HashMap, HashSet};

use crate::error::ParsingError;
use crate::model::{SpatialElement, SpatialKind};
use crate::parser::step::{InstanceId, InstanceTable, Parameter, RawInstance};

/// Builds the spatial tree rooted at the project instance.
///
/// Children follow IFCRELAGGREGATES in relationship id order, then in the
/// order of each relationship's related-objects list. Recursion stops at
/// `max_depth` levels and never revisits a node, so cyclic aggregation data
/// truncates instead of looping.
///
/// # Errors
///
/// Returns [`ParsingError::MissingProject`] if no IFCPROJECT exists.
pub fn build_spatial_hierarchy(
    table: &InstanceTable,
    max_depth: usize,
) -> Result<SpatialElement, ParsingError> {
    let mut projects = table.of_type("IFCPROJECT");
    let project = projects.next().ok_or(ParsingError::MissingProject)?;
    let extra = projects.count();
    if extra > 0 {
        tracing::warn!(root = %project.id, extra, "several IFCPROJECT instances, using the first");
    }

    let builder = HierarchyBuilder {
        table,
        aggregates: aggregation_index(table),
        containment: containment_index(table),
        max_depth,
    };
    let mut visited = HashSet::from([project.id]);
    let root = builder.build_node(project, SpatialKind::Project, 1, &mut visited);

    tracing::debug!(
        nodes = root.nodes().len(),
        depth = root.depth(),
        "built spatial hierarchy"
    );
    Ok(root)
}

struct HierarchyBuilder<'a> {
    table: &'a InstanceTable,
    aggregates: HashMap<InstanceId, Vec<InstanceId>>,
    containment: HashMap<InstanceId, Vec<InstanceId>>,
    max_depth: usize,
}

impl HierarchyBuilder<'_> {
    fn build_node(
        &self,
        instance: &RawInstance,
        kind: SpatialKind,
        depth: usize,
        visited: &mut HashSet<InstanceId>,
    ) -> SpatialElement {
        let mut node = SpatialElement {
            id: instance.id,
            kind,
            name: instance.name().unwrap_or("Unnamed").to_string(),
            elevation: (kind == SpatialKind::Storey)
                .then(|| instance.real_at(9))
                .flatten(),
            children: Vec::new(),
            contained_elements: self
                .containment
                .get(&instance.id)
                .cloned()
                .unwrap_or_default(),
        };

        let Some(child_ids) = self.aggregates.get(&instance.id) else {
            return node;
        };
        if depth >= self.max_depth {
            tracing::warn!(id = %instance.id, depth, "spatial hierarchy too deep, truncating");
            return node;
        }

        for &child_id in child_ids {
            let Some(child) = self.table.get(child_id) else {
                tracing::debug!(id = %child_id, "aggregated object does not exist");
                continue;
            };
            let Some(child_kind) = SpatialKind::from_type_name(&child.type_name) else {
                continue;
            };
            if !visited.insert(child_id) {
                tracing::warn!(id = %child_id, "spatial element aggregated twice, skipping");
                continue;
            }
            node.children
                .push(self.build_node(child, child_kind, depth + 1, visited));
        }

        node
    }
}

/// Relating → related ids of a relationship such as IFCRELAGGREGATES
/// (`RelatingObject` at 4, `RelatedObjects` at 5).
///
/// Falls back to the last reference and the last list when a producer does
/// not follow the usual attribute positions.
pub(crate) fn relating_and_related(
    rel: &RawInstance,
    relating_index: usize,
    related_index: usize,
) -> Option<(InstanceId, Vec<InstanceId>)> {
    let relating = rel.reference_at(relating_index).or_else(|| {
        rel.parameters
            .iter()
            .rev()
            .find_map(Parameter::as_reference)
    })?;
    let related = match rel.get(related_index) {
        Some(list @ Parameter::List(_)) => list.references(),
        _ => rel
            .parameters
            .iter()
            .rev()
            .find(|p| p.as_list().is_some())
            .map(Parameter::references)
            .unwrap_or_default(),
    };
    Some((relating, related))
}

fn aggregation_index(table: &InstanceTable) -> HashMap<InstanceId, Vec<InstanceId>> {
    let mut index: HashMap<InstanceId, Vec<InstanceId>> = HashMap::new();
    for rel in table.of_type("IFCRELAGGREGATES") {
        if let Some((parent, children)) = relating_and_related(rel, 4, 5) {
            index.entry(parent).or_default().extend(children);
        }
    }
    index
}

/// Spatial element id → ids of the elements it contains, from
/// IFCRELCONTAINEDINSPATIALSTRUCTURE (`RelatedElements` at 4,
/// `RelatingStructure` at 5).
pub(crate) fn containment_index(table: &InstanceTable) -> HashMap<InstanceId, Vec<InstanceId>> {
    let mut index: HashMap<InstanceId, Vec<InstanceId>> = HashMap::new();
    for rel in table.of_type("IFCRELCONTAINEDINSPATIALSTRUCTURE") {
        if let Some((structure, elements)) = relating_and_related(rel, 5, 4) {
            index.entry(structure).or_default().extend(elements);
        }
    }
    index
}

/// Element id → id of its containing spatial element.
///
/// An element listed by several relationships keeps the one with the
/// lowest relationship id.
pub(crate) fn element_containers(table: &InstanceTable) -> HashMap<InstanceId, InstanceId> {
    let mut containers = HashMap::new();
    for rel in table.of_type("IFCRELCONTAINEDINSPATIALSTRUCTURE") {
        let Some((structure, elements)) = relating_and_related(rel, 5, 4) else {
            continue;
        };
        for element in elements {
            if let Some(&kept) = containers.get(&element) {
                if kept != structure {
                    tracing::warn!(id = %element, %kept, ignored = %structure, "element contained twice");
                }
                continue;
            }
            containers.insert(element, structure);
        }
    }
    containers
}
