use serde::Serialize;

use crate::parser::step::InstanceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SpatialKind {
    Project,
    Site,
    Building,
    Storey,
    Space,
}

impl SpatialKind {
    #[must_use]
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        match type_name {
            "IFCPROJECT" => Some(SpatialKind::Project),
            "IFCSITE" => Some(SpatialKind::Site),
            "IFCBUILDING" => Some(SpatialKind::Building),
            "IFCBUILDINGSTOREY" => Some(SpatialKind::Storey),
            "IFCSPACE" => Some(SpatialKind::Space),
            _ => None,
        }
    }
}

/// A node of the project → site → building → storey → space tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpatialElement {
    pub id: InstanceId,
    pub kind: SpatialKind,
    pub name: String,
    /// Storey elevation, when the file records one.
    pub elevation: Option<f64>,
    pub children: Vec<SpatialElement>,
    /// Building elements placed directly in this spatial element.
    pub contained_elements: Vec<InstanceId>,
}

impl SpatialElement {
    /// Number of levels in the tree rooted here; a leaf has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(SpatialElement::depth)
            .max()
            .unwrap_or(0)
    }

    /// Pre-order walk over this node and all descendants.
    #[must_use]
    pub fn nodes(&self) -> Vec<&SpatialElement> {
        let mut nodes = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            nodes.push(node);
            stack.extend(node.children.iter().rev());
        }
        nodes
    }

    #[must_use]
    pub fn find(&self, id: InstanceId) -> Option<&SpatialElement> {
        self.nodes().into_iter().find(|node| node.id == id)
    }
}
