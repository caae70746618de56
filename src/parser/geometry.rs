//! Placement resolution and placeholder shapes.
//!
//! Placements are composed as rigid transforms along the
//! `IFCLOCALPLACEMENT` chain. Shapes are only a coarse descriptor read from
//! the extrusion profile or a triangulated face set; nothing is evaluated.

use nalgebra::{Isometry3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

use crate::error::ParsingError;
use crate::model::{ElementGeometry, Shape};
use crate::parser::step::{InstanceId, InstanceTable, Parameter, RawInstance};

const EPSILON: f64 = 1e-9;

/// Resolves the geometry of an element.
///
/// Returns `Ok(None)` when the element has no placement reference.
pub fn extract_geometry(
    table: &InstanceTable,
    element: &RawInstance,
    max_placement_depth: usize,
    extract_shapes: bool,
) -> Result<Option<ElementGeometry>, ParsingError> {
    let Some(placement_id) = find_reference(table, element, |t| t.contains("PLACEMENT")) else {
        return Ok(None);
    };

    let transform = resolve_placement(table, placement_id, 0, max_placement_depth)?;
    let shape = if extract_shapes {
        extract_shape(table, element)
    } else {
        Shape::unit_box()
    };

    Ok(Some(ElementGeometry {
        position: transform.translation.vector,
        rotation: transform.rotation,
        scale: Vector3::new(1.0, 1.0, 1.0),
        shape,
    }))
}

/// First reference parameter whose target's type name matches.
fn find_reference(
    table: &InstanceTable,
    instance: &RawInstance,
    matches: impl Fn(&str) -> bool,
) -> Option<InstanceId> {
    instance
        .parameters
        .iter()
        .filter_map(Parameter::as_reference)
        .find(|id| table.get(*id).is_some_and(|target| matches(&target.type_name)))
}

fn resolve_placement(
    table: &InstanceTable,
    id: InstanceId,
    depth: usize,
    limit: usize,
) -> Result<Isometry3<f64>, ParsingError> {
    if depth >= limit {
        return Err(ParsingError::PlacementTooDeep { id, limit });
    }
    let placement = table
        .get(id)
        .ok_or(ParsingError::UnresolvedReference { id })?;
    let type_name = placement.type_name.as_str();

    if type_name.contains("CARTESIANPOINT") {
        let location = coordinates(table, id, 0.0)?;
        return Ok(Isometry3::from_parts(
            Translation3::from(location),
            UnitQuaternion::identity(),
        ));
    }

    match type_name {
        "IFCLOCALPLACEMENT" => {
            let parent = match placement.reference_at(0) {
                Some(parent_id) => resolve_placement(table, parent_id, depth + 1, limit)?,
                None => Isometry3::identity(),
            };
            let relative = match placement.reference_at(1) {
                Some(relative_id) => relative_placement(table, relative_id)?,
                None => Isometry3::identity(),
            };
            Ok(parent * relative)
        }
        "IFCAXIS2PLACEMENT3D" => axis_placement(table, placement, Some(1), 2),
        "IFCAXIS2PLACEMENT2D" => axis_placement(table, placement, None, 1),
        _ => {
            // Other placement kinds: follow the last reference to a placement or point.
            let next = placement
                .parameters
                .iter()
                .rev()
                .filter_map(Parameter::as_reference)
                .find(|next| {
                    table.get(*next).is_some_and(|target| {
                        target.type_name.contains("PLACEMENT")
                            || target.type_name.contains("CARTESIANPOINT")
                    })
                });
            match next {
                Some(next) => resolve_placement(table, next, depth + 1, limit),
                None => {
                    tracing::debug!(%id, type_name, "unsupported placement, using identity");
                    Ok(Isometry3::identity())
                }
            }
        }
    }
}

/// The RelativePlacement of a local placement, read without following
/// further placements so only the PlacementRelTo chain recurses.
fn relative_placement(
    table: &InstanceTable,
    id: InstanceId,
) -> Result<Isometry3<f64>, ParsingError> {
    let placement = table
        .get(id)
        .ok_or(ParsingError::UnresolvedReference { id })?;
    match placement.type_name.as_str() {
        "IFCAXIS2PLACEMENT3D" => axis_placement(table, placement, Some(1), 2),
        "IFCAXIS2PLACEMENT2D" => axis_placement(table, placement, None, 1),
        t if t.contains("CARTESIANPOINT") => Ok(Isometry3::from_parts(
            Translation3::from(coordinates(table, id, 0.0)?),
            UnitQuaternion::identity(),
        )),
        other => {
            tracing::debug!(%id, type_name = other, "unsupported relative placement, using identity");
            Ok(Isometry3::identity())
        }
    }
}

fn axis_placement(
    table: &InstanceTable,
    placement: &RawInstance,
    axis_index: Option<usize>,
    ref_direction_index: usize,
) -> Result<Isometry3<f64>, ParsingError> {
    let location = match placement.reference_at(0) {
        Some(point_id) => {
            table
                .get(point_id)
                .ok_or(ParsingError::UnresolvedReference { id: point_id })?;
            coordinates(table, point_id, 0.0)?
        }
        None => Vector3::zeros(),
    };

    let axis = match axis_index.and_then(|i| placement.reference_at(i)) {
        Some(direction_id) => direction(table, direction_id)?,
        None => Vector3::z(),
    };
    let ref_direction = match placement.reference_at(ref_direction_index) {
        Some(direction_id) => direction(table, direction_id)?,
        None => Vector3::x(),
    };

    Ok(Isometry3::from_parts(
        Translation3::from(location),
        orientation(axis, ref_direction),
    ))
}

/// Rotation whose local Z is `axis` and whose local X is `ref_direction`
/// projected onto the plane normal to Z.
fn orientation(axis: Vector3<f64>, ref_direction: Vector3<f64>) -> UnitQuaternion<f64> {
    let z = axis.try_normalize(EPSILON).unwrap_or_else(Vector3::z);
    let x = (ref_direction - z * ref_direction.dot(&z))
        .try_normalize(EPSILON)
        .or_else(|| {
            // ref direction parallel to the axis: any perpendicular will do
            let fallback = if z.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
            (fallback - z * fallback.dot(&z)).try_normalize(EPSILON)
        })
        .unwrap_or_else(Vector3::x);
    let y = z.cross(&x);

    UnitQuaternion::from_rotation_matrix(&Rotation3::from_basis_unchecked(&[x, y, z]))
}

/// Reads the first list parameter of a point or direction as a 3-vector.
///
/// Missing axes take `missing`; a missing list reads as all `missing`.
fn coordinates(
    table: &InstanceTable,
    id: InstanceId,
    missing: f64,
) -> Result<Vector3<f64>, ParsingError> {
    let mut vector = Vector3::repeat(missing);
    let Some(values) = table
        .get(id)
        .and_then(|instance| instance.get(0))
        .and_then(Parameter::as_list)
    else {
        return Ok(vector);
    };

    for (axis, value) in values.iter().take(3).enumerate() {
        match value {
            Parameter::Null => {}
            other => {
                vector[axis] = other
                    .as_f64()
                    .ok_or(ParsingError::InvalidCoordinate { id })?;
            }
        }
    }
    Ok(vector)
}

fn direction(table: &InstanceTable, id: InstanceId) -> Result<Vector3<f64>, ParsingError> {
    table
        .get(id)
        .ok_or(ParsingError::UnresolvedReference { id })?;
    coordinates(table, id, 0.0)
}

/// Coarse shape from the element's product definition shape.
fn extract_shape(table: &InstanceTable, element: &RawInstance) -> Shape {
    let Some(definition) =
        find_reference(table, element, |t| t == "IFCPRODUCTDEFINITIONSHAPE").and_then(|id| table.get(id))
    else {
        return Shape::unit_box();
    };

    let mut representations: Vec<&RawInstance> = definition
        .get(2)
        .map(Parameter::references)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|id| table.get(id))
        .filter(|rep| rep.type_name == "IFCSHAPEREPRESENTATION")
        .collect();
    // Body first, keep file order otherwise
    representations.sort_by_key(|rep| rep.string_at(1) != Some("Body"));

    representations
        .iter()
        .flat_map(|rep| rep.get(3).map(Parameter::references).unwrap_or_default())
        .filter_map(|item_id| table.get(item_id))
        .find_map(|item| shape_of_item(table, item))
        .unwrap_or_else(Shape::unit_box)
}

fn shape_of_item(table: &InstanceTable, item: &RawInstance) -> Option<Shape> {
    match item.type_name.as_str() {
        "IFCEXTRUDEDAREASOLID" => {
            let profile = table.get(item.reference_at(0)?)?;
            let height = item.real_at(3)?;
            match profile.type_name.as_str() {
                "IFCRECTANGLEPROFILEDEF" => Some(Shape::Box {
                    width: profile.real_at(3)?,
                    height,
                    depth: profile.real_at(4)?,
                }),
                "IFCCIRCLEPROFILEDEF" => Some(Shape::Cylinder {
                    radius: profile.real_at(3)?,
                    height,
                }),
                _ => None,
            }
        }
        "IFCTRIANGULATEDFACESET" => triangulated_mesh(table, item),
        _ => None,
    }
}

fn triangulated_mesh(table: &InstanceTable, face_set: &RawInstance) -> Option<Shape> {
    let point_list = table.get(face_set.reference_at(0)?)?;
    let vertices: Vec<Point3<f64>> = point_list
        .get(0)?
        .as_list()?
        .iter()
        .filter_map(|point| {
            let coords = point.as_list()?;
            let axis = |i: usize| coords.get(i).and_then(Parameter::as_f64).unwrap_or(0.0);
            Some(Point3::new(axis(0), axis(1), axis(2)))
        })
        .collect();

    // CoordIndex is 1-based; drop triangles that point outside the list
    let indices: Vec<u32> = face_set
        .get(3)?
        .as_list()?
        .iter()
        .filter_map(|triangle| {
            let corners: Vec<u32> = triangle
                .as_list()?
                .iter()
                .filter_map(|corner| match corner {
                    Parameter::Integer(i) if *i >= 1 && (*i as usize) <= vertices.len() => {
                        Some((*i - 1) as u32)
                    }
                    _ => None,
                })
                .collect();
            (corners.len() == 3).then_some(corners)
        })
        .flatten()
        .collect();

    if vertices.is_empty() || indices.is_empty() {
        return None;
    }
    Some(Shape::Mesh { vertices, indices })
}
