//! Known marker locations on the field.
//!
//! The field frame has its origin at a field corner, x across the field
//! width, y along the field length and z up. Marker yaw is measured about z.

use crate::error::FieldMapError;
use crate::transform::{RigidTransform, Rotation, Scalar, Translation};
use serde::{Deserialize, Serialize};

/// Printed marker size used when a layout entry does not give one (6 in).
pub const DEFAULT_EDGE_LENGTH: Scalar = 0.1524;

/// Largest marker id a layout may use. The id table is sized by the largest
/// id, so this also caps its allocation.
pub const MAX_MARKER_ID: u32 = 1023;

pub const FIELD_WIDTH: Scalar = 8.2296;
pub const FIELD_LENGTH: Scalar = 16.4592;

fn default_edge_length() -> Scalar {
    DEFAULT_EDGE_LENGTH
}

// ---------------------------------------------------------------------------
// LAYOUT (input document)
// ---------------------------------------------------------------------------

/// One row of a field layout table, in meters and degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub id: u32,
    pub x: Scalar,
    pub y: Scalar,
    pub z: Scalar,
    pub yaw_degrees: Scalar,
    #[serde(default = "default_edge_length")]
    pub edge_length: Scalar,
}

impl MarkerSpec {
    pub fn from_inches(id: u32, x: Scalar, y: Scalar, z: Scalar, yaw_degrees: Scalar) -> Self {
        let t = Translation::from_inches(x, y, z);
        Self {
            id,
            x: t.x,
            y: t.y,
            z: t.z,
            yaw_degrees,
            edge_length: DEFAULT_EDGE_LENGTH,
        }
    }

    fn validate(&self) -> Result<(), FieldMapError> {
        if self.id == 0 {
            return Err(FieldMapError::ReservedId);
        }
        if self.id > MAX_MARKER_ID {
            return Err(FieldMapError::IdOutOfRange {
                id: self.id,
                max: MAX_MARKER_ID,
            });
        }
        if !(self.edge_length.is_finite() && self.edge_length > 0.0) {
            return Err(FieldMapError::InvalidEdgeLength {
                id: self.id,
                edge_length: self.edge_length,
            });
        }
        let finite = [self.x, self.y, self.z, self.yaw_degrees]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(FieldMapError::NonFinitePose(self.id));
        }
        Ok(())
    }
}

/// A field layout as loaded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldLayout {
    pub markers: Vec<MarkerSpec>,
}

impl FieldLayout {
    /// The 2023 competition field: eight markers along the two end walls.
    pub fn charged_up_2023() -> Self {
        Self {
            markers: vec![
                MarkerSpec::from_inches(1, 42.19, 610.77, 18.22, 0.0),
                MarkerSpec::from_inches(2, 108.19, 610.77, 18.22, 0.0),
                MarkerSpec::from_inches(3, 147.19, 610.77, 18.22, 0.0),
                MarkerSpec::from_inches(4, 265.74, 636.96, 27.38, 0.0),
                MarkerSpec::from_inches(5, 265.74, 14.25, 27.38, 180.0),
                MarkerSpec::from_inches(6, 147.19, 40.45, 18.22, 180.0),
                MarkerSpec::from_inches(7, 108.19, 40.45, 18.22, 180.0),
                MarkerSpec::from_inches(8, 42.19, 40.45, 18.22, 180.0),
            ],
        }
    }
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self::charged_up_2023()
    }
}

// ---------------------------------------------------------------------------
// FIELD MAP
// ---------------------------------------------------------------------------

/// A marker fixed to the field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnownMarker {
    pub id: u32,
    /// Marker frame expressed in the field frame.
    pub pose: RigidTransform,
    pub edge_length: Scalar,
}

impl KnownMarker {
    fn from_spec(spec: &MarkerSpec) -> Self {
        Self {
            id: spec.id,
            pose: RigidTransform::new(
                Translation::new(spec.x, spec.y, spec.z),
                Rotation::from_yaw_degrees(spec.yaw_degrees),
            ),
            edge_length: spec.edge_length,
        }
    }
}

/// One entry of the id-indexed table. `Empty` marks ids with no marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarkerSlot {
    Empty,
    Known(KnownMarker),
}

/// Immutable id → marker registry.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMap {
    slots: Vec<MarkerSlot>,
}

impl FieldMap {
    pub fn from_layout(layout: &FieldLayout) -> Result<Self, FieldMapError> {
        if layout.markers.is_empty() {
            return Err(FieldMapError::Empty);
        }
        for spec in &layout.markers {
            spec.validate()?;
        }
        let mut ids: Vec<u32> = layout.markers.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        if let Some(w) = ids.windows(2).find(|w| w[0] == w[1]) {
            return Err(FieldMapError::DuplicateId(w[0]));
        }
        Ok(Self::build(layout))
    }

    pub fn from_json(json: &str) -> Result<Self, FieldMapError> {
        let layout: FieldLayout =
            serde_json::from_str(json).map_err(|e| FieldMapError::Parse(e.to_string()))?;
        Self::from_layout(&layout)
    }

    fn build(layout: &FieldLayout) -> Self {
        let max_id = layout.markers.iter().map(|m| m.id).max().unwrap_or(0);
        let mut slots = vec![MarkerSlot::Empty; max_id as usize + 1];
        for spec in &layout.markers {
            slots[spec.id as usize] = MarkerSlot::Known(KnownMarker::from_spec(spec));
        }
        Self { slots }
    }

    /// Number of id slots, including empty ones. Valid ids are `0..len()`.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers().next().is_none()
    }

    pub fn slot(&self, id: u32) -> MarkerSlot {
        self.slots
            .get(id as usize)
            .copied()
            .unwrap_or(MarkerSlot::Empty)
    }

    pub fn get(&self, id: u32) -> Option<&KnownMarker> {
        match self.slots.get(id as usize) {
            Some(MarkerSlot::Known(marker)) => Some(marker),
            _ => None,
        }
    }

    pub fn markers(&self) -> impl Iterator<Item = &KnownMarker> {
        self.slots.iter().filter_map(|slot| match slot {
            MarkerSlot::Known(marker) => Some(marker),
            MarkerSlot::Empty => None,
        })
    }
}

impl Default for FieldMap {
    fn default() -> Self {
        Self::build(&FieldLayout::charged_up_2023())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_field_has_hole_at_zero() {
        let field = FieldMap::default();
        assert_eq!(field.len(), 9);
        assert_eq!(field.slot(0), MarkerSlot::Empty);
        assert!(field.get(0).is_none());
        assert_eq!(field.markers().count(), 8);
    }

    #[test]
    fn test_marker_one_position() {
        let field = FieldMap::default();
        let m = field.get(1).unwrap();
        let t = m.pose.translation;
        assert!((t.x - 1.0713).abs() < 1e-3);
        assert!((t.y - 15.513).abs() < 1e-3);
        assert!((t.z - 0.4628).abs() < 1e-3);
        assert!(m.pose.rotation.yaw_degrees().abs() < 1e-9);
        assert_eq!(m.edge_length, DEFAULT_EDGE_LENGTH);
    }

    #[test]
    fn test_out_of_range_is_empty() {
        let field = FieldMap::default();
        assert_eq!(field.slot(9), MarkerSlot::Empty);
        assert_eq!(field.slot(u32::MAX), MarkerSlot::Empty);
    }

    #[test]
    fn test_rejects_broken_layouts() {
        let empty = FieldLayout { markers: vec![] };
        assert_eq!(FieldMap::from_layout(&empty), Err(FieldMapError::Empty));

        let mut dup = FieldLayout::charged_up_2023();
        dup.markers.push(dup.markers[2]);
        assert_eq!(FieldMap::from_layout(&dup), Err(FieldMapError::DuplicateId(3)));

        let mut reserved = FieldLayout::charged_up_2023();
        reserved.markers[0].id = 0;
        assert_eq!(FieldMap::from_layout(&reserved), Err(FieldMapError::ReservedId));

        let mut flat = FieldLayout::charged_up_2023();
        flat.markers[4].edge_length = 0.0;
        assert!(matches!(
            FieldMap::from_layout(&flat),
            Err(FieldMapError::InvalidEdgeLength { id: 5, .. })
        ));
    }

    #[test]
    fn test_from_json_with_gaps() {
        let json = r#"{"markers": [
            {"id": 3, "x": 1.0, "y": 2.0, "z": 0.5, "yaw_degrees": 90.0},
            {"id": 7, "x": 4.0, "y": 2.0, "z": 0.5, "yaw_degrees": 0.0, "edge_length": 0.2}
        ]}"#;
        let field = FieldMap::from_json(json).unwrap();
        assert_eq!(field.len(), 8);
        assert!(field.get(5).is_none());
        assert_eq!(field.get(3).unwrap().edge_length, DEFAULT_EDGE_LENGTH);
        assert_eq!(field.get(7).unwrap().edge_length, 0.2);
    }

    #[test]
    fn test_rejects_huge_id() {
        let json = r#"{"markers": [
            {"id": 4000000000, "x": 1.0, "y": 2.0, "z": 0.5, "yaw_degrees": 0.0}
        ]}"#;
        assert_eq!(
            FieldMap::from_json(json),
            Err(FieldMapError::IdOutOfRange {
                id: 4_000_000_000,
                max: MAX_MARKER_ID
            })
        );

        let mut layout = FieldLayout::charged_up_2023();
        layout.markers[7].id = MAX_MARKER_ID;
        let field = FieldMap::from_layout(&layout).unwrap();
        assert_eq!(field.len(), MAX_MARKER_ID as usize + 1);
        assert!(field.get(MAX_MARKER_ID).is_some());
    }

    #[test]
    fn test_from_json_parse_error() {
        assert!(matches!(
            FieldMap::from_json("{not json"),
            Err(FieldMapError::Parse(_))
        ));
    }
}
