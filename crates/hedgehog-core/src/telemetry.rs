//! Publishing boundary: sanity gating and compact encodings of the fused pose.

use crate::aggregate::AggregatePose;
use crate::field::{FIELD_LENGTH, FIELD_WIDTH};
use crate::transform::{Scalar, Translation};
use serde::Serialize;
use tracing::warn;
use zerocopy::{FromBytes, Immutable, IntoBytes};

// ---------------------------------------------------------------------------
// Gating
// ---------------------------------------------------------------------------

/// Field extents a published pose must fall inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldBounds {
    pub width: Scalar,
    pub length: Scalar,
}

impl FieldBounds {
    pub const DEFAULT: Self = Self {
        width: FIELD_WIDTH,
        length: FIELD_LENGTH,
    };

    /// Rejects the exact origin (the no-estimate pose) and anything off the
    /// field's footprint. Height is not checked.
    pub fn contains(&self, t: Translation) -> bool {
        if t.is_zero() {
            return false;
        }
        (0.0..=self.width).contains(&t.x) && (0.0..=self.length).contains(&t.y)
    }
}

impl Default for FieldBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A pose ready for a dashboard, keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedPose {
    pub name: String,
    pub x: Scalar,
    pub y: Scalar,
    pub z: Scalar,
    pub yaw_degrees: Scalar,
    pub dispersion: Scalar,
    pub markers: usize,
}

impl PublishedPose {
    /// `None` when there is no estimate or it falls outside `bounds`.
    pub fn from_aggregate(name: &str, estimate: &AggregatePose, bounds: &FieldBounds) -> Option<Self> {
        if !estimate.has_estimate() {
            return None;
        }
        let t = estimate.pose.translation;
        if !bounds.contains(t) {
            warn!(name, x = t.x, y = t.y, "pose outside field bounds, not published");
            return None;
        }
        Some(Self {
            name: name.to_owned(),
            x: t.x,
            y: t.y,
            z: t.z,
            yaw_degrees: estimate.pose.rotation.yaw_degrees(),
            dispersion: estimate.dispersion.scalar(),
            markers: estimate.sample_count(),
        })
    }

    /// `[x, y, z, yaw]`, the layout dashboards expect for a pose array.
    pub fn to_number_array(&self) -> [Scalar; 4] {
        [self.x, self.y, self.z, self.yaw_degrees]
    }
}

// ---------------------------------------------------------------------------
// Quantization helpers
// ---------------------------------------------------------------------------

/// Maps degrees onto the full u16 range; 360° wraps to 0.
#[inline]
pub fn deg_to_u16(deg: Scalar) -> u16 {
    let pos = deg.rem_euclid(360.0);
    (pos * (65536.0 / 360.0)) as u16
}

#[inline]
pub fn u16_to_deg(v: u16) -> Scalar {
    (v as Scalar / 65536.0) * 360.0
}

fn m_to_mm(v: Scalar) -> i32 {
    (v * 1000.0).round() as i32
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

pub const STATUS_VALID: u8 = 0b0000_0001;
pub const STATUS_SINGLE_MARKER: u8 = 0b0000_0010;

/// Fixed 16-byte wire form of one frame's estimate.
#[repr(C, packed)]
#[derive(IntoBytes, FromBytes, Immutable, Clone, Copy, Debug, PartialEq)]
pub struct PosePacket {
    pub x_mm: i32,
    pub y_mm: i32,
    pub z_mm: i32,
    pub yaw: u16,
    pub markers: u8,
    pub status: u8,
}

impl PosePacket {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub fn from_aggregate(estimate: &AggregatePose) -> Self {
        let t = estimate.pose.translation;
        let mut status = 0;
        if estimate.has_estimate() {
            status |= STATUS_VALID;
        }
        if estimate.sample_count() == 1 {
            status |= STATUS_SINGLE_MARKER;
        }
        Self {
            x_mm: m_to_mm(t.x),
            y_mm: m_to_mm(t.y),
            z_mm: m_to_mm(t.z),
            yaw: deg_to_u16(estimate.pose.rotation.yaw_degrees()),
            markers: estimate.sample_count().min(u8::MAX as usize) as u8,
            status,
        }
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        Self::read_from_bytes(bytes).ok()
    }

    pub fn translation(&self) -> Translation {
        let (x, y, z) = (self.x_mm, self.y_mm, self.z_mm);
        Translation::new(x as Scalar, y as Scalar, z as Scalar) / 1000.0
    }

    pub fn yaw_degrees(&self) -> Scalar {
        u16_to_deg(self.yaw)
    }

    pub fn is_valid(&self) -> bool {
        self.status & STATUS_VALID != 0
    }
}
