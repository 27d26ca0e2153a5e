use thiserror::Error;

/// A field layout that cannot be used for localization.
///
/// These indicate a broken configuration rather than a sensing gap, so they
/// are surfaced at load time instead of being filtered per frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldMapError {
    /// The layout contains no markers at all.
    #[error("field layout contains no markers")]
    Empty,
    /// Slot 0 is reserved and must stay empty.
    #[error("marker id 0 is reserved")]
    ReservedId,
    /// The id is larger than the table allows.
    #[error("marker id {id} exceeds the maximum of {max}")]
    IdOutOfRange { id: u32, max: u32 },
    /// Two entries claim the same id.
    #[error("duplicate marker id {0}")]
    DuplicateId(u32),
    /// Edge length must be a positive, finite number of meters.
    #[error("marker {id} has invalid edge length {edge_length}")]
    InvalidEdgeLength { id: u32, edge_length: f64 },
    /// Position or yaw is NaN or infinite.
    #[error("marker {0} has a non-finite pose")]
    NonFinitePose(u32),
    /// The layout document could not be parsed.
    #[error("invalid field layout: {0}")]
    Parse(String),
}
