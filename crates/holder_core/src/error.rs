use thiserror::Error;

/// Errors raised by the geometry engine.
///
/// Every error is deterministic given its inputs; nothing here is transient or worth retrying.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("Sample '{sample_id}' is not registered on this holder.")]
    UnknownSample { sample_id: String },

    #[error("Sample '{sample_id}' is already registered on this holder.")]
    DuplicateSample { sample_id: String },

    #[error("Holder has no geometry loaded. Load a bar geometry first.")]
    NoGeometry,

    #[error("Side {side} is out of range, holder only has {sides} sides (valid: 1..={sides}).")]
    SideOutOfRange { side: usize, sides: usize },

    #[error("Basis points are coincident or collinear; cannot construct an orthonormal basis.")]
    DegenerateBasis,

    #[error("Frame {frame} is not part of this geometry (it has {frames} frames); it may have been cleared.")]
    UnknownFrame { frame: usize, frames: usize },

    #[error("Parent frame {parent} does not exist (tree has {frames} frames).")]
    UnknownParent { parent: usize, frames: usize },

    #[error("Invalid {what}: {value}.")]
    InvalidShape { what: &'static str, value: f64 },

    #[error("Beam is parallel to the frame plane; no intersection exists.")]
    BeamParallel,
}
