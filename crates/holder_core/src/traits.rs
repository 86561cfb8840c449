//! The seams between holders, manipulators and concrete bar geometries.

use crate::error::GeometryError;
use crate::frame::{FrameId, Pose};
use crate::linalg::Vec3;
use std::fmt::Debug;

/// Coordinates a holder converts between manipulator space and sample space.
///
/// A 4-axis manipulator uses [`Pose`]; a single-axis ladder uses a bare `f64`.
pub trait Coordinates: Copy + Debug + Default + PartialEq {
    /// Constant offset between manipulator zero and beam zero.
    type Offset: Copy + Debug + Default + PartialEq;

    /// Moves the in-plane (x, y) coordinates by (dx, dy).
    fn shifted(self, dx: f64, dy: f64) -> Self;

    fn add_offset(self, offset: &Self::Offset) -> Self;

    fn sub_offset(self, offset: &Self::Offset) -> Self;
}

impl Coordinates for Pose {
    type Offset = Vec3;

    fn shifted(self, dx: f64, dy: f64) -> Self {
        Pose::new(self.x + dx, self.y + dy, self.z, self.r)
    }

    fn add_offset(self, offset: &Vec3) -> Self {
        Pose::new(self.x + offset.x, self.y + offset.y, self.z + offset.z, self.r)
    }

    fn sub_offset(self, offset: &Vec3) -> Self {
        Pose::new(self.x - offset.x, self.y - offset.y, self.z - offset.z, self.r)
    }
}

impl Coordinates for f64 {
    type Offset = f64;

    fn shifted(self, dx: f64, _dy: f64) -> Self {
        self + dx
    }

    fn add_offset(self, offset: &f64) -> Self {
        self + offset
    }

    fn sub_offset(self, offset: &f64) -> Self {
        self - offset
    }
}

/// The physical layout a [`crate::holder::SampleHolder`] works on: the faces of a bar plus
/// every sample frame attached to them.
///
/// `Default` is the empty geometry, which only holds the identity "null" frame.
pub trait Geometry: Default + Debug {
    type Coords: Coordinates;
    /// Where a sample sits on its side.
    type Placement: Debug;

    fn side_count(&self) -> usize;

    /// Frame of a side, zero-based.
    fn side(&self, index: usize) -> Option<FrameId>;

    fn null_frame(&self) -> FrameId;

    /// Creates a sample frame as a child of `side`.
    fn attach_sample(
        &mut self,
        side: FrameId,
        placement: &Self::Placement,
    ) -> Result<FrameId, GeometryError>;

    /// Drops every sample frame, keeping the sides and the null frame.
    fn clear_samples(&mut self);

    /// (width, height) of a frame, used for the center origin convention.
    fn extent(&self, frame: FrameId) -> Result<(f64, f64), GeometryError>;

    /// Manipulator coordinates that put frame coordinates `coords` into the beam.
    fn frame_to_beam(
        &self,
        frame: FrameId,
        coords: Self::Coords,
    ) -> Result<Self::Coords, GeometryError>;

    /// Frame coordinates of the beam for manipulator coordinates `manip`.
    fn beam_to_frame(
        &self,
        frame: FrameId,
        manip: Self::Coords,
    ) -> Result<Self::Coords, GeometryError>;

    /// Signed distance from the beam to the frame, negative when the beam hits it.
    fn distance_to_beam(&self, frame: FrameId, manip: Self::Coords) -> Result<f64, GeometryError>;
}
