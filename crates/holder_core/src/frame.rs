//! Local coordinate frames nested under parent frames.
//!
//! Frames are stored in a [`FrameTree`] arena and refer to their parent by [`FrameId`]. A parent
//! has to exist before a child can point at it, so the tree can never contain a cycle.
//!
//! The root of every chain is attached to the manipulator: applying the manipulator rotation
//! (about z) and translation to root coordinates gives global coordinates, where the beam sits
//! on the origin and propagates along +y.

use crate::error::GeometryError;
use crate::linalg::{quadrant_angle, rotate_about_vertical, Basis, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// A manipulator pose, or a pseudo position in a sample frame.
///
/// `r` is in degrees: 0 is grazing incidence, 90 is normal incidence.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub r: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, z: f64, r: f64) -> Self {
        Self { x, y, z, r }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    fn from_position(v: &Vec3, r: f64) -> Self {
        Self::new(v.x, v.y, v.z, r)
    }
}

impl From<[f64; 4]> for Pose {
    fn from(value: [f64; 4]) -> Self {
        Self::new(value[0], value[1], value[2], value[3])
    }
}

impl From<Pose> for [f64; 4] {
    fn from(value: Pose) -> Self {
        [value.x, value.y, value.z, value.r]
    }
}

/// How a rotation passed to [`FrameTree::frame_to_global`] should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationMode {
    /// Rotation relative to the frame's own surface; the frame's `r0` is subtracted.
    Frame,
    /// Rotation of the manipulator itself.
    Global,
}

/// Handle to a frame in a [`FrameTree`].
///
/// Ids carry the generation of the tree they were issued in, so an id whose frame was dropped
/// by clearing samples is rejected even after its slot has been reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId {
    index: usize,
    generation: u32,
}

impl FrameId {
    pub(crate) fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    origin: Vec3,
    basis: Basis,
    /// Rotation of the local z axis in the global x-y plane, in degrees.
    r0: f64,
    parent: Option<FrameId>,
    generation: u32,
}

impl Frame {
    pub fn origin(&self) -> &Vec3 {
        &self.origin
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn r0(&self) -> f64 {
        self.r0
    }

    pub fn parent(&self) -> Option<FrameId> {
        self.parent
    }

    fn to_parent(&self, v: &Vec3) -> Vec3 {
        self.basis.to_parent(v) + self.origin
    }

    fn to_local(&self, v: &Vec3) -> Vec3 {
        self.basis.to_local(&(v - self.origin))
    }
}

fn manip_to_global(v: &Vec3, manip: &Vec3, r: f64) -> Vec3 {
    rotate_about_vertical(v, r.to_radians()) + manip
}

fn global_to_manip(v: &Vec3, manip: &Vec3, r: f64) -> Vec3 {
    rotate_about_vertical(&(v - manip), -r.to_radians())
}

/// Angle in degrees of a surface normal projected onto the global x-y plane.
fn normal_angle(n3: &Vec3) -> f64 {
    quadrant_angle(n3.x, n3.y).to_degrees()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTree {
    frames: Vec<Frame>,
    generation: u32,
}

impl FrameTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.frames
            .get(id.index)
            .filter(|frame| frame.generation == id.generation)
    }

    fn frame(&self, id: FrameId) -> Result<&Frame, GeometryError> {
        self.get(id).ok_or(GeometryError::UnknownFrame {
            frame: id.index,
            frames: self.frames.len(),
        })
    }

    fn push(&mut self, frame: Frame) -> FrameId {
        self.frames.push(frame);
        FrameId::new(self.frames.len() - 1, self.generation)
    }

    /// Inserts a frame built from three points expressed in the parent's coordinates.
    pub fn insert(
        &mut self,
        p1: &Vec3,
        p2: &Vec3,
        p3: &Vec3,
        parent: Option<FrameId>,
    ) -> Result<FrameId, GeometryError> {
        let basis = Basis::from_points(p1, p2, p3)?;
        self.insert_with_basis(*p1, basis, parent)
    }

    /// Inserts an unparented frame whose axes coincide with the manipulator's.
    pub fn insert_root_identity(&mut self, origin: Vec3) -> FrameId {
        let basis = Basis::identity();
        let r0 = normal_angle(&basis.to_parent(&Vec3::z()));
        let generation = self.generation;
        self.push(Frame {
            origin,
            basis,
            r0,
            parent: None,
            generation,
        })
    }

    /// Inserts a frame whose axes coincide with its parent's, offset by `origin`.
    pub fn insert_identity(
        &mut self,
        origin: Vec3,
        parent: Option<FrameId>,
    ) -> Result<FrameId, GeometryError> {
        self.insert_with_basis(origin, Basis::identity(), parent)
    }

    fn insert_with_basis(
        &mut self,
        origin: Vec3,
        basis: Basis,
        parent: Option<FrameId>,
    ) -> Result<FrameId, GeometryError> {
        if let Some(p) = parent {
            if self.get(p).is_none() {
                return Err(GeometryError::UnknownParent {
                    parent: p.index,
                    frames: self.frames.len(),
                });
            }
        }
        let r0 = self.rotation_offset(&basis, parent)?;
        let generation = self.generation;
        Ok(self.push(Frame {
            origin,
            basis,
            r0,
            parent,
            generation,
        }))
    }

    /// Replaces the placement of one frame, keeping its parent. Children keep their own `r0`.
    pub fn reset(
        &mut self,
        id: FrameId,
        p1: &Vec3,
        p2: &Vec3,
        p3: &Vec3,
    ) -> Result<(), GeometryError> {
        let parent = self.frame(id)?.parent;
        let basis = Basis::from_points(p1, p2, p3)?;
        let r0 = self.rotation_offset(&basis, parent)?;
        let frame = &mut self.frames[id.index];
        frame.origin = *p1;
        frame.basis = basis;
        frame.r0 = r0;
        Ok(())
    }

    /// Drops every frame inserted after the first `len`. Ids of dropped frames stay invalid.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len < self.frames.len() {
            self.frames.truncate(len);
            self.generation = self.generation.wrapping_add(1);
        }
    }

    /// Rotation offset of a (possibly not yet inserted) frame relative to the global frame.
    ///
    /// Samples are assumed to have their z axis along the surface normal, and a 4-axis
    /// manipulator can only rotate that normal within the x-y plane, so the offset is the
    /// angle of the global image of local +z in that plane.
    fn rotation_offset(&self, basis: &Basis, parent: Option<FrameId>) -> Result<f64, GeometryError> {
        let mut n3 = basis.to_parent(&Vec3::z());
        let mut current = parent;
        while let Some(id) = current {
            let frame = self.frame(id)?;
            n3 = frame.basis.to_parent(&n3);
            current = frame.parent;
        }
        Ok(normal_angle(&n3))
    }

    pub fn r0(&self, id: FrameId) -> Result<f64, GeometryError> {
        Ok(self.frame(id)?.r0)
    }

    /// A frame point expressed in its parent's coordinates (root frames: manipulator
    /// coordinates).
    pub fn to_parent(&self, id: FrameId, v_frame: &Vec3) -> Result<Vec3, GeometryError> {
        Ok(self.frame(id)?.to_parent(v_frame))
    }

    /// Global coordinates of a frame point for a manipulator position and rotation.
    ///
    /// With [`RotationMode::Frame`], `r` is the rotation relative to this frame's surface and
    /// the frame's `r0` is removed before walking up the chain; parents always receive the
    /// already-global rotation.
    pub fn frame_to_global(
        &self,
        id: FrameId,
        v_frame: &Vec3,
        manip: &Vec3,
        r: f64,
        mode: RotationMode,
    ) -> Result<Vec3, GeometryError> {
        let first = self.frame(id)?;
        let rg = match mode {
            RotationMode::Frame => r - first.r0,
            RotationMode::Global => r,
        };
        let mut v = *v_frame;
        let mut current = Some(id);
        while let Some(frame_id) = current {
            let frame = self.frame(frame_id)?;
            v = frame.to_parent(&v);
            current = frame.parent;
        }
        Ok(manip_to_global(&v, manip, rg))
    }

    /// Frame coordinates of a global point for a manipulator position and rotation.
    pub fn global_to_frame(
        &self,
        id: FrameId,
        v_global: &Vec3,
        manip: &Vec3,
        r: f64,
    ) -> Result<Vec3, GeometryError> {
        let frame = self.frame(id)?;
        let v_parent = match frame.parent {
            Some(parent) => self.global_to_frame(parent, v_global, manip, r)?,
            None => global_to_manip(v_global, manip, r),
        };
        Ok(frame.to_local(&v_parent))
    }

    fn global_direction_to_frame(
        &self,
        id: FrameId,
        d_global: &Vec3,
        r: f64,
    ) -> Result<Vec3, GeometryError> {
        let frame = self.frame(id)?;
        let d_parent = match frame.parent {
            Some(parent) => self.global_direction_to_frame(parent, d_global, r)?,
            None => rotate_about_vertical(d_global, -r.to_radians()),
        };
        Ok(frame.basis.to_local(&d_parent))
    }

    /// Manipulator pose that puts frame point `(x, y, z)` into the beam at frame rotation `r`.
    pub fn frame_to_beam(&self, id: FrameId, pose: &Pose) -> Result<Pose, GeometryError> {
        let v_global = -self.frame_to_global(
            id,
            &pose.position(),
            &Vec3::zeros(),
            pose.r,
            RotationMode::Frame,
        )?;
        Ok(Pose::from_position(&v_global, pose.r - self.r0(id)?))
    }

    /// Frame coordinates and frame rotation of the beam for a manipulator pose.
    pub fn beam_to_frame(&self, id: FrameId, manip_pose: &Pose) -> Result<Pose, GeometryError> {
        let v_frame = self.origin_to_frame(id, manip_pose)?;
        Ok(Pose::from_position(&v_frame, manip_pose.r + self.r0(id)?))
    }

    /// The beam origin expressed in frame coordinates.
    pub fn origin_to_frame(&self, id: FrameId, manip_pose: &Pose) -> Result<Vec3, GeometryError> {
        self.global_to_frame(id, &Vec3::zeros(), &manip_pose.position(), manip_pose.r)
    }

    /// Distance from the beam line to the frame origin, ignoring the propagation (y) axis.
    pub fn distance_to_beam(&self, id: FrameId, manip_pose: &Pose) -> Result<f64, GeometryError> {
        let op = self.frame_to_global(
            id,
            &Vec3::zeros(),
            &manip_pose.position(),
            manip_pose.r,
            RotationMode::Global,
        )?;
        Ok(op.x.hypot(op.z))
    }

    /// Where the beam ray crosses the frame's z = 0 plane, in frame x-y coordinates.
    pub fn project_beam_to_frame_xy(
        &self,
        id: FrameId,
        manip_pose: &Pose,
    ) -> Result<Vec2, GeometryError> {
        let op = self.origin_to_frame(id, manip_pose)?;
        let vp = self.global_direction_to_frame(id, &Vec3::y(), manip_pose.r)?;
        if vp.z.abs() <= f64::EPSILON {
            return Err(GeometryError::BeamParallel);
        }
        let a = op.z / vp.z;
        let proj = op - vp * a;
        Ok(Vec2::new(proj.x, proj.y))
    }
}
