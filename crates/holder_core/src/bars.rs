//! Sample bar geometries: regular prisms, two-sided clamshells and 1-D ladders.

use crate::error::GeometryError;
use crate::frame::{FrameId, FrameTree, Pose};
use crate::linalg::{vec3, Vec3};
use crate::panel::Panel;
use crate::traits::Geometry;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Sample rectangle `(x1, y1)`-`(x2, y2)` in the plane of a side, lifted by `thickness`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SamplePlacement {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(default)]
    pub thickness: f64,
}

impl SamplePlacement {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            thickness: 0.0,
        }
    }

    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.thickness = thickness;
        self
    }
}

/// Sample range along a 1-D bar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IntervalPlacement {
    pub start: f64,
    pub end: f64,
}

fn check_positive(what: &'static str, value: f64) -> Result<(), GeometryError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::InvalidShape { what, value })
    }
}

fn unknown_frame(frame: FrameId, frames: usize) -> GeometryError {
    GeometryError::UnknownFrame {
        frame: frame.index(),
        frames,
    }
}

/// Faces of a sample bar and the sample frames attached to them.
#[derive(Debug, Clone, PartialEq)]
pub struct BarGeometry {
    tree: FrameTree,
    /// Bounds of every frame in `tree`, indexed by frame id.
    panels: Vec<Panel>,
    sides: Vec<FrameId>,
    null: FrameId,
    /// Frame the sides are parented to, if the bar is mounted with an offset or tilt.
    mount: Option<FrameId>,
    /// Frames that survive clearing samples: null, mount and sides.
    fixed: usize,
}

impl Default for BarGeometry {
    fn default() -> Self {
        let mut tree = FrameTree::new();
        let null = tree.insert_root_identity(Vec3::zeros());
        Self {
            tree,
            panels: vec![Panel::new(null, 0.0, 0.0)],
            sides: Vec::new(),
            null,
            mount: None,
            fixed: 1,
        }
    }
}

impl BarGeometry {
    /// An empty geometry, with a mount frame built from `parent` (three points in manipulator
    /// coordinates) when given.
    fn mounted(parent: Option<[Vec3; 3]>) -> Result<Self, GeometryError> {
        let mut geometry = Self::default();
        if let Some([p1, p2, p3]) = parent {
            geometry.mount = Some(geometry.push_panel([&p1, &p2, &p3], 0.0, 0.0, None)?);
        }
        Ok(geometry)
    }

    fn finish(mut self, sides: Vec<FrameId>) -> Self {
        self.sides = sides;
        self.fixed = self.tree.len();
        self
    }

    pub fn tree(&self) -> &FrameTree {
        &self.tree
    }

    pub fn mount(&self) -> Option<FrameId> {
        self.mount
    }

    pub fn panel(&self, frame: FrameId) -> Option<&Panel> {
        self.tree.get(frame)?;
        self.panels.get(frame.index())
    }

    fn checked_panel(&self, frame: FrameId) -> Result<&Panel, GeometryError> {
        self.panel(frame)
            .ok_or_else(|| unknown_frame(frame, self.tree.len()))
    }

    /// Side panels in side-number order.
    pub fn sides(&self) -> impl Iterator<Item = &Panel> + '_ {
        self.sides.iter().filter_map(|id| self.panel(*id))
    }

    fn push_panel(
        &mut self,
        points: [&Vec3; 3],
        width: f64,
        height: f64,
        parent: Option<FrameId>,
    ) -> Result<FrameId, GeometryError> {
        let id = self.tree.insert(points[0], points[1], points[2], parent)?;
        self.panels.push(Panel::new(id, width, height));
        Ok(id)
    }

    /// Resets the placement of one side (zero-based) from points in the bar's mount
    /// coordinates. Samples on it follow the new placement.
    pub fn calibrate_side(
        &mut self,
        index: usize,
        p1: &Vec3,
        p2: &Vec3,
        p3: &Vec3,
    ) -> Result<(), GeometryError> {
        let id = self.sides.get(index).copied().ok_or(GeometryError::SideOutOfRange {
            side: index + 1,
            sides: self.sides.len(),
        })?;
        self.tree.reset(id, p1, p2, p3)
    }

    /// Builds the face that shares `previous`'s far edge, turned inward by `turn` radians.
    ///
    /// The new face is placed in the same parent as `previous`.
    fn next_side_from(&mut self, previous: FrameId, turn: f64) -> Result<FrameId, GeometryError> {
        let panel = *self.checked_panel(previous)?;
        let parent = self.tree.get(previous).and_then(|frame| frame.parent());
        let edges = panel.edges();
        let next_edge = vec3(turn.cos(), 0.0, -turn.sin());
        let p1 = self.tree.to_parent(previous, &edges[1])?;
        let p2 = self.tree.to_parent(previous, &edges[2])?;
        let p3 = self.tree.to_parent(previous, &(next_edge + edges[1]))?;
        self.push_panel([&p1, &p2, &p3], panel.width(), panel.height(), parent)
    }
}

/// Regular `nsides`-sided prism, each face `width` wide and `height` long.
///
/// Without explicit `points`, side 1 faces +x at the apothem distance. A hanging bar
/// (`invert`) runs from z = `height` down to z = 0, otherwise from 0 up. Each following face is
/// chained off the previous one's far edge; for hanging bars the chained faces are stored in
/// reverse so that side numbers always run counter-clockwise seen from +z.
///
/// `parent` mounts the whole bar in a frame given by three points in manipulator coordinates;
/// `points` are then read in that frame.
pub fn make_regular_polygon(
    width: f64,
    height: f64,
    nsides: usize,
    points: Option<[Vec3; 3]>,
    invert: bool,
    parent: Option<[Vec3; 3]>,
) -> Result<BarGeometry, GeometryError> {
    check_positive("bar width", width)?;
    check_positive("bar height", height)?;
    if nsides < 3 {
        return Err(GeometryError::InvalidShape {
            what: "side count",
            value: nsides as f64,
        });
    }

    let turn = 2.0 * PI / nsides as f64;
    let [p1, p2, p3] = match points {
        Some(points) => points,
        None => {
            let az = if invert { -1.0 } else { 1.0 };
            let x = width / (2.0 * (turn / 2.0).tan());
            let y = -az * width / 2.0;
            let z = if invert { height } else { 0.0 };
            let p1 = vec3(x, y, z);
            [p1, p1 + vec3(0.0, 0.0, az), p1 + vec3(0.0, az, 0.0)]
        }
    };

    let mut geometry = BarGeometry::mounted(parent)?;
    let mut current = geometry.push_panel([&p1, &p2, &p3], width, height, geometry.mount)?;
    let mut chain = vec![current];
    for _ in 1..nsides {
        current = geometry.next_side_from(current, turn)?;
        chain.push(current);
    }
    if invert {
        chain[1..].reverse();
    }
    Ok(geometry.finish(chain))
}

/// Two opposing faces, `thickness` apart, hanging from z = `height`.
pub fn make_two_sided_bar(
    width: f64,
    height: f64,
    thickness: f64,
    parent: Option<[Vec3; 3]>,
) -> Result<BarGeometry, GeometryError> {
    check_positive("bar width", width)?;
    check_positive("bar height", height)?;
    if !thickness.is_finite() || thickness < 0.0 {
        return Err(GeometryError::InvalidShape {
            what: "bar thickness",
            value: thickness,
        });
    }

    let mut geometry = BarGeometry::mounted(parent)?;
    let mount = geometry.mount;
    let front = vec3(thickness / 2.0, width / 2.0, height);
    let front_id = geometry.push_panel(
        [&front, &(front - Vec3::z()), &(front - Vec3::y())],
        width,
        height,
        mount,
    )?;
    let back = vec3(-thickness / 2.0, -width / 2.0, height);
    let back_id = geometry.push_panel(
        [&back, &(back - Vec3::z()), &(back + Vec3::y())],
        width,
        height,
        mount,
    )?;
    Ok(geometry.finish(vec![front_id, back_id]))
}

impl Geometry for BarGeometry {
    type Coords = Pose;
    type Placement = SamplePlacement;

    fn side_count(&self) -> usize {
        self.sides.len()
    }

    fn side(&self, index: usize) -> Option<FrameId> {
        self.sides.get(index).copied()
    }

    fn null_frame(&self) -> FrameId {
        self.null
    }

    fn attach_sample(
        &mut self,
        side: FrameId,
        placement: &SamplePlacement,
    ) -> Result<FrameId, GeometryError> {
        let SamplePlacement {
            x1,
            y1,
            x2,
            y2,
            thickness: t,
        } = *placement;
        let width = x2 - x1;
        let height = y2 - y1;
        check_positive("sample width", width)?;
        check_positive("sample height", height)?;
        self.push_panel(
            [&vec3(x1, y1, t), &vec3(x1, y2, t), &vec3(x2, y1, t)],
            width,
            height,
            Some(side),
        )
    }

    fn clear_samples(&mut self) {
        self.tree.truncate(self.fixed);
        self.panels.truncate(self.fixed);
    }

    fn extent(&self, frame: FrameId) -> Result<(f64, f64), GeometryError> {
        let panel = self.checked_panel(frame)?;
        Ok((panel.width(), panel.height()))
    }

    fn frame_to_beam(&self, frame: FrameId, coords: Pose) -> Result<Pose, GeometryError> {
        self.tree.frame_to_beam(frame, &coords)
    }

    fn beam_to_frame(&self, frame: FrameId, manip: Pose) -> Result<Pose, GeometryError> {
        self.tree.beam_to_frame(frame, &manip)
    }

    fn distance_to_beam(&self, frame: FrameId, manip: Pose) -> Result<f64, GeometryError> {
        self.checked_panel(frame)?.distance_to_beam(&self.tree, &manip)
    }
}

/// A position range on a single-axis holder, optionally nested in a parent range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    start: f64,
    end: f64,
    parent: Option<FrameId>,
    generation: u32,
}

impl Interval {
    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// 1-D counterpart of [`BarGeometry`] for ladders moved by a single motor.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGeometry {
    intervals: Vec<Interval>,
    sides: Vec<FrameId>,
    null: FrameId,
    generation: u32,
}

impl Default for LinearGeometry {
    fn default() -> Self {
        Self {
            intervals: vec![Interval {
                start: 0.0,
                end: 0.0,
                parent: None,
                generation: 0,
            }],
            sides: Vec::new(),
            null: FrameId::new(0, 0),
            generation: 0,
        }
    }
}

impl LinearGeometry {
    pub fn interval(&self, frame: FrameId) -> Option<&Interval> {
        self.intervals
            .get(frame.index())
            .filter(|interval| interval.generation == frame.generation())
    }

    fn checked_interval(&self, frame: FrameId) -> Result<&Interval, GeometryError> {
        self.interval(frame)
            .ok_or_else(|| unknown_frame(frame, self.intervals.len()))
    }

    fn push(&mut self, start: f64, end: f64, parent: Option<FrameId>) -> FrameId {
        self.intervals.push(Interval {
            start,
            end,
            parent,
            generation: self.generation,
        });
        FrameId::new(self.intervals.len() - 1, self.generation)
    }

    fn to_global(&self, frame: FrameId, x: f64) -> Result<f64, GeometryError> {
        let mut x = x;
        let mut current = Some(frame);
        while let Some(id) = current {
            let interval = self.checked_interval(id)?;
            x += interval.start;
            current = interval.parent;
        }
        Ok(x)
    }

    fn to_local(&self, frame: FrameId, x: f64) -> Result<f64, GeometryError> {
        let interval = self.checked_interval(frame)?;
        let x_parent = match interval.parent {
            Some(parent) => self.to_local(parent, x)?,
            None => x,
        };
        Ok(x_parent - interval.start)
    }
}

/// A single bar of `length` along the manipulator axis.
pub fn make_1d_bar(length: f64) -> Result<LinearGeometry, GeometryError> {
    check_positive("bar length", length)?;
    let mut geometry = LinearGeometry::default();
    let side = geometry.push(0.0, length, None);
    geometry.sides = vec![side];
    Ok(geometry)
}

impl Geometry for LinearGeometry {
    type Coords = f64;
    type Placement = IntervalPlacement;

    fn side_count(&self) -> usize {
        self.sides.len()
    }

    fn side(&self, index: usize) -> Option<FrameId> {
        self.sides.get(index).copied()
    }

    fn null_frame(&self) -> FrameId {
        self.null
    }

    fn attach_sample(
        &mut self,
        side: FrameId,
        placement: &IntervalPlacement,
    ) -> Result<FrameId, GeometryError> {
        if self.interval(side).is_none() {
            return Err(GeometryError::UnknownParent {
                parent: side.index(),
                frames: self.intervals.len(),
            });
        }
        if !placement.start.is_finite() {
            return Err(GeometryError::InvalidShape {
                what: "sample start",
                value: placement.start,
            });
        }
        check_positive("sample length", placement.end - placement.start)?;
        Ok(self.push(placement.start, placement.end, Some(side)))
    }

    fn clear_samples(&mut self) {
        let fixed = 1 + self.sides.len();
        if self.intervals.len() > fixed {
            self.intervals.truncate(fixed);
            self.generation = self.generation.wrapping_add(1);
        }
    }

    fn extent(&self, frame: FrameId) -> Result<(f64, f64), GeometryError> {
        Ok((self.checked_interval(frame)?.length(), 0.0))
    }

    fn frame_to_beam(&self, frame: FrameId, coords: f64) -> Result<f64, GeometryError> {
        Ok(-self.to_global(frame, coords)?)
    }

    fn beam_to_frame(&self, frame: FrameId, manip: f64) -> Result<f64, GeometryError> {
        self.to_local(frame, -manip)
    }

    fn distance_to_beam(&self, frame: FrameId, manip: f64) -> Result<f64, GeometryError> {
        let length = self.checked_interval(frame)?.length();
        let a = self.to_global(frame, 0.0)? + manip;
        let b = self.to_global(frame, length)? + manip;
        let (lo, hi) = (a.min(b), a.max(b));
        Ok(if lo < 0.0 && hi > 0.0 {
            -(-lo).min(hi)
        } else {
            lo.abs().min(hi.abs())
        })
    }
}
