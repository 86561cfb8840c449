//! Registry of named sample frames on a bar, plus the active-sample selection.
//!
//! The selection is a small state machine: it starts at the `"null"` sentinel (an identity
//! frame, so lookups always succeed) and only changes through [`SampleHolder::set`] or when the
//! registry is rebuilt.

use crate::bars::BarGeometry;
use crate::error::GeometryError;
use crate::frame::FrameId;
use crate::linalg::Vec3;
use crate::traits::{Coordinates, Geometry};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const NULL_SAMPLE: &str = "null";

/// Whether sample coordinates are measured from the sample's corner or its center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginConvention {
    #[default]
    Edge,
    Center,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMetadata {
    pub sample_id: String,
    pub name: String,
    /// One-based side number; `None` for the null sentinel.
    pub side: Option<usize>,
    pub description: String,
    pub origin: OriginConvention,
}

/// Metadata replaced on the active selection only; the registry keeps the original values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataOverrides {
    pub name: Option<String>,
    pub description: Option<String>,
    pub origin: Option<OriginConvention>,
}

impl MetadataOverrides {
    pub fn origin(origin: OriginConvention) -> Self {
        Self {
            origin: Some(origin),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SampleEntry {
    frame: FrameId,
    metadata: SampleMetadata,
}

fn null_entry(frame: FrameId) -> SampleEntry {
    SampleEntry {
        frame,
        metadata: SampleMetadata {
            sample_id: NULL_SAMPLE.to_string(),
            name: NULL_SAMPLE.to_string(),
            side: None,
            description: String::new(),
            origin: OriginConvention::Edge,
        },
    }
}

fn side_id(side: usize) -> String {
    format!("side{side}")
}

#[derive(Debug, Clone)]
pub struct SampleHolder<G: Geometry> {
    geometry: G,
    has_geometry: bool,
    /// Registration order; the null sentinel and the sides always come first.
    order: Vec<String>,
    entries: HashMap<String, SampleEntry>,
    active: SampleEntry,
}

impl<G: Geometry> Default for SampleHolder<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Geometry> SampleHolder<G> {
    /// An empty holder: no sides, only the null sentinel.
    pub fn new() -> Self {
        let geometry = G::default();
        let null = null_entry(geometry.null_frame());
        let mut entries = HashMap::new();
        entries.insert(NULL_SAMPLE.to_string(), null.clone());
        Self {
            geometry,
            has_geometry: false,
            order: vec![NULL_SAMPLE.to_string()],
            entries,
            active: null,
        }
    }

    pub fn with_geometry(geometry: G) -> Self {
        let mut holder = Self::new();
        holder.add_geometry(geometry);
        holder
    }

    fn register(&mut self, frame: FrameId, metadata: SampleMetadata) {
        let sample_id = metadata.sample_id.clone();
        self.order.push(sample_id.clone());
        self.entries.insert(sample_id, SampleEntry { frame, metadata });
    }

    /// Replaces all sides and samples with `geometry` and resets the selection to null.
    ///
    /// Sides are registered as `side1`..`sideN`.
    pub fn add_geometry(&mut self, geometry: G) {
        self.geometry = geometry;
        self.order.clear();
        self.entries.clear();

        let null = null_entry(self.geometry.null_frame());
        self.register(null.frame, null.metadata.clone());
        for index in 0..self.geometry.side_count() {
            let Some(frame) = self.geometry.side(index) else {
                continue;
            };
            let sample_id = side_id(index + 1);
            self.register(
                frame,
                SampleMetadata {
                    sample_id: sample_id.clone(),
                    name: sample_id,
                    side: Some(index + 1),
                    description: String::new(),
                    origin: OriginConvention::Edge,
                },
            );
        }
        self.has_geometry = self.geometry.side_count() > 0;
        self.active = null;
        debug!(
            "Loaded holder geometry with {} sides.",
            self.geometry.side_count()
        );
    }

    /// Registers a sample on `side` (one-based).
    pub fn add_sample(
        &mut self,
        sample_id: &str,
        name: &str,
        placement: G::Placement,
        side: usize,
        description: &str,
        origin: OriginConvention,
    ) -> Result<(), GeometryError> {
        if !self.has_geometry {
            return Err(GeometryError::NoGeometry);
        }
        let sides = self.geometry.side_count();
        let side_frame = side
            .checked_sub(1)
            .and_then(|index| self.geometry.side(index))
            .ok_or(GeometryError::SideOutOfRange { side, sides })?;
        if self.entries.contains_key(sample_id) {
            return Err(GeometryError::DuplicateSample {
                sample_id: sample_id.to_string(),
            });
        }

        let frame = self.geometry.attach_sample(side_frame, &placement)?;
        self.register(
            frame,
            SampleMetadata {
                sample_id: sample_id.to_string(),
                name: name.to_string(),
                side: Some(side),
                description: description.to_string(),
                origin,
            },
        );
        debug!("Added sample '{sample_id}' on side {side} at {placement:?}.");
        Ok(())
    }

    /// Drops every registered sample, keeping the sides. The selection returns to null.
    pub fn clear_samples(&mut self) {
        self.geometry.clear_samples();
        self.order.truncate(1 + self.geometry.side_count());
        let order = &self.order;
        self.entries.retain(|sample_id, _| order.contains(sample_id));
        self.active = null_entry(self.geometry.null_frame());
        debug!("Cleared samples; {} entries remain.", self.order.len());
    }

    /// Makes `sample_id` the active sample.
    pub fn set(&mut self, sample_id: &str) -> Result<&SampleMetadata, GeometryError> {
        self.set_with(sample_id, MetadataOverrides::default())
    }

    /// Makes `sample_id` the active sample, overriding parts of its metadata.
    pub fn set_with(
        &mut self,
        sample_id: &str,
        overrides: MetadataOverrides,
    ) -> Result<&SampleMetadata, GeometryError> {
        let mut entry = self
            .entries
            .get(sample_id)
            .cloned()
            .ok_or_else(|| GeometryError::UnknownSample {
                sample_id: sample_id.to_string(),
            })?;
        if let Some(name) = overrides.name {
            entry.metadata.name = name;
        }
        if let Some(description) = overrides.description {
            entry.metadata.description = description;
        }
        if let Some(origin) = overrides.origin {
            entry.metadata.origin = origin;
        }
        self.active = entry;
        debug!(
            "Active sample is now '{}' ({:?} origin).",
            sample_id, self.active.metadata.origin
        );
        Ok(&self.active.metadata)
    }

    /// Registered ids in registration order, including the null sentinel and the sides.
    pub fn samples(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    pub fn sample_metadata(&self, sample_id: &str) -> Option<&SampleMetadata> {
        self.entries.get(sample_id).map(|entry| &entry.metadata)
    }

    pub fn current_sample(&self) -> &SampleMetadata {
        &self.active.metadata
    }

    pub fn current_frame(&self) -> FrameId {
        self.active.frame
    }

    pub fn geometry(&self) -> &G {
        &self.geometry
    }

    pub fn has_geometry(&self) -> bool {
        self.has_geometry
    }

    pub fn side_count(&self) -> usize {
        self.geometry.side_count()
    }

    fn half_extent(&self) -> Result<(f64, f64), GeometryError> {
        let (width, height) = self.geometry.extent(self.active.frame)?;
        Ok((width / 2.0, height / 2.0))
    }

    /// Manipulator coordinates that put active-sample coordinates `coords` into the beam.
    pub fn frame_to_beam(&self, coords: G::Coords) -> Result<G::Coords, GeometryError> {
        let frame = self.active.frame;
        match self.active.metadata.origin {
            OriginConvention::Edge => self.geometry.frame_to_beam(frame, coords),
            OriginConvention::Center => {
                let (dx, dy) = self.half_extent()?;
                self.geometry.frame_to_beam(frame, coords.shifted(dx, dy))
            }
        }
    }

    /// Active-sample coordinates of the beam for manipulator coordinates `manip`.
    pub fn beam_to_frame(&self, manip: G::Coords) -> Result<G::Coords, GeometryError> {
        let coords = self.geometry.beam_to_frame(self.active.frame, manip)?;
        match self.active.metadata.origin {
            OriginConvention::Edge => Ok(coords),
            OriginConvention::Center => {
                let (dx, dy) = self.half_extent()?;
                Ok(coords.shifted(-dx, -dy))
            }
        }
    }

    /// Holder-wide signed distance: the smallest over all sides, so any side in the beam
    /// makes it negative. Without geometry the active (null) frame is measured instead.
    pub fn distance_to_beam(&self, manip: G::Coords) -> Result<f64, GeometryError> {
        if !self.has_geometry {
            return self.geometry.distance_to_beam(self.active.frame, manip);
        }
        let mut closest = f64::INFINITY;
        for frame in (0..self.geometry.side_count()).filter_map(|index| self.geometry.side(index)) {
            closest = closest.min(self.geometry.distance_to_beam(frame, manip)?);
        }
        Ok(closest)
    }

    /// Signed distance to the active sample only.
    pub fn sample_distance_to_beam(&self, manip: G::Coords) -> Result<f64, GeometryError> {
        self.geometry.distance_to_beam(self.active.frame, manip)
    }
}

impl SampleHolder<BarGeometry> {
    /// Re-places side `side` (one-based) from three measured points.
    pub fn calibrate(
        &mut self,
        side: usize,
        p1: &Vec3,
        p2: &Vec3,
        p3: &Vec3,
    ) -> Result<(), GeometryError> {
        if !self.has_geometry {
            return Err(GeometryError::NoGeometry);
        }
        let sides = self.geometry.side_count();
        if side == 0 || side > sides {
            return Err(GeometryError::SideOutOfRange { side, sides });
        }
        self.geometry.calibrate_side(side - 1, p1, p2, p3)?;
        info!("Calibrated side {side} from points {p1:?}, {p2:?}, {p3:?}.");
        Ok(())
    }
}

impl<G: Geometry> fmt::Display for SampleHolder<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Samples loaded on holder:")?;
        for sample_id in &self.order {
            if let Some(entry) = self.entries.get(sample_id) {
                writeln!(f, "{}: {}", sample_id, entry.metadata.name)?;
            }
        }
        Ok(())
    }
}
