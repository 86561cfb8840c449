//! Plain-data configuration for holders and manipulators, and the builders that turn it into
//! configured values.

use crate::bars::{
    make_1d_bar, make_regular_polygon, make_two_sided_bar, BarGeometry, IntervalPlacement,
    LinearGeometry, SamplePlacement,
};
use crate::holder::{OriginConvention, SampleHolder};
use crate::linalg::{vec3, Vec3};
use crate::manipulator::Manipulator;
use crate::traits::Geometry;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BAR_WIDTH: f64 = 24.5;
pub const DEFAULT_BAR_HEIGHT: f64 = 215.0;
pub const DEFAULT_MANIPULATOR_ORIGIN: [f64; 3] = [0.0, 0.0, 464.0];

fn default_invert() -> bool {
    true
}

fn default_origin() -> [f64; 3] {
    DEFAULT_MANIPULATOR_ORIGIN
}

fn default_holder() -> Option<HolderConfig> {
    Some(HolderConfig::default())
}

fn to_points(points: Option<[[f64; 3]; 3]>) -> Option<[Vec3; 3]> {
    points.map(|pts| pts.map(|[x, y, z]| vec3(x, y, z)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BarSpec {
    RegularPolygon {
        width: f64,
        height: f64,
        nsides: usize,
        /// Explicit placement of side 1 as three points.
        #[serde(default)]
        points: Option<[[f64; 3]; 3]>,
        #[serde(default = "default_invert")]
        invert: bool,
        /// Mount frame of the whole bar as three points in manipulator coordinates.
        #[serde(default)]
        parent: Option<[[f64; 3]; 3]>,
    },
    TwoSided {
        width: f64,
        height: f64,
        #[serde(default)]
        thickness: f64,
        #[serde(default)]
        parent: Option<[[f64; 3]; 3]>,
    },
}

impl Default for BarSpec {
    fn default() -> Self {
        Self::RegularPolygon {
            width: DEFAULT_BAR_WIDTH,
            height: DEFAULT_BAR_HEIGHT,
            nsides: 4,
            points: None,
            invert: true,
            parent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSpec<P> {
    pub id: String,
    /// Defaults to the id.
    #[serde(default)]
    pub name: Option<String>,
    /// One-based.
    pub side: usize,
    pub placement: P,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub origin: OriginConvention,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HolderConfig {
    #[serde(default)]
    pub bar: BarSpec,
    #[serde(default)]
    pub samples: Vec<SampleSpec<SamplePlacement>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManipulatorConfig {
    #[serde(default = "default_origin")]
    pub origin: [f64; 3],
    /// Omitted: the standard bar. `null`: no holder.
    #[serde(default = "default_holder")]
    pub holder: Option<HolderConfig>,
}

impl Default for ManipulatorConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_MANIPULATOR_ORIGIN,
            holder: Some(HolderConfig::default()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearManipulatorConfig {
    #[serde(default)]
    pub origin: f64,
    /// Ladder length; without it the manipulator starts with an empty holder.
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub samples: Vec<SampleSpec<IntervalPlacement>>,
}

pub fn build_geometry(spec: &BarSpec) -> Result<BarGeometry> {
    match *spec {
        BarSpec::RegularPolygon {
            width,
            height,
            nsides,
            points,
            invert,
            parent,
        } => make_regular_polygon(width, height, nsides, to_points(points), invert, to_points(parent))
            .with_context(|| format!("Failed to build {nsides}-sided bar ({width} x {height})")),
        BarSpec::TwoSided {
            width,
            height,
            thickness,
            parent,
        } => make_two_sided_bar(width, height, thickness, to_points(parent))
            .with_context(|| format!("Failed to build two-sided bar ({width} x {height})")),
    }
}

fn add_samples<G>(holder: &mut SampleHolder<G>, samples: &[SampleSpec<G::Placement>]) -> Result<()>
where
    G: Geometry,
    G::Placement: Clone,
{
    for sample in samples {
        holder
            .add_sample(
                &sample.id,
                sample.name.as_deref().unwrap_or(&sample.id),
                sample.placement.clone(),
                sample.side,
                &sample.description,
                sample.origin,
            )
            .with_context(|| format!("Failed to add sample '{}'", sample.id))?;
    }
    Ok(())
}

pub fn build_holder(config: &HolderConfig) -> Result<SampleHolder<BarGeometry>> {
    let mut holder = SampleHolder::with_geometry(build_geometry(&config.bar)?);
    add_samples(&mut holder, &config.samples)?;
    Ok(holder)
}

pub fn build_manipulator(config: &ManipulatorConfig) -> Result<Manipulator<BarGeometry>> {
    let holder = config.holder.as_ref().map(build_holder).transpose()?;
    let [x, y, z] = config.origin;
    Ok(Manipulator::new(vec3(x, y, z), holder))
}

pub fn build_linear_manipulator(
    config: &LinearManipulatorConfig,
) -> Result<Manipulator<LinearGeometry>> {
    let holder = match config.length {
        Some(length) => {
            let geometry = make_1d_bar(length)
                .with_context(|| format!("Failed to build ladder of length {length}"))?;
            let mut holder = SampleHolder::with_geometry(geometry);
            add_samples(&mut holder, &config.samples)?;
            Some(holder)
        }
        None if !config.samples.is_empty() => {
            bail!("Ladder samples were given without a ladder length")
        }
        None => None,
    };
    Ok(Manipulator::new(config.origin, holder))
}
