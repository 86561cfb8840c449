pub mod bars;
pub mod config;
pub mod error;
pub mod frame;
pub mod holder;
pub mod linalg;
pub mod manipulator;
pub mod panel;
/// The `holder_core` crate is the geometry engine behind beamline sample positioning.
/// It maps positions given on a sample (pseudo positions) to the manipulator motor positions
/// that put that spot into the beam, and reports how far the beam is from the holder.
///
/// Key components:
/// - **Frames**: `FrameTree` of nested local coordinate systems, and `Panel` bounds on them.
/// - **Bars**: regular prism, two-sided and single-axis holder geometries.
/// - **Holder**: `SampleHolder`, the registry of samples and the active selection.
/// - **Manipulator**: `Manipulator`, coupling motor positions to the active sample.
/// - **Config**: serde configuration and builders for all of the above.
pub mod traits;
