//! Browser bridge for the `holder_core` geometry engine.

mod manipulator;

pub use manipulator::WasmManipulator;
