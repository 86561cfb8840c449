//! WASM wrapper around a 4-axis manipulator and its sample holder.

use holder_core::bars::{make_regular_polygon, make_two_sided_bar, BarGeometry, SamplePlacement};
use holder_core::config::{build_geometry, build_manipulator, BarSpec, ManipulatorConfig};
use holder_core::frame::Pose;
use holder_core::holder::OriginConvention;
use holder_core::linalg::vec3;
use holder_core::manipulator::Manipulator;
use serde_wasm_bindgen::{from_value, to_value};
use std::fmt::Display;
use wasm_bindgen::prelude::*;

fn js_error(err: impl Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn pose_from_slice(values: &[f64]) -> Result<Pose, String> {
    match values {
        [x, y, z, r] => Ok(Pose::new(*x, *y, *z, *r)),
        _ => Err(format!(
            "Expected 4 values (x, y, z, r), got {}",
            values.len()
        )),
    }
}

fn parse_origin(origin: &str) -> Result<OriginConvention, String> {
    match origin {
        "" | "edge" => Ok(OriginConvention::Edge),
        "center" => Ok(OriginConvention::Center),
        other => Err(format!("Unknown origin convention: {other}")),
    }
}

#[wasm_bindgen]
pub struct WasmManipulator {
    manipulator: Manipulator<BarGeometry>,
}

impl WasmManipulator {
    pub(crate) fn from_config(config: &ManipulatorConfig) -> Result<Self, String> {
        let manipulator = build_manipulator(config).map_err(|err| format!("{err:#}"))?;
        Ok(Self { manipulator })
    }
}

#[wasm_bindgen]
impl WasmManipulator {
    /// Builds a manipulator from a `ManipulatorConfig` object; `undefined` gives the standard
    /// 4-sided bar.
    #[wasm_bindgen(constructor)]
    pub fn new(config_val: JsValue) -> Result<WasmManipulator, JsValue> {
        console_error_panic_hook::set_once();

        let config: ManipulatorConfig = if config_val.is_undefined() || config_val.is_null() {
            ManipulatorConfig::default()
        } else {
            from_value(config_val)
                .map_err(|e| js_error(format!("Invalid manipulator config: {e}")))?
        };
        Self::from_config(&config).map_err(js_error)
    }

    /// Replaces the bar with one described by a `BarSpec` object. Samples are dropped.
    pub fn load_bar(&mut self, spec_val: JsValue) -> Result<(), JsValue> {
        let spec: BarSpec =
            from_value(spec_val).map_err(|e| js_error(format!("Invalid bar spec: {e}")))?;
        let geometry = build_geometry(&spec).map_err(|err| js_error(format!("{err:#}")))?;
        self.manipulator.holder_mut().add_geometry(geometry);
        Ok(())
    }

    pub fn load_regular_polygon(
        &mut self,
        width: f64,
        height: f64,
        nsides: usize,
        invert: bool,
    ) -> Result<(), JsValue> {
        let geometry =
            make_regular_polygon(width, height, nsides, None, invert, None).map_err(js_error)?;
        self.manipulator.holder_mut().add_geometry(geometry);
        Ok(())
    }

    pub fn load_two_sided(&mut self, width: f64, height: f64, thickness: f64) -> Result<(), JsValue> {
        let geometry = make_two_sided_bar(width, height, thickness, None).map_err(js_error)?;
        self.manipulator.holder_mut().add_geometry(geometry);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_sample(
        &mut self,
        sample_id: &str,
        name: &str,
        side: usize,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        thickness: f64,
        description: &str,
        origin: &str,
    ) -> Result<(), JsValue> {
        let origin = parse_origin(origin).map_err(js_error)?;
        let placement = SamplePlacement::new(x1, y1, x2, y2).with_thickness(thickness);
        self.manipulator
            .holder_mut()
            .add_sample(sample_id, name, placement, side, description, origin)
            .map_err(js_error)
    }

    pub fn clear_samples(&mut self) {
        self.manipulator.holder_mut().clear_samples();
    }

    pub fn set_sample(&mut self, sample_id: &str) -> Result<(), JsValue> {
        self.manipulator
            .holder_mut()
            .set(sample_id)
            .map(|_| ())
            .map_err(js_error)
    }

    /// Calibrates a side from three points given as a flat `[x1, y1, z1, ..., z3]` array.
    pub fn calibrate_side(&mut self, side: usize, points: Vec<f64>) -> Result<(), JsValue> {
        let &[a, b, c, d, e, f, g, h, i] = points.as_slice() else {
            return Err(js_error(format!(
                "Expected 9 coordinates for three points, got {}",
                points.len()
            )));
        };
        self.manipulator
            .holder_mut()
            .calibrate(side, &vec3(a, b, c), &vec3(d, e, f), &vec3(g, h, i))
            .map_err(js_error)
    }

    pub fn sample_ids(&self) -> Vec<String> {
        self.manipulator
            .holder()
            .samples()
            .map(str::to_string)
            .collect()
    }

    pub fn current_sample(&self) -> String {
        self.manipulator.holder().current_sample().sample_id.clone()
    }

    pub fn sample_metadata(&self, sample_id: &str) -> Result<JsValue, JsValue> {
        let metadata = self
            .manipulator
            .holder()
            .sample_metadata(sample_id)
            .ok_or_else(|| js_error(format!("Unknown sample: {sample_id}")))?;
        to_value(metadata).map_err(|e| js_error(format!("Failed to serialize metadata: {e}")))
    }

    pub fn side_count(&self) -> usize {
        self.manipulator.holder().side_count()
    }

    /// Motor position `[x, y, z, r]` for a pseudo position on the active sample.
    pub fn forward(&self, pseudo: Vec<f64>) -> Result<Vec<f64>, JsValue> {
        let pose = pose_from_slice(&pseudo).map_err(js_error)?;
        let real = self.manipulator.forward(pose).map_err(js_error)?;
        Ok(<[f64; 4]>::from(real).to_vec())
    }

    /// Pseudo position `[x, y, z, r]` on the active sample for a motor position.
    pub fn inverse(&self, real: Vec<f64>) -> Result<Vec<f64>, JsValue> {
        let pose = pose_from_slice(&real).map_err(js_error)?;
        let pseudo = self.manipulator.inverse(pose).map_err(js_error)?;
        Ok(<[f64; 4]>::from(pseudo).to_vec())
    }

    pub fn update_position(&mut self, real: Vec<f64>) -> Result<(), JsValue> {
        let pose = pose_from_slice(&real).map_err(js_error)?;
        self.manipulator.update_position(pose);
        Ok(())
    }

    pub fn distance_to_beam(&self) -> Result<f64, JsValue> {
        self.manipulator.distance_to_beam().map_err(js_error)
    }

    pub fn sample_distance_to_beam(&self) -> Result<f64, JsValue> {
        self.manipulator.sample_distance_to_beam().map_err(js_error)
    }
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn unknown_sample_is_rejected() {
        let mut manip = WasmManipulator::new(JsValue::UNDEFINED).expect("manipulator");
        assert!(manip.set_sample("missing").is_err());
        assert!(manip.forward(vec![0.0]).is_err());
    }

    #[wasm_bindgen_test]
    fn empty_config_object_loads_the_standard_bar() {
        let from_object =
            WasmManipulator::new(js_sys::Object::new().into()).expect("manipulator");
        let from_undefined = WasmManipulator::new(JsValue::UNDEFINED).expect("manipulator");
        assert_eq!(from_object.side_count(), from_undefined.side_count());
        assert_eq!(from_object.side_count(), 4);
    }

    #[wasm_bindgen_test]
    fn bad_bar_spec_is_reported() {
        let mut manip = WasmManipulator::new(JsValue::UNDEFINED).expect("manipulator");
        assert!(manip.load_bar(JsValue::from_str("hexagon")).is_err());
        assert!(manip.load_regular_polygon(1.0, 1.0, 2, true).is_err());
    }
}
