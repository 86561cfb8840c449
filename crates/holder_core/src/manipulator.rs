//! Motor-side coupling of a sample holder to the beam.

use crate::error::GeometryError;
use crate::holder::SampleHolder;
use crate::traits::{Coordinates, Geometry};
use log::debug;

/// Offset between manipulator motor zero and the beam, in manipulator coordinates.
pub type Origin<G> = <<G as Geometry>::Coords as Coordinates>::Offset;

/// Couples motor (real) positions to sample-frame (pseudo) positions through a holder.
///
/// The manipulator owns its holder. Until one is attached it works on an empty holder,
/// which measures distances from the beam to the manipulator origin.
#[derive(Debug, Clone)]
pub struct Manipulator<G: Geometry> {
    holder: SampleHolder<G>,
    holder_loaded: bool,
    origin: Origin<G>,
    /// Last real position reported by the motion loop.
    position: G::Coords,
}

impl<G: Geometry> Manipulator<G> {
    pub fn new(origin: Origin<G>, holder: Option<SampleHolder<G>>) -> Self {
        let holder_loaded = holder.is_some();
        Self {
            holder: holder.unwrap_or_default(),
            holder_loaded,
            origin,
            position: G::Coords::default(),
        }
    }

    /// Replaces the holder. The previous holder, if any, is returned.
    pub fn attach_holder(&mut self, holder: SampleHolder<G>) -> Option<SampleHolder<G>> {
        let previous = std::mem::replace(&mut self.holder, holder);
        let was_loaded = std::mem::replace(&mut self.holder_loaded, true);
        debug!(
            "Attached holder with {} sides to manipulator.",
            self.holder.side_count()
        );
        was_loaded.then_some(previous)
    }

    pub fn holder(&self) -> &SampleHolder<G> {
        &self.holder
    }

    pub fn holder_mut(&mut self) -> &mut SampleHolder<G> {
        &mut self.holder
    }

    pub fn holder_loaded(&self) -> bool {
        self.holder_loaded
    }

    pub fn origin(&self) -> &Origin<G> {
        &self.origin
    }

    /// Motor coordinates to the beam-centred coordinates the holder works in.
    pub fn manip_to_beam_frame(&self, real: G::Coords) -> G::Coords {
        real.sub_offset(&self.origin)
    }

    /// Beam-centred coordinates back to motor coordinates.
    pub fn beam_to_manip_frame(&self, beam: G::Coords) -> G::Coords {
        beam.add_offset(&self.origin)
    }

    /// Motor position that realizes the pseudo position `pseudo` on the active sample.
    pub fn forward(&self, pseudo: G::Coords) -> Result<G::Coords, GeometryError> {
        Ok(self.beam_to_manip_frame(self.holder.frame_to_beam(pseudo)?))
    }

    /// Pseudo position on the active sample for the motor position `real`.
    pub fn inverse(&self, real: G::Coords) -> Result<G::Coords, GeometryError> {
        self.holder.beam_to_frame(self.manip_to_beam_frame(real))
    }

    pub fn update_position(&mut self, real: G::Coords) {
        self.position = real;
    }

    pub fn position(&self) -> G::Coords {
        self.position
    }

    /// Pseudo position of the current motor position.
    pub fn pseudo_position(&self) -> Result<G::Coords, GeometryError> {
        self.inverse(self.position)
    }

    /// Holder-wide signed distance at the current motor position.
    pub fn distance_to_beam(&self) -> Result<f64, GeometryError> {
        self.holder
            .distance_to_beam(self.manip_to_beam_frame(self.position))
    }

    /// Active-sample signed distance at the current motor position.
    pub fn sample_distance_to_beam(&self) -> Result<f64, GeometryError> {
        self.holder
            .sample_distance_to_beam(self.manip_to_beam_frame(self.position))
    }
}

impl<G: Geometry> Default for Manipulator<G> {
    fn default() -> Self {
        Self::new(Default::default(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bars::{make_1d_bar, make_regular_polygon, BarGeometry, IntervalPlacement, LinearGeometry, SamplePlacement};
    use crate::frame::Pose;
    use crate::holder::OriginConvention;
    use crate::linalg::vec3;
    use approx::assert_abs_diff_eq;

    fn unit_bar_manipulator() -> Manipulator<BarGeometry> {
        let geometry = make_regular_polygon(
            1.0,
            10.0,
            4,
            Some([
                vec3(0.5, -0.5, 0.0),
                vec3(0.5, -0.5, 1.0),
                vec3(0.5, 0.5, 0.0),
            ]),
            false,
            None,
        )
        .expect("unit bar");
        let mut holder = SampleHolder::with_geometry(geometry);
        holder
            .add_sample("1", "one", SamplePlacement::new(0.0, 1.0, 1.0, 2.0), 1, "", OriginConvention::Edge)
            .expect("sample");
        holder.set("1").expect("select");
        Manipulator::new(vec3(0.0, 0.0, 464.0), Some(holder))
    }

    #[test]
    fn forward_adds_the_origin_offset() {
        let manip = unit_bar_manipulator();
        let real = manip.forward(Pose::new(0.0, 0.0, 0.0, 90.0)).expect("forward");
        assert_abs_diff_eq!(real.x, -0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(real.y, -0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(real.z, 463.0, epsilon = 1e-9);
        assert_abs_diff_eq!(real.r, 90.0, epsilon = 1e-9);
    }

    #[test]
    fn inverse_undoes_forward() {
        let manip = unit_bar_manipulator();
        for pseudo in [
            Pose::new(0.0, 0.0, 0.0, 90.0),
            Pose::new(0.25, 0.5, 0.1, 30.0),
            Pose::new(-1.0, 2.0, 0.0, 180.0),
        ] {
            let real = manip.forward(pseudo).expect("forward");
            let back = manip.inverse(real).expect("inverse");
            assert_abs_diff_eq!(back.x, pseudo.x, epsilon = 1e-9);
            assert_abs_diff_eq!(back.y, pseudo.y, epsilon = 1e-9);
            assert_abs_diff_eq!(back.z, pseudo.z, epsilon = 1e-9);
            assert_abs_diff_eq!(back.r, pseudo.r, epsilon = 1e-9);
        }
    }

    #[test]
    fn rotation_has_no_offset() {
        let manip = unit_bar_manipulator();
        let beam = manip.manip_to_beam_frame(Pose::new(1.0, 2.0, 500.0, 45.0));
        assert_eq!(beam, Pose::new(1.0, 2.0, 36.0, 45.0));
        assert_eq!(manip.beam_to_manip_frame(beam), Pose::new(1.0, 2.0, 500.0, 45.0));
    }

    #[test]
    fn distances_use_the_last_reported_position() {
        let mut manip = unit_bar_manipulator();
        // Centre of sample "1" at normal incidence.
        let real = manip.forward(Pose::new(0.5, 0.5, 0.0, 90.0)).expect("forward");
        manip.update_position(real);
        assert_eq!(manip.position(), real);
        assert_abs_diff_eq!(manip.sample_distance_to_beam().expect("distance"), -0.5, epsilon = 1e-9);
        assert!(manip.distance_to_beam().expect("distance") < 0.0);

        let pseudo = manip.pseudo_position().expect("pseudo position");
        assert_abs_diff_eq!(pseudo.x, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(pseudo.y, 0.5, epsilon = 1e-9);

        // Raise the bar well clear of the beam.
        manip.update_position(Pose::new(real.x, real.y, real.z + 20.0, real.r));
        assert!(manip.distance_to_beam().expect("distance") > 0.0);
        assert!(manip.sample_distance_to_beam().expect("distance") > 0.0);
    }

    #[test]
    fn missing_holder_falls_back_to_empty_holder() {
        let mut manip: Manipulator<BarGeometry> = Manipulator::new(vec3(0.0, 0.0, 464.0), None);
        assert!(!manip.holder_loaded());
        assert!(!manip.holder().has_geometry());

        manip.update_position(Pose::new(3.0, 0.0, 468.0, 0.0));
        assert_abs_diff_eq!(manip.distance_to_beam().expect("distance"), 5.0, epsilon = 1e-12);

        let previous = manip.attach_holder(SampleHolder::with_geometry(
            make_regular_polygon(24.5, 215.0, 4, None, true, None).expect("bar"),
        ));
        assert!(previous.is_none());
        assert!(manip.holder_loaded());
        assert_eq!(manip.holder().side_count(), 4);

        let previous = manip.attach_holder(SampleHolder::new());
        assert_eq!(previous.map(|h| h.side_count()), Some(4));
    }

    #[test]
    fn single_axis_ladder() {
        let mut holder: SampleHolder<LinearGeometry> =
            SampleHolder::with_geometry(make_1d_bar(100.0).expect("bar"));
        holder
            .add_sample("au", "Au mesh", IntervalPlacement { start: 40.0, end: 50.0 }, 1, "", OriginConvention::Edge)
            .expect("sample");
        holder.set("au").expect("select");

        let mut manip = Manipulator::new(5.0, Some(holder));
        let real = manip.forward(2.0).expect("forward");
        assert_abs_diff_eq!(real, -37.0);
        assert_abs_diff_eq!(manip.inverse(real).expect("inverse"), 2.0);

        manip.update_position(real);
        assert_abs_diff_eq!(manip.sample_distance_to_beam().expect("distance"), -2.0);
        // The beam is 42 into the 100 long bar.
        assert_abs_diff_eq!(manip.distance_to_beam().expect("distance"), -42.0);
    }
}
