//! Rectangular frames and their footprint as seen by the beam.

use crate::error::GeometryError;
use crate::frame::{FrameId, FrameTree, Pose, RotationMode};
use crate::linalg::{vec3, Vec2, Vec3};
use geo::{Contains, EuclideanDistance};
use geo_types::{Coord, LineString, Point, Polygon};

/// A bounded rectangle in the x-y plane of a frame.
///
/// The panel only records the bounds; the frame itself lives in a [`FrameTree`], which every
/// query takes by reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Panel {
    frame: FrameId,
    width: f64,
    height: f64,
    edges: [Vec3; 4],
}

impl Panel {
    pub fn new(frame: FrameId, width: f64, height: f64) -> Self {
        Self {
            frame,
            width,
            height,
            edges: [
                vec3(0.0, 0.0, 0.0),
                vec3(width, 0.0, 0.0),
                vec3(width, height, 0.0),
                vec3(0.0, height, 0.0),
            ],
        }
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Corners in the panel's own coordinates.
    pub fn edges(&self) -> &[Vec3; 4] {
        &self.edges
    }

    /// Global positions of the four corners for a manipulator pose.
    pub fn real_edges(&self, tree: &FrameTree, manip_pose: &Pose) -> Result<[Vec3; 4], GeometryError> {
        let manip = manip_pose.position();
        let mut corners = [Vec3::zeros(); 4];
        for (corner, edge) in corners.iter_mut().zip(&self.edges) {
            *corner =
                tree.frame_to_global(self.frame, edge, &manip, manip_pose.r, RotationMode::Global)?;
        }
        Ok(corners)
    }

    /// The corners projected onto the beam plane (global x, z).
    pub fn project_real_edges(
        &self,
        tree: &FrameTree,
        manip_pose: &Pose,
    ) -> Result<[Vec2; 4], GeometryError> {
        Ok(self
            .real_edges(tree, manip_pose)?
            .map(|edge| Vec2::new(edge.x, edge.z)))
    }

    /// Signed distance between the beam and the panel outline in the beam plane.
    ///
    /// Negative when the beam lands on the panel, positive when it misses.
    pub fn distance_to_beam(&self, tree: &FrameTree, manip_pose: &Pose) -> Result<f64, GeometryError> {
        let outline = self.project_real_edges(tree, manip_pose)?;
        Ok(signed_distance(&Vec2::zeros(), &outline))
    }
}

fn outline_polygon(outline: &[Vec2]) -> Polygon<f64> {
    let ring: LineString<f64> = outline.iter().map(|v| Coord { x: v.x, y: v.y }).collect();
    Polygon::new(ring, Vec::new())
}

/// Distance from `point` to the outline, negative when the point is strictly inside.
///
/// Zero-area outlines have no inside, so a zero-size panel measures plain distance to its corner.
pub fn signed_distance(point: &Vec2, outline: &[Vec2]) -> f64 {
    if outline.is_empty() {
        return f64::INFINITY;
    }
    let polygon = outline_polygon(outline);
    let point = Point::new(point.x, point.y);
    let distance = point.euclidean_distance(polygon.exterior());
    if polygon.contains(&point) {
        -distance
    } else {
        distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square() -> Vec<Vec2> {
        vec![
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ]
    }

    /// Panel facing +y (normal incidence at r = 0), 2 wide and 4 tall, centred on x = 0.
    fn facing_panel(tree: &mut FrameTree) -> Panel {
        let id = tree
            .insert(
                &vec3(1.0, 0.0, 0.0),
                &vec3(1.0, 0.0, 1.0),
                &vec3(0.0, 0.0, 0.0),
                None,
            )
            .expect("frame");
        Panel::new(id, 2.0, 4.0)
    }

    #[test]
    fn signed_distance_inside_and_outside_a_square() {
        let poly = square();
        assert_abs_diff_eq!(signed_distance(&Vec2::new(0.0, 0.0), &poly), -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(signed_distance(&Vec2::new(0.0, 0.25), &poly), -0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(signed_distance(&Vec2::new(1.5, 0.0), &poly), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(signed_distance(&Vec2::new(4.0, 5.0), &poly), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(signed_distance(&Vec2::new(1.0, 0.3), &poly), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_outline_contains_nothing() {
        let segment = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        assert_abs_diff_eq!(signed_distance(&Vec2::new(-0.5, 1.0), &segment), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn zero_size_outline_measures_point_distance() {
        let poly = vec![Vec2::new(3.0, 4.0); 4];
        assert_abs_diff_eq!(signed_distance(&Vec2::zeros(), &poly), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn real_edges_follow_the_frame() {
        let mut tree = FrameTree::new();
        let panel = facing_panel(&mut tree);
        let edges = panel
            .real_edges(&tree, &Pose::new(0.0, 0.0, 0.0, 0.0))
            .expect("edges");
        assert_abs_diff_eq!(edges[0], vec3(1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(edges[1], vec3(-1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(edges[2], vec3(-1.0, 0.0, 4.0), epsilon = 1e-12);
        assert_abs_diff_eq!(edges[3], vec3(1.0, 0.0, 4.0), epsilon = 1e-12);
    }

    #[test]
    fn distance_is_negative_inside_and_positive_outside() {
        let mut tree = FrameTree::new();
        let panel = facing_panel(&mut tree);

        // Beam 1.5 above the bottom edge, centred: 1.0 from the side edges.
        let inside = panel
            .distance_to_beam(&tree, &Pose::new(0.0, 0.0, -1.5, 0.0))
            .expect("distance");
        assert_abs_diff_eq!(inside, -1.0, epsilon = 1e-12);

        // Panel lifted 0.5 above the beam.
        let outside = panel
            .distance_to_beam(&tree, &Pose::new(0.0, 0.0, 0.5, 0.0))
            .expect("distance");
        assert_abs_diff_eq!(outside, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn distance_changes_sign_at_the_boundary() {
        let mut tree = FrameTree::new();
        let panel = facing_panel(&mut tree);
        let distance = |x: f64| {
            panel
                .distance_to_beam(&tree, &Pose::new(x, 0.0, -2.0, 0.0))
                .expect("distance")
        };
        let mut previous = distance(0.0);
        assert!(previous < 0.0);
        // Slide the panel sideways until the beam leaves through the x = -1 edge.
        for step in 1..=40 {
            let x = -0.05 * step as f64;
            let d = distance(x);
            assert_abs_diff_eq!(d, x.abs() - 1.0, epsilon = 1e-9);
            if previous < 0.0 && d > 0.0 {
                assert!(previous.abs() < 0.06 && d < 0.06, "sign flip away from the edge");
            }
            previous = d;
        }
        assert!(previous > 0.0);
    }

    #[test]
    fn rotating_a_facing_panel_to_grazing_collapses_it() {
        let mut tree = FrameTree::new();
        let panel = facing_panel(&mut tree);
        let outline = panel
            .project_real_edges(&tree, &Pose::new(0.0, 0.0, -2.0, 90.0))
            .expect("outline");
        for corner in outline {
            assert_abs_diff_eq!(corner.x, 0.0, epsilon = 1e-12);
        }
        let d = panel
            .distance_to_beam(&tree, &Pose::new(0.0, 0.0, -2.0, 90.0))
            .expect("distance");
        assert!(d.abs() < 1e-9);
    }
}
