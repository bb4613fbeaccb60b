use glam::{Vec2, Vec3};

use super::camera::Camera;

const TIE_PIXELS: f32 = 1.0;

/// Index of the point whose projection is closest to `cursor`, if any lies
/// within `radius` pixels. Distances are bucketed to whole pixels and points
/// in the same bucket are ranked by depth, so the point nearest the camera
/// wins.
pub fn pick_point(
    camera: &Camera,
    viewport: Vec2,
    points: &[[f32; 3]],
    cursor: Vec2,
    radius: f32,
) -> Option<usize> {
    let candidates = points.iter().enumerate().filter_map(|(index, point)| {
        let (pixel, depth) = camera.project(Vec3::from_array(*point), viewport)?;
        let distance = pixel.distance(cursor);
        (distance <= radius).then_some((index, distance, depth))
    });

    nearest(candidates)
}

/// Picks from `(index, pixel distance, depth)` triples. The ranking is a
/// total order on (pixel bucket, depth, index), so the winner does not
/// depend on the order candidates arrive in.
fn nearest(candidates: impl Iterator<Item = (usize, f32, f32)>) -> Option<usize> {
    candidates
        .map(|(index, distance, depth)| ((distance / TIE_PIXELS).floor() as u32, depth, index))
        .min_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.total_cmp(&b.1))
                .then(a.2.cmp(&b.2))
        })
        .map(|(_, _, index)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Bounds;

    const VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);

    fn camera() -> Camera {
        let mut camera = Camera::default();
        camera.set_aspect(VIEWPORT.x, VIEWPORT.y);
        camera.frame(&Bounds {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        });
        camera
    }

    #[test]
    fn picks_point_under_cursor() {
        let camera = camera();
        let points = [[0.0, 0.0, 0.0], [0.8, 0.0, 0.0], [-0.8, 0.5, 0.0]];
        let (pixel, _) = camera.project(Vec3::new(0.8, 0.0, 0.0), VIEWPORT).unwrap();

        assert_eq!(pick_point(&camera, VIEWPORT, &points, pixel + Vec2::new(2.0, -1.0), 8.0), Some(1));
    }

    #[test]
    fn nothing_within_radius() {
        let camera = camera();
        let points = [[0.0, 0.0, 0.0]];
        assert_eq!(pick_point(&camera, VIEWPORT, &points, Vec2::new(10.0, 10.0), 8.0), None);
    }

    #[test]
    fn front_point_wins_when_overlapping() {
        let camera = camera();
        // Both project to the viewport center; +Z is towards the camera.
        let points = [[0.0, 0.0, -0.5], [0.0, 0.0, 0.5]];
        let center = VIEWPORT * 0.5;
        assert_eq!(pick_point(&camera, VIEWPORT, &points, center, 8.0), Some(1));
    }

    #[test]
    fn ranking_ignores_candidate_order() {
        // Each neighbour is within a pixel of the next, but the first and
        // last are not.
        let candidates = [(0, 0.0, 0.5), (1, 0.8, 0.4), (2, 1.6, 0.3)];

        let forward = nearest(candidates.into_iter());
        let backward = nearest(candidates.into_iter().rev());

        assert_eq!(forward, Some(1));
        assert_eq!(backward, forward);
    }

    #[test]
    fn equal_rank_prefers_lower_index() {
        let candidates = [(4, 0.2, 0.5), (2, 0.7, 0.5)];
        assert_eq!(nearest(candidates.into_iter().rev()), Some(2));
    }
}
