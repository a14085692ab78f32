//! Convex polygon helpers backing the built-in level probe.
//!
//! Polygons are counter-clockwise vertex lists. Edge normals point outward.

use glam::Vec2;

const EPSILON: f32 = 1.0e-6;

/// Convex hull of a point set (monotone chain). Counter-clockwise, no
/// collinear points. Fewer than three output points means a degenerate set.
pub fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    let mut pts: Vec<Vec2> = points.iter().copied().filter(|p| p.is_finite()).collect();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup_by(|a, b| (*a - *b).length_squared() < EPSILON * EPSILON);
    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: Vec2, a: Vec2, b: Vec2| (a - o).perp_dot(b - o);
    let mut hull: Vec<Vec2> = Vec::with_capacity(pts.len() * 2);

    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= EPSILON {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= EPSILON {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Outward unit normal of the edge `a -> b` of a counter-clockwise polygon.
#[inline]
pub fn edge_normal(a: Vec2, b: Vec2) -> Vec2 {
    let e = b - a;
    Vec2::new(e.y, -e.x).normalize_or_zero()
}

/// Minkowski sum of a convex polygon and an axis-aligned box.
pub fn inflate_by_box(polygon: &[Vec2], half_extents: Vec2) -> Vec<Vec2> {
    let corners = [
        Vec2::new(-half_extents.x, -half_extents.y),
        Vec2::new(half_extents.x, -half_extents.y),
        Vec2::new(half_extents.x, half_extents.y),
        Vec2::new(-half_extents.x, half_extents.y),
    ];
    let mut points = Vec::with_capacity(polygon.len() * 4);
    for &v in polygon {
        for c in corners {
            points.push(v + c);
        }
    }
    convex_hull(&points)
}

/// Ray against convex polygon by half-plane clipping.
///
/// `dir` must be normalized. Returns `(distance, normal)` for the entry point.
/// A ray starting inside reports distance 0 and the normal of the face the
/// origin is closest to.
pub fn ray_polygon(origin: Vec2, dir: Vec2, max_distance: f32, polygon: &[Vec2]) -> Option<(f32, Vec2)> {
    if polygon.len() < 3 {
        return None;
    }

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut enter_normal = Vec2::ZERO;
    let mut inside = true;
    let mut shallowest = (f32::NEG_INFINITY, Vec2::ZERO);

    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        let n = edge_normal(a, b);
        let separation = n.dot(origin - a);
        if separation > 0.0 {
            inside = false;
        } else if separation > shallowest.0 {
            shallowest = (separation, n);
        }

        let num = -separation;
        let den = n.dot(dir);
        if den.abs() < EPSILON {
            if num < 0.0 {
                return None;
            }
            continue;
        }
        let t = num / den;
        if den < 0.0 {
            if t > t_enter {
                t_enter = t;
                enter_normal = n;
            }
        } else if t < t_exit {
            t_exit = t;
        }
        if t_enter > t_exit {
            return None;
        }
    }

    if inside {
        return Some((0.0, shallowest.1));
    }
    if t_exit < 0.0 || t_enter > max_distance || t_enter < 0.0 {
        return None;
    }
    Some((t_enter, enter_normal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Vec<Vec2> {
        vec![
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ]
    }

    #[test]
    fn hull_drops_interior_and_collinear_points() {
        let hull = convex_hull(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
            Vec2::new(1.0, 1.0),
        ]);
        assert_eq!(hull.len(), 4);
        // Counter-clockwise: positive signed area.
        let area: f32 = (0..hull.len())
            .map(|i| hull[i].perp_dot(hull[(i + 1) % hull.len()]))
            .sum();
        assert!(area > 0.0);
    }

    #[test]
    fn ray_hits_top_face() {
        let (t, n) = ray_polygon(Vec2::new(0.0, 5.0), Vec2::NEG_Y, 10.0, &unit_square()).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
        assert!((n - Vec2::Y).length() < 1e-5);
    }

    #[test]
    fn ray_misses_when_too_short_or_pointing_away() {
        assert!(ray_polygon(Vec2::new(0.0, 5.0), Vec2::NEG_Y, 3.0, &unit_square()).is_none());
        assert!(ray_polygon(Vec2::new(0.0, 5.0), Vec2::Y, 10.0, &unit_square()).is_none());
        assert!(ray_polygon(Vec2::new(3.0, 5.0), Vec2::NEG_Y, 10.0, &unit_square()).is_none());
    }

    #[test]
    fn ray_from_inside_reports_shallowest_face() {
        let (t, n) = ray_polygon(Vec2::new(0.0, 0.9), Vec2::X, 10.0, &unit_square()).unwrap();
        assert_eq!(t, 0.0);
        assert!((n - Vec2::Y).length() < 1e-5);
    }

    #[test]
    fn inflated_square_grows_by_half_extents() {
        let inflated = inflate_by_box(&unit_square(), Vec2::new(0.5, 0.25));
        let (t, _) = ray_polygon(Vec2::new(0.0, 5.0), Vec2::NEG_Y, 10.0, &inflated).unwrap();
        assert!((t - 3.75).abs() < 1e-5);
    }
}
