//! Collision shapes and pairwise hit tests
//!
//! Shapes are a closed set. [`collide`] is the pairwise dispatch table: each
//! supported pair is listed once, mirrored pairs swap their arguments, and
//! anything else comes back as `None` ("this pair is not implemented"), which
//! is distinct from `Some(false)` ("no hit").

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A hit shape, positioned by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CollisionShape {
    /// Never collides
    None,
    Circle { radius: f32 },
    /// Axis-aligned box centered on the position
    Aabb { width: f32, height: f32 },
    /// Rotated slab starting at the position (static lasers)
    Segment(DirectionalSegment),
    /// One link of a laser chain, ending at the position
    Laser(LaserQuad),
}

/// Shape kind without parameters, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    None,
    Circle,
    Aabb,
    Segment,
    Laser,
}

impl CollisionShape {
    pub fn circle(radius: f32) -> Self {
        Self::Circle { radius }
    }

    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::None => ShapeKind::None,
            Self::Circle { .. } => ShapeKind::Circle,
            Self::Aabb { .. } => ShapeKind::Aabb,
            Self::Segment(_) => ShapeKind::Segment,
            Self::Laser(_) => ShapeKind::Laser,
        }
    }

    /// Size of a box enclosing the shape
    pub fn bounding_size(&self) -> Vec2 {
        match self {
            Self::None => Vec2::ZERO,
            Self::Circle { radius } => Vec2::splat(radius * 2.0),
            Self::Aabb { width, height } => Vec2::new(*width, *height),
            Self::Segment(seg) => Vec2::splat(seg.length.max(seg.width)),
            Self::Laser(_) => Vec2::splat(1e9),
        }
    }
}

/// Rotated slab hitbox, inset from its visual extent
///
/// The corner offsets are derived once at construction; owners rebuild the
/// shape only when one of its parameters changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalSegment {
    pub angle: f32,
    pub length: f32,
    pub width: f32,
    /// Fraction of the length that is hit-active (head and tail are inset)
    pub head_hit: f32,
    /// Fraction of the width that is hit-active
    pub width_hit: f32,
    corners: [Vec2; 4],
}

impl DirectionalSegment {
    pub fn new(angle: f32, length: f32, width: f32, head_hit: f32, width_hit: f32) -> Self {
        let dir = Vec2::from_angle(angle);
        let along = dir * (length * (1.0 - head_hit) / 2.0);
        let across = dir.perp() * (width * width_hit / 2.0);
        let end = dir * length;
        Self {
            angle,
            length,
            width,
            head_hit,
            width_hit,
            corners: [
                along + across,
                along - across,
                end - along - across,
                end - along + across,
            ],
        }
    }

    /// Hitbox corners relative to the segment origin
    pub fn corners(&self) -> [Vec2; 4] {
        self.corners
    }

    fn collide_circle(&self, origin: Vec2, center: Vec2, radius: f32) -> bool {
        let quad = self.corners.map(|c| c + origin);
        circle_quad(center, radius, &quad)
    }
}

/// Hit quad of one laser chain link, from the previous node to the current one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserQuad {
    /// Position of the previous node
    pub from: Vec2,
    /// Render width of the laser
    pub width: f32,
    /// Fraction of the width that is hit-active
    pub hit_ratio: f32,
}

impl LaserQuad {
    /// Quad corners for a link ending at `to`
    pub fn corners(&self, to: Vec2) -> [Vec2; 4] {
        let side = (to - self.from).perp().normalize_or_zero() * (self.width * self.hit_ratio / 2.0);
        //1|==|2
        //4|==|3
        [self.from + side, to + side, to - side, self.from - side]
    }

    fn collide_circle(&self, to: Vec2, center: Vec2, radius: f32) -> bool {
        circle_quad(center, radius, &self.corners(to))
    }
}

/// Pairwise collision between two positioned shapes
///
/// Returns `None` for shape pairs that are not implemented.
pub fn collide(
    a: &CollisionShape,
    pa: Vec2,
    b: &CollisionShape,
    pb: Vec2,
    ortho_circles: bool,
) -> Option<bool> {
    use CollisionShape as S;

    match (a, b) {
        (S::None, _) | (_, S::None) => Some(false),
        (S::Circle { radius: r1 }, S::Circle { radius: r2 }) => Some(if ortho_circles {
            circle_circle_ortho(pa, *r1, pb, *r2)
        } else {
            circle_circle(pa, *r1, pb, *r2)
        }),
        (S::Circle { radius }, S::Aabb { width, height }) => {
            Some(circle_rect(pa, *radius, pb, Vec2::new(*width, *height)))
        }
        (S::Aabb { width: w1, height: h1 }, S::Aabb { width: w2, height: h2 }) => Some(rect_rect(
            pa,
            Vec2::new(*w1, *h1),
            pb,
            Vec2::new(*w2, *h2),
        )),
        (S::Segment(seg), S::Circle { radius }) => Some(seg.collide_circle(pa, pb, *radius)),
        (S::Laser(quad), S::Circle { radius }) => Some(quad.collide_circle(pa, pb, *radius)),
        (S::Aabb { .. }, S::Circle { .. })
        | (S::Circle { .. }, S::Segment(_))
        | (S::Circle { .. }, S::Laser(_)) => collide(b, pb, a, pa, ortho_circles),
        _ => None,
    }
}

/// Exact circle test; touching counts as a hit
#[inline]
pub fn circle_circle(p1: Vec2, r1: f32, p2: Vec2, r2: f32) -> bool {
    let r = r1 + r2;
    p1.distance_squared(p2) <= r * r
}

/// Cheaper circle test: independent per-axis overlap checks
#[inline]
pub fn circle_circle_ortho(p1: Vec2, r1: f32, p2: Vec2, r2: f32) -> bool {
    let r = r1 + r2;
    let d = (p1 - p2).abs();
    d.x <= r && d.y <= r
}

/// Circle against a centered axis-aligned box
#[inline]
pub fn circle_rect(center: Vec2, radius: f32, rect_center: Vec2, size: Vec2) -> bool {
    let half = size / 2.0;
    let closest = center.clamp(rect_center - half, rect_center + half);
    center.distance_squared(closest) <= radius * radius
}

/// Two centered axis-aligned boxes
#[inline]
pub fn rect_rect(p1: Vec2, s1: Vec2, p2: Vec2, s2: Vec2) -> bool {
    let d = (p1 - p2).abs();
    let reach = (s1 + s2) / 2.0;
    d.x <= reach.x && d.y <= reach.y
}

/// Whether a circle touches the segment `start..end`
pub fn segment_circle(start: Vec2, end: Vec2, center: Vec2, radius: f32) -> bool {
    let line = end - start;
    let len_sq = line.length_squared();
    let closest = if len_sq <= f32::EPSILON {
        start
    } else {
        let t = ((center - start).dot(line) / len_sq).clamp(0.0, 1.0);
        start + line * t
    };
    center.distance_squared(closest) <= radius * radius
}

/// Circle against a convex quad: any edge touched, or center inside
fn circle_quad(center: Vec2, radius: f32, quad: &[Vec2; 4]) -> bool {
    let edge_hit = (0..4).any(|i| segment_circle(quad[i], quad[(i + 1) % 4], center, radius));
    edge_hit || point_in_convex_quad(center, quad)
}

fn point_in_convex_quad(p: Vec2, quad: &[Vec2; 4]) -> bool {
    let mut sign = 0.0_f32;
    for i in 0..4 {
        let a = quad[i];
        let b = quad[(i + 1) % 4];
        let cross = (b - a).perp_dot(p - a);
        if cross == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    // Degenerate (zero-area) quads contain nothing
    sign != 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::FRAC_PI_2;

    fn circle(r: f32) -> CollisionShape {
        CollisionShape::circle(r)
    }

    #[test]
    fn test_circle_circle_boundary_counts() {
        let hit = collide(&circle(3.0), Vec2::ZERO, &circle(2.0), Vec2::new(5.0, 0.0), false);
        assert_eq!(hit, Some(true));
        let miss = collide(&circle(3.0), Vec2::ZERO, &circle(2.0), Vec2::new(5.01, 0.0), false);
        assert_eq!(miss, Some(false));
    }

    #[test]
    fn test_ortho_is_more_generous_on_diagonals() {
        let p2 = Vec2::new(4.0, 4.0);
        assert_eq!(collide(&circle(3.0), Vec2::ZERO, &circle(2.0), p2, false), Some(false));
        assert_eq!(collide(&circle(3.0), Vec2::ZERO, &circle(2.0), p2, true), Some(true));
    }

    #[test]
    fn test_circle_rect_both_directions() {
        let rect = CollisionShape::Aabb { width: 10.0, height: 4.0 };
        let c = circle(1.0);
        assert_eq!(collide(&c, Vec2::new(5.5, 0.0), &rect, Vec2::ZERO, false), Some(true));
        assert_eq!(collide(&rect, Vec2::ZERO, &c, Vec2::new(5.5, 0.0), false), Some(true));
        assert_eq!(collide(&rect, Vec2::ZERO, &c, Vec2::new(0.0, 3.5), false), Some(false));
    }

    #[test]
    fn test_rect_rect() {
        let a = CollisionShape::Aabb { width: 4.0, height: 4.0 };
        assert_eq!(collide(&a, Vec2::ZERO, &a, Vec2::new(4.0, 3.9), true), Some(true));
        assert_eq!(collide(&a, Vec2::ZERO, &a, Vec2::new(4.1, 0.0), true), Some(false));
    }

    #[test]
    fn test_none_never_collides() {
        let none = CollisionShape::None;
        assert_eq!(collide(&none, Vec2::ZERO, &circle(100.0), Vec2::ZERO, false), Some(false));
        assert_eq!(collide(&circle(100.0), Vec2::ZERO, &none, Vec2::ZERO, false), Some(false));
    }

    #[test]
    fn test_unsupported_pairs_are_distinct_from_miss() {
        let seg = CollisionShape::Segment(DirectionalSegment::new(0.0, 100.0, 10.0, 0.6, 0.7));
        let rect = CollisionShape::Aabb { width: 1.0, height: 1.0 };
        assert_eq!(collide(&seg, Vec2::ZERO, &rect, Vec2::ZERO, false), None);
        assert_eq!(collide(&rect, Vec2::ZERO, &seg, Vec2::ZERO, false), None);
        let laser = CollisionShape::Laser(LaserQuad {
            from: Vec2::ZERO,
            width: 4.0,
            hit_ratio: 0.8,
        });
        assert_eq!(collide(&laser, Vec2::X, &laser, Vec2::X, false), None);
    }

    #[test]
    fn test_directional_segment_insets() {
        // Beam along +x, 100 long, 10 wide; hit region x in [20, 80], |y| <= 3.5
        let seg = CollisionShape::Segment(DirectionalSegment::new(0.0, 100.0, 10.0, 0.6, 0.7));
        let point = circle(0.5);
        let hit = |p: Vec2| collide(&seg, Vec2::ZERO, &point, p, false).unwrap();
        assert!(hit(Vec2::new(50.0, 3.6)));
        assert!(!hit(Vec2::new(50.0, 4.5)));
        assert!(hit(Vec2::new(19.6, 0.0)));
        assert!(!hit(Vec2::new(10.0, 0.0)));
        assert!(!hit(Vec2::new(90.0, 0.0)));
        // Small circle well inside the slab
        assert!(hit(Vec2::new(50.0, 0.0)));
    }

    #[test]
    fn test_directional_segment_rotated() {
        let seg = DirectionalSegment::new(FRAC_PI_2, 100.0, 10.0, 0.6, 0.7);
        let shape = CollisionShape::Segment(seg);
        let origin = Vec2::new(10.0, 10.0);
        assert_eq!(
            collide(&circle(1.0), Vec2::new(10.0, 60.0), &shape, origin, false),
            Some(true)
        );
        assert_eq!(
            collide(&circle(1.0), Vec2::new(60.0, 10.0), &shape, origin, false),
            Some(false)
        );
    }

    #[test]
    fn test_laser_quad() {
        let quad = CollisionShape::Laser(LaserQuad {
            from: Vec2::new(0.0, 0.0),
            width: 10.0,
            hit_ratio: 0.8,
        });
        let to = Vec2::new(0.0, 50.0);
        // Half hit width = 4
        assert_eq!(collide(&quad, to, &circle(1.0), Vec2::new(4.5, 25.0), false), Some(true));
        assert_eq!(collide(&quad, to, &circle(1.0), Vec2::new(5.5, 25.0), false), Some(false));
        assert_eq!(collide(&circle(1.0), Vec2::new(0.0, 25.0), &quad, to, false), Some(true));
    }

    proptest! {
        #[test]
        fn prop_circle_circle_matches_distance(
            x1 in -500.0f32..500.0, y1 in -500.0f32..500.0,
            x2 in -500.0f32..500.0, y2 in -500.0f32..500.0,
            r1 in 0.0f32..60.0, r2 in 0.0f32..60.0,
        ) {
            let p1 = Vec2::new(x1, y1);
            let p2 = Vec2::new(x2, y2);
            let expected = p1.distance_squared(p2) <= (r1 + r2) * (r1 + r2);
            prop_assert_eq!(collide(&circle(r1), p1, &circle(r2), p2, false), Some(expected));
        }

        #[test]
        fn prop_collide_is_symmetric(
            x in -100.0f32..100.0, y in -100.0f32..100.0,
            r in 0.5f32..20.0, w in 1.0f32..50.0, h in 1.0f32..50.0,
        ) {
            let rect = CollisionShape::Aabb { width: w, height: h };
            let p = Vec2::new(x, y);
            prop_assert_eq!(
                collide(&circle(r), p, &rect, Vec2::ZERO, false),
                collide(&rect, Vec2::ZERO, &circle(r), p, false)
            );
        }
    }
}
