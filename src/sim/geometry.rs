//! Collision geometry for oriented rectangles, circles and swept segments
//!
//! Walls and tank bodies are oriented rectangles; everything else is a circle.
//! Shells are tested as the segment they swept this frame so fast shells
//! can't tunnel through thin walls.

use glam::Vec2;

/// Result of a collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point (if hit)
    pub point: Vec2,
    /// Surface normal at contact, or the push direction for overlap tests
    pub normal: Vec2,
    /// Penetration depth (how far to push to separate)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }

    fn contact(point: Vec2, normal: Vec2, penetration: f32) -> Self {
        Self {
            hit: true,
            point,
            normal,
            penetration,
        }
    }
}

/// Reflect velocity off a surface with given normal: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Corners of a rectangle centered at `center`, rotated by `angle`.
/// Order: back-left, front-left, front-right, back-right (in local space
/// x is the length axis, y the width axis).
pub fn rect_corners(center: Vec2, angle: f32, half_length: f32, half_width: f32) -> [Vec2; 4] {
    let rot = Vec2::from_angle(angle);
    [
        Vec2::new(-half_length, -half_width),
        Vec2::new(half_length, -half_width),
        Vec2::new(half_length, half_width),
        Vec2::new(-half_length, half_width),
    ]
    .map(|local| center + rot.rotate(local))
}

/// Strict intersection of segments p1-p2 and p3-p4 (touching endpoints miss)
pub fn segment_intersection(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> Option<Vec2> {
    let d1 = (p4 - p3).perp_dot(p1 - p3);
    let d2 = (p4 - p3).perp_dot(p2 - p3);
    let d3 = (p2 - p1).perp_dot(p3 - p1);
    let d4 = (p2 - p1).perp_dot(p4 - p1);

    let straddles = |a: f32, b: f32| (a > 0.0 && b < 0.0) || (a < 0.0 && b > 0.0);
    if straddles(d1, d2) && straddles(d3, d4) {
        let t = d1 / (d1 - d2);
        Some(p1 + (p2 - p1) * t)
    } else {
        None
    }
}

/// Whether a point is inside a convex polygon given in consistent winding
pub fn point_in_convex(p: Vec2, corners: &[Vec2; 4]) -> bool {
    let mut sign = 0.0f32;
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        let cross = (b - a).perp_dot(p - a);
        if cross != 0.0 {
            if sign != 0.0 && cross.signum() != sign {
                return false;
            }
            sign = cross.signum();
        }
    }
    true
}

/// Swept segment vs circle. Returns the first point along `start -> end`
/// within `radius` of `center`; a segment that starts inside hits at `start`.
pub fn segment_circle_hit(start: Vec2, end: Vec2, center: Vec2, radius: f32) -> Option<Vec2> {
    let to_start = start - center;
    let c = to_start.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(start);
    }

    let d = end - start;
    let a = d.length_squared();
    if a <= f32::EPSILON {
        return None;
    }
    let b = 2.0 * to_start.dot(d);
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / (2.0 * a);
    (0.0..=1.0).contains(&t).then(|| start + d * t)
}

/// Swept segment vs oriented rectangle.
///
/// Takes the crossing nearest to `start`; the normal points out of the
/// rectangle on the side that was hit. A segment ending inside the rectangle
/// without crossing an edge hits at `end` with the normal opposing `velocity`.
pub fn segment_rect_hit(
    start: Vec2,
    end: Vec2,
    corners: &[Vec2; 4],
    center: Vec2,
    velocity: Vec2,
) -> CollisionResult {
    let mut best: Option<(f32, Vec2, Vec2)> = None;
    for i in 0..4 {
        let p1 = corners[i];
        let p2 = corners[(i + 1) % 4];
        if let Some(point) = segment_intersection(start, end, p1, p2) {
            let dist = point.distance_squared(start);
            if best.is_none_or(|(d, _, _)| dist < d) {
                let mut normal = (p2 - p1).perp().normalize_or_zero();
                if (point - center).dot(normal) < 0.0 {
                    normal = -normal;
                }
                best = Some((dist, point, normal));
            }
        }
    }

    if let Some((_, point, normal)) = best {
        return CollisionResult::contact(point, normal, 0.0);
    }

    if point_in_convex(end, corners) {
        return CollisionResult::contact(end, -velocity.normalize_or_zero(), 0.0);
    }

    CollisionResult::miss()
}

/// Circle vs circle overlap. The normal points from `a` toward `b`.
pub fn circle_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> CollisionResult {
    let diff = b - a;
    let dist = diff.length();
    let combined = radius_a + radius_b;
    if dist >= combined {
        return CollisionResult::miss();
    }
    // Coincident centers push along +x
    let normal = if dist > f32::EPSILON { diff / dist } else { Vec2::X };
    CollisionResult::contact(a + normal * radius_a, normal, combined - dist)
}

fn project(corners: &[Vec2; 4], axis: Vec2) -> (f32, f32) {
    corners.iter().fold((f32::MAX, f32::MIN), |(lo, hi), c| {
        let p = c.dot(axis);
        (lo.min(p), hi.max(p))
    })
}

/// Separating-axis overlap test between two oriented rectangles.
///
/// On overlap, `normal` is the minimum-translation axis oriented from `a`'s
/// center toward `b`'s and `penetration` is the overlap along it: moving `b`
/// by `normal * penetration` (or splitting that between both) separates them.
pub fn obb_overlap(a: &[Vec2; 4], a_center: Vec2, b: &[Vec2; 4], b_center: Vec2) -> CollisionResult {
    let axes = [
        (a[1] - a[0]).normalize_or_zero(),
        (a[3] - a[0]).normalize_or_zero(),
        (b[1] - b[0]).normalize_or_zero(),
        (b[3] - b[0]).normalize_or_zero(),
    ];

    let mut min_overlap = f32::MAX;
    let mut min_axis = Vec2::ZERO;
    for axis in axes {
        if axis == Vec2::ZERO {
            continue;
        }
        let (min_a, max_a) = project(a, axis);
        let (min_b, max_b) = project(b, axis);
        if max_a < min_b || max_b < min_a {
            return CollisionResult::miss();
        }
        let overlap = (max_a - min_b).min(max_b - min_a);
        if overlap < min_overlap {
            min_overlap = overlap;
            min_axis = axis;
        }
    }

    if min_axis == Vec2::ZERO {
        return CollisionResult::miss();
    }
    if (b_center - a_center).dot(min_axis) < 0.0 {
        min_axis = -min_axis;
    }
    CollisionResult::contact((a_center + b_center) * 0.5, min_axis, min_overlap)
}
