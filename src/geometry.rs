use egui::{Pos2, Rect, pos2};

/// Grid pitch in world units. Every stored position is a multiple of this.
pub const GRID_STEP: f32 = 10.0;

/// Quantize a point to the nearest grid intersection.
///
/// Halfway cases round to the even multiple so that e.g. 15.0 and 25.0 both
/// land on 20.0, which keeps snapping stable under tiny pointer jitter.
pub fn snap(p: Pos2) -> Pos2 {
    pos2(
        (p.x / GRID_STEP).round_ties_even() * GRID_STEP,
        (p.y / GRID_STEP).round_ties_even() * GRID_STEP,
    )
}

/// Inclusive containment test, matching how gate bounding boxes capture
/// nodes sitting exactly on their border.
pub fn rect_contains(rect: Rect, p: Pos2) -> bool {
    p.x >= rect.left() && p.x <= rect.right() && p.y >= rect.top() && p.y <= rect.bottom()
}

/// Squared euclidean distance, used for nearest-port selection.
pub fn dist_sq(a: Pos2, b: Pos2) -> f32 {
    let d = a - b;
    d.x * d.x + d.y * d.y
}

/// Closest point to `p` on the segment `a..b`.
pub fn closest_point_on_segment(a: Pos2, b: Pos2, p: Pos2) -> Pos2 {
    let ab = b - a;
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq == 0.0 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Distance from `p` to the segment `a..b`, used for wire hit-testing.
pub fn segment_dist(a: Pos2, b: Pos2, p: Pos2) -> f32 {
    closest_point_on_segment(a, b, p).distance(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::vec2;

    #[test]
    fn snap_is_idempotent() {
        for p in [
            pos2(0.0, 0.0),
            pos2(13.0, -27.0),
            pos2(104.9, 95.1),
            pos2(-3.3, 7.7),
        ] {
            let once = snap(p);
            assert_eq!(snap(once), once, "snap(snap({p:?})) drifted");
        }
    }

    #[test]
    fn snap_rounds_to_nearest_multiple() {
        assert_eq!(snap(pos2(13.0, 27.0)), pos2(10.0, 30.0));
        assert_eq!(snap(pos2(-13.0, -27.0)), pos2(-10.0, -30.0));
        assert_eq!(snap(pos2(104.9, 95.1)), pos2(100.0, 100.0));
    }

    #[test]
    fn snap_ties_round_to_even_multiple() {
        assert_eq!(snap(pos2(15.0, 25.0)), pos2(20.0, 20.0));
        assert_eq!(snap(pos2(-15.0, -25.0)), pos2(-20.0, -20.0));
        assert_eq!(snap(pos2(5.0, 35.0)), pos2(0.0, 40.0));
    }

    #[test]
    fn segment_dist_handles_endpoints_and_interior() {
        let a = pos2(0.0, 0.0);
        let b = pos2(100.0, 0.0);
        assert_eq!(segment_dist(a, b, pos2(50.0, 30.0)), 30.0);
        assert_eq!(segment_dist(a, b, pos2(-40.0, 0.0)), 40.0);
        assert_eq!(segment_dist(a, b, pos2(130.0, 40.0)), 50.0);
        // degenerate segment
        assert_eq!(segment_dist(a, a, pos2(3.0, 4.0)), 5.0);
    }

    #[test]
    fn rect_contains_is_inclusive() {
        let r = Rect::from_min_size(pos2(0.0, 0.0), vec2(50.0, 100.0));
        assert!(rect_contains(r, pos2(0.0, 0.0)));
        assert!(rect_contains(r, pos2(50.0, 100.0)));
        assert!(rect_contains(r, pos2(25.0, 50.0)));
        assert!(!rect_contains(r, pos2(50.1, 50.0)));
        assert!(!rect_contains(r, pos2(-0.1, 0.0)));
    }
}
