//! Trail hazard geometry: per-player trails, arena bounds and fatal-contact tests

use log::info;
use shared::{Vec2, MAX_STEP_DISTANCE, PLAYER_COLLISION_RADIUS, TRAIL_POINT_SPACING};
use std::collections::HashMap;

/// Tolerance for the segment intersection tests. Large enough to absorb
/// floating-point jitter in near-collinear configurations, small enough to
/// never mask a real crossing at gameplay scale.
const COLLISION_EPS: f32 = 1e-6;

/// Square play area centered at the origin; leaving it is fatal.
/// The side length is fixed for the whole session.
#[derive(Debug, Clone, Copy)]
pub struct Arena {
    size: f32,
}

impl Arena {
    pub fn new(size: f32) -> Self {
        assert!(size > 0.0, "arena size must be positive");
        Self { size }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn half(&self) -> f32 {
        self.size / 2.0
    }

    /// Boundary contact is inclusive: sitting exactly on the wall kills.
    pub fn out_of_bounds(&self, p: &Vec2) -> bool {
        p.x.abs() >= self.half() || p.z.abs() >= self.half()
    }
}

#[derive(Debug)]
struct Trail {
    /// Ground-plane points in insertion order; consecutive pairs form the
    /// collidable segments.
    points: Vec<Vec2>,
    /// Current position, updated on every record even when no point is kept.
    position: Vec2,
    /// Eliminated players keep a frozen trail but stop occupying space.
    alive: bool,
}

impl Trail {
    fn new(position: Vec2) -> Self {
        Self {
            points: vec![position],
            position,
            alive: true,
        }
    }
}

/// Tracks the trails and current positions of every known player (local and
/// remote) and answers the per-tick fatal-contact query for the mover.
pub struct CollisionEngine {
    arena: Arena,
    trails: HashMap<String, Trail>,
}

impl CollisionEngine {
    pub fn new(arena: Arena) -> Self {
        Self {
            arena,
            trails: HashMap::new(),
        }
    }

    pub fn arena(&self) -> Arena {
        self.arena
    }

    /// Records a player's current position, extending their trail only when
    /// the point is farther than the spacing epsilon from the last kept
    /// point. This keeps segments non-degenerate and bounds point growth
    /// while a player holds still.
    pub fn record_point(&mut self, id: &str, point: Vec2) {
        match self.trails.get_mut(id) {
            Some(trail) => {
                trail.position = point;
                if !trail.alive {
                    return;
                }
                let last = trail.points[trail.points.len() - 1];
                if last.distance(&point) > TRAIL_POINT_SPACING {
                    trail.points.push(point);
                }
            }
            None => {
                self.trails.insert(id.to_string(), Trail::new(point));
            }
        }
    }

    /// Freezes a trail in place: no further growth, no body to run into,
    /// but the laid segments stay lethal.
    pub fn mark_eliminated(&mut self, id: &str) {
        if let Some(trail) = self.trails.get_mut(id) {
            trail.alive = false;
        }
    }

    /// Discards a player's trail entirely (disconnect). Re-adding the same
    /// id later starts from an empty trail.
    pub fn remove_player(&mut self, id: &str) {
        if self.trails.remove(id).is_some() {
            info!("Dropped trail for player {}", id);
        }
    }

    /// Drops every trail except the given player's. Used when rejoining a
    /// session: remote hazards are re-learned from the fresh snapshot.
    pub fn retain_player(&mut self, id: &str) {
        self.trails.retain(|key, _| key == id);
    }

    pub fn trail_points(&self, id: &str) -> &[Vec2] {
        self.trails.get(id).map(|t| t.points.as_slice()).unwrap_or(&[])
    }

    pub fn tracked_players(&self) -> usize {
        self.trails.len()
    }

    /// Tests the straight path from the mover's last recorded point to
    /// `candidate` against every hazard. Check order: arena boundary, own
    /// trail (excluding the still-forming tip segment), every other trail,
    /// then proximity to other live players. First hit wins.
    pub fn check_collision(&self, id: &str, candidate: Vec2) -> bool {
        if self.arena.out_of_bounds(&candidate) {
            return true;
        }

        let from = match self.trails.get(id) {
            Some(trail) => *trail.points.last().unwrap_or(&trail.position),
            None => candidate,
        };

        if let Some(own) = self.trails.get(id) {
            // The newest segment ends at `from` itself; testing it would
            // flag the trail's growing tip every tick.
            let segments = own.points.len().saturating_sub(1);
            if crosses_trail(&own.points, from, candidate, segments.saturating_sub(1)) {
                return true;
            }
        }

        for (other_id, trail) in &self.trails {
            if other_id == id {
                continue;
            }
            let segments = trail.points.len().saturating_sub(1);
            if crosses_trail(&trail.points, from, candidate, segments) {
                return true;
            }
        }

        let radius_sq = PLAYER_COLLISION_RADIUS * PLAYER_COLLISION_RADIUS;
        for (other_id, trail) in &self.trails {
            if other_id == id || !trail.alive {
                continue;
            }
            if trail.position.distance_squared(&candidate) < radius_sq {
                return true;
            }
        }

        false
    }
}

/// Bounds one tick's travel distance so that the straight-line segment test
/// between successive positions cannot tunnel through a trail.
pub fn clamp_step(delta: f32, speed: f32) -> f32 {
    if speed <= 0.0 {
        return delta;
    }
    delta.min(MAX_STEP_DISTANCE / speed)
}

fn crosses_trail(points: &[Vec2], from: Vec2, to: Vec2, segment_limit: usize) -> bool {
    if points.len() < 2 || segment_limit == 0 {
        return false;
    }
    points
        .windows(2)
        .take(segment_limit)
        .any(|w| segments_intersect(from, to, w[0], w[1]))
}

fn orient(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b.x - a.x) * (c.z - a.z) - (b.z - a.z) * (c.x - a.x)
}

fn on_segment(a: Vec2, b: Vec2, p: Vec2) -> bool {
    p.x >= a.x.min(b.x) - COLLISION_EPS
        && p.x <= a.x.max(b.x) + COLLISION_EPS
        && p.z >= a.z.min(b.z) - COLLISION_EPS
        && p.z <= a.z.max(b.z) + COLLISION_EPS
}

/// Standard 2D segment-segment intersection on the ground plane. Touching
/// endpoints and collinear overlap both count as contact.
pub fn segments_intersect(p1: Vec2, p2: Vec2, p3: Vec2, p4: Vec2) -> bool {
    let d1 = orient(p3, p4, p1);
    let d2 = orient(p3, p4, p2);
    let d3 = orient(p1, p2, p3);
    let d4 = orient(p1, p2, p4);

    if ((d1 > COLLISION_EPS && d2 < -COLLISION_EPS) || (d1 < -COLLISION_EPS && d2 > COLLISION_EPS))
        && ((d3 > COLLISION_EPS && d4 < -COLLISION_EPS)
            || (d3 < -COLLISION_EPS && d4 > COLLISION_EPS))
    {
        return true;
    }

    (d1.abs() <= COLLISION_EPS && on_segment(p3, p4, p1))
        || (d2.abs() <= COLLISION_EPS && on_segment(p3, p4, p2))
        || (d3.abs() <= COLLISION_EPS && on_segment(p1, p2, p3))
        || (d4.abs() <= COLLISION_EPS && on_segment(p1, p2, p4))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CollisionEngine {
        CollisionEngine::new(Arena::new(shared::ARENA_SIZE))
    }

    #[test]
    fn test_segment_intersection_crossing() {
        assert!(segments_intersect(
            Vec2::new(5.0, -1.0),
            Vec2::new(5.0, 1.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
        ));
    }

    #[test]
    fn test_segment_intersection_disjoint() {
        assert!(!segments_intersect(
            Vec2::new(5.0, 5.0),
            Vec2::new(5.0, 15.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
        ));
    }

    #[test]
    fn test_segment_intersection_touching_endpoint() {
        assert!(segments_intersect(
            Vec2::new(10.0, 0.0),
            Vec2::new(20.0, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
        ));
    }

    #[test]
    fn test_segment_intersection_collinear_gap() {
        assert!(!segments_intersect(
            Vec2::new(11.0, 0.0),
            Vec2::new(20.0, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
        ));
    }

    #[test]
    fn test_record_point_spacing() {
        let mut engine = engine();
        engine.record_point("p1", Vec2::new(0.0, 0.0));
        engine.record_point("p1", Vec2::new(0.1, 0.0));
        assert_eq!(engine.trail_points("p1").len(), 1);

        engine.record_point("p1", Vec2::new(1.0, 0.0));
        assert_eq!(engine.trail_points("p1").len(), 2);
    }

    #[test]
    fn test_boundary_inclusive() {
        let engine = engine();
        let half = shared::ARENA_SIZE / 2.0;
        assert!(engine.check_collision("p1", Vec2::new(half, 0.0)));
        assert!(engine.check_collision("p1", Vec2::new(half + 0.001, 0.0)));
        assert!(engine.check_collision("p1", Vec2::new(0.0, -half)));
        assert!(!engine.check_collision("p1", Vec2::new(half - 0.1, 0.0)));
    }

    #[test]
    fn test_crossing_other_trail_is_fatal() {
        let mut engine = engine();
        engine.record_point("wall", Vec2::new(0.0, 0.0));
        engine.record_point("wall", Vec2::new(10.0, 0.0));

        engine.record_point("mover", Vec2::new(5.0, -1.0));
        assert!(engine.check_collision("mover", Vec2::new(5.0, 1.0)));
    }

    #[test]
    fn test_parallel_path_is_safe() {
        let mut engine = engine();
        engine.record_point("wall", Vec2::new(0.0, 0.0));
        engine.record_point("wall", Vec2::new(10.0, 0.0));

        engine.record_point("mover", Vec2::new(5.0, 5.0));
        assert!(!engine.check_collision("mover", Vec2::new(5.0, 15.0)));
    }

    #[test]
    fn test_own_tip_segment_excluded() {
        let mut engine = engine();
        engine.record_point("p1", Vec2::new(0.0, 0.0));
        engine.record_point("p1", Vec2::new(5.0, 0.0));

        // Doubling back over the still-forming segment is not a hit.
        assert!(!engine.check_collision("p1", Vec2::new(3.0, 0.0)));
    }

    #[test]
    fn test_own_older_segment_is_fatal() {
        let mut engine = engine();
        engine.record_point("p1", Vec2::new(0.0, 0.0));
        engine.record_point("p1", Vec2::new(10.0, 0.0));
        engine.record_point("p1", Vec2::new(10.0, 10.0));

        // Path back across the first laid segment.
        assert!(engine.check_collision("p1", Vec2::new(5.0, -5.0)));
    }

    #[test]
    fn test_other_trail_tip_still_counts() {
        let mut engine = engine();
        engine.record_point("other", Vec2::new(0.0, 0.0));
        engine.record_point("other", Vec2::new(10.0, 0.0));

        engine.record_point("mover", Vec2::new(5.0, -1.0));
        // The wall's only segment is its newest one; it is someone else's,
        // so it stays lethal.
        assert!(engine.check_collision("mover", Vec2::new(5.0, 1.0)));
    }

    #[test]
    fn test_player_proximity() {
        let mut engine = engine();
        engine.record_point("other", Vec2::new(3.0, 0.0));
        engine.record_point("mover", Vec2::new(-3.0, 20.0));

        assert!(engine.check_collision("mover", Vec2::new(2.5, 0.5)));

        engine.mark_eliminated("other");
        assert!(!engine.check_collision("mover", Vec2::new(2.5, 0.5)));
    }

    #[test]
    fn test_eliminated_trail_stays_lethal_but_frozen() {
        let mut engine = engine();
        engine.record_point("other", Vec2::new(0.0, 0.0));
        engine.record_point("other", Vec2::new(10.0, 0.0));
        engine.mark_eliminated("other");

        engine.record_point("other", Vec2::new(30.0, 0.0));
        assert_eq!(engine.trail_points("other").len(), 2);

        engine.record_point("mover", Vec2::new(5.0, -1.0));
        assert!(engine.check_collision("mover", Vec2::new(5.0, 1.0)));
    }

    #[test]
    fn test_remove_then_readd_starts_empty() {
        let mut engine = engine();
        engine.record_point("p1", Vec2::new(0.0, 0.0));
        engine.record_point("p1", Vec2::new(10.0, 0.0));
        engine.remove_player("p1");
        assert_eq!(engine.trail_points("p1").len(), 0);

        engine.record_point("p1", Vec2::new(50.0, 50.0));
        assert_eq!(engine.trail_points("p1").len(), 1);

        // No stale segments resurrected.
        engine.record_point("mover", Vec2::new(5.0, -1.0));
        assert!(!engine.check_collision("mover", Vec2::new(5.0, 1.0)));
    }

    #[test]
    fn test_retain_player_drops_other_trails() {
        let mut engine = engine();
        engine.record_point("me", Vec2::new(0.0, 0.0));
        engine.record_point("other", Vec2::new(5.0, 5.0));
        engine.retain_player("me");

        assert_eq!(engine.tracked_players(), 1);
        assert_eq!(engine.trail_points("me").len(), 1);
        assert!(engine.trail_points("other").is_empty());
    }

    #[test]
    fn test_remove_absent_player_is_noop() {
        let mut engine = engine();
        engine.remove_player("ghost");
        assert_eq!(engine.tracked_players(), 0);
    }

    #[test]
    fn test_clamp_step() {
        // 1s at speed 10 would travel 10 units; clamp holds it to the
        // configured max step.
        let clamped = clamp_step(1.0, 10.0);
        assert!((clamped * 10.0 - MAX_STEP_DISTANCE).abs() < 1e-6);

        // Small deltas pass through untouched.
        assert_eq!(clamp_step(0.016, 10.0), 0.016);
    }
}
