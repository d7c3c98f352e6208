use std::collections::HashMap;

use crate::app::EntityId;
use crate::math::Vec2;

use super::body::{Aabb, CollisionLayers, PhysicsBody};

/// Longest distance a body travels per sub-step, so fast bodies cannot skip
/// through a tile in one tick.
const MAX_SUBSTEP_UNITS: f32 = 8.0;

/// How far below a one-way surface the feet may already be and still land on it.
const ONE_WAY_TOLERANCE: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solid {
    pub owner: EntityId,
    pub aabb: Aabb,
    pub category: CollisionLayers,
    pub one_way: bool,
}

impl Solid {
    pub fn from_body(owner: EntityId, body: &PhysicsBody) -> Self {
        Self {
            owner,
            aabb: body.aabb(),
            category: body.category,
            one_way: body.one_way,
        }
    }
}

/// One blocked movement. `normal` points from the solid toward the mover:
/// `(0, 1)` is a landing, `(0, -1)` a ceiling, `(±1, 0)` a wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    pub other: EntityId,
    pub normal: Vec2,
    pub impact_velocity: Vec2,
}

/// Static solids bucketed by column for cheap region queries.
#[derive(Debug, Clone)]
pub struct StaticIndex {
    cell_width: f32,
    solids: Vec<Solid>,
    buckets: HashMap<i32, Vec<usize>>,
}

impl StaticIndex {
    pub fn new(cell_width: f32) -> Self {
        Self {
            cell_width: cell_width.max(1.0),
            solids: Vec::new(),
            buckets: HashMap::new(),
        }
    }

    pub fn insert(&mut self, solid: Solid) {
        let index = self.solids.len();
        for column in self.column_span(&solid.aabb) {
            self.buckets.entry(column).or_default().push(index);
        }
        self.solids.push(solid);
    }

    pub fn remove_owner(&mut self, owner: EntityId) -> bool {
        let before = self.solids.len();
        self.solids.retain(|solid| solid.owner != owner);
        if self.solids.len() == before {
            return false;
        }
        self.rebuild_buckets();
        true
    }

    pub fn len(&self) -> usize {
        self.solids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solids.is_empty()
    }

    pub fn clear(&mut self) {
        self.solids.clear();
        self.buckets.clear();
    }

    pub fn solid(&self, index: usize) -> Option<&Solid> {
        self.solids.get(index)
    }

    /// Indices of solids whose columns touch `region`, sorted and deduplicated.
    pub fn query(&self, region: &Aabb, out: &mut Vec<usize>) {
        out.clear();
        for column in self.column_span(region) {
            if let Some(bucket) = self.buckets.get(&column) {
                out.extend_from_slice(bucket);
            }
        }
        out.sort_unstable();
        out.dedup();
    }

    fn column_span(&self, aabb: &Aabb) -> std::ops::RangeInclusive<i32> {
        let first = (aabb.min_x() / self.cell_width).floor() as i32;
        let last = (aabb.max_x() / self.cell_width).floor() as i32;
        first..=last
    }

    fn rebuild_buckets(&mut self) {
        self.buckets.clear();
        for index in 0..self.solids.len() {
            let span = self.column_span(&self.solids[index].aabb);
            for column in span {
                self.buckets.entry(column).or_default().push(index);
            }
        }
    }
}

/// Integrates `velocity * dt` into `position`, resolving against the static
/// solids the body's collision mask selects. Axes are resolved separately,
/// x before y, in sub-steps. Every solid that blocked the body is reported
/// in `hits`; blocked axes have their velocity zeroed.
pub fn move_and_collide(
    body: &mut PhysicsBody,
    dt_seconds: f32,
    index: &StaticIndex,
    hits: &mut Vec<SweepHit>,
) {
    if body.is_static {
        return;
    }
    let total = body.velocity * dt_seconds;
    if !total.is_finite() {
        return;
    }

    let longest = total.x.abs().max(total.y.abs());
    let steps = (longest / MAX_SUBSTEP_UNITS).ceil().max(1.0) as u32;
    let step = total * (1.0 / steps as f32);
    let mut move_x = step.x != 0.0;
    let mut move_y = step.y != 0.0;
    let mut candidates = Vec::new();

    for _ in 0..steps {
        if move_x && step_x(body, step.x, index, &mut candidates, hits) {
            move_x = false;
        }
        if move_y && step_y(body, step.y, index, &mut candidates, hits) {
            move_y = false;
        }
        if !move_x && !move_y {
            break;
        }
    }
}

fn step_x(
    body: &mut PhysicsBody,
    dx: f32,
    index: &StaticIndex,
    candidates: &mut Vec<usize>,
    hits: &mut Vec<SweepHit>,
) -> bool {
    let before = body.aabb();
    body.position.x += dx;
    let after = body.aabb();
    index.query(&after, candidates);

    let mut resolved_x = body.position.x;
    let mut blocked = false;
    for solid in candidates.iter().filter_map(|&i| index.solid(i)) {
        if solid.one_way || !body.collision_mask.intersects(solid.category) {
            continue;
        }
        if before.overlaps(&solid.aabb) || !after.overlaps(&solid.aabb) {
            continue;
        }
        let normal = if dx > 0.0 {
            resolved_x = resolved_x.min(solid.aabb.min_x() - after.half_extents.x);
            Vec2::new(-1.0, 0.0)
        } else {
            resolved_x = resolved_x.max(solid.aabb.max_x() + after.half_extents.x);
            Vec2::new(1.0, 0.0)
        };
        hits.push(SweepHit {
            other: solid.owner,
            normal,
            impact_velocity: body.velocity,
        });
        blocked = true;
    }

    if blocked {
        body.position.x = resolved_x;
        body.velocity.x = 0.0;
    }
    blocked
}

fn step_y(
    body: &mut PhysicsBody,
    dy: f32,
    index: &StaticIndex,
    candidates: &mut Vec<usize>,
    hits: &mut Vec<SweepHit>,
) -> bool {
    let before = body.aabb();
    body.position.y += dy;
    let after = body.aabb();
    index.query(&after, candidates);

    let mut resolved_y = body.position.y;
    let mut blocked = false;
    for solid in candidates.iter().filter_map(|&i| index.solid(i)) {
        if !body.collision_mask.intersects(solid.category) {
            continue;
        }
        if before.overlaps(&solid.aabb) || !after.overlaps(&solid.aabb) {
            continue;
        }
        if solid.one_way
            && (dy > 0.0
                || body.velocity.y > 0.0
                || before.min_y() < solid.aabb.max_y() - ONE_WAY_TOLERANCE)
        {
            continue;
        }
        let normal = if dy < 0.0 {
            resolved_y = resolved_y.max(solid.aabb.max_y() + after.half_extents.y);
            Vec2::new(0.0, 1.0)
        } else {
            resolved_y = resolved_y.min(solid.aabb.min_y() - after.half_extents.y);
            Vec2::new(0.0, -1.0)
        };
        hits.push(SweepHit {
            other: solid.owner,
            normal,
            impact_velocity: body.velocity,
        });
        blocked = true;
    }

    if blocked {
        body.position.y = resolved_y;
        body.velocity.y = 0.0;
    }
    blocked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body::BodyDesc;

    const GROUND: CollisionLayers = CollisionLayers(1 << 0);
    const PLATFORM: CollisionLayers = CollisionLayers(1 << 1);
    const ACTOR: CollisionLayers = CollisionLayers(1 << 2);
    const TILE: f32 = 32.0;

    fn tile(owner: u64, column: i32, row: i32, category: CollisionLayers) -> Solid {
        Solid {
            owner: EntityId(owner),
            aabb: Aabb::new(
                Vec2::new(column as f32 * TILE + 16.0, row as f32 * TILE + 16.0),
                Vec2::new(16.0, 16.0),
            ),
            category,
            one_way: category == PLATFORM,
        }
    }

    fn floor(columns: i32) -> StaticIndex {
        let mut index = StaticIndex::new(TILE);
        for column in 0..columns {
            index.insert(tile(column as u64, column, 0, GROUND));
        }
        index
    }

    fn actor_at(x: f32, bottom: f32) -> PhysicsBody {
        PhysicsBody::new(
            Vec2::new(x, bottom + 15.0),
            BodyDesc::dynamic(Vec2::new(12.0, 15.0), ACTOR)
                .with_collision_mask(GROUND | PLATFORM),
        )
        .expect("body")
    }

    #[test]
    fn falling_body_lands_on_floor_top() {
        let index = floor(4);
        let mut body = actor_at(48.0, 40.0);
        body.velocity.y = -600.0;
        let mut hits = Vec::new();

        move_and_collide(&mut body, 1.0 / 30.0, &index, &mut hits);

        assert!((body.bottom() - 32.0).abs() < 1.0e-4);
        assert_eq!(body.velocity.y, 0.0);
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|hit| hit.normal == Vec2::new(0.0, 1.0)));
        assert!(hits.iter().all(|hit| hit.impact_velocity.y == -600.0));
    }

    #[test]
    fn body_straddling_a_seam_reports_both_tiles() {
        let index = floor(4);
        let mut body = actor_at(64.0, 32.0);
        body.velocity.y = -20.0;
        let mut hits = Vec::new();

        move_and_collide(&mut body, 1.0 / 60.0, &index, &mut hits);

        let mut owners: Vec<_> = hits.iter().map(|hit| hit.other).collect();
        owners.sort();
        owners.dedup();
        assert_eq!(owners, vec![EntityId(1), EntityId(2)]);
    }

    #[test]
    fn walking_along_floor_produces_no_wall_hits() {
        let index = floor(6);
        let mut body = actor_at(40.0, 32.0);
        let mut hits = Vec::new();
        for _ in 0..30 {
            body.velocity = Vec2::new(180.0, body.velocity.y - 1400.0 / 60.0);
            move_and_collide(&mut body, 1.0 / 60.0, &index, &mut hits);
        }
        assert!(hits.iter().all(|hit| hit.normal.x == 0.0));
        assert!(body.position.x > 120.0);
    }

    #[test]
    fn wall_blocks_horizontal_motion_with_side_normal() {
        let mut index = floor(6);
        index.insert(tile(100, 3, 1, GROUND));
        let mut body = actor_at(70.0, 32.0);
        body.velocity.x = 600.0;
        let mut hits = Vec::new();

        move_and_collide(&mut body, 1.0 / 30.0, &index, &mut hits);

        let wall = hits
            .iter()
            .find(|hit| hit.other == EntityId(100))
            .expect("wall hit");
        assert_eq!(wall.normal, Vec2::new(-1.0, 0.0));
        assert!((body.aabb().max_x() - 96.0).abs() < 1.0e-4);
        assert_eq!(body.velocity.x, 0.0);
    }

    #[test]
    fn ceiling_hit_reports_downward_normal() {
        let mut index = StaticIndex::new(TILE);
        index.insert(tile(7, 1, 3, GROUND));
        let mut body = actor_at(48.0, 50.0);
        body.velocity.y = 600.0;
        let mut hits = Vec::new();

        move_and_collide(&mut body, 1.0 / 30.0, &index, &mut hits);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].normal, Vec2::new(0.0, -1.0));
        assert!((body.top() - 96.0).abs() < 1.0e-4);
    }

    #[test]
    fn one_way_platform_lets_bodies_pass_upward_and_catches_them_falling() {
        let mut index = StaticIndex::new(TILE);
        index.insert(tile(9, 1, 2, PLATFORM));
        let mut body = actor_at(48.0, 40.0);
        let mut hits = Vec::new();

        body.velocity.y = 700.0;
        for _ in 0..6 {
            move_and_collide(&mut body, 1.0 / 60.0, &index, &mut hits);
        }
        assert!(hits.is_empty());
        assert!(body.bottom() > 96.0);

        body.velocity.y = -300.0;
        for _ in 0..10 {
            move_and_collide(&mut body, 1.0 / 60.0, &index, &mut hits);
        }
        assert!(!hits.is_empty());
        assert!((body.bottom() - 96.0).abs() < 1.0e-4);
    }

    #[test]
    fn one_way_platform_never_blocks_from_the_side() {
        let mut index = StaticIndex::new(TILE);
        index.insert(tile(9, 2, 0, PLATFORM));
        let mut body = actor_at(40.0, 4.0);
        body.velocity.x = 300.0;
        let mut hits = Vec::new();
        move_and_collide(&mut body, 1.0 / 30.0, &index, &mut hits);
        assert!(hits.is_empty());
        assert!(body.position.x > 49.0);
    }

    #[test]
    fn collision_mask_filters_solids() {
        let index = floor(3);
        let mut body = actor_at(48.0, 34.0);
        body.collision_mask = PLATFORM;
        body.velocity.y = -300.0;
        let mut hits = Vec::new();
        move_and_collide(&mut body, 1.0 / 30.0, &index, &mut hits);
        assert!(hits.is_empty());
        assert!(body.bottom() < 32.0);
    }

    #[test]
    fn removing_an_owner_drops_it_from_queries() {
        let mut index = floor(3);
        assert!(index.remove_owner(EntityId(1)));
        assert!(!index.remove_owner(EntityId(1)));
        assert_eq!(index.len(), 2);

        let mut found = Vec::new();
        index.query(&Aabb::new(Vec2::new(48.0, 16.0), Vec2::new(4.0, 4.0)), &mut found);
        assert!(found
            .iter()
            .filter_map(|&i| index.solid(i))
            .all(|solid| solid.owner != EntityId(1)));
    }
}
