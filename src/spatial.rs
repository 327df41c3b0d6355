//! Spatial partitioning for proximity queries.
//!
//! A bounded quadtree over the play area, rebuilt from scratch every tick
//! from the active enemy snapshot. Entities move every tick, so a clean
//! rebuild is cheaper than incremental maintenance at these entity counts;
//! there is deliberately no remove or update operation.
//!
//! Queries are conservative: rectangle bounds are inclusive and a node is
//! visited whenever its region intersects the query, so there are no false
//! negatives. Callers re-check exact distances themselves.

use bevy_ecs::prelude::*;

use crate::components::{Active, EnemyKind, Health, Position, Radius};

/// Node capacity before subdivision.
pub const DEFAULT_NODE_CAPACITY: usize = 8;

/// Hard recursion cap. Coincident or near-coincident points (common right
/// after a cluster merge) would otherwise subdivide forever; at max depth a
/// node simply accepts points past its nominal capacity.
pub const MAX_DEPTH: u8 = 8;

/// Axis-aligned rectangle as center plus half-extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub hw: f32,
    pub hh: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, hw: f32, hh: f32) -> Self {
        Self { x, y, hw, hh }
    }

    /// Square rect centered on the origin, covering `[-half, half]` on both axes.
    pub fn centered(half: f32) -> Self {
        Self::new(0.0, 0.0, half, half)
    }

    /// Inclusive containment on all four edges.
    #[inline]
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x - self.hw
            && px <= self.x + self.hw
            && py >= self.y - self.hh
            && py <= self.y + self.hh
    }

    /// Inclusive intersection test.
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        (self.x - other.x).abs() <= self.hw + other.hw
            && (self.y - other.y).abs() <= self.hh + other.hh
    }
}

/// Position snapshot held by the index for the current tick only.
#[derive(Debug, Clone, Copy)]
pub struct SpatialEntry {
    pub entity: Entity,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

struct Node {
    region: Rect,
    depth: u8,
    points: Vec<SpatialEntry>,
    // Indices of the four child quadrants, set once on subdivision.
    children: Option<[usize; 4]>,
}

/// Region-partitioning quadtree resource.
///
/// Nodes live in an arena that is cleared (allocation-preserving) on every
/// rebuild, so steady-state ticks do not allocate.
#[derive(Resource)]
pub struct SpatialIndex {
    bounds: Rect,
    capacity: usize,
    nodes: Vec<Node>,
    free_points: Vec<Vec<SpatialEntry>>,
    len: usize,
}

impl SpatialIndex {
    pub fn new(bounds: Rect, capacity: usize) -> Self {
        let mut index = Self {
            bounds,
            capacity: capacity.max(1),
            nodes: Vec::new(),
            free_points: Vec::new(),
            len: 0,
        };
        index.clear();
        index
    }

    /// World bounds this index covers. Covering the whole play area is a
    /// setup invariant of the orchestrator, not a per-call concern.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Number of points currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reset to a single empty root, keeping node allocations for reuse.
    pub fn clear(&mut self) {
        let bounds = self.bounds;
        for node in self.nodes.drain(..) {
            let mut points = node.points;
            points.clear();
            self.free_points.push(points);
        }
        self.len = 0;
        let root = self.make_node(bounds, 0);
        debug_assert_eq!(root, 0);
    }

    fn make_node(&mut self, region: Rect, depth: u8) -> usize {
        let points = self.free_points.pop().unwrap_or_default();
        self.nodes.push(Node {
            region,
            depth,
            points,
            children: None,
        });
        self.nodes.len() - 1
    }

    /// Insert a position snapshot. Returns `false` if the point lies outside
    /// the index bounds; that is a caller error, not a recoverable state.
    pub fn insert(&mut self, entity: Entity, x: f32, y: f32, radius: f32) -> bool {
        if !self.bounds.contains(x, y) {
            return false;
        }
        let entry = SpatialEntry {
            entity,
            x,
            y,
            radius,
        };
        let mut idx = 0;
        loop {
            let node = &self.nodes[idx];
            if let Some(children) = node.children {
                idx = children[Self::quadrant(&node.region, x, y)];
                continue;
            }
            if node.points.len() < self.capacity || node.depth >= MAX_DEPTH {
                self.nodes[idx].points.push(entry);
                self.len += 1;
                return true;
            }
            self.subdivide(idx);
        }
    }

    #[inline]
    fn quadrant(region: &Rect, x: f32, y: f32) -> usize {
        let east = x > region.x;
        let north = y > region.y;
        match (east, north) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        }
    }

    fn subdivide(&mut self, idx: usize) {
        let region = self.nodes[idx].region;
        let depth = self.nodes[idx].depth + 1;
        let hw = region.hw * 0.5;
        let hh = region.hh * 0.5;
        let children = [
            self.make_node(Rect::new(region.x - hw, region.y - hh, hw, hh), depth),
            self.make_node(Rect::new(region.x + hw, region.y - hh, hw, hh), depth),
            self.make_node(Rect::new(region.x - hw, region.y + hh, hw, hh), depth),
            self.make_node(Rect::new(region.x + hw, region.y + hh, hw, hh), depth),
        ];
        let points = std::mem::take(&mut self.nodes[idx].points);
        self.nodes[idx].children = Some(children);
        for entry in &points {
            let child = children[Self::quadrant(&region, entry.x, entry.y)];
            self.nodes[child].points.push(*entry);
        }
        let mut recycled = points;
        recycled.clear();
        self.free_points.push(recycled);
    }

    /// Collect every stored point whose containing node intersects `range`.
    ///
    /// Appends into `out` so callers can reuse a scratch buffer. Results can
    /// include points just outside `range` (boundary imprecision); callers
    /// re-check exact distance.
    pub fn query_rect(&self, range: &Rect, out: &mut Vec<SpatialEntry>) {
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !node.region.intersects(range) {
                continue;
            }
            for entry in &node.points {
                if range.contains(entry.x, entry.y) {
                    out.push(*entry);
                }
            }
            if let Some(children) = node.children {
                stack.extend_from_slice(&children);
            }
        }
    }

    /// Rect query followed by an exact circle check.
    pub fn query_circle(&self, x: f32, y: f32, radius: f32, out: &mut Vec<SpatialEntry>) {
        let start = out.len();
        self.query_rect(&Rect::new(x, y, radius, radius), out);
        let r_sq = radius * radius;
        let mut write = start;
        for read in start..out.len() {
            let e = out[read];
            let dx = e.x - x;
            let dy = e.y - y;
            if dx * dx + dy * dy <= r_sq {
                out[write] = e;
                write += 1;
            }
        }
        out.truncate(write);
    }
}

/// System that rebuilds the index from the active enemy snapshot. Runs
/// first in the tick; every later proximity consumer reads this tick's
/// positions, never last tick's.
pub fn spatial_index_rebuild_system(
    mut index: ResMut<SpatialIndex>,
    query: Query<(Entity, &Position, &Radius, &Health, &Active), With<EnemyKind>>,
) {
    index.clear();
    for (entity, pos, radius, health, active) in query.iter() {
        if !active.0 || !health.is_alive() {
            continue;
        }
        if !index.insert(entity, pos.x, pos.y, radius.0) {
            log::debug!(
                "enemy {entity:?} at ({}, {}) outside world bounds",
                pos.x,
                pos.y
            );
        }
    }
}
