//! Uniform bucket grid for proximity queries.
//!
//! Every live agent sits in exactly one bucket, the cell containing its
//! position. Positions outside the field are clamped to the nearest edge
//! bucket, so an agent that momentarily overshoots the boundary is never
//! lost from the index.
//!
//! The index also tracks which bucket each agent was filed under, which
//! makes removal O(bucket) and lets callers verify consistency.

use std::collections::BTreeMap;

use ecosim_types::{AgentId, Vec2};
use tracing::trace;

use crate::cell::{CellCoord, GridDims};
use crate::error::WorldError;
use crate::grid::EnvironmentGrid;

/// Bucket grid mapping cells to the agents inside them.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    dims: GridDims,
    buckets: Vec<Vec<AgentId>>,
    locations: BTreeMap<AgentId, usize>,
}

impl SpatialIndex {
    /// Build an empty index with the given dimensions.
    pub fn new(columns: u32, rows: u32, cell_size: f64) -> Result<Self, WorldError> {
        Ok(Self::with_dims(GridDims::new(columns, rows, cell_size)?))
    }

    /// Build an empty index sharing the resource grid's cells.
    pub fn for_grid(grid: &EnvironmentGrid) -> Self {
        Self::with_dims(*grid.dims())
    }

    fn with_dims(dims: GridDims) -> Self {
        Self {
            dims,
            buckets: vec![Vec::new(); dims.cell_count()],
            locations: BTreeMap::new(),
        }
    }

    /// Grid dimensions of the index.
    pub const fn dims(&self) -> &GridDims {
        &self.dims
    }

    /// Number of indexed agents.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the index holds no agents.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Whether `id` is indexed.
    pub fn contains(&self, id: AgentId) -> bool {
        self.locations.contains_key(&id)
    }

    /// The bucket `id` is currently filed under.
    pub fn bucket_of(&self, id: AgentId) -> Option<CellCoord> {
        self.locations
            .get(&id)
            .and_then(|&index| self.dims.coord_of_index(index))
    }

    /// The bucket a position would be filed under.
    pub fn bucket_for(&self, pos: Vec2) -> CellCoord {
        self.dims.clamped_cell_of(pos)
    }

    /// Agents filed under one bucket, in insertion order.
    pub fn agents_in(&self, coord: CellCoord) -> &[AgentId] {
        self.dims
            .flat_index(coord)
            .and_then(|index| self.buckets.get(index))
            .map_or(&[], Vec::as_slice)
    }

    fn bucket_index(&self, pos: Vec2) -> Option<usize> {
        self.dims.flat_index(self.dims.clamped_cell_of(pos))
    }

    /// File a new agent under the bucket containing `pos`.
    pub fn insert(&mut self, id: AgentId, pos: Vec2) -> Result<(), WorldError> {
        if self.locations.contains_key(&id) {
            return Err(WorldError::DuplicateAgent(id));
        }
        let index = self.bucket_index(pos).ok_or(WorldError::ArithmeticOverflow)?;
        let bucket = self
            .buckets
            .get_mut(index)
            .ok_or(WorldError::ArithmeticOverflow)?;
        bucket.push(id);
        self.locations.insert(id, index);
        trace!(agent = %id, bucket = index, "agent indexed");
        Ok(())
    }

    /// Drop an agent from the index. Returns `false` if it was not indexed.
    pub fn remove(&mut self, id: AgentId) -> bool {
        let Some(index) = self.locations.remove(&id) else {
            return false;
        };
        if let Some(bucket) = self.buckets.get_mut(index) {
            bucket.retain(|&other| other != id);
        }
        trace!(agent = %id, bucket = index, "agent unindexed");
        true
    }

    /// Move an agent from the bucket of `old_pos` to the bucket of
    /// `new_pos`. A no-op when both positions share a bucket.
    pub fn relocate(&mut self, id: AgentId, old_pos: Vec2, new_pos: Vec2) -> Result<(), WorldError> {
        let current = *self
            .locations
            .get(&id)
            .ok_or(WorldError::AgentNotIndexed(id))?;
        let target = self
            .bucket_index(new_pos)
            .ok_or(WorldError::ArithmeticOverflow)?;
        if current == target {
            return Ok(());
        }
        if self.bucket_index(old_pos) != Some(current) {
            trace!(agent = %id, "stale old position on relocate, using tracked bucket");
        }

        if let Some(bucket) = self.buckets.get_mut(current) {
            bucket.retain(|&other| other != id);
        }
        let bucket = self
            .buckets
            .get_mut(target)
            .ok_or(WorldError::ArithmeticOverflow)?;
        bucket.push(id);
        self.locations.insert(id, target);
        Ok(())
    }

    /// Every agent in the square block of buckets within `radius` of `pos`.
    ///
    /// The block spans `ceil(radius / cell_size)` buckets on each side of
    /// the bucket containing `pos`. Buckets off the grid are skipped. The
    /// result is a superset of the agents truly within `radius`; callers
    /// filter by exact distance.
    pub fn neighbors_within(&self, pos: Vec2, radius: f64) -> Vec<AgentId> {
        let Some((center_column, center_row)) = self.dims.raw_cell(pos) else {
            return Vec::new();
        };
        let span = bucket_span(radius, self.dims.cell_size());

        let max_column = i64::from(self.dims.columns()).saturating_sub(1);
        let max_row = i64::from(self.dims.rows()).saturating_sub(1);
        let first_column = center_column.saturating_sub(span).max(0);
        let last_column = center_column.saturating_add(span).min(max_column);
        let first_row = center_row.saturating_sub(span).max(0);
        let last_row = center_row.saturating_add(span).min(max_row);

        let mut found = Vec::new();
        for row in first_row..=last_row {
            for column in first_column..=last_column {
                if let Some(coord) = self.dims.checked_coord(column, row) {
                    found.extend_from_slice(self.agents_in(coord));
                }
            }
        }
        found
    }

    /// Whether `id` is filed under the bucket its position maps to.
    pub fn is_filed_at(&self, id: AgentId, pos: Vec2) -> bool {
        let Some(&index) = self.locations.get(&id) else {
            return false;
        };
        self.bucket_index(pos) == Some(index)
            && self
                .buckets
                .get(index)
                .is_some_and(|bucket| bucket.contains(&id))
    }

    /// Total number of bucket entries. Equals [`len`](Self::len) when the
    /// index is consistent.
    pub fn entry_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }
}

/// Number of buckets to scan on each side of the centre bucket.
#[allow(clippy::cast_possible_truncation)] // Saturating float-to-int cast is the intent.
fn bucket_span(radius: f64, cell_size: f64) -> i64 {
    if !radius.is_finite() || radius <= 0.0 {
        return 0;
    }
    (radius / cell_size).ceil() as i64
}
