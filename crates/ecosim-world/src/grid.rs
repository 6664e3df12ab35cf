//! The resource field: a rectangular grid of grass levels.
//!
//! Every cell holds a level in `[0, max_resource]`. Each tick the grid is
//! advanced as a single step computed from the previous tick's levels:
//!
//! - a cell at or above the maximum stays at the maximum;
//! - a partially grown cell gains `growth_rate * dt`, capped at the maximum;
//! - an empty cell starts regrowing only when one of its four orthogonal
//!   neighbours is at the maximum.
//!
//! Because the update reads only the old buffer, regrowth spreads at most
//! one cell per tick.

use ecosim_types::{CellSnapshot, Vec2};
use tracing::debug;

use crate::cell::{CellCoord, GridDims};
use crate::error::WorldError;

/// Parameters for building an [`EnvironmentGrid`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridParams {
    /// Number of columns.
    pub columns: u32,
    /// Number of rows.
    pub rows: u32,
    /// Edge length of a cell in world units.
    pub cell_size: f64,
    /// Maximum resource level of a cell.
    pub max_resource: f64,
    /// Regrowth per unit of simulated time.
    pub growth_rate: f64,
    /// Level every cell starts at. Clamped to `[0, max_resource]`.
    pub initial_level: f64,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            columns: 52,
            rows: 24,
            cell_size: 25.0,
            max_resource: 50.0,
            growth_rate: 2.0,
            initial_level: 50.0,
        }
    }
}

/// Grid of resource levels covering the whole field.
#[derive(Debug, Clone)]
pub struct EnvironmentGrid {
    dims: GridDims,
    max_resource: f64,
    growth_rate: f64,
    levels: Vec<f64>,
}

impl EnvironmentGrid {
    /// Build a grid with every cell at `params.initial_level`.
    pub fn new(params: &GridParams) -> Result<Self, WorldError> {
        let dims = GridDims::new(params.columns, params.rows, params.cell_size)?;
        if !params.max_resource.is_finite() || params.max_resource <= 0.0 {
            return Err(WorldError::InvalidResourceParams {
                reason: format!("max_resource must be positive, got {}", params.max_resource),
            });
        }
        if !params.growth_rate.is_finite() || params.growth_rate < 0.0 {
            return Err(WorldError::InvalidResourceParams {
                reason: format!("growth_rate must be non-negative, got {}", params.growth_rate),
            });
        }
        if !params.initial_level.is_finite() {
            return Err(WorldError::InvalidResourceParams {
                reason: format!("initial_level must be finite, got {}", params.initial_level),
            });
        }

        let initial = params.initial_level.clamp(0.0, params.max_resource);
        debug!(
            columns = params.columns,
            rows = params.rows,
            cell_size = params.cell_size,
            initial,
            "environment grid created"
        );

        Ok(Self {
            dims,
            max_resource: params.max_resource,
            growth_rate: params.growth_rate,
            levels: vec![initial; dims.cell_count()],
        })
    }

    /// Grid dimensions, shared with the spatial index.
    pub const fn dims(&self) -> &GridDims {
        &self.dims
    }

    /// Maximum resource level of a cell.
    pub const fn max_resource(&self) -> f64 {
        self.max_resource
    }

    /// Regrowth per unit of simulated time.
    pub const fn growth_rate(&self) -> f64 {
        self.growth_rate
    }

    /// Level of the cell at `coord`, or `None` if it is off the grid.
    pub fn level(&self, coord: CellCoord) -> Option<f64> {
        let index = self.dims.flat_index(coord)?;
        self.levels.get(index).copied()
    }

    /// Level of the cell containing `pos`. Positions on the far edge of the
    /// field read the last cell; positions outside it report an empty cell.
    pub fn level_at(&self, pos: Vec2) -> f64 {
        self.dims
            .field_cell_of(pos)
            .and_then(|coord| self.level(coord))
            .unwrap_or(0.0)
    }

    /// Overwrite the level of one cell, clamped to `[0, max_resource]`.
    /// Returns `false` if the cell is off the grid.
    pub fn set_level(&mut self, coord: CellCoord, level: f64) -> bool {
        let clamped = if level.is_finite() {
            level.clamp(0.0, self.max_resource)
        } else {
            0.0
        };
        match self
            .dims
            .flat_index(coord)
            .and_then(|index| self.levels.get_mut(index))
        {
            Some(slot) => {
                *slot = clamped;
                true
            }
            None => false,
        }
    }

    /// Empty the cell containing `pos` and return how much it held.
    /// Positions on the far edge empty the last cell; positions outside the
    /// field yield nothing.
    pub fn deplete(&mut self, pos: Vec2) -> f64 {
        let Some(slot) = self
            .dims
            .field_cell_of(pos)
            .and_then(|coord| self.dims.flat_index(coord))
            .and_then(|index| self.levels.get_mut(index))
        else {
            return 0.0;
        };
        std::mem::replace(slot, 0.0)
    }

    /// Advance every cell by one regrowth step of length `dt`.
    ///
    /// Non-finite or negative `dt` leaves the grid untouched.
    pub fn advance(&mut self, dt: f64) {
        if !dt.is_finite() || dt < 0.0 {
            return;
        }
        let growth = self.growth_rate * dt;
        let max = self.max_resource;

        let next: Vec<f64> = self
            .dims
            .coords()
            .map(|coord| {
                let current = self.level(coord).unwrap_or(0.0);
                let grown = if current >= max {
                    max
                } else if current > 0.0 {
                    current + growth
                } else if self.has_full_neighbor(coord) {
                    growth
                } else {
                    0.0
                };
                grown.clamp(0.0, max)
            })
            .collect();

        self.levels = next;
    }

    /// Whether any orthogonal neighbour of `coord` is at the maximum.
    fn has_full_neighbor(&self, coord: CellCoord) -> bool {
        let column = i64::from(coord.column);
        let row = i64::from(coord.row);
        [(-1_i64, 0_i64), (1, 0), (0, -1), (0, 1)]
            .into_iter()
            .filter_map(|(dc, dr)| {
                self.dims
                    .checked_coord(column.saturating_add(dc), row.saturating_add(dr))
            })
            .filter_map(|neighbor| self.level(neighbor))
            .any(|level| level >= self.max_resource)
    }

    /// Sum of all cell levels.
    pub fn total(&self) -> f64 {
        self.levels.iter().sum()
    }

    /// Snapshot of every cell for rendering and inspection.
    pub fn snapshot(&self) -> Vec<CellSnapshot> {
        self.dims
            .coords()
            .zip(self.levels.iter())
            .map(|(coord, &level)| CellSnapshot {
                column: coord.column,
                row: coord.row,
                level,
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn params(columns: u32, rows: u32, initial_level: f64) -> GridParams {
        GridParams {
            columns,
            rows,
            cell_size: 25.0,
            max_resource: 50.0,
            growth_rate: 2.0,
            initial_level,
        }
    }

    fn row_levels(grid: &EnvironmentGrid) -> Vec<f64> {
        (0..grid.dims().columns())
            .map(|c| grid.level(CellCoord::new(c, 0)).unwrap())
            .collect()
    }

    #[test]
    fn default_grid_starts_full() {
        let grid = EnvironmentGrid::new(&GridParams::default()).unwrap();
        assert_eq!(grid.dims().cell_count(), 52 * 24);
        assert!((grid.total() - 50.0 * 52.0 * 24.0).abs() < EPS);
    }

    #[test]
    fn rejects_invalid_resource_params() {
        let mut p = params(2, 2, 0.0);
        p.max_resource = 0.0;
        assert!(EnvironmentGrid::new(&p).is_err());
        let mut p = params(2, 2, 0.0);
        p.growth_rate = -1.0;
        assert!(EnvironmentGrid::new(&p).is_err());
        let mut p = params(2, 2, 0.0);
        p.initial_level = f64::INFINITY;
        assert!(EnvironmentGrid::new(&p).is_err());
    }

    #[test]
    fn deplete_empties_cell_and_returns_amount() {
        let mut grid = EnvironmentGrid::new(&params(3, 3, 50.0)).unwrap();
        let taken = grid.deplete(Vec2::new(30.0, 30.0));
        assert!((taken - 50.0).abs() < EPS);
        assert!(grid.level(CellCoord::new(1, 1)).unwrap().abs() < EPS);
        assert!(grid.deplete(Vec2::new(30.0, 30.0)).abs() < EPS);
    }

    #[test]
    fn deplete_outside_field_yields_nothing() {
        let mut grid = EnvironmentGrid::new(&params(3, 3, 50.0)).unwrap();
        assert!(grid.deplete(Vec2::new(-5.0, 10.0)).abs() < EPS);
        assert!(grid.deplete(Vec2::new(10.0, 500.0)).abs() < EPS);
        assert!((grid.total() - 450.0).abs() < EPS);
    }

    #[test]
    fn far_edge_positions_deplete_last_cell() {
        let mut grid = EnvironmentGrid::new(&params(3, 3, 50.0)).unwrap();
        assert!((grid.level_at(Vec2::new(75.0, 30.0)) - 50.0).abs() < EPS);
        assert!((grid.deplete(Vec2::new(75.0, 30.0)) - 50.0).abs() < EPS);
        assert!(grid.level(CellCoord::new(2, 1)).unwrap().abs() < EPS);
        assert!((grid.deplete(Vec2::new(75.0, 75.0)) - 50.0).abs() < EPS);
        assert!(grid.level(CellCoord::new(2, 2)).unwrap().abs() < EPS);
    }

    #[test]
    fn partial_cell_grows_and_caps_at_max() {
        let mut grid = EnvironmentGrid::new(&params(1, 1, 49.0)).unwrap();
        grid.advance(0.25);
        assert!((grid.level(CellCoord::new(0, 0)).unwrap() - 49.5).abs() < EPS);
        grid.advance(10.0);
        assert!((grid.level(CellCoord::new(0, 0)).unwrap() - 50.0).abs() < EPS);
    }

    #[test]
    fn isolated_empty_cell_stays_empty() {
        let mut grid = EnvironmentGrid::new(&params(3, 3, 10.0)).unwrap();
        grid.set_level(CellCoord::new(1, 1), 0.0);
        grid.advance(1.0);
        assert!(grid.level(CellCoord::new(1, 1)).unwrap().abs() < EPS);
    }

    #[test]
    fn diagonal_full_neighbor_does_not_seed() {
        let mut grid = EnvironmentGrid::new(&params(2, 2, 0.0)).unwrap();
        grid.set_level(CellCoord::new(0, 0), 50.0);
        grid.advance(1.0);
        assert!(grid.level(CellCoord::new(1, 1)).unwrap().abs() < EPS);
        assert!((grid.level(CellCoord::new(1, 0)).unwrap() - 2.0).abs() < EPS);
        assert!((grid.level(CellCoord::new(0, 1)).unwrap() - 2.0).abs() < EPS);
    }

    #[test]
    fn regrowth_spreads_one_cell_per_step() {
        let mut grid = EnvironmentGrid::new(&params(4, 1, 0.0)).unwrap();
        grid.set_level(CellCoord::new(0, 0), 50.0);
        grid.advance(1.0);
        let levels = row_levels(&grid);
        assert!((levels[0] - 50.0).abs() < EPS);
        assert!((levels[1] - 2.0).abs() < EPS);
        assert!(levels[2].abs() < EPS);
        assert!(levels[3].abs() < EPS);
    }

    #[test]
    fn levels_stay_in_bounds() {
        let mut grid = EnvironmentGrid::new(&params(6, 5, 0.0)).unwrap();
        for (i, coord) in grid.dims().coords().collect::<Vec<_>>().into_iter().enumerate() {
            let level = f64::from(u32::try_from(i % 7).unwrap()) * 9.0;
            grid.set_level(coord, level);
        }
        for _ in 0..200 {
            grid.advance(0.7);
            for cell in grid.snapshot() {
                assert!(cell.level >= 0.0 && cell.level <= 50.0);
            }
        }
    }

    #[test]
    fn set_level_clamps_and_rejects_off_grid() {
        let mut grid = EnvironmentGrid::new(&params(2, 2, 0.0)).unwrap();
        assert!(grid.set_level(CellCoord::new(0, 0), 80.0));
        assert!((grid.level(CellCoord::new(0, 0)).unwrap() - 50.0).abs() < EPS);
        assert!(grid.set_level(CellCoord::new(1, 0), -3.0));
        assert!(grid.level(CellCoord::new(1, 0)).unwrap().abs() < EPS);
        assert!(!grid.set_level(CellCoord::new(2, 0), 1.0));
    }

    #[test]
    fn negative_dt_is_ignored() {
        let mut grid = EnvironmentGrid::new(&params(1, 1, 10.0)).unwrap();
        grid.advance(-1.0);
        grid.advance(f64::NAN);
        assert!((grid.level(CellCoord::new(0, 0)).unwrap() - 10.0).abs() < EPS);
    }

    #[test]
    fn snapshot_covers_every_cell() {
        let grid = EnvironmentGrid::new(&params(3, 2, 7.0)).unwrap();
        let cells = grid.snapshot();
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[4].column, 1);
        assert_eq!(cells[4].row, 1);
        assert!((cells[4].level - 7.0).abs() < EPS);
    }
}
