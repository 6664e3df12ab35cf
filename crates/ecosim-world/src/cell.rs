//! Cell coordinates shared by the resource grid and the spatial index.
//!
//! Both structures divide the field into the same square cells, so a
//! position always maps to the same `(column, row)` in either of them.

use ecosim_types::Vec2;

use crate::error::WorldError;

/// Integer coordinate of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellCoord {
    /// Column index, `x / cell_size`.
    pub column: u32,
    /// Row index, `y / cell_size`.
    pub row: u32,
}

impl CellCoord {
    /// Create a cell coordinate.
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }
}

/// Dimensions of a cell grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridDims {
    columns: u32,
    rows: u32,
    cell_size: f64,
    cell_count: usize,
}

impl GridDims {
    /// Validate and build grid dimensions.
    pub fn new(columns: u32, rows: u32, cell_size: f64) -> Result<Self, WorldError> {
        if columns == 0 || rows == 0 {
            return Err(WorldError::InvalidDimensions { columns, rows });
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(WorldError::InvalidCellSize(cell_size));
        }
        let cell_count = usize::try_from(columns)
            .ok()
            .zip(usize::try_from(rows).ok())
            .and_then(|(c, r)| c.checked_mul(r))
            .ok_or(WorldError::ArithmeticOverflow)?;
        Ok(Self {
            columns,
            rows,
            cell_size,
            cell_count,
        })
    }

    /// Number of columns.
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows.
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Edge length of a cell in world units.
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Total number of cells.
    pub const fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Width of the field in world units.
    pub fn width(&self) -> f64 {
        f64::from(self.columns) * self.cell_size
    }

    /// Height of the field in world units.
    pub fn height(&self) -> f64 {
        f64::from(self.rows) * self.cell_size
    }

    /// Unclamped `(column, row)` of the cell containing `pos`. May lie
    /// outside the grid. `None` for non-finite positions.
    pub fn raw_cell(&self, pos: Vec2) -> Option<(i64, i64)> {
        if !pos.is_finite() {
            return None;
        }
        Some((
            to_cell_index(pos.x / self.cell_size),
            to_cell_index(pos.y / self.cell_size),
        ))
    }

    /// The in-bounds cell containing `pos`, or `None` outside the grid.
    pub fn cell_of(&self, pos: Vec2) -> Option<CellCoord> {
        let (column, row) = self.raw_cell(pos)?;
        self.checked_coord(column, row)
    }

    /// The cell containing `pos` for any position inside the closed field
    /// `[0, width] x [0, height]`. The far edges belong to the last column
    /// and row, matching where the spatial index files them.
    pub fn field_cell_of(&self, pos: Vec2) -> Option<CellCoord> {
        let inside = pos.is_finite()
            && (0.0..=self.width()).contains(&pos.x)
            && (0.0..=self.height()).contains(&pos.y);
        inside.then(|| self.clamped_cell_of(pos))
    }

    /// The cell containing `pos`, clamped to the nearest edge cell when the
    /// position lies outside the grid.
    pub fn clamped_cell_of(&self, pos: Vec2) -> CellCoord {
        let (column, row) = self.raw_cell(pos).unwrap_or((0, 0));
        CellCoord::new(
            clamp_index(column, self.columns),
            clamp_index(row, self.rows),
        )
    }

    /// Convert a signed coordinate into a [`CellCoord`] if it is on the grid.
    pub fn checked_coord(&self, column: i64, row: i64) -> Option<CellCoord> {
        let column = u32::try_from(column).ok()?;
        let row = u32::try_from(row).ok()?;
        (column < self.columns && row < self.rows).then_some(CellCoord::new(column, row))
    }

    /// Row-major index of a cell in a flat buffer.
    pub fn flat_index(&self, coord: CellCoord) -> Option<usize> {
        if coord.column >= self.columns || coord.row >= self.rows {
            return None;
        }
        let row_start = coord.row.checked_mul(self.columns)?;
        let index = row_start.checked_add(coord.column)?;
        usize::try_from(index).ok()
    }

    /// Inverse of [`flat_index`](Self::flat_index).
    pub fn coord_of_index(&self, index: usize) -> Option<CellCoord> {
        let index = u32::try_from(index).ok()?;
        let row = index.checked_div(self.columns)?;
        let column = index.checked_rem(self.columns)?;
        (row < self.rows).then_some(CellCoord::new(column, row))
    }

    /// Iterate over every cell in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = CellCoord> + use<> {
        let columns = self.columns;
        (0..self.rows).flat_map(move |row| (0..columns).map(move |column| CellCoord::new(column, row)))
    }
}

/// Floor a cell-space coordinate to a signed cell index.
#[allow(clippy::cast_possible_truncation)] // Saturating float-to-int cast is the intent.
fn to_cell_index(value: f64) -> i64 {
    value.floor() as i64
}

/// Clamp a signed index into `[0, len)`.
fn clamp_index(value: i64, len: u32) -> u32 {
    let max = len.saturating_sub(1);
    u32::try_from(value.max(0)).map_or(max, |v| v.min(max))
}
