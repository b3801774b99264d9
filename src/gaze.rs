use crate::error::{FootfallError, Result};
use crate::observation::GazePoint;

pub const GRID_COLUMNS: u32 = 6;
pub const GRID_ROWS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GazeCell {
    pub column: u32,
    pub row: u32,
}

/// Screen split into equally sized cells
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeGrid {
    columns: u32,
    rows: u32,
    cell_width: f32,
    cell_height: f32,
}

impl GazeGrid {
    /// The default 6 x 4 layout over a screen of the given pixel size
    pub fn new(screen_width: u32, screen_height: u32) -> Result<Self> {
        Self::with_layout(GRID_COLUMNS, GRID_ROWS, screen_width, screen_height)
    }

    pub fn with_layout(columns: u32, rows: u32, screen_width: u32, screen_height: u32) -> Result<Self> {
        if columns == 0 || rows == 0 || screen_width == 0 || screen_height == 0 {
            return Err(FootfallError::config(format!(
                "gaze grid needs a non-empty layout, got {}x{} cells over {}x{} px",
                columns, rows, screen_width, screen_height
            )));
        }
        Ok(Self {
            columns,
            rows,
            cell_width: screen_width as f32 / columns as f32,
            cell_height: screen_height as f32 / rows as f32,
        })
    }

    pub fn cells(&self) -> u32 {
        self.columns * self.rows
    }

    /// Row-major index of a cell
    pub fn index(&self, cell: GazeCell) -> u32 {
        cell.row * self.columns + cell.column
    }

    /// Cell under the point, or `None` when the point is off screen
    pub fn locate(&self, point: GazePoint) -> Option<GazeCell> {
        if !(point.x >= 0.0 && point.y >= 0.0) {
            return None;
        }
        let column = (point.x / self.cell_width) as u32;
        let row = (point.y / self.cell_height) as u32;
        (column < self.columns && row < self.rows).then_some(GazeCell { column, row })
    }
}

/// Cell hand-over reported when the gaze moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GazeTransition {
    pub released: Option<GazeCell>,
    pub highlighted: GazeCell,
}

/// Keeps track of the highlighted cell between frames
#[derive(Debug, Clone)]
pub struct GazeTracker {
    grid: GazeGrid,
    active: Option<GazeCell>,
}

impl GazeTracker {
    pub fn new(grid: GazeGrid) -> Self {
        Self { grid, active: None }
    }

    pub fn grid(&self) -> &GazeGrid {
        &self.grid
    }

    pub fn active(&self) -> Option<GazeCell> {
        self.active
    }

    /// A missing or off-screen gaze leaves the current highlight alone
    pub fn update(&mut self, gaze: Option<GazePoint>) -> Option<GazeTransition> {
        let cell = self.grid.locate(gaze?)?;
        if self.active == Some(cell) {
            return None;
        }
        let released = self.active.replace(cell);
        Some(GazeTransition {
            released,
            highlighted: cell,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f32, y: f32) -> GazePoint {
        GazePoint { x, y }
    }

    #[test]
    fn locates_cells_on_a_full_hd_screen() {
        let grid = GazeGrid::new(1920, 1080).unwrap();
        assert_eq!(grid.cells(), 24);
        assert_eq!(grid.locate(point(0.0, 0.0)), Some(GazeCell { column: 0, row: 0 }));
        let corner = grid.locate(point(1919.0, 1079.0)).unwrap();
        assert_eq!(corner, GazeCell { column: 5, row: 3 });
        assert_eq!(grid.index(corner), 23);
        assert_eq!(grid.locate(point(330.0, 280.0)), Some(GazeCell { column: 1, row: 1 }));
    }

    #[test]
    fn off_screen_points_have_no_cell() {
        let grid = GazeGrid::new(1920, 1080).unwrap();
        assert!(grid.locate(point(-1.0, 10.0)).is_none());
        assert!(grid.locate(point(1920.0, 10.0)).is_none());
        assert!(grid.locate(point(10.0, 5000.0)).is_none());
        assert!(grid.locate(point(f32::NAN, 10.0)).is_none());
    }

    #[test]
    fn rejects_empty_layouts() {
        assert!(GazeGrid::new(0, 1080).is_err());
        assert!(GazeGrid::with_layout(0, 4, 640, 480).is_err());
    }

    #[test]
    fn tracker_reports_only_cell_changes() {
        let mut tracker = GazeTracker::new(GazeGrid::new(600, 400).unwrap());
        let first = tracker.update(Some(point(10.0, 10.0))).unwrap();
        assert_eq!(first.released, None);
        assert_eq!(first.highlighted, GazeCell { column: 0, row: 0 });

        assert!(tracker.update(Some(point(20.0, 20.0))).is_none());
        assert!(tracker.update(None).is_none());
        assert!(tracker.update(Some(point(-5.0, 0.0))).is_none());

        let moved = tracker.update(Some(point(590.0, 390.0))).unwrap();
        assert_eq!(moved.released, Some(GazeCell { column: 0, row: 0 }));
        assert_eq!(tracker.active(), Some(GazeCell { column: 5, row: 3 }));
    }
}
