use thiserror::Error;

/// Row-major cell grid.
///
/// - Cell `(column, row)` lives at index `row * width + column`.
/// - Row 0 is the first row stored; callers decide whether that is the top or the bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    width: u32,
    height: u32,
    cells: Vec<T>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },
    #[error("cell count mismatch: expected {expected}, got {actual}")]
    CellCountMismatch { expected: usize, actual: usize },
}

impl<T> Grid<T> {
    pub fn new(width: u32, height: u32, cells: Vec<T>) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        let actual = cells.len();
        if expected != actual {
            return Err(GridError::CellCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index_of(&self, column: u32, row: u32) -> Option<usize> {
        if column >= self.width || row >= self.height {
            return None;
        }
        Some(row as usize * self.width as usize + column as usize)
    }

    pub fn get(&self, column: u32, row: u32) -> Option<&T> {
        self.index_of(column, row)
            .and_then(|index| self.cells.get(index))
    }

    pub fn get_mut(&mut self, column: u32, row: u32) -> Option<&mut T> {
        let index = self.index_of(column, row)?;
        self.cells.get_mut(index)
    }

    /// Returns false when the cell is out of bounds.
    pub fn set(&mut self, column: u32, row: u32, value: T) -> bool {
        match self.get_mut(column, row) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    pub fn row(&self, row: u32) -> Option<&[T]> {
        if row >= self.height {
            return None;
        }
        let start = row as usize * self.width as usize;
        self.cells.get(start..start + self.width as usize)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.cells.chunks(self.width as usize)
    }

    pub fn cells(&self) -> impl Iterator<Item = (u32, u32, &T)> {
        let width = self.width as usize;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            ((index % width) as u32, (index / width) as u32, cell)
        })
    }
}

impl<T: Clone> Grid<T> {
    pub fn filled(width: u32, height: u32, value: T) -> Result<Self, GridError> {
        let count = width as usize * height as usize;
        Self::new(width, height, vec![value; count])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_invalid_cell_count() {
        let err = Grid::new(2, 2, vec![0u8, 1, 2]).expect_err("err");
        assert_eq!(
            err,
            GridError::CellCountMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn new_rejects_zero_dimensions() {
        let err = Grid::<u8>::new(0, 3, Vec::new()).expect_err("err");
        assert_eq!(
            err,
            GridError::EmptyDimensions {
                width: 0,
                height: 3
            }
        );
    }

    #[test]
    fn indexing_and_bounds() {
        let grid = Grid::new(2, 2, vec![10, 11, 12, 13]).expect("grid");
        assert_eq!(grid.index_of(0, 0), Some(0));
        assert_eq!(grid.index_of(1, 1), Some(3));
        assert_eq!(grid.get(1, 0), Some(&11));
        assert_eq!(grid.get(0, 1), Some(&12));
        assert_eq!(grid.index_of(2, 0), None);
        assert_eq!(grid.index_of(0, 2), None);
        assert_eq!(grid.get(2, 2), None);
    }

    #[test]
    fn set_writes_in_bounds_only() {
        let mut grid = Grid::filled(3, 2, '-').expect("grid");
        assert!(grid.set(2, 1, '#'));
        assert!(!grid.set(3, 1, '#'));
        assert_eq!(grid.row(1), Some(&['-', '-', '#'][..]));
        assert_eq!(grid.rows().count(), 2);
        let marked: Vec<_> = grid
            .cells()
            .filter(|(_, _, cell)| **cell == '#')
            .map(|(column, row, _)| (column, row))
            .collect();
        assert_eq!(marked, vec![(2, 1)]);
    }
}
