use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A row-major matrix of integer samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridRepr")]
pub struct Grid {
    rows: usize,
    cols: usize,
    samples: Vec<i32>,
}

/// Wire form of a [`Grid`]; checked against its shape on the way in.
#[derive(Deserialize)]
struct GridRepr {
    rows: usize,
    cols: usize,
    samples: Vec<i32>,
}

impl TryFrom<GridRepr> for Grid {
    type Error = CoreError;

    fn try_from(repr: GridRepr) -> Result<Self, Self::Error> {
        Grid::new(repr.rows, repr.cols, repr.samples)
    }
}

impl Grid {
    /// Build a grid from row-major samples. Fails if the sample count does not match the shape.
    pub fn new(rows: usize, cols: usize, samples: Vec<i32>) -> Result<Self, CoreError> {
        let expected = rows
            .checked_mul(cols)
            .ok_or(CoreError::ShapeOverflow { rows, cols })?;
        if samples.len() != expected {
            return Err(CoreError::ShapeMismatch {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            rows,
            cols,
            samples,
        })
    }

    /// Build a grid by evaluating `f(row, col)` for every cell.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> i32) -> Self {
        let mut samples = Vec::with_capacity(rows.checked_mul(cols).unwrap_or(0));
        for r in 0..rows {
            for c in 0..cols {
                samples.push(f(r, c));
            }
        }
        Self {
            rows,
            cols,
            samples,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<i32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.samples.get(row * self.cols + col).copied()
    }

    /// Iterate rows as slices, top to bottom.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[i32]> {
        // chunks(0) panics; an empty grid simply has no rows.
        self.samples.chunks(self.cols.max(1)).take(self.rows)
    }

    pub fn samples(&self) -> &[i32] {
        &self.samples
    }

    /// Copy out the `height × width` window whose top-left corner is `(row, col)`.
    ///
    /// Returns `None` if the window does not fit inside the grid.
    pub fn window(&self, row: usize, col: usize, height: usize, width: usize) -> Option<Grid> {
        let fits = |start: usize, len: usize, limit: usize| {
            start.checked_add(len).is_some_and(|end| end <= limit)
        };
        if !fits(row, height, self.rows) || !fits(col, width, self.cols) {
            return None;
        }
        let mut samples = Vec::with_capacity(height * width);
        for r in row..row + height {
            let start = r * self.cols + col;
            samples.extend_from_slice(&self.samples[start..start + width]);
        }
        Some(Grid {
            rows: height,
            cols: width,
            samples,
        })
    }

    /// Apply `f` to every sample, keeping the shape.
    pub fn map(&self, f: impl Fn(i32) -> i32) -> Grid {
        Grid {
            rows: self.rows,
            cols: self.cols,
            samples: self.samples.iter().map(|&v| f(v)).collect(),
        }
    }
}
