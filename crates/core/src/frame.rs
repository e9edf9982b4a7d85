//! Frames and the sliding-window frame source.
//!
//! A [`FrameLayout`] describes how a dataset is cut into overlapping
//! fixed-size windows: unit stride in both axes, row-major enumeration.
//! [`FrameSource`] walks that layout lazily and yields indexed [`Frame`]s.

use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// Position of a frame in the enumeration order (0-based, dense).
pub type TaskIndex = usize;

/// A fixed-size window cut from a dataset, tagged with its enumeration index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub index: TaskIndex,
    pub grid: Grid,
}

impl Frame {
    pub fn new(index: TaskIndex, grid: Grid) -> Self {
        Self { index, grid }
    }
}

/// Dataset and window dimensions; everything needed to enumerate frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLayout {
    pub dataset_rows: usize,
    pub dataset_cols: usize,
    pub window_rows: usize,
    pub window_cols: usize,
}

impl FrameLayout {
    pub fn new(dataset: (usize, usize), window: (usize, usize)) -> Self {
        Self {
            dataset_rows: dataset.0,
            dataset_cols: dataset.1,
            window_rows: window.0,
            window_cols: window.1,
        }
    }

    /// Layout for cutting `dataset` with a `window` of `(rows, cols)`.
    pub fn for_grid(dataset: &Grid, window: (usize, usize)) -> Self {
        Self::new(dataset.shape(), window)
    }

    /// Number of window origins along each axis, `(rows, cols)`.
    ///
    /// Zero on both axes when the window is empty or does not fit.
    pub fn origins(&self) -> (usize, usize) {
        let fits = self.window_rows > 0
            && self.window_cols > 0
            && self.window_rows <= self.dataset_rows
            && self.window_cols <= self.dataset_cols;
        if !fits {
            return (0, 0);
        }
        (
            self.dataset_rows - self.window_rows + 1,
            self.dataset_cols - self.window_cols + 1,
        )
    }

    /// Total number of frames this layout yields.
    ///
    /// Zero for a layout whose origin count does not fit in `usize`; no grid
    /// that large can exist.
    pub fn count(&self) -> usize {
        let (r, c) = self.origins();
        r.checked_mul(c).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Top-left `(row, col)` of the frame with the given index.
    pub fn origin(&self, index: TaskIndex) -> Option<(usize, usize)> {
        let (_, per_row) = self.origins();
        if index >= self.count() {
            return None;
        }
        Some((index / per_row, index % per_row))
    }

    /// Rebuild a dataset-shaped grid from frames ordered by index.
    ///
    /// Cell `(r, c)` comes from the frame whose origin is
    /// `(min(r, R - h), min(c, C - w))`, so interior cells take the frame that
    /// starts on them and the trailing edge is filled by the last frame on that axis.
    /// Returns `None` if `frames` does not match the layout.
    pub fn reconstruct(&self, frames: &[Frame]) -> Option<Grid> {
        if frames.len() != self.count() || frames.is_empty() {
            return None;
        }
        let (origin_rows, origin_cols) = self.origins();
        let last_row = origin_rows - 1;
        let last_col = origin_cols - 1;

        let mut samples =
            Vec::with_capacity(self.dataset_rows.checked_mul(self.dataset_cols).unwrap_or(0));
        for r in 0..self.dataset_rows {
            for c in 0..self.dataset_cols {
                let (or, oc) = (r.min(last_row), c.min(last_col));
                let frame = &frames[or * origin_cols + oc];
                if frame.index != or * origin_cols + oc {
                    return None;
                }
                samples.push(frame.grid.get(r - or, c - oc)?);
            }
        }
        Grid::new(self.dataset_rows, self.dataset_cols, samples).ok()
    }
}

/// Lazy iterator over every frame of a dataset, in index order.
///
/// Restart by constructing a new source (or cloning one before iterating);
/// the sequence depends only on the dataset and window.
#[derive(Debug, Clone)]
pub struct FrameSource<'a> {
    dataset: &'a Grid,
    layout: FrameLayout,
    next: TaskIndex,
}

impl<'a> FrameSource<'a> {
    pub fn new(dataset: &'a Grid, window: (usize, usize)) -> Self {
        let layout = FrameLayout::for_grid(dataset, window);
        if layout.is_empty() {
            tracing::warn!(
                dataset_rows = layout.dataset_rows,
                dataset_cols = layout.dataset_cols,
                window_rows = layout.window_rows,
                window_cols = layout.window_cols,
                "window does not fit dataset, no frames will be produced"
            );
        }
        Self {
            dataset,
            layout,
            next: 0,
        }
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }
}

impl Iterator for FrameSource<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let (row, col) = self.layout.origin(self.next)?;
        let grid = self.dataset.window(
            row,
            col,
            self.layout.window_rows,
            self.layout.window_cols,
        )?;
        let frame = Frame::new(self.next, grid);
        self.next += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.layout.count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameSource<'_> {}
