//! Dataset construction: synthetic ramps and whitespace-separated tables.

use std::path::Path;

use crate::error::CoreError;
use crate::grid::Grid;

/// A `rows × cols` grid whose samples count up row-major and wrap at 256.
pub fn ramp(rows: usize, cols: usize) -> Grid {
    Grid::from_fn(rows, cols, |r, c| ((r * cols + c) % 256) as i32)
}

/// Parse a grid from text: one row per line, samples separated by whitespace.
///
/// Blank lines and lines starting with `#` are skipped. Every row must have
/// the same width.
pub fn parse_table(text: &str) -> Result<Grid, CoreError> {
    let mut samples = Vec::new();
    let mut width: Option<usize> = None;
    let mut rows = 0;

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let before = samples.len();
        for token in line.split_whitespace() {
            let value = token.parse::<i32>().map_err(|e| CoreError::Parse {
                line: lineno + 1,
                reason: format!("'{token}': {e}"),
            })?;
            samples.push(value);
        }
        let row_width = samples.len() - before;
        match width {
            None => width = Some(row_width),
            Some(expected) if expected != row_width => {
                return Err(CoreError::RaggedRow {
                    row: rows,
                    width: row_width,
                    expected,
                });
            }
            Some(_) => {}
        }
        rows += 1;
    }

    Grid::new(rows, width.unwrap_or(0), samples)
}

/// Load a grid from a table file (see [`parse_table`]).
pub fn load_table(path: impl AsRef<Path>) -> Result<Grid, CoreError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let grid = parse_table(&text)?;
    tracing::info!(
        path = %path.as_ref().display(),
        rows = grid.rows(),
        cols = grid.cols(),
        "loaded dataset"
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_wraps_at_256() {
        let g = ramp(20, 20);
        assert_eq!(g.get(0, 0), Some(0));
        assert_eq!(g.get(12, 15), Some(255));
        assert_eq!(g.get(12, 16), Some(0));
        assert!(g.samples().iter().all(|&v| (0..=255).contains(&v)));
    }

    #[test]
    fn parse_table_skips_comments_and_blanks() {
        let g = parse_table("# header\n1 2 3\n\n  4 5 6  \n").unwrap();
        assert_eq!(g.shape(), (2, 3));
        assert_eq!(g.samples(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn parse_table_rejects_ragged_rows() {
        let err = parse_table("1 2 3\n4 5\n").unwrap_err();
        assert!(matches!(
            err,
            CoreError::RaggedRow {
                row: 1,
                width: 2,
                expected: 3
            }
        ));
    }

    #[test]
    fn parse_table_reports_bad_token_line() {
        let err = parse_table("1 2\n3 x\n").unwrap_err();
        assert!(matches!(err, CoreError::Parse { line: 2, .. }));
    }

    #[test]
    fn load_table_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        std::fs::write(&path, "9 8\n7 6\n").unwrap();
        let g = load_table(&path).unwrap();
        assert_eq!(g.samples(), &[9, 8, 7, 6]);
    }

    #[test]
    fn empty_table_is_empty_grid() {
        let g = parse_table("").unwrap();
        assert_eq!(g.shape(), (0, 0));
    }
}
