use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("grid shape mismatch: expected {expected} samples, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("grid shape {rows}x{cols} is too large to address")]
    ShapeOverflow { rows: usize, cols: usize },

    #[error("dataset parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("dataset rows have uneven width: row {row} has {width} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        width: usize,
        expected: usize,
    },
}
