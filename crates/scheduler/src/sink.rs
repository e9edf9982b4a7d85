//! Plain-text output of a finished run.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use tessera_core::{Frame, FrameLayout, Grid};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write results to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes the reconstructed dataset and every processed frame to a text file.
#[derive(Debug, Clone)]
pub struct TextSink {
    path: PathBuf,
}

impl TextSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `frames` (index-ordered, complete) to the sink's file, replacing it.
    pub fn write(&self, layout: &FrameLayout, frames: &[Frame]) -> Result<(), SinkError> {
        let io_err = |source| SinkError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = File::create(&self.path).map_err(io_err)?;
        let mut out = BufWriter::new(file);
        render(&mut out, layout, frames).map_err(io_err)?;
        out.flush().map_err(io_err)?;

        info!(path = %self.path.display(), frames = frames.len(), "results written");
        Ok(())
    }
}

/// Render the report into any writer.
pub fn render<W: Write>(out: &mut W, layout: &FrameLayout, frames: &[Frame]) -> io::Result<()> {
    writeln!(out, "# tessera results")?;
    writeln!(
        out,
        "# dataset {}x{}, window {}x{}, {} frames",
        layout.dataset_rows,
        layout.dataset_cols,
        layout.window_rows,
        layout.window_cols,
        frames.len()
    )?;

    match layout.reconstruct(frames) {
        Some(grid) => {
            writeln!(out, "== reconstructed {}x{}", grid.rows(), grid.cols())?;
            write_grid(out, &grid)?;
        }
        None => writeln!(out, "== reconstructed (none)")?,
    }

    for frame in frames {
        match layout.origin(frame.index) {
            Some((r, c)) => writeln!(out, "== frame {} at ({r}, {c})", frame.index)?,
            None => writeln!(out, "== frame {}", frame.index)?,
        }
        write_grid(out, &frame.grid)?;
    }
    Ok(())
}

fn write_grid<W: Write>(out: &mut W, grid: &Grid) -> io::Result<()> {
    for row in grid.iter_rows() {
        for sample in row {
            write!(out, "{sample:>4}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}
