//! End-to-end blend of two grid files.
//!
//! The run is all-or-nothing: a metadata mismatch, a grid missing from the
//! second input, or any I/O failure aborts before the output is written.
//! Grid pairs whose element types cannot be blended are dropped from the
//! output and listed in the report.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::blend::{blend_any, BlendConfig, BlendOutcome, BlendStats, SkipReason};
use crate::error::{BlendError, Result};
use crate::grid::AnyGrid;
use crate::store::{GridFile, GridSource};

/// One blend invocation
#[derive(Debug, Clone)]
pub struct BlendJob {
    pub output: PathBuf,
    pub input1: PathBuf,
    pub input2: PathBuf,
    pub coefficient: f32,
    pub config: BlendConfig,
}

/// What happened to each grid of the first input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlendReport {
    pub blended: Vec<(String, BlendStats)>,
    pub skipped: Vec<(String, SkipReason)>,
}

impl BlendReport {
    pub fn blended_names(&self) -> impl Iterator<Item = &str> {
        self.blended.iter().map(|(name, _)| name.as_str())
    }

    pub fn skipped_names(&self) -> impl Iterator<Item = &str> {
        self.skipped.iter().map(|(name, _)| name.as_str())
    }
}

/// Blend every grid of `source1` with its same-named counterpart in `source2`.
///
/// Returns the merged grids in `source1` order; skipped pairs are left out.
///
/// # Errors
/// Returns [`BlendError::Metadata`] if the required keys differ (no grid is
/// read in that case), [`BlendError::FieldNotFound`] if `source2` lacks a
/// grid, and [`BlendError::Store`] if a grid cannot be read.
pub fn blend_sources<S1, S2>(
    source1: &S1,
    source2: &S2,
    coefficient: f32,
    config: &BlendConfig,
) -> Result<(Vec<AnyGrid>, BlendReport)>
where
    S1: GridSource + ?Sized,
    S2: GridSource + ?Sized,
{
    config
        .requirements
        .verify(source1.metadata(), source2.metadata())?;

    let mut merged = Vec::new();
    let mut report = BlendReport::default();

    for name in source1.grid_names() {
        if !source2.has_grid(&name) {
            return Err(BlendError::FieldNotFound { name });
        }
        let mut grid1 = source1.read_grid(&name)?;
        let mut grid2 = source2.read_grid(&name)?;

        if config.voxelize_tiles {
            grid1.voxelize_active_tiles();
            grid2.voxelize_active_tiles();
        }

        match blend_any(&mut grid1, &grid2, coefficient) {
            BlendOutcome::Blended(stats) => {
                merged.push(grid1);
                report.blended.push((name, stats));
            }
            BlendOutcome::Skipped(reason) => {
                warn!("Skipping grid '{}': {}", name, reason);
                report.skipped.push((name, reason));
            }
        }
    }

    Ok((merged, report))
}

/// Open both inputs, blend them and write the result with the first input's metadata.
///
/// # Errors
/// Any [`BlendError`]; the output file is only created once blending succeeded.
pub fn run_blend(job: &BlendJob) -> Result<BlendReport> {
    let file1 = GridFile::open(&job.input1)?;
    let file2 = GridFile::open(&job.input2)?;

    let (grids, report) = blend_sources(&file1, &file2, job.coefficient, &job.config)?;

    GridFile::write_grids(&job.output, &grids, file1.metadata())?;
    info!(
        "Wrote {} ({} blended, {} skipped, coefficient {})",
        job.output.display(),
        report.blended.len(),
        report.skipped.len(),
        job.coefficient
    );
    Ok(report)
}
