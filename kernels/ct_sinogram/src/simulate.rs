// Parallel acquisition orchestration
//
// The 360-degree sweep is partitioned into contiguous row bands, one per
// worker. Each band is an independent task writing into its own disjoint
// slice of the sinogram buffer, so the parallel phase needs no locking; the
// only coordination point is the join before normalization.

use rayon::prelude::*;
use serde::Serialize;

use crate::geometry::{GridFrame, ScannerGeometry};
use crate::grid::SampleGrid;
use crate::integral::{GridWalker, LineIntegrator, RayMarcher};
use crate::types::{ConfigError, IntegratorKind, SimulationConfig};

// ============================================================================
// ROW PARTITIONING
// ============================================================================

// A contiguous range of sinogram rows owned by exactly one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBand {
    pub first_row: usize,
    pub n_rows: usize,
}

// Split `n_rows` into at most `tasks` contiguous bands of equal width, the
// last one absorbing the shortfall. The bands are disjoint and cover every
// row exactly once; the parallel sweep relies on this to write the shared
// sinogram without synchronization.
pub fn partition_rows(n_rows: usize, tasks: usize) -> Vec<RowBand> {
    assert!(tasks > 0, "Partitioning requires at least one task");
    let band_rows = n_rows.div_ceil(tasks);
    let mut bands = Vec::new();
    let mut first_row = 0;
    while first_row < n_rows {
        let n = band_rows.min(n_rows - first_row);
        bands.push(RowBand {
            first_row,
            n_rows: n,
        });
        first_row += n;
    }
    bands
}

// ============================================================================
// SIMULATOR
// ============================================================================

// Owns the attenuation grid for the whole run (read-only once built), the
// scanner geometry, and the worker pool. Construction performs all
// configuration validation: nothing is discovered mid-sweep.
pub struct Simulator {
    grid: SampleGrid,
    geometry: ScannerGeometry,
    config: SimulationConfig,
    frame: GridFrame,
    workers: usize,
    pool: rayon::ThreadPool,
}

impl Simulator {
    pub fn new(
        grid: SampleGrid,
        geometry: ScannerGeometry,
        config: SimulationConfig,
    ) -> Result<Self, ConfigError> {
        geometry.validate()?;
        config.validate()?;
        // A step over 360 degrees leaves no rows to compute
        if config.rows() == 0 {
            return Err(ConfigError::AngleStep(config.angle_step_deg));
        }

        let workers = if config.workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            config.workers
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ConfigError::WorkerPool(e.to_string()))?;

        let frame = GridFrame::new(grid.width(), grid.height(), geometry.pixel_size_mm);
        Ok(Self {
            grid,
            geometry,
            config,
            frame,
            workers,
            pool,
        })
    }

    #[inline]
    pub fn geometry(&self) -> &ScannerGeometry {
        &self.geometry
    }

    #[inline]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    // Detector readings for one projection angle, written into `row`
    // (one value per dexel, attenuation per centimeter).
    fn view(&self, angle_deg: f32, integrator: &dyn LineIntegrator, row: &mut [f32]) {
        let source = self.frame.world_to_grid(self.geometry.source_position(angle_deg));
        // Integrals come back in lattice units; pixel pitch converts to mm,
        // the extra /10 reports per centimeter
        let per_cm = self.geometry.pixel_size_mm / 10.0;
        for (value, dexel) in row
            .iter_mut()
            .zip(self.geometry.detector_positions(angle_deg))
        {
            let dexel = self.frame.world_to_grid(dexel);
            *value =
                integrator.integrate(&self.grid, source, dexel, self.config.access) * per_cm;
        }
    }

    // Run the full sweep. `on_row` fires once per completed projection row,
    // from worker threads; it carries progress reporting without tying the
    // core to any terminal crate.
    pub fn simulate_with_progress<F>(&self, on_row: F) -> SampleGrid
    where
        F: Fn() + Sync,
    {
        let n_rows = self.config.rows();
        let mut sinogram = SampleGrid::new(self.geometry.n_dexel, n_rows);
        let stride = sinogram.stride();
        let bands = partition_rows(n_rows, self.workers);
        // Every band but the last has the same width, which is exactly the
        // chunk length par_chunks_mut splits on
        let band_rows = bands[0].n_rows;
        let step_deg = self.config.angle_step_deg;

        let integrator: Box<dyn LineIntegrator> = match self.config.integrator {
            IntegratorKind::March => Box::new(RayMarcher {
                step: self.config.ray_step,
            }),
            IntegratorKind::Walk => Box::new(GridWalker),
        };

        // Row ownership is static: each band is one par_chunks_mut slice,
        // so no sinogram cell is ever written by two tasks and the output
        // needs no locking. Each task returns its local maximum; the merge
        // after the join restores the grid's v_max invariant.
        let band_maxes: Vec<f32> = self.pool.install(|| {
            sinogram
                .samples_mut()
                .par_chunks_mut(band_rows * stride)
                .zip(bands.into_par_iter())
                .map(|(samples, band)| {
                    let mut band_max = 0.0f32;
                    for (i, row) in samples.chunks_mut(stride).enumerate() {
                        let angle_deg = (band.first_row + i) as f32 * step_deg;
                        self.view(angle_deg, integrator.as_ref(), row);
                        for &v in row.iter() {
                            band_max = band_max.max(v);
                        }
                        on_row();
                    }
                    band_max
                })
                .collect()
        });
        for band_max in band_maxes {
            sinogram.raise_max(band_max);
        }
        sinogram
    }

    pub fn simulate(&self) -> SampleGrid {
        self.simulate_with_progress(|| {})
    }
}

// ============================================================================
// ACQUISITION MANIFEST
// ============================================================================

// Metadata describing one finished acquisition, serialized to JSON next to
// the sinogram when requested.
#[derive(Debug, Clone, Serialize)]
pub struct AcquisitionManifest {
    // Sinogram dimensions: dexels wide, projection rows tall
    pub width: usize,
    pub height: usize,
    // Input image dimensions in pixels
    pub source_width: usize,
    pub source_height: usize,
    pub geometry: ScannerGeometry,
    pub config: SimulationConfig,
    pub workers: usize,
    pub elapsed_ms: u128,
}
