// Configuration types for the sinogram simulation

use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// CONFIGURATION ERRORS
// ============================================================================

// Everything in this enum is detectable before the angular sweep starts, and
// the `Simulator` constructor rejects it there. Geometric degeneracies that
// can only show up mid-run (zero-length rays, rays missing the grid) are not
// errors at all: their line integral is defined as 0.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("detector element count must be positive")]
    DetectorCount,

    #[error("detector element pitch must be positive, got {0} mm")]
    DexelPitch(f32),

    #[error("pixel pitch must be positive, got {0} mm")]
    PixelPitch(f32),

    #[error("angle step must be positive, got {0} degrees")]
    AngleStep(f32),

    #[error("ray-marching step must be positive, got {0} pixel units")]
    RayStep(f32),

    // The marcher samples the nearest pixel center, which can land one cell
    // outside the bounding box near grid-aligned rays. Only the exact walker
    // keeps its indices in bounds by construction.
    #[error("unchecked grid access is only valid with the exact grid walker")]
    UncheckedMarcher,

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

// ============================================================================
// EXECUTION MODE
// ============================================================================

// Bounds-checking mode for sample-grid reads during integration.
//
// `Checked` reads return 0 outside the grid. `Unchecked` skips the bounds
// test entirely; it is sound only when the caller proves every computed
// index lies inside the grid, which the exact walker does and the marcher
// does not. The mode is an explicit per-run configuration value threaded
// into each access, never a process-wide flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    #[default]
    Checked,
    Unchecked,
}

// Line-integral algorithm selection.
//
// The exact walker is the reference; the marcher is the approximate
// alternative kept for comparison and performance testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    // Fixed-step ray marching: samples the nearest pixel center every
    // `ray_step` units of arclength. Error scales with the step size, and
    // nearest-center rounding adds quantization noise near aligned rays.
    March,

    // Exact voxel traversal: weights every crossed cell by the exact path
    // length inside it. No quantization error.
    #[default]
    Walk,
}

// ============================================================================
// SIMULATION CONFIGURATION
// ============================================================================

// Knobs of the angular sweep, independent of the scanner geometry.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SimulationConfig {
    // Angular increment between projections in degrees. 1 degree gives the
    // classic 360-row sinogram.
    pub angle_step_deg: f32,

    // Arclength step of the ray marcher, in pixel (lattice) units.
    // Ignored by the exact walker.
    pub ray_step: f32,

    pub integrator: IntegratorKind,

    pub access: AccessMode,

    // Parallel worker count. 0 means one worker per available core.
    pub workers: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            angle_step_deg: 1.0,
            ray_step: 0.05,
            integrator: IntegratorKind::default(),
            access: AccessMode::default(),
            workers: 0,
        }
    }
}

impl SimulationConfig {
    // Number of sinogram rows for a full 360-degree sweep.
    // Truncates when the step does not divide 360, matching the row
    // assignment `floor(angle / step)`.
    #[inline]
    pub fn rows(&self) -> usize {
        (360.0 / self.angle_step_deg) as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.angle_step_deg <= 0.0 {
            return Err(ConfigError::AngleStep(self.angle_step_deg));
        }
        if self.integrator == IntegratorKind::March {
            if self.ray_step <= 0.0 {
                return Err(ConfigError::RayStep(self.ray_step));
            }
            if self.access == AccessMode::Unchecked {
                return Err(ConfigError::UncheckedMarcher);
            }
        }
        Ok(())
    }
}
