// kernels/ct_sinogram/src/lib.rs

// Fan-Beam CT Sinogram Simulation Core
//
// This library synthesizes the sinogram a CT scanner would record for a 2-D
// attenuation image: a point source and a linear detector array rotate
// around the object, and every projection angle contributes one row of
// line-integral measurements.
//
// Forward simulation only. Reconstruction, beam hardening, scatter and
// polychromatic attenuation are out of scope; attenuation is the additive
// line integral of the sample grid.
//
// Layout, leaf first:
// - vec2:     planar vector math
// - types:    configuration and its rejection rules
// - grid:     bounds-checked sample buffer + slab ray-box intersection
// - geometry: source/detector motion, world <-> grid frame
// - integral: fixed-step marcher and exact voxel walker
// - simulate: row partitioning and the parallel sweep
// - raster:   decoded images in, 8-bit sinogram out

pub mod geometry;
pub mod grid;
pub mod integral;
pub mod raster;
pub mod simulate;
pub mod types;
pub mod vec2;

pub use geometry::{rotate, GridFrame, ScannerGeometry};
pub use grid::SampleGrid;
pub use integral::{GridWalker, LineIntegrator, RayMarcher};
pub use simulate::{partition_rows, AcquisitionManifest, RowBand, Simulator};
pub use types::{AccessMode, ConfigError, IntegratorKind, SimulationConfig};
pub use vec2::Vec2;
