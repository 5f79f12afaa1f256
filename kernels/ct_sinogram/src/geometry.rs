// Scanner geometry: source/detector motion and the world-to-grid transform
//
// Everything rotates a canonical unrotated configuration by the current
// projection angle: the source sits at (0, FCD) and the detector array lies
// on the line y = -DCD, both in millimeters with the rotation center at the
// origin. Physical y points up; grid rows grow down.

use serde::Serialize;

use crate::types::ConfigError;
use crate::vec2::Vec2;

// ============================================================================
// ROTATION
// ============================================================================

// Rotate a vector CLOCKWISE by the given angle in degrees.
//
// Implemented as a counter-clockwise rotation by the negated angle, so the
// gantry sweep 0 -> 360 advances clockwise as seen on the image.
pub fn rotate(v: Vec2, angle_deg: f32) -> Vec2 {
    let angle_rad = -angle_deg.to_radians();
    let (sin, cos) = angle_rad.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

// ============================================================================
// SCANNER GEOMETRY
// ============================================================================

// Fan-beam acquisition geometry. Distances in millimeters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScannerGeometry {
    // Focus (source) to rotation-center distance
    pub fcd_mm: f32,

    // Rotation-center to detector-array distance
    pub dcd_mm: f32,

    // Number of detector elements (dexels)
    pub n_dexel: usize,

    // Pitch between adjacent detector elements
    pub dexel_size_mm: f32,

    // Physical size of one image pixel
    pub pixel_size_mm: f32,
}

impl ScannerGeometry {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_dexel == 0 {
            return Err(ConfigError::DetectorCount);
        }
        if self.dexel_size_mm <= 0.0 {
            return Err(ConfigError::DexelPitch(self.dexel_size_mm));
        }
        if self.pixel_size_mm <= 0.0 {
            return Err(ConfigError::PixelPitch(self.pixel_size_mm));
        }
        Ok(())
    }

    // X-ray source position for a projection angle.
    pub fn source_position(&self, angle_deg: f32) -> Vec2 {
        rotate(Vec2::new(0.0, self.fcd_mm), angle_deg)
    }

    // Positions of all detector elements for a projection angle.
    //
    // Unrotated, element i sits at x = i * pitch - (n - 1) * pitch / 2 on
    // the line y = -DCD: evenly spaced, centered on x = 0. Element order is
    // preserved under rotation, so index i is always the same physical
    // channel of the array.
    pub fn detector_positions(&self, angle_deg: f32) -> Vec<Vec2> {
        let trans = (self.n_dexel - 1) as f32 * self.dexel_size_mm / 2.0;
        (0..self.n_dexel)
            .map(|i| {
                let x = self.dexel_size_mm * i as f32 - trans;
                rotate(Vec2::new(x, -self.dcd_mm), angle_deg)
            })
            .collect()
    }
}

// ============================================================================
// WORLD <-> GRID FRAME
// ============================================================================

// The single adapter between physical millimeter space and the grid's
// 1-indexed lattice coordinates (pixel centers at integers 1..width and
// 1..height, y growing downward).
//
// world_to_grid: scale by 1 / pixel_size, negate y, then translate by half
// the extent plus one so the physical origin lands on the lattice center.
// grid_to_world is the exact inverse; the round trip is lossless up to
// float tolerance. The 1-based offset itself is consumed exactly once, in
// `SampleGrid::sample_lattice`.
#[derive(Debug, Clone, Copy)]
pub struct GridFrame {
    pixel_size_mm: f32,
    half_x: f32,
    half_y: f32,
}

impl GridFrame {
    pub fn new(width_px: usize, height_px: usize, pixel_size_mm: f32) -> Self {
        assert!(pixel_size_mm > 0.0, "Pixel pitch must be positive");
        Self {
            pixel_size_mm,
            half_x: (width_px as f32 + 1.0) / 2.0,
            half_y: (height_px as f32 + 1.0) / 2.0,
        }
    }

    #[inline]
    pub fn world_to_grid(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x / self.pixel_size_mm + self.half_x,
            -p.y / self.pixel_size_mm + self.half_y,
        )
    }

    #[inline]
    pub fn grid_to_world(&self, g: Vec2) -> Vec2 {
        Vec2::new(
            (g.x - self.half_x) * self.pixel_size_mm,
            -(g.y - self.half_y) * self.pixel_size_mm,
        )
    }
}
