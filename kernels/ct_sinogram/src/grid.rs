// Bounds-checked 2-D sample buffer with ray-box intersection
//
// One SampleGrid holds the attenuation image for the whole run (read-only
// after construction) and a second one collects the sinogram (written in
// disjoint row bands by the orchestrator).

use crate::types::AccessMode;
use crate::vec2::Vec2;

// ============================================================================
// SAMPLE GRID
// ============================================================================

// Flat row-major f32 buffer with a running maximum.
//
// Two coordinate conventions meet here:
// - native storage addressing: 0-based (x, y), x = column, y = row;
// - the lattice convention used by the geometry and the integrators:
//   1-based continuous coordinates with pixel centers at integers, so the
//   physical bounding box spans (1, 1)..(width, height) and cell edges sit
//   on half-integers.
// `sample_lattice` is the only place the 1-based offset is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    samples: Vec<f32>,
    // Samples per row. Always equals `width` here; kept separate so row
    // arithmetic reads as row arithmetic.
    stride: usize,
    width: usize,
    height: usize,
    // Largest value ever stored through `set`/`accumulate`/`raise_max`.
    // Monotonically non-decreasing.
    v_max: f32,
}

impl SampleGrid {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "Grid dimensions must be positive");
        Self {
            samples: vec![0.0; width * height],
            stride: width,
            width,
            height,
            v_max: 0.0,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn v_max(&self) -> f32 {
        self.v_max
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && (x as usize) < self.width && y >= 0 && (y as usize) < self.height
    }

    #[inline]
    fn offset(&self, x: i32, y: i32) -> usize {
        y as usize * self.stride + x as usize
    }

    // Read one sample.
    //
    // `Checked` returns 0 outside the grid, so rays can be sampled past the
    // object without special cases. `Unchecked` skips the bounds test; the
    // caller must guarantee (x, y) is inside the grid.
    #[inline]
    pub fn get(&self, x: i32, y: i32, mode: AccessMode) -> f32 {
        match mode {
            AccessMode::Checked => {
                if self.in_bounds(x, y) {
                    self.samples[self.offset(x, y)]
                } else {
                    0.0
                }
            }
            AccessMode::Unchecked => {
                debug_assert!(self.in_bounds(x, y));
                unsafe { *self.samples.get_unchecked(self.offset(x, y)) }
            }
        }
    }

    // Read one sample at 1-based lattice coordinates. The 1-based offset of
    // the lattice convention is applied here and nowhere else.
    #[inline]
    pub fn sample_lattice(&self, cx: i32, cy: i32, mode: AccessMode) -> f32 {
        self.get(cx - 1, cy - 1, mode)
    }

    // Store one sample. Out-of-bounds writes are dropped.
    pub fn set(&mut self, x: i32, y: i32, v: f32) {
        if !self.in_bounds(x, y) {
            return;
        }
        let i = self.offset(x, y);
        self.samples[i] = v;
        self.v_max = self.v_max.max(v);
    }

    // Add to one sample in place, summing contributions without overwriting.
    // Out-of-bounds writes are dropped.
    pub fn accumulate(&mut self, x: i32, y: i32, v: f32) {
        if !self.in_bounds(x, y) {
            return;
        }
        let i = self.offset(x, y);
        self.samples[i] += v;
        self.v_max = self.v_max.max(self.samples[i]);
    }

    // Read one sample scaled by the running maximum, in [0, 1].
    // An all-zero grid (v_max == 0) reads as 0 everywhere.
    #[inline]
    pub fn normalized_get(&self, x: i32, y: i32) -> f32 {
        if self.v_max == 0.0 {
            return 0.0;
        }
        self.get(x, y, AccessMode::Checked) / self.v_max
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    // Raw buffer access for the orchestrator's disjoint row-band writes.
    // Writes through this slice bypass v_max tracking; the writer must fold
    // its maximum back in with `raise_max`.
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    #[inline]
    pub fn raise_max(&mut self, v: f32) {
        self.v_max = self.v_max.max(v);
    }

    // ------------------------------------------------------------------------
    // Ray-box intersection (slab method)
    // ------------------------------------------------------------------------

    // Intersect a ray with the grid's physical bounding box,
    // (1, 1)..(width, height) in lattice coordinates.
    //
    // Per axis, the entry/exit parametric distances are computed from the
    // reciprocal direction component, with the near/far box edge selected by
    // the reciprocal's sign instead of branching on the direction. A zero
    // component gives an infinite reciprocal and resolves through ordinary
    // IEEE comparisons.
    //
    // Returns None when the per-axis intervals do not overlap or the box
    // lies entirely behind the origin. The entry distance is clamped to 0
    // so an origin inside the box integrates forward only.
    pub fn intersect(&self, origin: Vec2, dir: Vec2) -> Option<(f32, f32)> {
        let lo = Vec2::new(1.0, 1.0);
        let hi = Vec2::new(self.width as f32, self.height as f32);

        let inv_x = 1.0 / dir.x;
        let (tx_min, tx_max) = if inv_x >= 0.0 {
            ((lo.x - origin.x) * inv_x, (hi.x - origin.x) * inv_x)
        } else {
            ((hi.x - origin.x) * inv_x, (lo.x - origin.x) * inv_x)
        };

        let inv_y = 1.0 / dir.y;
        let (ty_min, ty_max) = if inv_y >= 0.0 {
            ((lo.y - origin.y) * inv_y, (hi.y - origin.y) * inv_y)
        } else {
            ((hi.y - origin.y) * inv_y, (lo.y - origin.y) * inv_y)
        };

        if tx_min > ty_max || ty_min > tx_max {
            return None;
        }

        let t_min = tx_min.max(ty_min).max(0.0);
        let t_max = tx_max.min(ty_max);
        if t_max < t_min {
            return None;
        }
        Some((t_min, t_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_outside_bounds_is_zero() {
        let grid = SampleGrid::new(3, 3);
        assert_eq!(grid.get(-1, 0, AccessMode::Checked), 0.0);
        assert_eq!(grid.get(0, 3, AccessMode::Checked), 0.0);
        assert_eq!(grid.get(3, 0, AccessMode::Checked), 0.0);
    }

    #[test]
    fn test_set_tracks_running_maximum() {
        let mut grid = SampleGrid::new(2, 2);
        grid.set(0, 0, 0.5);
        grid.set(1, 1, 2.0);
        grid.set(0, 1, 1.0);
        assert_eq!(grid.v_max(), 2.0);

        // Lowering a cell never lowers the maximum
        grid.set(1, 1, 0.1);
        assert_eq!(grid.v_max(), 2.0);
    }

    #[test]
    fn test_set_out_of_bounds_is_dropped() {
        let mut grid = SampleGrid::new(2, 2);
        grid.set(5, 5, 9.0);
        assert_eq!(grid.v_max(), 0.0);
        assert!(grid.samples().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_accumulate_sums_in_place() {
        let mut grid = SampleGrid::new(2, 2);
        grid.accumulate(1, 0, 0.5);
        grid.accumulate(1, 0, 0.25);
        assert_eq!(grid.get(1, 0, AccessMode::Checked), 0.75);
        assert_eq!(grid.v_max(), 0.75);
        grid.accumulate(-1, 0, 9.0);
        assert_eq!(grid.v_max(), 0.75);
    }

    #[test]
    fn test_normalized_get_of_empty_grid_is_zero() {
        let grid = SampleGrid::new(2, 2);
        assert_eq!(grid.normalized_get(0, 0), 0.0);
    }

    #[test]
    fn test_normalized_get_scales_by_maximum() {
        let mut grid = SampleGrid::new(2, 2);
        grid.set(0, 0, 1.0);
        grid.set(1, 0, 4.0);
        assert_eq!(grid.normalized_get(0, 0), 0.25);
        assert_eq!(grid.normalized_get(1, 0), 1.0);
    }

    #[test]
    fn test_sample_lattice_applies_one_based_offset() {
        let mut grid = SampleGrid::new(3, 3);
        grid.set(0, 0, 7.0);
        assert_eq!(grid.sample_lattice(1, 1, AccessMode::Checked), 7.0);
        assert_eq!(grid.sample_lattice(0, 0, AccessMode::Checked), 0.0);
    }

    #[test]
    fn test_intersect_ray_through_center() {
        let grid = SampleGrid::new(5, 5);
        let (t_min, t_max) = grid
            .intersect(Vec2::new(-2.0, 3.0), Vec2::new(1.0, 0.0))
            .expect("ray through the box must hit");
        assert!(t_min < t_max);
        assert!((t_min - 3.0).abs() < 1e-5);
        assert!((t_max - 7.0).abs() < 1e-5);
    }

    #[test]
    fn test_intersect_ray_pointing_away_misses() {
        let grid = SampleGrid::new(5, 5);
        // Origin outside the box, direction away from it
        assert!(grid
            .intersect(Vec2::new(-2.0, 3.0), Vec2::new(-1.0, 0.0))
            .is_none());
    }

    #[test]
    fn test_intersect_parallel_ray_outside_slab_misses() {
        let grid = SampleGrid::new(5, 5);
        // Zero y component, running above the box: the y slab test must
        // still reject it through infinite reciprocals
        assert!(grid
            .intersect(Vec2::new(-2.0, 8.0), Vec2::new(1.0, 0.0))
            .is_none());
    }

    #[test]
    fn test_intersect_diagonal() {
        let grid = SampleGrid::new(5, 5);
        let dir = Vec2::new(1.0, 1.0).scaled(1.0 / 2.0_f32.sqrt());
        let (t_min, t_max) = grid
            .intersect(Vec2::new(0.0, 0.0), dir)
            .expect("diagonal through the box must hit");
        let sqrt2 = 2.0_f32.sqrt();
        assert!((t_min - sqrt2).abs() < 1e-4);
        assert!((t_max - 5.0 * sqrt2).abs() < 1e-4);
    }

    #[test]
    fn test_intersect_origin_inside_clamps_entry() {
        let grid = SampleGrid::new(5, 5);
        let (t_min, t_max) = grid
            .intersect(Vec2::new(3.0, 3.0), Vec2::new(1.0, 0.0))
            .expect("origin inside the box must hit");
        assert_eq!(t_min, 0.0);
        assert!((t_max - 2.0).abs() < 1e-5);
    }
}
