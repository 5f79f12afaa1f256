// Line-integral engines: fixed-step marching and exact voxel traversal
//
// Both compute the attenuation integral along the segment from a detector
// element to the source, in lattice units. Rays that miss the grid's
// bounding box, graze a corner (entry == exit), or have zero length all
// contribute exactly 0.

use crate::grid::SampleGrid;
use crate::types::AccessMode;
use crate::vec2::Vec2;

// One interface, two strategies, selected by configuration.
//
// The integral runs from `dexel` toward `source` in lattice coordinates and
// is reported in lattice units; the orchestrator applies the physical
// scaling. `Unchecked` access is sound only for `GridWalker`.
pub trait LineIntegrator: Sync {
    fn integrate(&self, grid: &SampleGrid, source: Vec2, dexel: Vec2, mode: AccessMode) -> f32;
}

// ============================================================================
// FIXED-STEP RAY MARCHER
// ============================================================================

// Approximate integrator: constant-arclength steps from box entry to exit,
// sampling the nearest pixel center at each step and summing value * step.
// Error scales with the step size; nearest-center rounding adds quantization
// noise, worst near grid-aligned rays.
#[derive(Debug, Clone, Copy)]
pub struct RayMarcher {
    // Arclength step in lattice units
    pub step: f32,
}

impl LineIntegrator for RayMarcher {
    fn integrate(&self, grid: &SampleGrid, source: Vec2, dexel: Vec2, _mode: AccessMode) -> f32 {
        let dir = source - dexel;
        let length = dir.length();
        if length == 0.0 {
            return 0.0;
        }
        let dir = dir.scaled(1.0 / length);

        let Some((t_min, t_max)) = grid.intersect(dexel, dir) else {
            return 0.0;
        };

        // Nearest-center rounding can land one cell outside the box, so
        // reads stay checked regardless of the configured mode.
        let mut sum = 0.0;
        let mut t = t_min;
        while t <= t_max {
            let p = dexel + dir.scaled(t);
            let cx = p.x.round() as i32;
            let cy = p.y.round() as i32;
            sum += grid.sample_lattice(cx, cy, AccessMode::Checked);
            t += self.step;
        }
        sum * self.step
    }
}

// ============================================================================
// EXACT VOXEL TRAVERSAL
// ============================================================================

// Reference integrator: a 2-D DDA over the lattice cells the ray actually
// crosses, weighting each cell by the exact path length inside it.
//
// Per axis, the walk keeps the parametric distance to the next cell-edge
// crossing (edges sit on half-integers) and a count of cells remaining in
// the step direction. Advancing only the axis with the nearer crossing and
// stopping when either the exit parameter or a remaining-count is exhausted
// keeps every visited index inside the grid, which is what makes
// `AccessMode::Unchecked` sound here.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridWalker;

// Crossing state of one traversal axis.
struct Axis {
    // +1, 0 or -1 depending on the direction component's sign
    step: i32,
    // Parametric distance at which the ray crosses this axis's next cell edge.
    // Infinite for a ray parallel to the axis: that axis never triggers.
    t_next: f32,
    // Parametric distance between consecutive crossings (1 / |component|)
    dt: f32,
    // Cells left before stepping off the lattice
    remaining: u32,
}

impl Axis {
    fn new(entry: f32, component: f32, cell: i32, extent: usize, t_entry: f32) -> Self {
        if component > 0.0 {
            Self {
                step: 1,
                t_next: t_entry + (cell as f32 + 0.5 - entry) / component,
                dt: 1.0 / component,
                remaining: (extent as i32 - cell) as u32,
            }
        } else if component < 0.0 {
            Self {
                step: -1,
                t_next: t_entry + (cell as f32 - 0.5 - entry) / component,
                dt: -1.0 / component,
                remaining: (cell - 1) as u32,
            }
        } else {
            Self {
                step: 0,
                t_next: f32::INFINITY,
                dt: f32::INFINITY,
                remaining: 0,
            }
        }
    }
}

impl LineIntegrator for GridWalker {
    fn integrate(&self, grid: &SampleGrid, source: Vec2, dexel: Vec2, mode: AccessMode) -> f32 {
        let dir = source - dexel;
        let length = dir.length();
        if length == 0.0 {
            return 0.0;
        }
        let dir = dir.scaled(1.0 / length);

        let Some((t_entry, t_exit)) = grid.intersect(dexel, dir) else {
            return 0.0;
        };
        // Degenerate corner graze
        if t_exit <= t_entry {
            return 0.0;
        }

        let width = grid.width() as i32;
        let height = grid.height() as i32;

        // Starting cell: nearest lattice center to the entry point, clamped
        // onto the lattice against entry-edge float noise
        let entry = dexel + dir.scaled(t_entry);
        let mut cx = (entry.x.round() as i32).clamp(1, width);
        let mut cy = (entry.y.round() as i32).clamp(1, height);

        let mut x_axis = Axis::new(entry.x, dir.x, cx, grid.width(), t_entry);
        let mut y_axis = Axis::new(entry.y, dir.y, cy, grid.height(), t_entry);

        let mut sum = 0.0;
        let mut t_last = t_entry;
        loop {
            let t_next = x_axis.t_next.min(y_axis.t_next).min(t_exit);
            let segment = t_next - t_last;
            if segment > 0.0 {
                sum += grid.sample_lattice(cx, cy, mode) * segment;
            }
            if t_next >= t_exit {
                break;
            }
            t_last = t_next;

            if x_axis.t_next <= y_axis.t_next {
                if x_axis.remaining == 0 {
                    break;
                }
                cx += x_axis.step;
                x_axis.remaining -= 1;
                x_axis.t_next += x_axis.dt;
            } else {
                if y_axis.remaining == 0 {
                    break;
                }
                cy += y_axis.step;
                y_axis.remaining -= 1;
                y_axis.t_next += y_axis.dt;
            }
        }
        sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALLOWED_ERROR: f32 = 0.16;

    // The 4x4 reference phantom used by the original acquisition tests:
    //
    //   0 0 0 0
    //   0 5 2 0
    //   0 1 3 0
    //   0 0 0 0
    fn reference_grid() -> SampleGrid {
        let mut grid = SampleGrid::new(4, 4);
        let values = [
            0.0, 0.0, 0.0, 0.0, //
            0.0, 5.0, 2.0, 0.0, //
            0.0, 1.0, 3.0, 0.0, //
            0.0, 0.0, 0.0, 0.0, //
        ];
        for (i, &v) in values.iter().enumerate() {
            grid.set((i % 4) as i32, (i / 4) as i32, v);
        }
        grid
    }

    fn integrators() -> Vec<Box<dyn LineIntegrator>> {
        vec![Box::new(RayMarcher { step: 0.05 }), Box::new(GridWalker)]
    }

    #[test]
    fn test_horizontal_reference_ray() {
        let grid = reference_grid();
        for integrator in integrators() {
            let p = integrator.integrate(
                &grid,
                Vec2::new(4.5, 1.7),
                Vec2::new(0.5, 1.7),
                AccessMode::Checked,
            );
            assert!((p - 7.15).abs() <= ALLOWED_ERROR, "got {}", p);
        }
    }

    #[test]
    fn test_horizontal_reference_ray_lower_row() {
        let grid = reference_grid();
        for integrator in integrators() {
            let p = integrator.integrate(
                &grid,
                Vec2::new(0.5, 3.0),
                Vec2::new(4.5, 3.0),
                AccessMode::Checked,
            );
            assert!((p - 4.15).abs() <= ALLOWED_ERROR, "got {}", p);
        }
    }

    #[test]
    fn test_diagonal_reference_ray() {
        let grid = reference_grid();
        for integrator in integrators() {
            let p = integrator.integrate(
                &grid,
                Vec2::new(0.5, 4.5),
                Vec2::new(4.5, 0.5),
                AccessMode::Checked,
            );
            assert!((p - 4.20).abs() <= ALLOWED_ERROR, "got {}", p);
        }
    }

    #[test]
    fn test_miss_contributes_zero() {
        let grid = reference_grid();
        for integrator in integrators() {
            let p = integrator.integrate(
                &grid,
                Vec2::new(-10.0, 20.0),
                Vec2::new(10.0, 20.0),
                AccessMode::Checked,
            );
            assert_eq!(p, 0.0);
        }
    }

    #[test]
    fn test_zero_length_ray_contributes_zero() {
        let grid = reference_grid();
        let p = Vec2::new(2.0, 2.0);
        for integrator in integrators() {
            assert_eq!(integrator.integrate(&grid, p, p, AccessMode::Checked), 0.0);
        }
    }

    #[test]
    fn test_corner_graze_contributes_zero_for_walker() {
        let grid = reference_grid();
        // Runs through the single corner point (1, 1) of the bounding box:
        // entry equals exit
        let p = GridWalker.integrate(
            &grid,
            Vec2::new(2.0, 0.0),
            Vec2::new(0.0, 2.0),
            AccessMode::Checked,
        );
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_walker_is_exact_on_axis_aligned_ray() {
        let grid = reference_grid();
        // Straight through row 2 center: 0 * 0.5 + 5 + 2 + 0 * 0.5, with
        // half cells at both ends of the box
        let p = GridWalker.integrate(
            &grid,
            Vec2::new(5.0, 2.0),
            Vec2::new(0.0, 2.0),
            AccessMode::Checked,
        );
        assert!((p - 7.0).abs() < 1e-4, "got {}", p);
    }

    #[test]
    fn test_walker_vertical_ray() {
        let grid = reference_grid();
        // Straight down column 2: 0 * 0.5 + 5 + 1 + 0 * 0.5
        let p = GridWalker.integrate(
            &grid,
            Vec2::new(2.0, 5.0),
            Vec2::new(2.0, 0.0),
            AccessMode::Checked,
        );
        assert!((p - 6.0).abs() < 1e-4, "got {}", p);
    }

    #[test]
    fn test_walker_unchecked_matches_checked() {
        let grid = reference_grid();
        let rays = [
            (Vec2::new(4.5, 1.7), Vec2::new(0.5, 1.7)),
            (Vec2::new(0.5, 4.5), Vec2::new(4.5, 0.5)),
            (Vec2::new(2.0, 5.0), Vec2::new(2.0, 0.0)),
            (Vec2::new(-3.0, 0.3), Vec2::new(6.0, 4.9)),
        ];
        for (source, dexel) in rays {
            let checked = GridWalker.integrate(&grid, source, dexel, AccessMode::Checked);
            let unchecked = GridWalker.integrate(&grid, source, dexel, AccessMode::Unchecked);
            assert_eq!(checked, unchecked);
        }
    }
}
