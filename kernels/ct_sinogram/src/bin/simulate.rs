// Sinogram Simulator CLI
//
// Reads an attenuation image, runs the fan-beam acquisition over 360
// degrees, and writes the sinogram as an 8-bit grayscale PNG. Defaults
// reproduce the reference acquisition: 300 mm source and detector radii,
// 200 dexels over a 600 mm array, 300 mm object.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use ct_sinogram::{
    AccessMode, AcquisitionManifest, IntegratorKind, SampleGrid, ScannerGeometry,
    SimulationConfig, Simulator,
};

/// CLI arguments for the sinogram simulator
#[derive(Parser, Debug)]
#[command(name = "simulate")]
#[command(about = "Simulate a fan-beam CT acquisition of a 2-D image", long_about = None)]
struct Args {
    /// Input attenuation image (any format the image crate decodes)
    input: PathBuf,

    /// Output sinogram PNG
    output: PathBuf,

    /// Focus-to-center distance in mm
    #[arg(long, default_value_t = 300.0)]
    fcd: f32,

    /// Center-to-detector distance in mm
    #[arg(long, default_value_t = 300.0)]
    dcd: f32,

    /// Number of detector elements
    #[arg(long, default_value_t = 200)]
    dexels: usize,

    /// Physical width of the detector array in mm
    #[arg(long, default_value_t = 600.0)]
    detector_width: f32,

    /// Physical width of the imaged object in mm
    #[arg(long, default_value_t = 300.0)]
    object_width: f32,

    /// Angular increment between projections in degrees
    #[arg(long, default_value_t = 1.0)]
    angle_step: f32,

    /// Line-integral algorithm
    #[arg(long, value_enum, default_value_t = IntegratorKind::Walk)]
    integrator: IntegratorKind,

    /// Arclength step of the ray marcher, in pixel units
    #[arg(long, default_value_t = 0.05)]
    ray_step: f32,

    /// Worker threads (0 = one per available core)
    #[arg(short = 'j', long, default_value_t = 0)]
    threads: usize,

    /// Bounds-checking mode for grid reads (unchecked: exact walker only)
    #[arg(long, value_enum, default_value_t = AccessMode::Checked)]
    access: AccessMode,

    /// Write acquisition metadata as JSON to this path
    #[arg(long)]
    manifest: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let src = image::open(&args.input)
        .with_context(|| format!("failed to read input image {}", args.input.display()))?;
    let grid = SampleGrid::from_luma(&src);
    let (source_width, source_height) = (grid.width(), grid.height());

    let geometry = ScannerGeometry {
        fcd_mm: args.fcd,
        dcd_mm: args.dcd,
        n_dexel: args.dexels,
        dexel_size_mm: args.detector_width / args.dexels.max(1) as f32,
        pixel_size_mm: args.object_width / source_width as f32,
    };
    let config = SimulationConfig {
        angle_step_deg: args.angle_step,
        ray_step: args.ray_step,
        integrator: args.integrator,
        access: args.access,
        workers: args.threads,
    };

    // All configuration rejection happens here, before any worker starts
    let simulator = Simulator::new(grid, geometry, config)?;

    println!("Fan-Beam Sinogram Simulator");
    println!("===========================");
    println!("  Input: {} ({}x{} px)", args.input.display(), source_width, source_height);
    println!("  Geometry: FCD {} mm, DCD {} mm", geometry.fcd_mm, geometry.dcd_mm);
    println!(
        "  Detector: {} dexels, {:.3} mm pitch",
        geometry.n_dexel, geometry.dexel_size_mm
    );
    println!("  Pixel pitch: {:.3} mm", geometry.pixel_size_mm);
    println!(
        "  Sweep: {} rows at {} degree steps, {:?} integrator",
        config.rows(),
        config.angle_step_deg,
        config.integrator
    );
    println!("  Workers: {}", simulator.workers());

    let pb = ProgressBar::new(config.rows() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows ({percent}%)")?
            .progress_chars("=> "),
    );

    let start = Instant::now();
    let sinogram = simulator.simulate_with_progress(|| pb.inc(1));
    let elapsed = start.elapsed();
    pb.finish_and_clear();
    println!("Simulated {} projections in {:.3} s", config.rows(), elapsed.as_secs_f64());

    sinogram
        .to_gray_image()
        .save(&args.output)
        .with_context(|| format!("failed to write sinogram {}", args.output.display()))?;
    println!("Wrote {} ({}x{} px)", args.output.display(), sinogram.width(), sinogram.height());

    if let Some(manifest_path) = args.manifest {
        let manifest = AcquisitionManifest {
            width: sinogram.width(),
            height: sinogram.height(),
            source_width,
            source_height,
            geometry,
            config,
            workers: simulator.workers(),
            elapsed_ms: elapsed.as_millis(),
        };
        let json = serde_json::to_string_pretty(&manifest)?;
        fs::write(&manifest_path, json)
            .with_context(|| format!("failed to write manifest {}", manifest_path.display()))?;
        println!("Wrote {}", manifest_path.display());
    }

    Ok(())
}
