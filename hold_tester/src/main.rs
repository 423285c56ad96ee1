use std::env;
use std::path::Path;

use anyhow::{Context, bail};
use hold_vision::core_modules::utils::image_helper::{annotate_holds, open, save_png};
use hold_vision::{DetectionConfig, DetectionPipeline};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Half the side of the square drawn around each hold.
const MARKER_HALF_SIZE: u32 = 8;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // --- 1. Argument Parsing ---
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("Usage: hold_tester <input_image> [output_png] [step]");
        return Ok(());
    }
    let input_path = Path::new(&args[1]);
    let output_path = args.get(2).map(Path::new);
    let step = match args.get(3) {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("step must be a positive integer, got {raw:?}"))?,
        None => DetectionConfig::default().scan.step,
    };
    if step == 0 {
        bail!("step must be at least 1");
    }

    // --- 2. Detection ---
    let pipeline = DetectionPipeline::new(DetectionConfig::with_step(step))?;
    let image = open(input_path).with_context(|| format!("reading {}", input_path.display()))?;
    let result = pipeline.detect_raster(&image);
    info!(
        input = %input_path.display(),
        width = image.width(),
        height = image.height(),
        step,
        holds = result.total_holds(),
        "detection complete"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    // --- 3. Visualization ---
    if let Some(output_path) = output_path {
        let annotated = annotate_holds(&image, &result, MARKER_HALF_SIZE);
        save_png(output_path, &annotated)
            .with_context(|| format!("writing {}", output_path.display()))?;
        info!(output = %output_path.display(), "annotated image saved");
    }
    Ok(())
}
