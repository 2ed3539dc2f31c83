use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use ipts_touch::visual::{raw_intensity, render_frame, save_png};
use ipts_touch::{
    FrameBlobSet, FrameObserver, FrameReader, Heatmap, ReadOutcome, TouchConfig, TouchPipeline,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pixels per sensor cell in the dumped images.
const CELL_SCALE: u32 = 8;

/// Writes one PNG per processed heatmap section.
struct PngDumper {
    output_dir: PathBuf,
    /// Draw the baseline-corrected grid instead of the raw sensor values.
    baseline_background: bool,
    written: usize,
    failed: usize,
}

impl FrameObserver for PngDumper {
    fn observe_section(&mut self, section: &[u8], heatmap: &Heatmap, blobs: &FrameBlobSet) {
        if self.baseline_background {
            self.observe(heatmap, blobs);
        } else {
            let raw = raw_intensity(section, heatmap.width(), heatmap.height());
            self.observe(&raw, blobs);
        }
    }

    fn observe(&mut self, heatmap: &Heatmap, blobs: &FrameBlobSet) {
        let image = render_frame(heatmap, blobs, CELL_SCALE);
        let path = self.output_dir.join(format!("frame_{:05}.png", self.written + self.failed));
        match save_png(&path, &image) {
            Ok(()) => self.written += 1,
            Err(err) => {
                warn!(path = %path.display(), %err, "could not write frame image");
                self.failed += 1;
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- 1. Argument Parsing & Setup ---
    let mut baseline_background = false;
    let mut args = Vec::new();
    for arg in env::args() {
        if arg == "--baseline" {
            baseline_background = true;
        } else {
            args.push(arg);
        }
    }
    if args.len() < 3 {
        println!("Usage: touch_tester <capture_path> <output_dir> [config.json] [--baseline]");
        return Ok(());
    }
    let capture_path = &args[1];
    let output_dir = Path::new(&args[2]);
    let config = match args.get(3) {
        Some(path) => TouchConfig::from_json_file(path)
            .with_context(|| format!("loading config {path}"))?,
        None => TouchConfig::default(),
    };

    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("creating {}", output_dir.display()))?;

    // --- 2. Capture Reader & Pipeline Initialization ---
    let file = tokio::fs::File::open(capture_path)
        .await
        .with_context(|| format!("opening {capture_path}"))?;
    let mut reader = FrameReader::capture(file, config.frame_size);
    let mut pipeline = TouchPipeline::new(config)?;
    let mut dumper = PngDumper {
        output_dir: output_dir.to_path_buf(),
        baseline_background,
        written: 0,
        failed: 0,
    };

    // --- 3. Main Processing Loop ---
    let (mut reports, mut dropped, mut touching) = (0usize, 0usize, 0usize);
    loop {
        let raw = match reader.next_frame().await? {
            ReadOutcome::Frame(raw) => raw,
            ReadOutcome::Short(rest) => {
                warn!(bytes = rest.len(), "ignoring trailing partial report");
                break;
            }
            ReadOutcome::Eof => break,
        };
        reports += 1;

        match pipeline.process_frame_with(raw, &mut dumper) {
            Ok(Some(contacts)) if contacts.touching() => touching += 1,
            Ok(_) => {}
            Err(err) => {
                warn!(report = reports, %err, "report dropped");
                dropped += 1;
            }
        }
    }

    // --- 4. Summary ---
    info!(
        reports,
        heatmaps = pipeline.frames_processed(),
        dropped,
        single_touch = touching,
        images = dumper.written,
        image_errors = dumper.failed,
        "capture processed"
    );
    Ok(())
}
