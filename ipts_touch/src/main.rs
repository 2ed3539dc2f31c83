// Reads reports from a device node or a capture file and logs the contacts.
//
// Usage: ipts_touch [path] [config.json] [--loop]
//   path defaults to /dev/hidraw0. Paths under /dev/ are read one report per
//   read call; anything else is treated as a capture of back-to-back reports.
//   --loop rewinds a capture at its end.

use std::env;
use std::io::SeekFrom;

use anyhow::Context;
use ipts_touch::{ContactSink, FrameReader, LogSink, ReadOutcome, TouchConfig, TouchPipeline};
use tokio::fs::File;
use tokio::io::AsyncSeekExt;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut looping = false;
    let mut positional = Vec::new();
    for arg in env::args().skip(1) {
        if arg == "--loop" {
            looping = true;
        } else {
            positional.push(arg);
        }
    }
    let path = positional.first().map(String::as_str).unwrap_or("/dev/hidraw0");

    let config = match positional.get(1) {
        Some(config_path) => TouchConfig::from_json_file(config_path)
            .with_context(|| format!("loading config {config_path}"))?,
        None => TouchConfig::default(),
    };
    let (frame_size, output_scale) = (config.frame_size, config.output_scale);
    let mut pipeline = TouchPipeline::new(config)?;

    let file = File::open(path).await.with_context(|| format!("opening {path}"))?;
    let device = path.starts_with("/dev/");
    let mut reader = if device {
        FrameReader::device(file, frame_size)
    } else {
        FrameReader::capture(file, frame_size)
    };
    info!(path, device, frame_size, "reading touch reports");

    let mut sink = LogSink::new(output_scale);
    let mut frames_since_rewind = 0u64;
    loop {
        let mut rewind = false;
        match reader.next_frame().await? {
            ReadOutcome::Frame(raw) | ReadOutcome::Short(raw) if device || raw.len() == frame_size => {
                frames_since_rewind += 1;
                match pipeline.process_frame(raw) {
                    Ok(Some(contacts)) => sink.submit(&contacts)?,
                    Ok(None) => {}
                    Err(err) => {
                        warn!(%err, "frame dropped");
                        sink.submit(&pipeline.lifted_contacts())?;
                    }
                }
            }
            ReadOutcome::Frame(_) | ReadOutcome::Short(_) | ReadOutcome::Eof => {
                // An empty capture would spin forever.
                if !looping || device || frames_since_rewind == 0 {
                    break;
                }
                rewind = true;
            }
        }

        if rewind {
            reader.get_mut().seek(SeekFrom::Start(0)).await?;
            pipeline.reset();
            frames_since_rewind = 0;
        }
    }

    info!(
        frames = pipeline.frames_processed(),
        updates = sink.submitted(),
        "reader finished"
    );
    Ok(())
}
