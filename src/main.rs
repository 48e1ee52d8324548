use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rust_mocap::config::Config;
use rust_mocap::io::load_capture;
use rust_mocap::skeleton::SegmentName;
use rust_mocap::system::SkeletonSystem;
use rust_mocap::tracking::PoseState;

/// Frames between progress lines.
const PROGRESS_INTERVAL: usize = 100;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let mut args = std::env::args().skip(1);
    let capture_path = args
        .next()
        .unwrap_or_else(|| "data/capture.csv".to_string());
    let config = match args.next() {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    println!("Loading capture from: {}", capture_path);
    let frames = load_capture(&capture_path)?;
    println!("Loaded {} frames", frames.len());

    let mut system = SkeletonSystem::new(config);
    let mut tracked = 0usize;
    let mut repaired = 0usize;
    let mut lost = 0usize;
    let mut reconstructed = 0usize;
    let mut chains_failed = 0usize;
    let mut total_ms = 0.0;

    for (i, frame) in frames.iter().enumerate() {
        let result = system.process_frame(frame);
        match result.state {
            PoseState::Tracked => tracked += 1,
            PoseState::Repaired => repaired += 1,
            PoseState::Lost | PoseState::NotInitialized => lost += 1,
        }
        reconstructed += result.metrics.markers_reconstructed;
        chains_failed += result.metrics.chains_failed;
        total_ms += result.timing.total_ms;

        if i % PROGRESS_INTERVAL == 0 {
            let pelvis = system.skeleton()[SegmentName::Pelvis].position;
            info!(
                frame = result.index,
                state = ?result.state,
                markers = result.metrics.markers_observed,
                repaired = result.metrics.segments_repaired,
                unresolved = result.unresolved.len(),
                "Frame {}/{}: pelvis=[{:.3}, {:.3}, {:.3}]",
                i,
                frames.len(),
                pelvis.x,
                pelvis.y,
                pelvis.z
            );
        }
    }

    let processed = frames.len().max(1) as f64;
    println!("Done! Processed {} frames", frames.len());
    println!(
        "  tracked={} repaired={} lost={} reconstructed markers={} failed chains={}",
        tracked, repaired, lost, reconstructed, chains_failed
    );
    println!(
        "  height={:.1} cm mass={:.1} kg avg frame time={:.3} ms",
        system.metrics().height_cm(),
        system.metrics().mass_kg(),
        total_ms / processed
    );

    Ok(())
}
