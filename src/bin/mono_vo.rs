use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use mono_visual_odometry::data_loader::{FrameSource, ImageSequence};
use mono_visual_odometry::io::{object_from_json, object_to_json, trajectory_entries, write_report};
use mono_visual_odometry::visualization::{log_frame, log_tracks, log_trajectory, set_frame_time};
use mono_visual_odometry::{OdometryConfig, VisualOdometry};

#[derive(Parser)]
#[command(version, about, author)]
struct MonoVoCli {
    /// path to image folder
    path: String,

    /// json file with an OdometryConfig, defaults are used when omitted
    #[arg(long)]
    config: Option<String>,

    #[arg(long, default_value = "0")]
    start_idx: usize,

    #[arg(long, default_value = "1")]
    step: usize,

    /// output folder for the trace, trajectory and report
    #[arg(short, long, default_value = "output")]
    output: String,

    /// save a rerun recording to <output>/odometry.rrd
    #[arg(long, action)]
    rerun: bool,

    /// write the config that was used next to the results
    #[arg(long, action)]
    dump_config: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = MonoVoCli::parse();

    let config: OdometryConfig = match &cli.config {
        Some(path) => object_from_json(path).with_context(|| format!("reading config {}", path))?,
        None => OdometryConfig::default(),
    };
    let output = PathBuf::from(&cli.output);
    std::fs::create_dir_all(&output).with_context(|| format!("creating {}", output.display()))?;
    if cli.dump_config {
        object_to_json(output.join("config.json"), &config)?;
    }

    let mut frames = ImageSequence::new(&cli.path, cli.start_idx, cli.step)?;
    anyhow::ensure!(!frames.is_empty(), "no .png or .jpg images under {}", cli.path);
    let mut vo = VisualOdometry::from_config(&config)?;

    let recording = if cli.rerun {
        Some(rerun::RecordingStreamBuilder::new("mono-vo").save(output.join("odometry.rrd"))?)
    } else {
        None
    };

    let progress = indicatif::ProgressBar::new(frames.len() as u64);
    let now = Instant::now();
    let mut reports = Vec::with_capacity(frames.len());
    let mut times = Vec::with_capacity(frames.len());
    let mut positions = Vec::new();
    while let Some(frame) = frames.next_frame() {
        progress.inc(1);
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("skipping unreadable frame: {}", e);
                continue;
            }
        };
        let report = match vo.process_frame(&frame.image) {
            Ok(report) => report,
            Err(e) => {
                log::warn!("frame {} rejected: {}", frame.index, e);
                continue;
            }
        };
        if let Some(t) = report.translation.filter(|_| report.pose_updated) {
            positions.push(t);
        }
        if let Some(recording) = &recording {
            set_frame_time(recording, frame.time_ns);
            if let (Some(rectified), Some(features)) = (vo.last_rectified(), vo.previous_features()) {
                log_frame(recording, "cam0", rectified, features)?;
            }
            if let Some(correspondences) = vo.last_correspondences().filter(|_| report.matches.matched) {
                log_tracks(recording, "cam0", correspondences)?;
            }
            log_trajectory(recording, &positions, vo.trace())?;
        }
        times.push(frame.time_ns);
        reports.push(report);
    }
    progress.finish();

    let duration_sec = now.elapsed().as_secs_f64();
    println!("processing {} frames took {:.6} sec", reports.len(), duration_sec);
    if !reports.is_empty() {
        println!("avg: {} sec", duration_sec / reports.len() as f64);
    }
    println!("final state: {}", vo.state());
    if let Some(pose) = vo.pose().filter(|_| vo.state().has_pose()) {
        let t = &pose.translation;
        println!("final translation: [{:.5}, {:.5}, {:.5}]", t.x, t.y, t.z);
    }

    vo.trace().save(output.join("trace.png"))?;
    let entries = trajectory_entries(reports.iter().zip(times.iter().copied()));
    object_to_json(output.join("trajectory.json"), &entries)?;
    write_report(output.join("report.txt"), &reports)?;
    Ok(())
}
