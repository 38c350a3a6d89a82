use std::io::Write;
use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;
use crate::odometry::FrameReport;

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize, P: AsRef<Path>>(output_path: P, object: &T) -> Result<()> {
    let j = serde_json::to_string_pretty(object)?;
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(j.as_bytes())?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned, P: AsRef<Path>>(file_path: P) -> Result<T> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct TrajectoryEntry {
    pub frame_index: usize,
    pub time_ns: i64,
    pub translation: [f64; 3],
}

/// Accumulated positions of the frames that carried a pose.
pub fn trajectory_entries<'a>(
    reports: impl IntoIterator<Item = (&'a FrameReport, i64)>,
) -> Vec<TrajectoryEntry> {
    reports
        .into_iter()
        .filter_map(|(r, time_ns)| {
            r.translation.map(|translation| TrajectoryEntry {
                frame_index: r.frame_index,
                time_ns,
                translation,
            })
        })
        .collect()
}

/// Writes a plain-text summary of a run.
pub fn write_report<P: AsRef<Path>>(output_path: P, reports: &[FrameReport]) -> Result<()> {
    let updated = reports.iter().filter(|r| r.pose_updated).count();
    let matched = reports.iter().filter(|r| r.matches.matched).count();
    let mean_ms = if reports.is_empty() {
        0.0
    } else {
        reports.iter().map(|r| r.timing.total_ms).sum::<f64>() / reports.len() as f64
    };
    let mut s = String::new();
    s += format!("frames: {}\n", reports.len()).as_str();
    s += format!("matched frames: {}\n", matched).as_str();
    s += format!("pose updates: {}\n", updated).as_str();
    s += format!("average frame time: {:.3} ms\n", mean_ms).as_str();
    if let Some(t) = reports.iter().rev().find_map(|r| r.translation) {
        s += format!("final translation: [{:.5}, {:.5}, {:.5}]\n", t[0], t[1], t[2]).as_str();
    }
    let mut file = std::fs::File::create(output_path)?;
    file.write_all(s.as_bytes())?;
    Ok(())
}
