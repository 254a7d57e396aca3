//! MPR pose track command implementations

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use ghs_anim::PoseTrack;

use crate::utils::{add_table_row, create_table};

#[derive(Subcommand)]
pub enum MprCommands {
    /// Display information about an MPR pose track
    Info {
        /// Path to the MPR file
        file: PathBuf,

        /// Show the first sample of every joint
        #[arg(short, long)]
        detailed: bool,
    },
}

pub fn execute(cmd: MprCommands) -> Result<()> {
    match cmd {
        MprCommands::Info { file, detailed } => handle_info(file, detailed),
    }
}

fn handle_info(path: PathBuf, detailed: bool) -> Result<()> {
    let track = PoseTrack::from_file(&path)
        .with_context(|| format!("Failed to read pose track {}", path.display()))?;

    println!("=== MPR Pose Track: {} ===", path.display());
    println!("Joints: {}", track.joints().count());
    println!("Frames: {}", track.frame_count());

    let mut headers = vec!["Joint", "Frames"];
    if detailed {
        headers.extend(["Position", "Rotation (deg)"]);
    }
    let mut table = create_table(headers);
    for (joint, pose) in track.joints() {
        let mut row = vec![joint.to_string(), pose.frame_count().to_string()];
        if detailed {
            match (pose.positions.first(), pose.rotations.first()) {
                (Some(p), Some(r)) => {
                    let deg = r.to_array().map(f32::to_degrees);
                    row.push(format!("({:.3}, {:.3}, {:.3})", p.x, p.y, p.z));
                    row.push(format!("({:.1}, {:.1}, {:.1})", deg[0], deg[1], deg[2]));
                }
                _ => row.extend(["-".to_string(), "-".to_string()]),
            }
        }
        add_table_row(&mut table, row);
    }
    table.printstd();

    Ok(())
}
