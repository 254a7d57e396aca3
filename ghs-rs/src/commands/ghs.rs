//! GHS character description command implementations

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use ghs_anim::{
    BlendWeightMode, CompileOptions, CompiledAnimation, GhsDescription, PoseTrack,
    ScheduleStrategy, SubmodelLoader, compile_clip_set, compile_rest_pose,
};
use ghs_pm2::Model;

use crate::utils::{add_table_row, create_table, format_samples, format_submodel};

#[derive(Subcommand)]
pub enum GhsCommands {
    /// Display the joints, defaults and clips of a GHS description
    Info {
        /// Path to the GHS JSON file
        file: PathBuf,
    },

    /// Compile the clips into visibility, blend weight and pose curves
    Compile {
        /// Path to the GHS JSON file
        file: PathBuf,

        /// Directory holding the `{id:03x}.pm2` submodels
        #[arg(long)]
        pm2_dir: PathBuf,

        /// Pose track for each clip, in clip order
        #[arg(long = "mpr")]
        pose_tracks: Vec<PathBuf>,

        /// How clips are laid out
        #[arg(short, long, value_enum, default_value_t = StrategyArg::SequentialConcat)]
        strategy: StrategyArg,

        /// Where blend weights are written (default depends on the strategy)
        #[arg(short, long, value_enum)]
        blend_weights: Option<BlendWeightArg>,

        /// Only bind the default submodels, without animation
        #[arg(long)]
        rest_pose: bool,

        /// Write the compiled result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    SequentialConcat,
    PaddedConcat,
    ParallelTracks,
    ReplicaPerClip,
}

impl From<StrategyArg> for ScheduleStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::SequentialConcat => Self::SequentialConcat,
            StrategyArg::PaddedConcat => Self::PaddedConcat,
            StrategyArg::ParallelTracks => Self::ParallelTracks,
            StrategyArg::ReplicaPerClip => Self::ReplicaPerClip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BlendWeightArg {
    Direct,
    CarrierChannel,
}

impl From<BlendWeightArg> for BlendWeightMode {
    fn from(arg: BlendWeightArg) -> Self {
        match arg {
            BlendWeightArg::Direct => Self::Direct,
            BlendWeightArg::CarrierChannel => Self::CarrierChannel,
        }
    }
}

pub fn execute(cmd: GhsCommands) -> Result<()> {
    match cmd {
        GhsCommands::Info { file } => handle_info(file),
        GhsCommands::Compile {
            file,
            pm2_dir,
            pose_tracks,
            strategy,
            blend_weights,
            rest_pose,
            output,
        } => {
            let mut options = CompileOptions::for_strategy(strategy.into());
            if let Some(mode) = blend_weights {
                options.blend_weights = mode.into();
            }
            handle_compile(file, pm2_dir, pose_tracks, options, rest_pose, output)
        }
    }
}

/// Loads `{id:03x}.pm2` files from one directory
struct DirectoryLoader {
    dir: PathBuf,
}

impl SubmodelLoader for DirectoryLoader {
    fn load_submodel(&mut self, id: i32) -> ghs_pm2::Result<Option<Model>> {
        let path = self.dir.join(format!("{:03x}.pm2", id));
        if !path.is_file() {
            return Ok(None);
        }
        log::debug!("loading {}", path.display());
        ghs_pm2::decode_model_file(&path).map(Some)
    }
}

fn load_description(path: &Path) -> Result<GhsDescription> {
    GhsDescription::from_file(path)
        .with_context(|| format!("Failed to load GHS description {}", path.display()))
}

fn handle_info(path: PathBuf) -> Result<()> {
    let ghs = load_description(&path)?;

    println!("=== GHS Description: {} ===", path.display());
    println!("Joints: {}", ghs.rig.len());
    println!("Clips:  {}", ghs.clips.len());

    println!();
    let mut table = create_table(vec!["Joint", "Parent", "Rest position", "Default"]);
    for (index, joint) in ghs.rig.joints.iter().enumerate() {
        let p = joint.rest_position;
        add_table_row(
            &mut table,
            vec![
                index.to_string(),
                joint
                    .parent
                    .map_or_else(|| "-".to_string(), |parent| parent.to_string()),
                format!("({:.3}, {:.3}, {:.3})", p.x, p.y, p.z),
                ghs.defaults
                    .get(index)
                    .map_or_else(|| "-".to_string(), format_submodel),
            ],
        );
    }
    table.printstd();

    println!();
    let mut table = create_table(vec!["Clip", "Length", "Resolved", "Keyed joints", "Keyframes"]);
    for (index, clip) in ghs.clips.iter().enumerate() {
        let keyed = clip.keyframes.iter().filter(|k| !k.is_empty()).count();
        let keyframes: usize = clip
            .keyframes
            .iter()
            .map(|k| k.iter().filter(|kf| !kf.is_sentinel()).count())
            .sum();
        add_table_row(
            &mut table,
            vec![
                index.to_string(),
                clip.length.to_string(),
                clip.resolved_length().to_string(),
                keyed.to_string(),
                keyframes.to_string(),
            ],
        );
    }
    table.printstd();

    Ok(())
}

fn handle_compile(
    path: PathBuf,
    pm2_dir: PathBuf,
    pose_tracks: Vec<PathBuf>,
    options: CompileOptions,
    rest_pose: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut ghs = load_description(&path)?;
    if pose_tracks.len() > ghs.clips.len() {
        log::warn!(
            "{} pose tracks given for {} clips; extra tracks are ignored",
            pose_tracks.len(),
            ghs.clips.len()
        );
    }
    let poses = pose_tracks
        .iter()
        .map(|p| {
            PoseTrack::from_file(p)
                .with_context(|| format!("Failed to read pose track {}", p.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    ghs.attach_poses(poses);

    let mut loader = DirectoryLoader { dir: pm2_dir };
    let compiled = if rest_pose {
        compile_rest_pose(&ghs.rig, &ghs.defaults, &mut loader)
    } else {
        compile_clip_set(&ghs.rig, &ghs.defaults, &ghs.clips, options, &mut loader)
    }
    .with_context(|| format!("Failed to compile {}", path.display()))?;

    match output {
        Some(out) => {
            let json = serde_json::to_string_pretty(&compiled)?;
            fs::write(&out, json).with_context(|| format!("Failed to write {}", out.display()))?;
            println!(
                "Compiled {} slots on {} tracks to {}",
                compiled.slots.len(),
                compiled.tracks.len(),
                out.display()
            );
        }
        None => print_summary(&compiled),
    }

    if !compiled.warnings.is_empty() {
        println!("{} warnings", compiled.warnings.len());
    }
    Ok(())
}

fn print_summary(compiled: &CompiledAnimation) {
    println!(
        "Strategy: {} / {}",
        compiled.options.strategy, compiled.options.blend_weights
    );

    let mut table = create_table(vec!["Slot", "Joint", "Submodel", "Role", "Geometry"]);
    for slot in compiled.slots.values() {
        let geometry = match &slot.model {
            Some(_) if slot.animated => "morph",
            Some(_) => "static",
            None => "missing",
        };
        add_table_row(
            &mut table,
            vec![
                slot.name(),
                slot.joint.to_string(),
                format_submodel(slot.submodel),
                format!("{:?}", slot.role),
                geometry.to_string(),
            ],
        );
    }
    table.printstd();

    for (index, track) in compiled.tracks.iter().enumerate() {
        println!();
        let clips: Vec<String> = track
            .clips
            .iter()
            .map(|c| format!("{}@{}+{}", c.clip, c.start, c.length))
            .collect();
        println!("Track {} [{}]", index, clips.join(", "));
        for (slot, timeline) in &track.visibility {
            if let Some(record) = compiled.slot(*slot) {
                println!("  {:<16} {}", record.name(), format_samples(timeline.samples()));
            }
        }
    }
}
