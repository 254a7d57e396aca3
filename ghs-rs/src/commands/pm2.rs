//! PM2 model command implementations

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use ghs_pm2::{MaterialKey, MeshBuffers, Model, decode_model};
use serde::Serialize;

use crate::utils::{add_table_row, create_table, format_bounds, format_bytes};

#[derive(Subcommand)]
pub enum Pm2Commands {
    /// Display information about a PM2 model file
    Info {
        /// Path to the PM2 file
        file: PathBuf,

        /// Show a per-group breakdown
        #[arg(short, long)]
        detailed: bool,
    },

    /// Export flattened mesh buffers and material keys as JSON
    Export {
        /// Path to the PM2 file
        file: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn execute(cmd: Pm2Commands) -> Result<()> {
    match cmd {
        Pm2Commands::Info { file, detailed } => handle_info(file, detailed),
        Pm2Commands::Export { file, output } => handle_export(file, output),
    }
}

fn load_model(path: &Path) -> Result<(Model, u64)> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read PM2 file {}", path.display()))?;
    let model = decode_model(&bytes)
        .with_context(|| format!("Failed to decode PM2 model {}", path.display()))?;
    Ok((model, bytes.len() as u64))
}

fn handle_info(path: PathBuf, detailed: bool) -> Result<()> {
    let (model, size) = load_model(&path)?;

    println!("=== PM2 Model: {} ===", path.display());
    println!("Size:       {}", format_bytes(size));
    println!(
        "Type:       0x{:02X} ({}, {})",
        model.model_type.as_u8(),
        if model.model_type.is_fixed_point() {
            "fixed point"
        } else {
            "float"
        },
        if model.animated() { "morph" } else { "static" }
    );
    println!("Groups:     {}", model.groups.len());
    println!("Primitives: {}", model.primitive_count());
    println!("Vertices:   {}", model.vertex_count());
    println!("Triangles:  {}", model.triangle_count());
    if let Some((min, max)) = model.bounds() {
        println!("Bounds:     {}", format_bounds(min, max));
    }

    let keys = model.material_keys();
    println!("Materials:  {}", keys.len());
    for key in &keys {
        println!("  {}", key.name_suffix());
    }

    if detailed {
        println!();
        let mut table = create_table(vec!["Group", "Texture", "Primitives", "Vertices", "Material"]);
        for (index, group) in model.groups.iter().enumerate() {
            add_table_row(
                &mut table,
                vec![
                    index.to_string(),
                    format!("0x{:04X}", group.texture_offset),
                    group.primitives.len().to_string(),
                    group.vertex_count().to_string(),
                    MaterialKey::for_group(group).name_suffix(),
                ],
            );
        }
        table.printstd();
    }

    Ok(())
}

#[derive(Serialize)]
struct MeshExport {
    model_type: u8,
    animated: bool,
    materials: Vec<MaterialKey>,
    /// Material index per group
    group_materials: Vec<usize>,
    mesh: MeshBuffers,
}

fn handle_export(path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let (model, _) = load_model(&path)?;
    let export = MeshExport {
        model_type: model.model_type.as_u8(),
        animated: model.animated(),
        materials: model.material_keys(),
        group_materials: model.group_material_indices(),
        mesh: MeshBuffers::from_model(&model),
    };
    let json = serde_json::to_string_pretty(&export)?;

    match output {
        Some(out) => {
            fs::write(&out, json)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            log::info!("wrote {}", out.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
