//! MAP-PM2 container command implementations

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use ghs_pm2::MapContainer;

use crate::utils::{add_table_row, create_progress_bar, create_table, format_bytes};

#[derive(Subcommand)]
pub enum MapCommands {
    /// Display the layout of a MAP-PM2 container
    Info {
        /// Path to the MAP-PM2 file
        file: PathBuf,

        /// Decode every embedded model and report failures
        #[arg(short, long)]
        detailed: bool,
    },

    /// Write each embedded model to its own PM2 file
    Extract {
        /// Path to the MAP-PM2 file
        file: PathBuf,

        /// Output directory
        output: PathBuf,

        /// Skip entries that do not decode
        #[arg(long)]
        valid_only: bool,
    },
}

pub fn execute(cmd: MapCommands) -> Result<()> {
    match cmd {
        MapCommands::Info { file, detailed } => handle_info(file, detailed),
        MapCommands::Extract {
            file,
            output,
            valid_only,
        } => handle_extract(file, output, valid_only),
    }
}

fn load_container(path: &Path) -> Result<MapContainer> {
    MapContainer::from_file(path)
        .with_context(|| format!("Failed to read MAP container {}", path.display()))
}

fn handle_info(path: PathBuf, detailed: bool) -> Result<()> {
    let container = load_container(&path)?;

    println!("=== MAP-PM2 Container: {} ===", path.display());
    println!(
        "Header:   {}",
        if container.has_magic {
            "MAP"
        } else {
            "none"
        }
    );
    println!("Size:     {}", format_bytes(u64::from(container.file_size)));
    println!("Grid:     {} x {}", container.columns, container.rows);
    println!("Occupied: {}", container.occupied_cells());
    println!("Models:   {}", container.entries.len());

    if detailed {
        println!();
        let mut table = create_table(vec!["Entry", "Offset", "Size", "Vertices", "Status"]);
        for (index, (entry, model)) in container
            .entries
            .iter()
            .zip(container.models())
            .enumerate()
        {
            let (vertices, status) = match model {
                Ok(model) => (model.vertex_count().to_string(), "ok".to_string()),
                Err(e) => ("-".to_string(), e.to_string()),
            };
            add_table_row(
                &mut table,
                vec![
                    index.to_string(),
                    format!("0x{:X}", entry.offset),
                    format_bytes(entry.data.len() as u64),
                    vertices,
                    status,
                ],
            );
        }
        table.printstd();
    }

    Ok(())
}

fn handle_extract(path: PathBuf, output: PathBuf, valid_only: bool) -> Result<()> {
    let container = load_container(&path)?;
    fs::create_dir_all(&output)
        .with_context(|| format!("Failed to create directory {}", output.display()))?;

    let quiet = log::max_level() <= log::LevelFilter::Error;
    let pb = create_progress_bar(container.entries.len() as u64, "Extracting", quiet);

    let mut written = 0;
    let mut skipped = 0;
    for (index, entry) in container.entries.iter().enumerate() {
        pb.inc(1);
        if valid_only && let Err(e) = entry.decode() {
            log::warn!("skipping entry {}: {}", index, e);
            skipped += 1;
            continue;
        }
        let target = output.join(format!("{:03}.pm2", index));
        fs::write(&target, &entry.data)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        written += 1;
    }
    pb.finish_and_clear();

    println!(
        "Extracted {} models to {} ({} skipped)",
        written,
        output.display(),
        skipped
    );
    Ok(())
}
