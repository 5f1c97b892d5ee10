//! Navigation graph command

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use console::style;
use std::path::PathBuf;

use tiled_nav::{ExportFormat, NavError, NavigationExtractor, NavigationOptions, Origin};

use crate::utils::create_spinner;

#[derive(Args)]
pub struct NavArgs {
    /// Path to the TMX map
    pub input: PathBuf,

    /// Path of the navigation file to write
    pub output: PathBuf,

    /// Output format; guessed from the output extension when omitted
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Where row 0 of the output coordinates lies
    #[arg(long, value_enum, default_value_t = OriginArg::BottomLeft)]
    pub origin: OriginArg,

    /// Object group holding the waypoints
    #[arg(long, default_value = "Navigation")]
    pub waypoint_group: String,

    /// Tile layer checked for collision tiles
    #[arg(long, default_value = "Map")]
    pub collision_layer: String,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Plist,
    Json,
    Yaml,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Plist => ExportFormat::Plist,
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Yaml => ExportFormat::Yaml,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OriginArg {
    BottomLeft,
    TopLeft,
}

impl From<OriginArg> for Origin {
    fn from(value: OriginArg) -> Self {
        match value {
            OriginArg::BottomLeft => Origin::BottomLeft,
            OriginArg::TopLeft => Origin::TopLeft,
        }
    }
}

impl NavArgs {
    fn options(&self) -> NavigationOptions {
        NavigationOptions {
            waypoint_group: self.waypoint_group.clone(),
            collision_layer: self.collision_layer.clone(),
            origin: self.origin.into(),
            ..Default::default()
        }
    }

    fn export_format(&self) -> ExportFormat {
        self.format.map_or_else(
            || ExportFormat::from_path(&self.output).unwrap_or_default(),
            Into::into,
        )
    }
}

pub fn execute(args: NavArgs, quiet: bool) -> Result<()> {
    let map = tiled_tmx::parse_and_decode(&args.input)
        .with_context(|| format!("Failed to parse TMX file: {}", args.input.display()))?;

    if !quiet {
        println!(
            "processing {}x{} cells at {}x{} px",
            map.width, map.height, map.tile_width, map.tile_height
        );
    }

    let extractor = NavigationExtractor::new(args.options());
    let located = match extractor.locate(&map) {
        Ok(located) => located,
        Err(NavError::MissingRequiredLayer { missing }) => {
            for section in &missing {
                eprintln!("{} {section}", style("Error:").red().bold());
            }
            anyhow::bail!(
                "{} required section(s) missing in {}",
                missing.len(),
                args.input.display()
            );
        }
        Err(err) => return Err(err.into()),
    };

    if !quiet {
        println!(
            "Found navigation layer at index {}",
            style(located.waypoint_group).green()
        );
        println!(
            "Found map layer at index {}",
            style(located.collision_layer).green()
        );
    }

    let spinner = create_spinner("Linking waypoints...", quiet);
    let graph = extractor
        .extract(&map)
        .context("Failed to build navigation graph");
    spinner.finish_and_clear();
    let graph = graph?;

    let format = args.export_format();
    tiled_nav::write_graph(&graph, &args.output, format)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    if !quiet {
        println!(
            "{format} containing {} navigation nodes was created",
            style(graph.len()).green()
        );
    }

    Ok(())
}
