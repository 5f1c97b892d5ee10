//! TMX map command implementations

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;
use std::path::{Path, PathBuf};

use tiled_tmx::{Layer, Map, MapObject, ObjectGroup, Properties, Tileset, strip_flip_flags};

use crate::utils::{
    NodeType, TreeNode, TreeOptions, add_table_row, create_table, format_bytes,
    format_dimensions, format_ratio, render_tree,
};

#[derive(Subcommand)]
pub enum TmxCommands {
    /// Display information about a TMX map
    Info {
        /// Path to the TMX file
        file: PathBuf,
    },

    /// Show tree structure of a TMX map
    Tree {
        /// Path to the TMX file
        file: PathBuf,

        /// Maximum depth to display
        #[arg(long)]
        depth: Option<usize>,

        /// Hide external file references
        #[arg(long)]
        no_external_refs: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Show compact metadata inline
        #[arg(long)]
        compact: bool,
    },

    /// Print the decoded tile ids of a layer, one row per line
    Grid {
        /// Path to the TMX file
        file: PathBuf,

        /// Layer name (case-insensitive); defaults to the first layer
        #[arg(short, long)]
        layer: Option<String>,

        /// Keep the flip flags in the printed ids
        #[arg(long)]
        raw: bool,
    },
}

pub fn execute(command: TmxCommands) -> Result<()> {
    match command {
        TmxCommands::Info { file } => execute_info(&file),
        TmxCommands::Tree {
            file,
            depth,
            no_external_refs,
            no_color,
            compact,
        } => execute_tree(
            &file,
            &TreeOptions {
                max_depth: depth,
                show_external_refs: !no_external_refs,
                no_color,
                show_metadata: true,
                compact,
            },
        ),
        TmxCommands::Grid { file, layer, raw } => execute_grid(&file, layer.as_deref(), raw),
    }
}

fn load_map(path: &Path) -> Result<Map> {
    tiled_tmx::parse_and_decode(path)
        .with_context(|| format!("Failed to parse TMX file: {}", path.display()))
}

fn execute_info(path: &Path) -> Result<()> {
    let map = load_map(path)?;
    let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or_default();

    println!("\n{}", style("TMX Map Information").bold().underlined());
    println!("File: {} ({})", style(path.display()).cyan(), format_bytes(file_size));
    println!("Version: {}", style(&map.version).yellow());
    println!("Orientation: {}", style(&map.orientation).yellow());
    println!(
        "Size: {} tiles of {} px ({} px)",
        style(format_dimensions(map.width, map.height)).green(),
        format_dimensions(map.tile_width, map.tile_height),
        format_dimensions(map.pixel_width, map.pixel_height)
    );
    if let Some(render_order) = &map.render_order {
        println!("Render Order: {render_order}");
    }
    if let Some(background) = &map.background_color {
        println!("Background: {background}");
    }

    if !map.tilesets.is_empty() {
        println!("\n{}", style("Tilesets").bold());
        let mut table = create_table(&["Name", "First GID", "Tiles", "Tile Size", "Source"]);
        for tileset in &map.tilesets {
            let (tile_width, tile_height) = tileset.tile_size(map.tile_width, map.tile_height);
            add_table_row(
                &mut table,
                vec![
                    tileset.name.clone(),
                    tileset.first_gid.to_string(),
                    tileset
                        .tile_count
                        .map_or_else(|| tileset.tiles.len().to_string(), |count| count.to_string()),
                    format_dimensions(tile_width, tile_height),
                    tileset
                        .source
                        .as_ref()
                        .map_or_else(|| "inline".to_string(), |source| source.display().to_string()),
                ],
            );
        }
        table.printstd();
    }

    println!("\n{}", style("Layers").bold());
    let mut table = create_table(&["Name", "Size", "Encoding", "Compression", "Visible", "Filled"]);
    for layer in &map.layers {
        let filled = layer.decoded().iter().filter(|&&gid| gid != 0).count();
        add_table_row(
            &mut table,
            vec![
                layer.name.clone(),
                format_dimensions(layer.width, layer.height),
                layer.data.encoding.to_string(),
                layer.data.compression.to_string(),
                yes_no(layer.visible),
                format_ratio(filled, layer.decoded().len()),
            ],
        );
    }
    table.printstd();

    if !map.object_groups.is_empty() {
        println!("\n{}", style("Object Groups").bold());
        let mut table = create_table(&["Name", "Objects", "Visible"]);
        for group in &map.object_groups {
            add_table_row(
                &mut table,
                vec![
                    group.name.clone(),
                    group.objects.len().to_string(),
                    yes_no(group.visible),
                ],
            );
        }
        table.printstd();
    }

    Ok(())
}

fn yes_no(value: bool) -> String {
    let text = if value { "yes" } else { "no" };
    text.to_string()
}

fn execute_tree(path: &Path, options: &TreeOptions) -> Result<()> {
    let map = load_map(path)?;
    let file_name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
    let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or_default();

    let mut root = TreeNode::new(file_name, NodeType::Root)
        .with_size(file_size)
        .with_metadata("version", &map.version)
        .with_metadata("orientation", &map.orientation)
        .with_metadata("size", format_dimensions(map.width, map.height))
        .with_metadata("tile size", format_dimensions(map.tile_width, map.tile_height));
    root = with_properties(root, &map.properties);

    for tileset in &map.tilesets {
        root = root.add_child(tileset_node(tileset));
    }
    for layer in &map.layers {
        root = root.add_child(layer_node(layer));
    }
    for group in &map.object_groups {
        root = root.add_child(object_group_node(group));
    }

    print!("{}", render_tree(&root, options));
    Ok(())
}

fn with_properties(mut node: TreeNode, properties: &Properties) -> TreeNode {
    for (name, value) in properties.iter() {
        node = node.add_child(TreeNode::new(format!("{name} = {value}"), NodeType::Property));
    }
    node
}

fn tileset_node(tileset: &Tileset) -> TreeNode {
    let mut node = TreeNode::new(&tileset.name, NodeType::Tileset)
        .with_metadata("firstgid", tileset.first_gid)
        .with_metadata("count", tileset.tiles.len());
    if let Some(source) = &tileset.source {
        node = node.with_external_ref(&source.display().to_string(), Some(source.exists()));
    }
    for image in &tileset.images {
        if let Some(source) = &image.source {
            node = node.with_external_ref(&source.display().to_string(), Some(source.exists()));
        }
    }
    node = with_properties(node, &tileset.properties);

    for tile in &tileset.tiles {
        let mut tile_node = TreeNode::new(format!("tile {}", tile.id), NodeType::Tile)
            .with_metadata("gid", tileset.global_id(tile));
        tile_node = with_properties(tile_node, &tile.properties);
        node = node.add_child(tile_node);
    }
    node
}

fn layer_node(layer: &Layer) -> TreeNode {
    let node = TreeNode::new(&layer.name, NodeType::Layer)
        .with_metadata("size", format_dimensions(layer.width, layer.height))
        .with_metadata("encoding", &layer.data.encoding)
        .with_metadata("compression", &layer.data.compression)
        .with_metadata("visible", layer.visible);
    with_properties(node, &layer.properties)
}

fn object_group_node(group: &ObjectGroup) -> TreeNode {
    let mut node = TreeNode::new(&group.name, NodeType::ObjectGroup)
        .with_metadata("count", group.objects.len());
    node = with_properties(node, &group.properties);
    for (index, object) in group.objects.iter().enumerate() {
        node = node.add_child(object_node(index, object));
    }
    node
}

fn object_node(index: usize, object: &MapObject) -> TreeNode {
    let name = object
        .name
        .clone()
        .unwrap_or_else(|| format!("object #{index}"));
    let mut node = TreeNode::new(name, NodeType::Object)
        .with_metadata("position", format!("{},{}", object.x, object.y));
    if let Some(object_type) = &object.object_type {
        node = node.with_metadata("type", object_type);
    }
    if let Some(gid) = object.gid {
        node = node.with_metadata("gid", gid);
    }
    with_properties(node, &object.properties)
}

fn execute_grid(path: &Path, layer_name: Option<&str>, raw: bool) -> Result<()> {
    let map = load_map(path)?;
    let layer = match layer_name {
        Some(name) => map
            .find_layer(name)
            .map(|(_, layer)| layer)
            .with_context(|| format!("No tile layer named \"{name}\" in {}", path.display()))?,
        None => map
            .layers
            .first()
            .with_context(|| format!("No tile layers in {}", path.display()))?,
    };

    for row in layer.rows() {
        let ids: Vec<String> = row
            .iter()
            .map(|&gid| (if raw { gid } else { strip_flip_flags(gid) }).to_string())
            .collect();
        println!("{}", ids.join(","));
    }
    Ok(())
}
