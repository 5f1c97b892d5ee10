//! Tree structure rendering utilities for map visualization

use console::Style;
use std::collections::BTreeMap;

use super::format::format_bytes;

/// Represents a node in a tree structure
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub node_type: NodeType,
    pub size: Option<u64>,
    pub children: Vec<TreeNode>,
    pub metadata: BTreeMap<String, String>,
    pub external_refs: Vec<ExternalRef>,
}

/// Types of nodes in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeType {
    Root,
    Header,
    Tileset,
    Tile,
    Layer,
    ObjectGroup,
    Object,
    Property,
}

/// External file reference
#[derive(Debug, Clone)]
pub struct ExternalRef {
    pub path: String,
    pub ref_type: RefType,
    pub exists: Option<bool>,
}

/// Types of external references
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefType {
    Map,
    Tileset,
    Image,
    Unknown,
}

/// Options for tree rendering
#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub max_depth: Option<usize>,
    pub show_external_refs: bool,
    pub no_color: bool,
    pub show_metadata: bool,
    pub compact: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            show_external_refs: true,
            no_color: false,
            show_metadata: true,
            compact: false,
        }
    }
}

impl TreeNode {
    /// Create a new tree node
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            size: None,
            children: Vec::new(),
            metadata: BTreeMap::new(),
            external_refs: Vec::new(),
        }
    }

    /// Add a child node
    pub fn add_child(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    /// Set the size of this node
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Add an external reference, recording whether the file exists on disk
    pub fn with_external_ref(mut self, path: &str, exists: Option<bool>) -> Self {
        self.external_refs.push(ExternalRef {
            path: path.to_string(),
            ref_type: detect_ref_type(path),
            exists,
        });
        self
    }
}

impl ExternalRef {
    /// Get emoji icon for reference type
    pub fn icon(&self) -> &'static str {
        match self.ref_type {
            RefType::Map => "🗺️",
            RefType::Tileset => "🧩",
            RefType::Image => "🖼️",
            RefType::Unknown => "📁",
        }
    }

    /// Get color style based on existence
    pub fn style(&self, no_color: bool) -> Style {
        if no_color {
            Style::new()
        } else {
            match self.exists {
                Some(true) => Style::new().green(),
                Some(false) => Style::new().red(),
                None => Style::new().yellow(),
            }
        }
    }
}

impl NodeType {
    /// Get emoji icon for node type
    pub fn icon(&self) -> &'static str {
        match self {
            NodeType::Root => "🗺️",
            NodeType::Header => "📋",
            NodeType::Tileset => "🧩",
            NodeType::Tile => "▫️",
            NodeType::Layer => "📐",
            NodeType::ObjectGroup => "📦",
            NodeType::Object => "📍",
            NodeType::Property => "🏷️",
        }
    }

    /// Get color style for node type
    pub fn style(&self, no_color: bool) -> Style {
        if no_color {
            Style::new()
        } else {
            match self {
                NodeType::Root => Style::new().bold().cyan(),
                NodeType::Header => Style::new().bold().yellow(),
                NodeType::Tileset => Style::new().magenta(),
                NodeType::Tile => Style::new().white(),
                NodeType::Layer => Style::new().blue(),
                NodeType::ObjectGroup => Style::new().cyan(),
                NodeType::Object => Style::new().green(),
                NodeType::Property => Style::new().dim(),
            }
        }
    }
}

/// Render a tree structure to string
pub fn render_tree(root: &TreeNode, options: &TreeOptions) -> String {
    let mut output = String::new();
    render_node(root, &mut output, "", true, 0, options);
    output
}

/// Render a single node and its children
fn render_node(
    node: &TreeNode,
    output: &mut String,
    prefix: &str,
    is_last: bool,
    depth: usize,
    options: &TreeOptions,
) {
    if let Some(max_depth) = options.max_depth
        && depth > max_depth
    {
        return;
    }

    let icon = node.node_type.icon();
    let style = node.node_type.style(options.no_color);
    let connector = if depth == 0 {
        ""
    } else if is_last {
        "└── "
    } else {
        "├── "
    };

    let mut line = format!(
        "{}{}{} {}",
        prefix,
        connector,
        icon,
        style.apply_to(&node.name)
    );

    if let Some(size) = node.size {
        line.push_str(&format!(" ({})", format_bytes(size)));
    }

    if options.show_metadata && options.compact && !node.metadata.is_empty() {
        let meta_parts: Vec<String> = node
            .metadata
            .iter()
            .filter(|(key, _)| ["version", "count", "size", "firstgid"].contains(&key.as_str()))
            .map(|(key, value)| format!("{key}:{value}"))
            .collect();
        if !meta_parts.is_empty() {
            line.push_str(&format!(" [{}]", meta_parts.join(", ")));
        }
    }

    output.push_str(&line);
    output.push('\n');

    let child_prefix = if depth == 0 {
        ""
    } else if is_last {
        "    "
    } else {
        "│   "
    };
    let detail_prefix = format!("{prefix}{child_prefix}    ");

    if options.show_metadata && !options.compact {
        let meta_style = Style::new().dim();
        for (key, value) in &node.metadata {
            output.push_str(&format!(
                "{}🏷️  {}: {}\n",
                detail_prefix,
                meta_style.apply_to(key),
                value
            ));
        }
    }

    if options.show_external_refs {
        for ext_ref in &node.external_refs {
            output.push_str(&format!(
                "{}└─→ {} {}\n",
                detail_prefix,
                ext_ref.icon(),
                ext_ref.style(options.no_color).apply_to(&ext_ref.path)
            ));
        }
    }

    let new_prefix = if depth == 0 {
        String::new()
    } else {
        format!("{prefix}{child_prefix}")
    };

    for (i, child) in node.children.iter().enumerate() {
        let is_last_child = i + 1 == node.children.len();
        render_node(child, output, &new_prefix, is_last_child, depth + 1, options);
    }
}

/// Detect reference type from file extension
pub fn detect_ref_type(path: &str) -> RefType {
    let path_lower = path.to_lowercase();

    if path_lower.ends_with(".tmx") {
        RefType::Map
    } else if path_lower.ends_with(".tsx") {
        RefType::Tileset
    } else if [".png", ".gif", ".jpg", ".jpeg", ".bmp"]
        .iter()
        .any(|ext| path_lower.ends_with(ext))
    {
        RefType::Image
    } else {
        RefType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TreeNode {
        TreeNode::new("level1.tmx", NodeType::Root)
            .with_size(2048)
            .with_metadata("version", "1.0")
            .add_child(
                TreeNode::new("dungeon", NodeType::Tileset)
                    .with_metadata("firstgid", 2)
                    .with_external_ref("tilesets/dungeon.tsx", Some(true))
                    .add_child(TreeNode::new("tile 0", NodeType::Tile)),
            )
            .add_child(TreeNode::new("Map", NodeType::Layer).with_metadata("size", "5x3"))
    }

    #[test]
    fn test_tree_rendering() {
        let options = TreeOptions {
            no_color: true,
            ..Default::default()
        };
        let output = render_tree(&sample(), &options);

        assert!(output.starts_with("🗺️ level1.tmx (2.05 kB)\n"));
        assert!(output.contains("├── 🧩 dungeon"));
        assert!(output.contains("│   └── ▫️ tile 0"));
        assert!(output.contains("└── 📐 Map"));
        assert!(output.contains("└─→ 🧩 tilesets/dungeon.tsx"));
    }

    #[test]
    fn test_max_depth_and_compact() {
        let options = TreeOptions {
            max_depth: Some(1),
            no_color: true,
            compact: true,
            show_external_refs: false,
            ..Default::default()
        };
        let output = render_tree(&sample(), &options);

        assert!(!output.contains("tile 0"));
        assert!(output.contains("dungeon [firstgid:2]"));
        assert!(output.contains("Map [size:5x3]"));
        assert!(!output.contains("🏷️"));
        assert!(!output.contains("dungeon.tsx"));
    }

    #[test]
    fn test_ref_type_detection() {
        assert_eq!(detect_ref_type("level1.tmx"), RefType::Map);
        assert_eq!(detect_ref_type("tilesets/dungeon.TSX"), RefType::Tileset);
        assert_eq!(detect_ref_type("images/dungeon.png"), RefType::Image);
        assert_eq!(detect_ref_type("notes.txt"), RefType::Unknown);
    }
}
