//! Navigation artifact export
//!
//! Every format stores the same flat dictionary: `"{x,y}"` → comma-joined
//! neighbour keys, sorted by key.

use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{NavError, Result};
use crate::graph::NavigationGraph;

const PLIST_DOCTYPE: &str = r#"plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd""#;

/// Output format of the navigation artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Apple XML property list
    #[default]
    Plist,
    /// JSON object
    Json,
    /// YAML mapping
    Yaml,
}

impl ExportFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "plist" => Some(ExportFormat::Plist),
            "json" => Some(ExportFormat::Json),
            "yaml" | "yml" => Some(ExportFormat::Yaml),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ExportFormat::Plist => "plist",
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plist" => Ok(ExportFormat::Plist),
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            other => Err(format!("unknown export format '{other}'")),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Render a graph in the given format
pub fn export(graph: &NavigationGraph, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Plist => to_plist(graph),
        ExportFormat::Json => to_json(graph),
        ExportFormat::Yaml => to_yaml(graph),
    }
}

/// Render a graph and write it to `path`
///
/// Nothing is written if rendering fails.
pub fn write_graph(graph: &NavigationGraph, path: &Path, format: ExportFormat) -> Result<()> {
    let rendered = export(graph, format)?;
    fs::write(path, rendered).map_err(|source| NavError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Wrote {} navigation nodes to {} ({format})",
        graph.len(),
        path.display()
    );
    Ok(())
}

/// Render a graph as an XML property list dictionary
pub fn to_plist(graph: &NavigationGraph) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b'\t', 1);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(plist_error)?;
    writer
        .write_event(Event::DocType(BytesText::from_escaped(PLIST_DOCTYPE)))
        .map_err(plist_error)?;

    let mut plist = BytesStart::new("plist");
    plist.push_attribute(("version", "1.0"));
    writer.write_event(Event::Start(plist)).map_err(plist_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("dict")))
        .map_err(plist_error)?;

    for (key, value) in graph.to_string_map() {
        for (tag, text) in [("key", key.as_str()), ("string", value.as_str())] {
            writer
                .write_event(Event::Start(BytesStart::new(tag)))
                .map_err(plist_error)?;
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(plist_error)?;
            writer
                .write_event(Event::End(BytesEnd::new(tag)))
                .map_err(plist_error)?;
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new("dict")))
        .map_err(plist_error)?;
    writer
        .write_event(Event::End(BytesEnd::new("plist")))
        .map_err(plist_error)?;

    let mut bytes = writer.into_inner().into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(plist_error)
}

fn plist_error(e: impl ToString) -> NavError {
    NavError::export("plist", e)
}

/// Render a graph as a pretty-printed JSON object
pub fn to_json(graph: &NavigationGraph) -> Result<String> {
    serde_json::to_string_pretty(&graph.to_string_map()).map_err(|e| NavError::export("json", e))
}

/// Render a graph as a YAML mapping
pub fn to_yaml(graph: &NavigationGraph) -> Result<String> {
    serde_yaml_ng::to_string(&graph.to_string_map()).map_err(|e| NavError::export("yaml", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NavigationExtractor, NodeKey};
    use pretty_assertions::assert_eq;
    use test_case::test_case;
    use tiled_tmx::TmxParser;

    fn sample_graph() -> NavigationGraph {
        let text = r#"<map version="1.0" width="3" height="2" tilewidth="10" tileheight="10">
<layer name="Map"><data encoding="csv">0,0,0,0,0,0</data></layer>
<objectgroup name="Navigation">
 <object x="0" y="0"/>
 <object x="20" y="0"/>
 <object x="0" y="10"/>
</objectgroup>
</map>"#;
        let mut map = TmxParser::new().parse_str(text, "").unwrap();
        map.decode().unwrap();
        NavigationExtractor::default().extract(&map).unwrap()
    }

    #[test]
    fn test_sample_graph() {
        let graph = sample_graph();
        assert_eq!(
            graph.neighbours(NodeKey { x: 0, y: 1 }),
            Some(&[NodeKey { x: 2, y: 1 }, NodeKey { x: 0, y: 0 }][..])
        );
    }

    #[test]
    fn test_plist_layout() {
        let plist = to_plist(&sample_graph()).unwrap();
        let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
	<dict>
		<key>{0,0}</key>
		<string>{0,1}</string>
		<key>{0,1}</key>
		<string>{2,1},{0,0}</string>
		<key>{2,1}</key>
		<string>{0,1}</string>
	</dict>
</plist>
"#;
        assert_eq!(plist, expected);
    }

    #[test]
    fn test_json() {
        let json: serde_json::Value = serde_json::from_str(&to_json(&sample_graph()).unwrap()).unwrap();
        assert_eq!(json["{0,1}"], "{2,1},{0,0}");
        assert_eq!(json.as_object().map(|o| o.len()), Some(3));
    }

    #[test]
    fn test_yaml() {
        let yaml = to_yaml(&sample_graph()).unwrap();
        let parsed: std::collections::BTreeMap<String, String> = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(parsed, sample_graph().to_string_map());
    }

    #[test_case("nav.plist", Some(ExportFormat::Plist))]
    #[test_case("nav.JSON", Some(ExportFormat::Json))]
    #[test_case("nav.yml", Some(ExportFormat::Yaml))]
    #[test_case("nav.txt", None)]
    #[test_case("nav", None)]
    fn test_format_from_path(path: &str, expected: Option<ExportFormat>) {
        assert_eq!(ExportFormat::from_path(Path::new(path)), expected);
    }

    #[test]
    fn test_write_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nav.json");
        write_graph(&sample_graph(), &path, ExportFormat::Json).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("\"{2,1}\": \"{0,1}\""));

        let missing_dir = dir.path().join("missing").join("nav.json");
        assert!(matches!(
            write_graph(&sample_graph(), &missing_dir, ExportFormat::Json),
            Err(NavError::Io { .. })
        ));
    }
}
