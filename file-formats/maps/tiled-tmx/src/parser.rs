//! Map model builder
//!
//! Walks the element tree produced by [`crate::document`] and fills the typed
//! model. Each entity has an explicit field table: known attributes are
//! converted to their field type, anything else is ignored.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::document::{Element, parse_document};
use crate::error::{Error, Result};
use crate::layer::{Compression, Encoding, Layer, LayerData, LayerPayload};
use crate::loader::{ImageLoader, LoadedMap, load_tiles};
use crate::types::{Map, MapObject, ObjectGroup, Properties, Tile, TileImage, Tileset};
use crate::version::TmxVersion;

/// Parser for TMX map documents
///
/// # Examples
///
/// ```rust,no_run
/// use tiled_tmx::TmxParser;
///
/// let parser = TmxParser::new();
/// let map = parser.parse_and_decode("maps/level1.tmx").unwrap();
/// let ground = map.layer("Ground").unwrap();
/// println!("top-left gid: {:?}", ground.tile_at(0, 0));
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct TmxParser {
    version: TmxVersion,
}

impl TmxParser {
    /// Create a parser for version 1.0 documents
    pub fn new() -> Self {
        Self::default()
    }

    /// Version this parser accepts
    pub fn version(&self) -> TmxVersion {
        self.version
    }

    /// Parse a map file
    ///
    /// Relative tileset and image sources are resolved against the directory
    /// of `path`. Layer payloads are left undecoded.
    pub fn parse(&self, path: impl AsRef<Path>) -> Result<Map> {
        let path = path.as_ref();
        let absolute = std::path::absolute(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = fs::read_to_string(&absolute).map_err(|source| Error::Io {
            path: absolute.clone(),
            source,
        })?;

        log::info!("Parsing map {}", absolute.display());
        let base_dir = absolute.parent().unwrap_or_else(|| Path::new(""));
        let mut map = self
            .parse_str(&text, base_dir)
            .map_err(|e| e.with_path(&absolute))?;
        map.source_path = Some(absolute);
        Ok(map)
    }

    /// Parse map text, resolving relative sources against `base_dir`
    pub fn parse_str(&self, text: &str, base_dir: impl AsRef<Path>) -> Result<Map> {
        let document = parse_document(text)?;
        let mut map = self.build_map(&document.root, base_dir.as_ref())?;
        map.convert()?;
        log::debug!("Built {map}");
        Ok(map)
    }

    /// Parse a map file and decode every layer
    pub fn parse_and_decode(&self, path: impl AsRef<Path>) -> Result<Map> {
        let mut map = self.parse(path)?;
        map.decode()?;
        Ok(map)
    }

    /// Parse, decode, then load all tile images through `loader`
    pub fn parse_decode_and_load<L: ImageLoader>(
        &self,
        path: impl AsRef<Path>,
        loader: &mut L,
    ) -> Result<LoadedMap<L::Image>> {
        let map = self.parse_and_decode(path)?;
        let tiles = load_tiles(&map, loader)?;
        log::info!("Loaded {} tile images", tiles.len());
        Ok(LoadedMap { map, tiles })
    }

    fn build_map(&self, root: &Element, base_dir: &Path) -> Result<Map> {
        if root.name != "map" {
            return Err(Error::MissingSection("map".to_string()));
        }
        let version = TmxVersion::from_attribute(root.attribute("version"))?;

        let width = attribute_or(root, "width", 0)?;
        let height = attribute_or(root, "height", 0)?;

        let tilesets = root
            .children_named("tileset")
            .map(|node| build_tileset(node, base_dir))
            .collect::<Result<Vec<_>>>()?;

        let layers = root
            .children_named("layer")
            .map(|node| build_layer(node, width, height))
            .collect::<Result<Vec<_>>>()?;
        if layers.is_empty() {
            return Err(Error::MissingSection("layer".to_string()));
        }

        let object_groups = root
            .children_named("objectgroup")
            .map(build_object_group)
            .collect::<Result<Vec<_>>>()?;

        Ok(Map {
            version: version.to_string(),
            orientation: attribute_or(root, "orientation", Default::default())?,
            width,
            height,
            tile_width: attribute_or(root, "tilewidth", 0)?,
            tile_height: attribute_or(root, "tileheight", 0)?,
            render_order: text_attribute(root, "renderorder"),
            background_color: text_attribute(root, "backgroundcolor"),
            tilesets,
            layers,
            object_groups,
            properties: read_properties(root),
            ..Default::default()
        })
    }
}

/// Read an attribute converted to `T`, `None` if absent
fn attribute<T: FromStr>(element: &Element, name: &str) -> Result<Option<T>> {
    element
        .attribute(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| Error::invalid_attribute(&element.name, name, raw))
        })
        .transpose()
}

/// Read an attribute converted to `T`, falling back to `default` if absent
fn attribute_or<T: FromStr>(element: &Element, name: &str, default: T) -> Result<T> {
    Ok(attribute(element, name)?.unwrap_or(default))
}

fn text_attribute(element: &Element, name: &str) -> Option<String> {
    element.attribute(name).map(str::to_string)
}

/// Read a flag written as `0`/`1` or `false`/`true`
fn flag_or(element: &Element, name: &str, default: bool) -> Result<bool> {
    match element.attribute(name).map(str::trim) {
        None => Ok(default),
        Some("1" | "true") => Ok(true),
        Some("0" | "false") => Ok(false),
        Some(other) => Err(Error::invalid_attribute(&element.name, name, other)),
    }
}

/// Merge every `<properties>` block of an element, later entries win
fn read_properties(element: &Element) -> Properties {
    let mut properties = Properties::new();
    for block in element.children_named("properties") {
        for property in block.children_named("property") {
            let Some(name) = property.attribute("name") else {
                log::warn!("Ignoring unnamed <property> on <{}>", element.name);
                continue;
            };
            let value = property
                .attribute("value")
                .map_or_else(|| property.text.clone(), str::to_string);
            properties.insert(name, value);
        }
    }
    properties
}

fn build_tileset(node: &Element, base_dir: &Path) -> Result<Tileset> {
    let first_gid = attribute_or(node, "firstgid", 1)?;

    let Some(source) = node.attribute("source") else {
        let mut tileset = read_tileset(node, base_dir)?;
        tileset.first_gid = first_gid;
        return Ok(tileset);
    };

    let path = base_dir.join(source);
    log::debug!("Resolving external tileset {}", path.display());
    let text = fs::read_to_string(&path).map_err(|source| Error::TilesetResolutionFailed {
        path: path.clone(),
        source,
    })?;
    let document = parse_document(&text).map_err(|e| e.with_path(&path))?;
    if document.root.name != "tileset" {
        log::error!("{} does not contain a <tileset> root", path.display());
        return Err(Error::MissingSection("tileset".to_string()));
    }

    let tileset_dir = path.parent().unwrap_or(base_dir);
    let mut tileset = read_tileset(&document.root, tileset_dir)?;

    // Properties on the referencing element come first, the TSX overrides them
    let mut properties = read_properties(node);
    properties.merge(std::mem::take(&mut tileset.properties));
    tileset.properties = properties;
    tileset.first_gid = first_gid;
    tileset.source = Some(path);
    Ok(tileset)
}

fn read_tileset(node: &Element, base_dir: &Path) -> Result<Tileset> {
    let images = node
        .children_named("image")
        .map(|image| build_image(image, base_dir))
        .collect::<Result<Vec<_>>>()?;

    let tiles = node
        .children_named("tile")
        .map(|tile| {
            Ok(Tile {
                id: attribute_or(tile, "id", 0)?,
                images: tile
                    .children_named("image")
                    .map(|image| build_image(image, base_dir))
                    .collect::<Result<Vec<_>>>()?,
                properties: read_properties(tile),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Tileset {
        first_gid: 0,
        name: text_attribute(node, "name").unwrap_or_default(),
        source: None,
        tile_width: attribute(node, "tilewidth")?,
        tile_height: attribute(node, "tileheight")?,
        spacing: attribute_or(node, "spacing", 0)?,
        margin: attribute_or(node, "margin", 0)?,
        tile_count: attribute(node, "tilecount")?,
        columns: attribute(node, "columns")?,
        images,
        tiles,
        properties: read_properties(node),
    })
}

fn build_image(node: &Element, base_dir: &Path) -> Result<TileImage> {
    let data = node.child("data");
    Ok(TileImage {
        id: attribute(node, "id")?,
        format: text_attribute(node, "format"),
        source: node.attribute("source").map(|source| base_dir.join(source)),
        encoding: data.and_then(|data| text_attribute(data, "encoding")),
        content: data.map(|data| data.text.trim().to_string()),
        trans: attribute(node, "trans")?,
        width: attribute(node, "width")?,
        height: attribute(node, "height")?,
        properties: read_properties(node),
    })
}

fn build_layer(node: &Element, map_width: u32, map_height: u32) -> Result<Layer> {
    let name = text_attribute(node, "name").unwrap_or_default();

    let data = match node.child("data") {
        Some(data) => {
            let encoding = Encoding::from_attribute(data.attribute("encoding"));
            let payload = if encoding == Encoding::None {
                LayerPayload::Tiles(
                    data.children_named("tile")
                        .map(|tile| tile.attribute("gid").unwrap_or("0").to_string())
                        .collect(),
                )
            } else {
                LayerPayload::Text(data.text.clone())
            };
            LayerData {
                encoding,
                compression: Compression::from_attribute(data.attribute("compression")),
                payload: Some(payload),
            }
        }
        None => {
            log::debug!("Layer '{name}' has no <data> element");
            LayerData::default()
        }
    };

    Ok(Layer {
        x: attribute_or(node, "x", 0)?,
        y: attribute_or(node, "y", 0)?,
        width: attribute_or(node, "width", map_width)?,
        height: attribute_or(node, "height", map_height)?,
        opacity: attribute_or(node, "opacity", 1.0)?,
        visible: flag_or(node, "visible", true)?,
        properties: read_properties(node),
        data,
        name,
        ..Default::default()
    })
}

fn build_object_group(node: &Element) -> Result<ObjectGroup> {
    let objects = node
        .children_named("object")
        .map(build_object)
        .collect::<Result<Vec<_>>>()?;

    Ok(ObjectGroup {
        name: text_attribute(node, "name").unwrap_or_default(),
        x: attribute_or(node, "x", 0)?,
        y: attribute_or(node, "y", 0)?,
        width: attribute_or(node, "width", 0)?,
        height: attribute_or(node, "height", 0)?,
        opacity: attribute_or(node, "opacity", 1.0)?,
        visible: flag_or(node, "visible", true)?,
        color: text_attribute(node, "color"),
        objects,
        properties: read_properties(node),
    })
}

fn build_object(node: &Element) -> Result<MapObject> {
    Ok(MapObject {
        id: attribute(node, "id")?,
        name: text_attribute(node, "name"),
        // Newer editors write `class` instead of `type`
        object_type: text_attribute(node, "type").or_else(|| text_attribute(node, "class")),
        x: attribute_or(node, "x", 0.0)?,
        y: attribute_or(node, "y", 0.0)?,
        width: attribute_or(node, "width", 0.0)?,
        height: attribute_or(node, "height", 0.0)?,
        gid: attribute(node, "gid")?,
        image_source: node
            .child("image")
            .and_then(|image| text_attribute(image, "source")),
        properties: read_properties(node),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Orientation, Rgb};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    const SMALL_MAP: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.0" orientation="orthogonal" width="2" height="2" tilewidth="32" tileheight="16" renderorder="right-down">
 <properties>
  <property name="music" value="field.ogg"/>
 </properties>
 <properties>
  <property name="music" value="town.ogg"/>
  <property name="intro">Welcome
home</property>
 </properties>
 <tileset firstgid="1" name="terrain" tilewidth="32" tileheight="32" spacing="1" margin="2">
  <image source="art/terrain.png" trans="ff00ff" width="256" height="256"/>
  <tile id="3">
   <properties><property name="collision" value="1"/></properties>
  </tile>
 </tileset>
 <layer name="Ground" width="2" height="2" opacity="0.5" visible="0" unknown="kept-out">
  <data encoding="csv">1,0,0,2</data>
 </layer>
 <layer name="Detail">
  <data>
   <tile gid="4"/><tile/><tile gid="0"/><tile gid="1"/>
  </data>
 </layer>
 <objectgroup name="Navigation" color="#a0a0a4">
  <object id="1" name="start" type="spawn" x="16" y="40.5" width="8" height="8"/>
  <object id="2" class="door" x="0" y="0" gid="7"/>
 </objectgroup>
</map>"##;

    #[test]
    fn test_parse_small_map() {
        let map = TmxParser::new().parse_str(SMALL_MAP, "/maps").unwrap();

        assert_eq!(map.version, "1.0");
        assert_eq!(map.orientation, Orientation::Orthogonal);
        assert_eq!((map.width, map.height), (2, 2));
        assert_eq!((map.tile_width, map.tile_height), (32, 16));
        assert_eq!((map.pixel_width, map.pixel_height), (64, 32));
        assert_eq!(map.render_order.as_deref(), Some("right-down"));
        assert!(map.source_path.is_none());

        let tileset = map.tileset("terrain").unwrap();
        assert_eq!(tileset.first_gid, 1);
        assert_eq!((tileset.spacing, tileset.margin), (1, 2));
        assert_eq!(tileset.tile_width, Some(32));
        assert_eq!(
            tileset.images[0].source,
            Some(PathBuf::from("/maps/art/terrain.png"))
        );
        assert_eq!(tileset.images[0].trans, Some(Rgb::new(255, 0, 255)));
        assert_eq!(tileset.tiles[0].properties.get("collision"), Some("1"));
        assert_eq!(tileset.global_id(&tileset.tiles[0]), 4);
    }

    #[test]
    fn test_property_blocks_merge() {
        let map = TmxParser::new().parse_str(SMALL_MAP, "").unwrap();
        assert_eq!(map.properties.get("music"), Some("town.ogg"));
        assert_eq!(map.properties.get("intro"), Some("Welcome\nhome"));
    }

    #[test]
    fn test_layer_fields() {
        let map = TmxParser::new().parse_str(SMALL_MAP, "").unwrap();

        let ground = map.layer("Ground").unwrap();
        assert_eq!(ground.opacity, 0.5);
        assert!(!ground.visible);
        assert_eq!(ground.pixel_width, 64);
        assert_eq!(ground.data.encoding, Encoding::Csv);

        // Missing size falls back to the map size, missing flags to their defaults
        let detail = map.layer("Detail").unwrap();
        assert_eq!((detail.width, detail.height), (2, 2));
        assert_eq!(detail.opacity, 1.0);
        assert!(detail.visible);
        assert_eq!(
            detail.data.payload,
            Some(LayerPayload::Tiles(
                ["4", "0", "0", "1"].iter().map(|s| s.to_string()).collect()
            ))
        );
    }

    #[test]
    fn test_object_fields() {
        let map = TmxParser::new().parse_str(SMALL_MAP, "").unwrap();
        let (index, group) = map.find_object_group("navigation").unwrap();
        assert_eq!(index, 0);
        assert_eq!(group.color.as_deref(), Some("#a0a0a4"));

        let start = &group.objects[0];
        assert_eq!(start.name.as_deref(), Some("start"));
        assert_eq!(start.object_type.as_deref(), Some("spawn"));
        assert_eq!((start.x, start.y), (16.0, 40.5));

        let door = &group.objects[1];
        assert_eq!(door.object_type.as_deref(), Some("door"));
        assert_eq!(door.gid, Some(7));
        assert_eq!(door.width, 0.0);
    }

    #[test]
    fn test_decode_after_parse() {
        let mut map = TmxParser::new().parse_str(SMALL_MAP, "").unwrap();
        map.decode().unwrap();
        assert_eq!(map.layer("Ground").unwrap().decoded(), &[1, 0, 0, 2]);
        assert_eq!(map.layer("Detail").unwrap().tile_at(0, 1), Some(0));
        assert_eq!(map.layer("Detail").unwrap().tile_at(1, 1), Some(1));
    }

    #[test]
    fn test_unsupported_version() {
        let text = r#"<map version="1.9"><layer name="a"/></map>"#;
        match TmxParser::new().parse_str(text, "").unwrap_err() {
            Error::UnsupportedVersion { found, .. } => assert_eq!(found, "1.9"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_sections() {
        let parser = TmxParser::new();
        assert!(matches!(
            parser.parse_str(r#"<tileset name="x"/>"#, ""),
            Err(Error::MissingSection(section)) if section == "map"
        ));
        assert!(matches!(
            parser.parse_str(r#"<map version="1.0"><objectgroup name="n"/></map>"#, ""),
            Err(Error::MissingSection(section)) if section == "layer"
        ));
    }

    #[test]
    fn test_invalid_attribute() {
        let text = r#"<map version="1.0" width="wide"><layer name="a"/></map>"#;
        match TmxParser::new().parse_str(text, "").unwrap_err() {
            Error::InvalidAttribute {
                element,
                attribute,
                value,
            } => {
                assert_eq!(element, "map");
                assert_eq!(attribute, "width");
                assert_eq!(value, "wide");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let text = r#"<map version="1.0" orientation="diagonal"><layer name="a"/></map>"#;
        assert!(matches!(
            TmxParser::new().parse_str(text, ""),
            Err(Error::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_oversized_map_rejected() {
        let text = r#"<map version="1.0" width="70000" height="1" tilewidth="70000" tileheight="1"><layer name="a"/></map>"#;
        assert!(matches!(
            TmxParser::new().parse_str(text, ""),
            Err(Error::InvalidAttribute { ref element, ref attribute, .. })
                if element == "map" && attribute == "width"
        ));

        let text = r#"<map version="1.0" width="1" height="1" tilewidth="8" tileheight="8">
  <tileset firstgid="4294967295" name="t" tilewidth="8" tileheight="8"><tile id="5"/></tileset>
  <layer name="a"/>
</map>"#;
        assert!(matches!(
            TmxParser::new().parse_str(text, ""),
            Err(Error::InvalidAttribute { ref element, .. }) if element == "tile"
        ));
    }

    #[test]
    fn test_missing_tileset_file() {
        let text = r#"<map version="1.0"><tileset firstgid="1" source="nope.tsx"/><layer name="a"/></map>"#;
        match TmxParser::new().parse_str(text, "/does/not/exist").unwrap_err() {
            Error::TilesetResolutionFailed { path, .. } => {
                assert_eq!(path, PathBuf::from("/does/not/exist/nope.tsx"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_external_tileset_resolves_relative_to_tsx() {
        let dir = tempfile::tempdir().unwrap();
        let tiles_dir = dir.path().join("tilesets");
        fs::create_dir_all(&tiles_dir).unwrap();
        fs::write(
            tiles_dir.join("walls.tsx"),
            r#"<tileset name="walls" tilewidth="16" tileheight="24">
  <properties><property name="theme" value="stone"/></properties>
  <image source="walls.png"/>
  <tile id="0"><properties><property name="collision" value="1"/></properties></tile>
</tileset>"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("level.tmx"),
            r#"<map version="1.0" width="1" height="1" tilewidth="16" tileheight="16">
  <tileset firstgid="5" source="tilesets/walls.tsx" name="ignored">
    <properties><property name="theme" value="wood"/><property name="extra" value="y"/></properties>
  </tileset>
  <layer name="a"><data encoding="csv">5</data></layer>
</map>"#,
        )
        .unwrap();

        let map = TmxParser::new()
            .parse_and_decode(dir.path().join("level.tmx"))
            .unwrap();
        let tileset = &map.tilesets[0];

        assert_eq!(tileset.name, "walls");
        assert_eq!(tileset.first_gid, 5);
        assert_eq!(tileset.tile_height, Some(24));
        assert_eq!(tileset.properties.get("theme"), Some("stone"));
        assert_eq!(tileset.properties.get("extra"), Some("y"));
        assert_eq!(tileset.source.as_deref(), Some(tiles_dir.join("walls.tsx").as_path()));
        assert_eq!(
            tileset.images[0].source.as_deref(),
            Some(tiles_dir.join("walls.png").as_path())
        );
        assert_eq!(map.gids_with_property("collision", "1"), vec![5]);
        assert!(map.source_path.is_some());
    }
}
