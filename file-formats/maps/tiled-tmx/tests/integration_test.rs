//! Integration tests for the TMX parser

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tiled_tmx::{
    Encoding, Error, FLIPPED_HORIZONTALLY_FLAG, ImageLoader, Rgb, StripLayout, TmxParser,
    strip_flip_flags,
};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

const EXPECTED_IDS: [u32; 8] = [1, 2, 0, 3, 4 | FLIPPED_HORIZONTALLY_FLAG, 0, 2, 1];

#[test]
fn test_every_encoding_decodes_to_the_same_ids() {
    let map = tiled_tmx::parse_and_decode(fixture("encodings.tmx")).unwrap();

    assert_eq!(map.layers.len(), 5);
    for layer in &map.layers {
        assert_eq!(layer.decoded(), &EXPECTED_IDS, "layer {}", layer.name);
        assert_eq!(layer.decoded().len(), (layer.width * layer.height) as usize);
    }

    let xml = map.layer("Xml").unwrap();
    assert_eq!(xml.data.encoding, Encoding::None);
    assert!(!xml.visible);
    assert_eq!(xml.tile_at(0, 1).map(strip_flip_flags), Some(4));
    assert_eq!(xml.tile_at(3, 0), Some(3));
}

#[test]
fn test_map_fields() {
    let map = tiled_tmx::parse(fixture("encodings.tmx")).unwrap();

    assert_eq!((map.pixel_width, map.pixel_height), (128, 64));
    assert_eq!(map.properties.get("title"), Some("Encodings"));
    assert_eq!(
        map.source_path.as_deref(),
        Some(std::path::absolute(fixture("encodings.tmx")).unwrap().as_path())
    );

    // Undecoded until asked
    assert!(map.layers.iter().all(|layer| !layer.is_decoded()));

    let spawns = &map.object_groups[0];
    assert_eq!(spawns.name, "Spawns");
    assert_eq!(spawns.objects[1].x, 100.5);
    assert_eq!(spawns.objects[1].properties.get("loot"), Some("gold"));
    assert_eq!(map.gids_with_property("collision", "1"), vec![3]);
}

#[test]
fn test_external_tileset() {
    let map = tiled_tmx::parse_and_decode(fixture("external.tmx")).unwrap();
    let dungeon = &map.tilesets[1];

    assert_eq!(dungeon.name, "dungeon");
    assert_eq!(dungeon.first_gid, 2);
    assert_eq!((dungeon.margin, dungeon.spacing), (1, 1));
    assert_eq!(dungeon.properties.get("theme"), Some("stone"));

    // Image paths are relative to the tsx file, not the map
    let image = dungeon.images[0].source.clone().unwrap();
    assert!(image.ends_with("tilesets/../images/dungeon.png"));
    assert_eq!(dungeon.images[0].trans, Some(Rgb::new(255, 0, 255)));

    assert_eq!(map.gids_with_property("collision", "1"), vec![2]);
    assert_eq!(map.tileset_for_gid(5).map(|t| t.name.as_str()), Some("dungeon"));
    assert_eq!(map.tileset_for_gid(1).map(|t| t.name.as_str()), Some("inline"));
}

#[test]
fn test_unsupported_version() {
    let err = tiled_tmx::parse(fixture("future_version.tmx")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unsupported map version: expected 1.0, found 1.2"
    );
}

#[test]
fn test_truncated_document_reports_file() {
    match tiled_tmx::parse(fixture("truncated.tmx")).unwrap_err() {
        Error::MalformedDocument { path, .. } => {
            assert!(path.unwrap().ends_with("truncated.tmx"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_short_layer_is_rejected() {
    let err = tiled_tmx::parse_and_decode(fixture("short_layer.tmx")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Layer 'Ground': expected 4 tiles (2x2), decoded 3"
    );
}

#[test]
fn test_missing_file() {
    let err = TmxParser::new().parse(fixture("nope.tmx")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

/// Hands out tile indices instead of pixels
#[derive(Default)]
struct CountingLoader {
    strips: usize,
}

impl ImageLoader for CountingLoader {
    type Image = (PathBuf, usize);

    fn load_image(&mut self, path: &Path, _colorkey: Option<Rgb>) -> tiled_tmx::Result<Self::Image> {
        Ok((path.to_path_buf(), 0))
    }

    fn load_image_from_bytes(
        &mut self,
        _bytes: &[u8],
        _colorkey: Option<Rgb>,
    ) -> tiled_tmx::Result<Self::Image> {
        Ok((PathBuf::new(), 0))
    }

    fn load_tiled_image_strip(
        &mut self,
        path: &Path,
        layout: StripLayout,
        _colorkey: Option<Rgb>,
    ) -> tiled_tmx::Result<Vec<Self::Image>> {
        self.strips += 1;
        assert_eq!((layout.margin, layout.spacing), (1, 1));
        Ok((0..4).map(|i| (path.to_path_buf(), i)).collect())
    }
}

#[test]
fn test_parse_decode_and_load_with_custom_backend() {
    let mut loader = CountingLoader::default();
    let loaded = tiled_tmx::parse_decode_and_load(fixture("external.tmx"), &mut loader).unwrap();

    assert_eq!(loader.strips, 1);
    assert_eq!(loaded.tiles.keys().copied().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
    assert_eq!(loaded.tile(5).map(|tile| tile.image.1), Some(3));
    assert!(loaded.tile(1).is_none());
    assert!(loaded.map.layer("Map").unwrap().is_decoded());
}

#[cfg(feature = "image")]
#[test]
fn test_rgba_loader_end_to_end() {
    use image::{Rgba, RgbaImage};
    use tiled_tmx::RgbaImageLoader;

    let dir = tempfile::tempdir().unwrap();
    RgbaImage::from_pixel(32, 16, Rgba([10, 20, 30, 255]))
        .save(dir.path().join("strip.png"))
        .unwrap();
    std::fs::write(
        dir.path().join("map.tmx"),
        r#"<map version="1.0" width="2" height="1" tilewidth="16" tileheight="16">
 <tileset firstgid="1" name="strip" tilewidth="16" tileheight="16">
  <image source="strip.png" trans="0a141e"/>
 </tileset>
 <layer name="Map"><data encoding="csv">1,2</data></layer>
</map>"#,
    )
    .unwrap();

    let mut loader = RgbaImageLoader::new();
    let loaded = tiled_tmx::parse_decode_and_load(dir.path().join("map.tmx"), &mut loader).unwrap();

    assert_eq!(loaded.tiles.len(), 2);
    let tile = loaded.tile(2).unwrap();
    assert_eq!(tile.image.dimensions(), (16, 16));
    // Every pixel matches the colour key
    assert_eq!(tile.image.get_pixel(0, 0)[3], 0);
    assert_eq!(loader.cached(), 1);
}

#[cfg(feature = "serde")]
#[test]
fn test_model_serializes() {
    let map = tiled_tmx::parse_and_decode(fixture("external.tmx")).unwrap();
    let json = serde_json::to_value(&map).unwrap();
    assert_eq!(json["width"], 3);
    assert_eq!(json["tilesets"][1]["name"], "dungeon");
    assert_eq!(json["layers"][0]["decoded"], serde_json::json!([1, 2, 5]));
}
