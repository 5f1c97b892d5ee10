//! Layer data codec
//!
//! Turns the raw `<data>` payload of a layer into a flat row-major list of
//! gids, and back. Base64 payloads may be gzip or zlib compressed and hold
//! little-endian u32 values.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::layer::{Compression, Encoding, LayerData, LayerPayload};

/// Decode a layer payload and check it against the layer size
pub fn decode_layer_data(layer: &str, data: &LayerData, width: u32, height: u32) -> Result<Vec<u32>> {
    let payload = data
        .payload
        .as_ref()
        .ok_or_else(|| Error::corrupt(layer, "layer has no <data> element"))?;

    let ids = match (&data.encoding, payload) {
        (Encoding::Other(value), _) => {
            return Err(Error::UnsupportedEncoding {
                layer: layer.to_string(),
                kind: "encoding",
                value: value.clone(),
            });
        }
        (Encoding::Base64, LayerPayload::Text(text)) => {
            let bytes = decode_base64(layer, text)?;
            let bytes = decompress(layer, &data.compression, bytes)?;
            bytes_to_gids(layer, &bytes)?
        }
        (Encoding::Csv, LayerPayload::Text(text)) => {
            warn_ignored_compression(layer, &data.compression);
            parse_tokens(layer, text.split(|c: char| c == ',' || c.is_whitespace()))?
        }
        (Encoding::None, LayerPayload::Tiles(tokens)) => {
            warn_ignored_compression(layer, &data.compression);
            parse_tokens(layer, tokens.iter().map(String::as_str))?
        }
        (Encoding::None, LayerPayload::Text(_)) => {
            return Err(Error::corrupt(layer, "unencoded data must use <tile> elements"));
        }
        (encoding, LayerPayload::Tiles(_)) => {
            return Err(Error::corrupt(
                layer,
                format!("{encoding} data must be text, found <tile> elements"),
            ));
        }
    };

    check_size(layer, ids.len(), width, height)?;
    log::trace!("Layer '{layer}': decoded {} ids", ids.len());
    Ok(ids)
}

/// Decode base64 text, ignoring embedded whitespace
pub fn decode_base64(layer: &str, text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::corrupt(layer, format!("invalid base64: {e}")))
}

fn decompress(layer: &str, compression: &Compression, bytes: Vec<u8>) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(bytes.len() * 4);
    match compression {
        Compression::None => return Ok(bytes),
        Compression::Gzip => GzDecoder::new(bytes.as_slice())
            .read_to_end(&mut output)
            .map_err(|e| Error::corrupt(layer, format!("gzip decompression failed: {e}")))?,
        Compression::Zlib => ZlibDecoder::new(bytes.as_slice())
            .read_to_end(&mut output)
            .map_err(|e| Error::corrupt(layer, format!("zlib decompression failed: {e}")))?,
        Compression::Other(value) => {
            return Err(Error::UnsupportedEncoding {
                layer: layer.to_string(),
                kind: "compression",
                value: value.clone(),
            });
        }
    };
    log::trace!(
        "Layer '{layer}': {compression} {} -> {} bytes",
        bytes.len(),
        output.len()
    );
    Ok(output)
}

/// Interpret bytes as consecutive little-endian u32 values
pub fn bytes_to_gids(layer: &str, bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::corrupt(
            layer,
            format!("{} bytes is not a multiple of 4", bytes.len()),
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn parse_tokens<'a>(layer: &str, tokens: impl Iterator<Item = &'a str>) -> Result<Vec<u32>> {
    tokens
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<u32>()
                .map_err(|_| Error::corrupt(layer, format!("'{token}' is not a tile id")))
        })
        .collect()
}

fn warn_ignored_compression(layer: &str, compression: &Compression) {
    if *compression != Compression::None {
        log::warn!("Layer '{layer}': compression '{compression}' only applies to base64 data, ignoring it");
    }
}

/// Fail unless exactly `width * height` ids were decoded
pub fn check_size(layer: &str, found: usize, width: u32, height: u32) -> Result<()> {
    let expected = width as usize * height as usize;
    if found == expected {
        Ok(())
    } else {
        Err(Error::LayerSizeMismatch {
            layer: layer.to_string(),
            width,
            height,
            expected,
            found,
        })
    }
}

/// Reshape row-major ids into columns so that `columns[x][y] == flat[x + y * width]`
pub fn to_columns(flat: &[u32], width: u32, height: u32) -> Vec<Vec<u32>> {
    let (width, height) = (width as usize, height as usize);
    (0..width)
        .map(|x| (0..height).map(|y| flat[x + y * width]).collect())
        .collect()
}

/// Encode row-major ids into a layer payload
///
/// The writer side of [`decode_layer_data`]. Compression is only applied to
/// base64 data.
pub fn encode_layer_data(ids: &[u32], encoding: Encoding, compression: Compression) -> Result<LayerData> {
    let payload = match &encoding {
        Encoding::Base64 => {
            let bytes: Vec<u8> = ids.iter().flat_map(|id| id.to_le_bytes()).collect();
            let bytes = compress(&compression, &bytes)?;
            LayerPayload::Text(STANDARD.encode(bytes))
        }
        Encoding::Csv => {
            warn_ignored_compression("<encoder>", &compression);
            let tokens: Vec<String> = ids.iter().map(u32::to_string).collect();
            LayerPayload::Text(tokens.join(","))
        }
        Encoding::None => {
            warn_ignored_compression("<encoder>", &compression);
            LayerPayload::Tiles(ids.iter().map(u32::to_string).collect())
        }
        Encoding::Other(value) => {
            return Err(Error::UnsupportedEncoding {
                layer: "<encoder>".to_string(),
                kind: "encoding",
                value: value.clone(),
            });
        }
    };

    let compression = if encoding == Encoding::Base64 {
        compression
    } else {
        Compression::None
    };

    Ok(LayerData {
        encoding,
        compression,
        payload: Some(payload),
    })
}

fn compress(compression: &Compression, bytes: &[u8]) -> Result<Vec<u8>> {
    let failed = |e: std::io::Error| Error::corrupt("<encoder>", format!("{compression} compression failed: {e}"));
    match compression {
        Compression::None => Ok(bytes.to_vec()),
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(bytes).map_err(failed)?;
            encoder.finish().map_err(failed)
        }
        Compression::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(bytes).map_err(failed)?;
            encoder.finish().map_err(failed)
        }
        Compression::Other(value) => Err(Error::UnsupportedEncoding {
            layer: "<encoder>".to_string(),
            kind: "compression",
            value: value.clone(),
        }),
    }
}
