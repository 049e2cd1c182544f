//! Hand-built PSD/PSB byte fixtures shared by the integration tests.
//!
//! There are no binary fixture files in this crate: every document an
//! integration test needs is assembled here, byte by byte, against the
//! container grammar. Every layer this builder emits is a full-canvas,
//! 8-bit RGBA pixel layer with raw (uncompressed) channel data; that
//! covers the layer placement/compositing/mutation surface without
//! pulling in the RLE/ZIP codecs, which already have focused coverage
//! closer to where they're implemented.

use psd::sections::PsdBuffer;
use psd::PsdVersion;

/// One layer to bake into a [`build_psd`] document: a solid-color,
/// full-canvas RGBA layer.
pub struct LayerSpec<'a> {
    pub name: &'a str,
    pub rgba: [u8; 4],
    pub blend_mode: &'a [u8; 4],
    pub opacity: u8,
    pub clipping: bool,
}

impl<'a> LayerSpec<'a> {
    pub fn new(name: &'a str, rgba: [u8; 4]) -> Self {
        LayerSpec {
            name,
            rgba,
            blend_mode: b"norm",
            opacity: 255,
            clipping: false,
        }
    }

    pub fn with_opacity(mut self, opacity: u8) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: &'a [u8; 4]) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn clipped(mut self) -> Self {
        self.clipping = true;
        self
    }
}

fn write_length(out: &mut Vec<u8>, value: u64, big: bool) {
    if big {
        out.extend_from_slice(&value.to_be_bytes());
    } else {
        out.extend_from_slice(&(value as u32).to_be_bytes());
    }
}

fn pascal_name(name: &str) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut buf = PsdBuffer::new(&mut bytes);
        buf.write_pascal_string(name, 4);
    }
    bytes
}

/// Build a full PSD/PSB file, bottom-to-top order matching `layers`
/// (the last entry ends up on top, the way Photoshop's Layers panel and
/// this crate's `Psd::layers()` both order things).
pub fn build_psd(width: u32, height: u32, version: PsdVersion, layers: &[LayerSpec]) -> Vec<u8> {
    let big = version.uses_big_lengths();
    let pixels = (width * height) as usize;

    let mut bytes = Vec::new();
    bytes.extend(*b"8BPS");
    bytes.extend(version.as_u16().to_be_bytes());
    bytes.extend([0u8; 6]);
    bytes.extend(4u16.to_be_bytes()); // channel count: R, G, B, A
    bytes.extend((height as u32).to_be_bytes());
    bytes.extend((width as u32).to_be_bytes());
    bytes.extend(8u16.to_be_bytes()); // 8 bits per channel
    bytes.extend(3u16.to_be_bytes()); // RGB

    bytes.extend(0u32.to_be_bytes()); // color mode data: empty
    bytes.extend(0u32.to_be_bytes()); // image resources: empty

    let mut layer_info = Vec::new();
    layer_info.extend((layers.len() as i16).to_be_bytes());

    for layer in layers {
        layer_info.extend(0i32.to_be_bytes()); // top
        layer_info.extend(0i32.to_be_bytes()); // left
        layer_info.extend((height as i32).to_be_bytes()); // bottom
        layer_info.extend((width as i32).to_be_bytes()); // right

        layer_info.extend(4u16.to_be_bytes());
        for channel_id in [0i16, 1, 2, -1] {
            layer_info.extend(channel_id.to_be_bytes());
            write_length(&mut layer_info, 2 + pixels as u64, big);
        }

        layer_info.extend(*b"8BIM");
        layer_info.extend(*layer.blend_mode);
        layer_info.push(layer.opacity);
        layer_info.push(layer.clipping as u8);
        layer_info.push(0); // flags: visible, no mask, no transparency protection
        layer_info.push(0); // filler

        let mut extra = Vec::new();
        extra.extend(0u32.to_be_bytes()); // no mask data
        extra.extend(0u32.to_be_bytes()); // no blending ranges
        extra.extend(pascal_name(layer.name));

        layer_info.extend((extra.len() as u32).to_be_bytes());
        layer_info.extend(extra);
    }

    for layer in layers {
        for sample in [layer.rgba[0], layer.rgba[1], layer.rgba[2], layer.rgba[3]] {
            layer_info.extend(0u16.to_be_bytes()); // raw compression
            layer_info.extend(vec![sample; pixels]);
        }
    }

    let mut layer_and_mask = Vec::new();
    write_length(&mut layer_and_mask, layer_info.len() as u64, big);
    layer_and_mask.extend(layer_info);
    layer_and_mask.extend(0u32.to_be_bytes()); // no global mask info

    write_length(&mut bytes, layer_and_mask.len() as u64, big);
    bytes.extend(layer_and_mask);

    bytes.extend(0u16.to_be_bytes()); // merged image data: raw compression
    let top_color = layers.last().map(|l| l.rgba).unwrap_or([0, 0, 0, 0]);
    for sample in top_color {
        bytes.extend(vec![sample; pixels]);
    }

    bytes
}
