//! Individual layer records (`spec.md` §3.4) and the flattened, public
//! [`PsdLayer`] view built from one.

use std::collections::HashMap;

use crate::error::PsdError;
use crate::psd_channel::{InsertChannelBytes, PsdChannelCompression, PsdChannelError, PsdChannelKind};
use crate::sections::image_data_section::ChannelBytes;
use crate::sections::layer_and_mask_information_section::blend_mode::BlendMode;
use crate::sections::layer_and_mask_information_section::blending_ranges::BlendingRanges;
use crate::sections::layer_and_mask_information_section::mask::MaskData;
use crate::sections::layer_and_mask_information_section::tagged_block::{
    adjustment_kind_for_key, AdjustmentKind, TaggedBlock,
};
use crate::sections::{PsdBuffer, PsdSerialize};
use crate::version::PsdVersion;

/// Bits within a layer record's 1-byte flags field.
///
/// Adobe's own file format documentation labels bit 1 "visible", but in
/// every real file it's the opposite: the bit is *set* when the layer is
/// hidden and clear when it's shown. Every other reader of this format
/// (Pillow, psd-tools, GIMP's plug-in) works around the same
/// documentation quirk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerFlags(u8);

impl LayerFlags {
    pub const TRANSPARENCY_PROTECTED: LayerFlags = LayerFlags(0b0000_0001);
    const HIDDEN: u8 = 0b0000_0010;
    pub const PIXEL_DATA_IRRELEVANT: LayerFlags = LayerFlags(0b0001_0000);

    pub fn from_bits(bits: u8) -> LayerFlags {
        LayerFlags(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: LayerFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn visible(&self) -> bool {
        self.0 & Self::HIDDEN == 0
    }
}

/// A single layer record as read from the layer info section: its
/// position, per-channel data lengths, compositing attributes and
/// additional layer information. [`PsdLayer`] is the public, leaf-only
/// view projected from these (`spec.md` §4.L).
#[derive(Debug, Clone)]
pub struct LayerRecord {
    pub name: String,
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    /// `(channel kind, on-disk data length including its own 2-byte
    /// compression marker)`, in the order the channel info table listed
    /// them.
    pub channel_info: Vec<(PsdChannelKind, u64)>,
    pub blend_mode: BlendMode,
    pub opacity: u8,
    /// `true` = non-base (clips to the layer below).
    pub clipping: bool,
    pub flags: LayerFlags,
    pub mask_data: MaskData,
    pub blending_ranges: BlendingRanges,
    pub tagged_blocks: Vec<TaggedBlock>,
    pub(crate) channels: HashMap<PsdChannelKind, ChannelBytes>,
}

impl LayerRecord {
    /// An empty, zero-sized record used as a placeholder when a group's
    /// bracketing record is missing (a truncated/corrupt document).
    pub(crate) fn empty() -> LayerRecord {
        LayerRecord {
            name: String::new(),
            top: 0,
            left: 0,
            bottom: 0,
            right: 0,
            channel_info: Vec::new(),
            blend_mode: BlendMode::Normal,
            opacity: 255,
            clipping: false,
            flags: LayerFlags::default(),
            mask_data: MaskData::None,
            blending_ranges: BlendingRanges::default(),
            tagged_blocks: Vec::new(),
            channels: HashMap::new(),
        }
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }

    pub fn width(&self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    /// The full Unicode layer name from a `luni` tagged block, if present;
    /// falls back to the (possibly lossily truncated) Pascal-string name
    /// on the record itself.
    pub fn display_name(&self) -> &str {
        for block in &self.tagged_blocks {
            if let TaggedBlock::UnicodeLayerName(name) = block {
                return name;
            }
        }
        &self.name
    }

    /// Serialize this record's placement/attributes and channel info table
    /// (`spec.md` §3.4). Every record's header is written contiguously
    /// before any record's channel image data, mirroring the on-disk
    /// layout and the two-pass read in [`super::read_layer_record`] /
    /// [`super::decode_layer_channel`] — callers write every record's
    /// [`Self::write_header`], then every record's [`Self::channel_data`],
    /// in the same order.
    pub fn write_header(&self, version: PsdVersion, encoded_channels: &[(PsdChannelKind, u16, Vec<u8>)]) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut buffer = PsdBuffer::new(&mut out);
            buffer.write(self.top.to_be_bytes());
            buffer.write(self.left.to_be_bytes());
            buffer.write(self.bottom.to_be_bytes());
            buffer.write(self.right.to_be_bytes());

            buffer.write((encoded_channels.len() as u16).to_be_bytes());
            for (channel_kind, _, encoded) in encoded_channels {
                buffer.write(channel_kind.as_i16().to_be_bytes());
                buffer.write_length(encoded.len() as u64 + 2, version);
            }

            buffer.write(*b"8BIM");
            buffer.write(*self.blend_mode.as_key());
            buffer.write([self.opacity]);
            buffer.write([self.clipping as u8]);
            buffer.write([self.flags.bits()]);
            buffer.write([0u8]); // filler

            let mut extra = Vec::new();
            {
                let mut extra_buf = PsdBuffer::new(&mut extra);
                self.mask_data.write(&mut extra_buf);
                self.blending_ranges.write(&mut extra_buf);
                extra_buf.write_pascal_string(&self.name, 4);
                for block in &self.tagged_blocks {
                    block.write(&mut extra_buf, version);
                }
            }
            buffer.write((extra.len() as u32).to_be_bytes());
            buffer.write(extra);
        }
        out
    }

    /// Re-encode every channel this record carries, in `channel_info`
    /// order, as `(kind, compression marker, encoded bytes)`.
    pub fn encode_channels(&self, version: PsdVersion) -> Result<Vec<(PsdChannelKind, u16, Vec<u8>)>, PsdError> {
        let width = self.width() as usize;
        let height = self.height() as usize;

        self.channel_info
            .iter()
            .map(|(channel_kind, _)| {
                let channel_bytes = self.channels.get(channel_kind).ok_or(
                    PsdChannelError::ChannelNotFound {
                        channel: *channel_kind,
                    },
                )?;
                let (compression, encoded) =
                    encode_layer_channel(channel_bytes, width, height, version)?;
                Ok((*channel_kind, compression, encoded))
            })
            .collect()
    }

    /// Serialize the already-encoded channel data for this record: each
    /// channel's 2-byte compression marker followed by its encoded bytes,
    /// in `channel_info` order.
    pub fn write_channel_data(encoded_channels: &[(PsdChannelKind, u16, Vec<u8>)]) -> Vec<u8> {
        let mut out = Vec::new();
        for (_, compression, encoded) in encoded_channels {
            out.extend_from_slice(&compression.to_be_bytes());
            out.extend_from_slice(encoded);
        }
        out
    }
}

/// Re-encode a single layer channel's decoded bytes, dispatching on
/// whichever compression tag it was decoded with (mirrors
/// [`super::decode_layer_channel`], run in reverse).
///
/// Returns `(compression marker, encoded bytes excluding that marker)`.
fn encode_layer_channel(
    channel_bytes: &ChannelBytes,
    width: usize,
    height: usize,
    version: PsdVersion,
) -> Result<(u16, Vec<u8>), PsdError> {
    use crate::sections::file_header_section::PsdDepth;

    // Layer channel rows are always 8-bit samples on disk regardless of
    // document depth; higher-depth documents store layer pixel data via
    // `Zip`/`ZipWithPrediction` against the document's real depth instead,
    // so `raw_bytes().len() / (width * height).max(1)` recovers the sample
    // width actually in play for RLE row framing.
    let raw = channel_bytes.raw_bytes();
    let pixels = (width * height).max(1);
    let bytes_per_sample = (raw.len() / pixels).max(1);
    let depth = PsdDepth::from_bytes_per_sample(bytes_per_sample);

    match channel_bytes {
        ChannelBytes::RawData(bytes) => Ok((PsdChannelCompression::RawData.as_u16(), bytes.clone())),
        ChannelBytes::RleCompressed(bytes) => {
            let row_bytes = width * bytes_per_sample;
            let mut counts = Vec::new();
            let mut packed_rows = Vec::new();
            for row in bytes.chunks(row_bytes.max(1)) {
                let packed = crate::compression::rle_compress(row);
                counts.push(packed.len());
                packed_rows.push(packed);
            }

            let mut out = Vec::new();
            for count in &counts {
                if version.uses_big_lengths() {
                    out.extend_from_slice(&(*count as u32).to_be_bytes());
                } else {
                    out.extend_from_slice(&(*count as u16).to_be_bytes());
                }
            }
            for packed in &packed_rows {
                out.extend_from_slice(packed);
            }
            Ok((PsdChannelCompression::RleCompressed.as_u16(), out))
        }
        ChannelBytes::Zip(bytes) => Ok((
            PsdChannelCompression::ZipWithoutPrediction.as_u16(),
            crate::compression::zip_compress(bytes),
        )),
        ChannelBytes::ZipWithPrediction(bytes) => {
            let compressed =
                crate::compression::zip_with_prediction_compress(bytes, width, height, depth)?;
            Ok((PsdChannelCompression::ZipWithPrediction.as_u16(), compressed))
        }
    }
}

/// A single layer's channel data and placement, flattened out of the
/// layer record it was built from.
///
/// Every `PsdLayer` is a leaf: groups are exposed separately as
/// [`super::tree::PsdGroup`] (`spec.md` §4.L).
#[derive(Debug)]
pub struct PsdLayer {
    pub(crate) name: String,
    pub(crate) channels: HashMap<PsdChannelKind, ChannelBytes>,
    pub(crate) layer_properties: LayerProperties,
    pub(crate) blend_mode: BlendMode,
    pub(crate) opacity: u8,
    pub(crate) clipping: bool,
    pub(crate) flags: LayerFlags,
    pub(crate) mask_data: MaskData,
    pub(crate) blending_ranges: BlendingRanges,
    pub(crate) tagged_blocks: Vec<TaggedBlock>,
    pub(crate) parent_id: Option<u32>,
    pub(crate) psd_width: u32,
    pub(crate) psd_height: u32,
    pub(crate) kind: LayerKind,
    /// Indices (into the document's flat layer list) of the layers
    /// clipping to this one, nearest first (`spec.md` §4.L, testable
    /// property #7). Empty for a layer that is itself clipped
    /// (`is_clipped()`) or has nothing clipping to it.
    pub(crate) clip_layers: Vec<usize>,
}

/// What kind of content a layer carries, classified from its tagged
/// blocks (`spec.md` §4.L). Interpreting the kind-specific payload
/// (vector path geometry aside) is out of scope; this only distinguishes
/// enough to tell the Layers panel icon apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Pixel,
    Text,
    SmartObject,
    Adjustment(AdjustmentKind),
    Shape,
}

/// Classify a layer record's kind from the tagged blocks it carries.
pub(crate) fn classify_kind(record: &LayerRecord) -> LayerKind {
    let mut adjustment = None;
    let mut has_vector_mask = false;

    for block in &record.tagged_blocks {
        match block {
            TaggedBlock::TypeToolObjectSetting { .. } => return LayerKind::Text,
            TaggedBlock::PlacedLayerData(_) => return LayerKind::SmartObject,
            TaggedBlock::VectorMaskSetting(_) | TaggedBlock::VectorStrokeContent(_) => {
                has_vector_mask = true;
            }
            TaggedBlock::Unknown { key, .. } => {
                if adjustment.is_none() {
                    adjustment = adjustment_kind_for_key(key);
                }
            }
            _ => {}
        }
    }

    if has_vector_mask {
        LayerKind::Shape
    } else if let Some(kind) = adjustment {
        LayerKind::Adjustment(kind)
    } else {
        LayerKind::Pixel
    }
}

/// A layer's bounding box within the document canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerProperties {
    pub layer_top: i32,
    pub layer_left: i32,
    pub layer_bottom: i32,
    pub layer_right: i32,
}

impl PsdLayer {
    pub(crate) fn from_record(
        record: &LayerRecord,
        channels: HashMap<PsdChannelKind, ChannelBytes>,
        parent_id: Option<u32>,
        psd_width: u32,
        psd_height: u32,
    ) -> PsdLayer {
        PsdLayer {
            name: record.display_name().to_string(),
            channels,
            layer_properties: LayerProperties {
                layer_top: record.top,
                layer_left: record.left,
                layer_bottom: record.bottom,
                layer_right: record.right,
            },
            blend_mode: record.blend_mode,
            opacity: record.opacity,
            clipping: record.clipping,
            flags: record.flags,
            mask_data: record.mask_data.clone(),
            blending_ranges: record.blending_ranges.clone(),
            tagged_blocks: record.tagged_blocks.clone(),
            parent_id,
            psd_width,
            psd_height,
            kind: classify_kind(record),
            clip_layers: Vec::new(),
        }
    }

    /// Reconstruct this layer's on-disk [`LayerRecord`], folding in
    /// whatever placement/attribute mutations were made through the
    /// public API since it was read. Channel data is carried over
    /// unchanged; [`LayerRecord::write`] re-encodes it.
    pub(crate) fn to_record(&self) -> LayerRecord {
        let channel_info = self
            .channels
            .keys()
            .copied()
            .map(|kind| (kind, 0u64))
            .collect();

        LayerRecord {
            name: self.name.clone(),
            top: self.layer_properties.layer_top,
            left: self.layer_properties.layer_left,
            bottom: self.layer_properties.layer_bottom,
            right: self.layer_properties.layer_right,
            channel_info,
            blend_mode: self.blend_mode,
            opacity: self.opacity,
            clipping: self.clipping,
            flags: self.flags,
            mask_data: self.mask_data.clone(),
            blending_ranges: self.blending_ranges.clone(),
            tagged_blocks: self.tagged_blocks.clone(),
            channels: self.channels.clone(),
        }
    }

    /// What kind of content this layer carries (`spec.md` §4.L).
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Indices of the layers clipping to this one, nearest first. Always
    /// empty for a layer that is itself clipped (`spec.md` §4.L, testable
    /// property #7).
    pub fn clip_layers(&self) -> &[usize] {
        &self.clip_layers
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u16 {
        (self.layer_properties.layer_right - self.layer_properties.layer_left).max(0) as u16
    }

    pub fn height(&self) -> u16 {
        (self.layer_properties.layer_bottom - self.layer_properties.layer_top).max(0) as u16
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    pub fn visible(&self) -> bool {
        self.flags.visible()
    }

    pub fn is_clipped(&self) -> bool {
        self.clipping
    }

    /// The id of the group this layer is nested in, if any (`spec.md`
    /// §4.L).
    pub fn parent_id(&self) -> Option<u32> {
        self.parent_id
    }

    pub fn mask(&self) -> &MaskData {
        &self.mask_data
    }

    /// Get the compression used for one of this layer's channels.
    pub fn compression(&self, channel: PsdChannelKind) -> Result<PsdChannelCompression, PsdError> {
        match self.channels.get(&channel) {
            Some(ChannelBytes::RawData(_)) => Ok(PsdChannelCompression::RawData),
            Some(ChannelBytes::RleCompressed(_)) => Ok(PsdChannelCompression::RleCompressed),
            Some(ChannelBytes::Zip(_)) => Ok(PsdChannelCompression::ZipWithoutPrediction),
            Some(ChannelBytes::ZipWithPrediction(_)) => Ok(PsdChannelCompression::ZipWithPrediction),
            None => Err(PsdChannelError::ChannelNotFound { channel }.into()),
        }
    }

    /// Interleave this layer's red, green, blue and alpha channels into a
    /// single `RGBA` buffer the size of the whole document canvas.
    /// Channels this layer doesn't carry (e.g. a layer with no alpha
    /// channel) default to fully opaque/zero.
    pub fn rgba(&self) -> Vec<u8> {
        let mut rgba = vec![0; self.psd_width as usize * self.psd_height as usize * 4];

        for (channel_kind, alpha_default) in [
            (PsdChannelKind::Color(0), 0u8),
            (PsdChannelKind::Color(1), 0u8),
            (PsdChannelKind::Color(2), 0u8),
            (PsdChannelKind::TransparencyMask, 255u8),
        ] {
            match self.channels.get(&channel_kind) {
                Some(channel_bytes) => {
                    self.insert_channel_bytes(&mut rgba, &channel_kind, channel_bytes);
                }
                None if channel_kind == PsdChannelKind::TransparencyMask => {
                    let offset = channel_kind.rgba_offset().unwrap();
                    for idx in 0..(self.psd_width as usize * self.psd_height as usize) {
                        rgba[idx * 4 + offset] = alpha_default;
                    }
                }
                None => {}
            }
        }

        rgba
    }

    /// This layer's full-canvas RGBA buffer as an `image::RgbaImage`
    /// (`spec.md` §6.3 `Layer.topil`).
    pub fn to_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_raw(self.psd_width, self.psd_height, self.rgba())
            .expect("rgba() always returns exactly psd_width * psd_height * 4 bytes")
    }
}

impl InsertChannelBytes for PsdLayer {
    fn rgba_idx(&self, idx: usize) -> usize {
        let width = self.width().max(1) as usize;
        let left_in_layer = idx % width;
        let left_in_psd = self.layer_properties.layer_left as usize + left_in_layer;

        let top_in_psd = idx / width + self.layer_properties.layer_top as usize;

        (top_in_psd * self.psd_width as usize) + left_in_psd
    }
}
