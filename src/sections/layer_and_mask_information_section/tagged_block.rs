//! Additional layer information: the tagged-block registry attached to
//! layer records and to the layer-and-mask section itself (`spec.md` §4.H).
//!
//! Every block shares the same envelope regardless of key: a signature
//! (`8BIM`, or `8B64` for the handful of PSB "big key" blocks), a 4-byte
//! key and a length field whose width depends on both the document
//! version and whether this particular key is one of the keys that widens
//! in a PSB (`spec.md` §4.K). Keys this crate doesn't have a typed
//! variant for still round-trip, as `TaggedBlock::Unknown`.

use std::io::Write;

use crate::error::{PsdError, TaggedBlockError};
use crate::sections::image_resources_section::image_resource::descriptor_structure::Descriptor;
use crate::sections::image_resources_section::image_resource::engine_data::EngineValue;
use crate::sections::layer_and_mask_information_section::blend_mode::BlendMode;
use crate::sections::layer_and_mask_information_section::vector_path::VectorPath;
use crate::sections::{PsdBuffer, PsdCursor, PsdSerialize};
use crate::version::PsdVersion;

const SIGNATURE_8BIM: [u8; 4] = *b"8BIM";
const SIGNATURE_8B64: [u8; 4] = *b"8B64";

/// Which kind of section boundary a `lsct` block marks (`spec.md` §4.H/§4.L).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionDividerKind {
    Layer,
    OpenFolder,
    ClosedFolder,
    /// The hidden `</Layer group>` hole left at the start of a group's
    /// span, balancing the folder record written at the end of it.
    BoundingSectionDivider,
}

impl SectionDividerKind {
    fn from_u32(value: u32) -> SectionDividerKind {
        match value {
            1 => SectionDividerKind::OpenFolder,
            2 => SectionDividerKind::ClosedFolder,
            3 => SectionDividerKind::BoundingSectionDivider,
            _ => SectionDividerKind::Layer,
        }
    }

    fn as_u32(&self) -> u32 {
        match self {
            SectionDividerKind::Layer => 0,
            SectionDividerKind::OpenFolder => 1,
            SectionDividerKind::ClosedFolder => 2,
            SectionDividerKind::BoundingSectionDivider => 3,
        }
    }
}

/// The `lsct` section divider setting block.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionDivider {
    pub kind: SectionDividerKind,
    pub blend_mode: Option<BlendMode>,
    pub sub_type: Option<u32>,
}

/// One item of additional layer information.
///
/// Every variant this crate recognizes still carries enough of the raw
/// payload shape to be written back out; `Unknown` preserves anything it
/// doesn't.
#[derive(Debug, Clone, PartialEq)]
pub enum TaggedBlock {
    /// `lsct`: marks a layer group boundary (§4.H/§4.L).
    SectionDivider(SectionDivider),
    /// `luni`: the layer's name, in full Unicode (vs. the Pascal-string
    /// name on the layer record itself, which is lossily truncated).
    UnicodeLayerName(String),
    /// `lyid`: a stable numeric id for this layer, used by other tagged
    /// blocks (layer comps, timeline) to refer back to it.
    LayerId(u32),
    /// `lspf`: which of the locked-attribute flags are set.
    ProtectedSetting(u32),
    /// `fxrp`: the reference point used by warp/transform tooling.
    ReferencePoint { x: f64, y: f64 },
    /// `lclr`: the layer's sheet color in the Layers panel.
    SheetColor([u16; 4]),
    /// `TySh`: a type (text) layer's descriptor plus its engine-data text
    /// styling markup.
    TypeToolObjectSetting {
        descriptor: Descriptor,
        engine_data: Option<EngineValue>,
    },
    /// `vmsk`/`vsms`: a vector mask's path.
    VectorMaskSetting(VectorPath),
    /// `vstk`/`vsdf` and similar vector stroke/fill content, kept as a
    /// descriptor tree.
    VectorStrokeContent(Descriptor),
    /// `SoLd`/`PlLd`: smart object / placed layer data.
    PlacedLayerData(Descriptor),
    /// `artb`/`artd`/`abdd`: one of the three near-equivalent artboard-data
    /// keys, carrying an `artboardRect` field that overrides a group's
    /// computed bounding box (`spec.md` §9 "Artboards").
    ArtboardData(Descriptor),
    /// Any key this crate doesn't have a typed variant for.
    Unknown { key: [u8; 4], data: Vec<u8> },
}

/// The tagged-block keys that mark a layer as one of Photoshop's built-in
/// adjustment layer kinds (`spec.md` §4.L). These are intentionally left as
/// `TaggedBlock::Unknown` rather than given dedicated variants: interpreting
/// an adjustment layer's parameters is out of scope (`spec.md` §1
/// Non-goals), so this crate only needs enough to classify the layer kind,
/// not to decode curves/levels/hue-saturation payloads.
pub const ADJUSTMENT_LAYER_KEYS: &[(&[u8; 4], AdjustmentKind)] = &[
    (b"brit", AdjustmentKind::BrightnessContrast),
    (b"levl", AdjustmentKind::Levels),
    (b"curv", AdjustmentKind::Curves),
    (b"expA", AdjustmentKind::Exposure),
    (b"vibA", AdjustmentKind::Vibrance),
    (b"hue2", AdjustmentKind::HueSaturation),
    (b"blnc", AdjustmentKind::ColorBalance),
    (b"blwh", AdjustmentKind::BlackAndWhite),
    (b"phfl", AdjustmentKind::PhotoFilter),
    (b"mixr", AdjustmentKind::ChannelMixer),
    (b"clrL", AdjustmentKind::ColorLookup),
    (b"nvrt", AdjustmentKind::Invert),
    (b"post", AdjustmentKind::Posterize),
    (b"thrs", AdjustmentKind::Threshold),
    (b"selc", AdjustmentKind::SelectiveColor),
    (b"grdm", AdjustmentKind::GradientMap),
    (b"SoCo", AdjustmentKind::SolidColorFill),
    (b"PtFl", AdjustmentKind::PatternFill),
    (b"GdFl", AdjustmentKind::GradientFill),
];

/// Which built-in adjustment a layer carrying one of [`ADJUSTMENT_LAYER_KEYS`]
/// applies (`spec.md` §4.L).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum AdjustmentKind {
    BrightnessContrast,
    Levels,
    Curves,
    Exposure,
    Vibrance,
    HueSaturation,
    ColorBalance,
    BlackAndWhite,
    PhotoFilter,
    ChannelMixer,
    ColorLookup,
    Invert,
    Posterize,
    Threshold,
    SelectiveColor,
    GradientMap,
    SolidColorFill,
    PatternFill,
    GradientFill,
}

/// Look up the adjustment kind a tagged-block key identifies, if any.
pub fn adjustment_kind_for_key(key: &[u8; 4]) -> Option<AdjustmentKind> {
    ADJUSTMENT_LAYER_KEYS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, kind)| *kind)
}

impl TaggedBlock {
    /// Read one tagged block from the cursor, which must be positioned at
    /// its signature.
    pub fn read(cursor: &mut PsdCursor, version: PsdVersion) -> Result<TaggedBlock, PsdError> {
        let signature = cursor.read_4();
        if signature != SIGNATURE_8BIM && signature != SIGNATURE_8B64 {
            return Err(TaggedBlockError::InvalidSignature.into());
        }

        let key = cursor.read_4();
        let big_key = version.uses_big_lengths() && crate::version::tagged_block_uses_big_length(&key);
        let length = if big_key {
            cursor.read_u64()
        } else {
            cursor.read_u32() as u64
        };
        let data = cursor.read_checked(length as u32)?;
        let mut body = PsdCursor::new(data);

        let block = match &key {
            b"lsct" | b"lsdk" => {
                let kind = SectionDividerKind::from_u32(body.read_u32());
                let (blend_mode, sub_type) = if body.remaining() >= 8 {
                    body.read_4(); // blend mode signature, always `8BIM`
                    let blend_mode = BlendMode::from_key(&body.read_4());
                    let sub_type = if body.remaining() >= 4 {
                        Some(body.read_u32())
                    } else {
                        None
                    };
                    (Some(blend_mode), sub_type)
                } else {
                    (None, None)
                };
                TaggedBlock::SectionDivider(SectionDivider {
                    kind,
                    blend_mode,
                    sub_type,
                })
            }
            b"luni" => TaggedBlock::UnicodeLayerName(body.read_unicode_string()),
            b"lyid" => TaggedBlock::LayerId(body.read_u32()),
            b"lspf" => TaggedBlock::ProtectedSetting(body.read_u32()),
            b"fxrp" => TaggedBlock::ReferencePoint {
                x: body.read_f64(),
                y: body.read_f64(),
            },
            b"lclr" => TaggedBlock::SheetColor([
                body.read_u16(),
                body.read_u16(),
                body.read_u16(),
                body.read_u16(),
            ]),
            b"TySh" => {
                let _version = body.read_u16();
                body.read(8 * 6); // transform: 6 f64 values
                let _text_version = body.read_u16();
                let _descriptor_version = body.read_u32();
                match Descriptor::from_bytes(&data[body.position() as usize..]) {
                    Ok(descriptor) => {
                        // The warp descriptor and two more descriptors follow;
                        // we don't parse them individually, just surface the
                        // first (text) descriptor and try to recover any
                        // engine data markup it carries.
                        let engine_data = descriptor
                            .get(b"Txt ")
                            .and_then(|value| match value {
                                crate::sections::image_resources_section::image_resource::descriptor_structure::DescriptorValue::RawData(bytes) => {
                                    EngineValue::parse(bytes).ok()
                                }
                                _ => None,
                            });
                        if descriptor.get(b"Txt ").is_some() && engine_data.is_none() {
                            log::debug!("TySh block carried a Txt value that didn't parse as engine data");
                        }
                        TaggedBlock::TypeToolObjectSetting {
                            descriptor,
                            engine_data,
                        }
                    }
                    Err(err) => {
                        log::warn!("TySh block's descriptor didn't parse ({}), keeping it as raw bytes", err);
                        TaggedBlock::Unknown { key, data: data.to_vec() }
                    }
                }
            }
            b"vmsk" | b"vsms" => {
                let _version = body.read_u32();
                let _flags = body.read_u32();
                let record_count = data.len().saturating_sub(8) / 26;
                let mut path_cursor = PsdCursor::new(&data[8..]);
                match VectorPath::from_records(&mut path_cursor, record_count) {
                    Ok(path) => TaggedBlock::VectorMaskSetting(path),
                    Err(err) => {
                        log::warn!("{} block's vector path didn't parse ({}), keeping it as raw bytes", String::from_utf8_lossy(&key), err);
                        TaggedBlock::Unknown { key, data: data.to_vec() }
                    }
                }
            }
            b"vstk" | b"vsCs" | b"vscg" => match Descriptor::from_bytes(data) {
                Ok(descriptor) => TaggedBlock::VectorStrokeContent(descriptor),
                Err(err) => {
                    log::warn!("{} block's descriptor didn't parse ({}), keeping it as raw bytes", String::from_utf8_lossy(&key), err);
                    TaggedBlock::Unknown { key, data: data.to_vec() }
                }
            },
            b"SoLd" | b"PlLd" => {
                let _identifier = body.read_4();
                let _version = body.read_u32();
                let remaining = &data[body.position() as usize..];
                match Descriptor::from_bytes(remaining) {
                    Ok(descriptor) => TaggedBlock::PlacedLayerData(descriptor),
                    Err(err) => {
                        log::warn!("{} block's descriptor didn't parse ({}), keeping it as raw bytes", String::from_utf8_lossy(&key), err);
                        TaggedBlock::Unknown { key, data: data.to_vec() }
                    }
                }
            }
            b"artb" | b"artd" | b"abdd" => {
                let _version = body.read_u32();
                let remaining = &data[body.position() as usize..];
                match Descriptor::from_bytes(remaining) {
                    Ok(descriptor) => TaggedBlock::ArtboardData(descriptor),
                    Err(err) => {
                        log::warn!("{} block's descriptor didn't parse ({}), keeping it as raw bytes", String::from_utf8_lossy(&key), err);
                        TaggedBlock::Unknown { key, data: data.to_vec() }
                    }
                }
            }
            _ => TaggedBlock::Unknown {
                key,
                data: data.to_vec(),
            },
        };

        Ok(block)
    }

    /// The 4-byte key this block serializes under.
    pub fn key(&self) -> [u8; 4] {
        match self {
            TaggedBlock::SectionDivider(_) => *b"lsct",
            TaggedBlock::UnicodeLayerName(_) => *b"luni",
            TaggedBlock::LayerId(_) => *b"lyid",
            TaggedBlock::ProtectedSetting(_) => *b"lspf",
            TaggedBlock::ReferencePoint { .. } => *b"fxrp",
            TaggedBlock::SheetColor(_) => *b"lclr",
            TaggedBlock::TypeToolObjectSetting { .. } => *b"TySh",
            TaggedBlock::VectorMaskSetting(_) => *b"vmsk",
            TaggedBlock::VectorStrokeContent(_) => *b"vstk",
            TaggedBlock::PlacedLayerData(_) => *b"SoLd",
            TaggedBlock::ArtboardData(_) => *b"artb",
            TaggedBlock::Unknown { key, .. } => *key,
        }
    }

    pub fn write<T: Write>(&self, buffer: &mut PsdBuffer<T>, version: PsdVersion) {
        let key = self.key();
        let big_key = version.uses_big_lengths() && crate::version::tagged_block_uses_big_length(&key);
        buffer.write(if big_key { SIGNATURE_8B64 } else { SIGNATURE_8BIM });
        buffer.write(key);

        let mut body = PsdBuffer::new(Vec::new());
        match self {
            TaggedBlock::SectionDivider(divider) => {
                body.write(divider.kind.as_u32().to_be_bytes());
                if let Some(blend_mode) = divider.blend_mode {
                    body.write(SIGNATURE_8BIM);
                    body.write(*blend_mode.as_key());
                    if let Some(sub_type) = divider.sub_type {
                        body.write(sub_type.to_be_bytes());
                    }
                }
            }
            TaggedBlock::UnicodeLayerName(name) => body.write_unicode_string(name),
            TaggedBlock::LayerId(id) => body.write(id.to_be_bytes()),
            TaggedBlock::ProtectedSetting(flags) => body.write(flags.to_be_bytes()),
            TaggedBlock::ReferencePoint { x, y } => {
                body.write(x.to_be_bytes());
                body.write(y.to_be_bytes());
            }
            TaggedBlock::SheetColor(color) => {
                for component in color {
                    body.write(component.to_be_bytes());
                }
            }
            TaggedBlock::VectorStrokeContent(descriptor) => {
                body.write(descriptor.to_bytes());
            }
            TaggedBlock::PlacedLayerData(descriptor) => {
                body.write(*b"ID  ");
                body.write(4u32.to_be_bytes());
                body.write(descriptor.to_bytes());
            }
            TaggedBlock::ArtboardData(descriptor) => {
                body.write(16u32.to_be_bytes());
                body.write(descriptor.to_bytes());
            }
            TaggedBlock::VectorMaskSetting(path) => {
                body.write(0u32.to_be_bytes());
                body.write(0u32.to_be_bytes());
                path.write(&mut body);
            }
            TaggedBlock::TypeToolObjectSetting { descriptor, .. } => {
                body.write(descriptor.to_bytes());
            }
            TaggedBlock::Unknown { data, .. } => body.write(data),
        }
        let body = body.into_inner();

        if big_key {
            buffer.write((body.len() as u64).to_be_bytes());
        } else {
            buffer.write((body.len() as u32).to_be_bytes());
        }
        buffer.write(body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_unicode_layer_name() {
        let block = TaggedBlock::UnicodeLayerName("hello".to_string());
        let mut bytes = Vec::new();
        let mut buffer = PsdBuffer::new(&mut bytes);
        block.write(&mut buffer, PsdVersion::One);

        let mut cursor = PsdCursor::new(&bytes);
        let parsed = TaggedBlock::read(&mut cursor, PsdVersion::One).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn round_trips_section_divider() {
        let block = TaggedBlock::SectionDivider(SectionDivider {
            kind: SectionDividerKind::OpenFolder,
            blend_mode: Some(BlendMode::PassThrough),
            sub_type: None,
        });
        let mut bytes = Vec::new();
        let mut buffer = PsdBuffer::new(&mut bytes);
        block.write(&mut buffer, PsdVersion::One);

        let mut cursor = PsdCursor::new(&bytes);
        let parsed = TaggedBlock::read(&mut cursor, PsdVersion::One).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn unknown_key_round_trips_raw_bytes() {
        let block = TaggedBlock::Unknown {
            key: *b"zzzz",
            data: vec![1, 2, 3],
        };
        let mut bytes = Vec::new();
        let mut buffer = PsdBuffer::new(&mut bytes);
        block.write(&mut buffer, PsdVersion::One);

        let mut cursor = PsdCursor::new(&bytes);
        let parsed = TaggedBlock::read(&mut cursor, PsdVersion::One).unwrap();
        assert_eq!(parsed, block);
    }

    #[test]
    fn an_unparseable_descriptor_falls_back_to_unknown_instead_of_aborting() {
        // A minimal descriptor body whose single item has an unrecognized
        // OSType tag, so `Descriptor::from_bytes` returns
        // `DescriptorError::InvalidOsType`.
        let mut body = Vec::new();
        body.extend(0u32.to_be_bytes()); // version
        body.extend(0u32.to_be_bytes()); // name: 0 UTF-16 chars
        body.extend(0u32.to_be_bytes()); // class id: terminology form
        body.extend(*b"clas");
        body.extend(1u32.to_be_bytes()); // one item
        body.extend(0u32.to_be_bytes()); // item key: terminology form
        body.extend(*b"key1");
        body.extend(*b"bad!"); // unrecognized OSType tag

        let mut bytes = Vec::new();
        bytes.extend(SIGNATURE_8BIM);
        bytes.extend(*b"artb");
        bytes.extend((body.len() as u32).to_be_bytes());
        bytes.extend(&body);

        let mut cursor = PsdCursor::new(&bytes);
        let parsed = TaggedBlock::read(&mut cursor, PsdVersion::One).unwrap();
        assert_eq!(
            parsed,
            TaggedBlock::Unknown {
                key: *b"artb",
                data: body,
            }
        );
    }

    #[test]
    fn psb_big_key_uses_64_bit_length() {
        let block = TaggedBlock::Unknown {
            key: *b"Lr16",
            data: vec![9, 9],
        };
        let mut bytes = Vec::new();
        let mut buffer = PsdBuffer::new(&mut bytes);
        block.write(&mut buffer, PsdVersion::Two);

        assert_eq!(&bytes[0..4], &SIGNATURE_8B64);
        let mut cursor = PsdCursor::new(&bytes);
        let parsed = TaggedBlock::read(&mut cursor, PsdVersion::Two).unwrap();
        assert_eq!(parsed, block);
    }
}
