//! The layer and mask information section (`spec.md` §3.4-§3.7 / §4.H-§4.L):
//! every layer's placement, pixels and compositing attributes, the
//! document-wide mask overlay defaults, and a handful of section-level
//! tagged blocks.
//!
//! The leaf layers and the groups they nest under are exposed separately
//! ([`PsdLayer`] and [`PsdGroup`]) — see [`tree`] for how the flat,
//! leaf-first record list on disk gets folded into that shape.

use std::collections::HashMap;

use crate::compression::{rle_decompress_row, zip_decompress, zip_with_prediction_decompress};
use crate::error::{PsdError, SignatureSite};
use crate::psd_channel::{PsdChannelCompression, PsdChannelKind};
use crate::sections::file_header_section::PsdDepth;
use crate::sections::image_data_section::ChannelBytes;
use crate::sections::layer_and_mask_information_section::blend_mode::BlendMode;
use crate::sections::layer_and_mask_information_section::blending_ranges::BlendingRanges;
use crate::sections::layer_and_mask_information_section::global_mask_info::GlobalMaskInfo;
use crate::sections::layer_and_mask_information_section::layer::{LayerFlags, LayerRecord, PsdLayer};
use crate::sections::layer_and_mask_information_section::mask::MaskData;
use crate::sections::layer_and_mask_information_section::tagged_block::TaggedBlock;
use crate::sections::layer_and_mask_information_section::tree::{MutationTarget, NodeRef, PsdGroup};
use crate::sections::{PsdBuffer, PsdCursor, PsdSerialize};
use crate::version::PsdVersion;

pub mod blend_mode;
pub mod blending_ranges;
pub mod global_mask_info;
pub mod layer;
pub mod mask;
pub mod tagged_block;
pub mod tree;
pub mod vector_path;

/// The layer and mask information section: leaf layers and the groups
/// they're nested under, document-wide mask overlay defaults, and any
/// section-level tagged blocks this crate doesn't fold into either of
/// those.
#[derive(Debug)]
pub struct LayerAndMaskInformationSection {
    pub(in crate) layers: Vec<PsdLayer>,
    pub(in crate) groups: Vec<PsdGroup>,
    pub(in crate) root_children: Vec<NodeRef>,
    pub(in crate) layer_names: HashMap<String, usize>,
    pub(in crate) group_names: HashMap<String, usize>,
    pub(in crate) global_mask_info: Option<GlobalMaskInfo>,
    pub(in crate) tagged_blocks: Vec<TaggedBlock>,
    /// If `true`, the layer count was negative on disk: the first alpha
    /// channel holds the transparency data for the merged result rather
    /// than belonging to any one layer (`spec.md` §3.4).
    pub(in crate) has_merged_alpha: bool,
}

impl LayerAndMaskInformationSection {
    /// An empty layer-and-mask section (no layers, no groups), for
    /// building a document from scratch (`spec.md` §4.M `new`/`frompil`).
    pub fn empty() -> LayerAndMaskInformationSection {
        LayerAndMaskInformationSection {
            layers: Vec::new(),
            groups: Vec::new(),
            root_children: Vec::new(),
            layer_names: HashMap::new(),
            group_names: HashMap::new(),
            global_mask_info: None,
            tagged_blocks: Vec::new(),
            has_merged_alpha: false,
        }
    }

    /// Parse the bytes of the layer and mask information section
    /// (including its own length marker, already sliced out by
    /// [`crate::sections::MajorSections`]).
    pub fn from_bytes(
        bytes: &[u8],
        psd_width: u32,
        psd_height: u32,
        depth: PsdDepth,
        version: PsdVersion,
    ) -> Result<LayerAndMaskInformationSection, PsdError> {
        let mut cursor = PsdCursor::new(bytes);

        if cursor.remaining() == 0 {
            return Ok(LayerAndMaskInformationSection {
                layers: vec![],
                groups: vec![],
                root_children: vec![],
                layer_names: HashMap::new(),
                group_names: HashMap::new(),
                global_mask_info: None,
                tagged_blocks: vec![],
                has_merged_alpha: false,
            });
        }

        let layer_info_len = cursor.read_length(version);
        let layer_info_end = cursor.position() + layer_info_len;

        let mut records = vec![];
        let mut has_merged_alpha = false;

        if layer_info_len > 0 {
            let layer_count_raw = cursor.read_i16();
            has_merged_alpha = layer_count_raw < 0;
            let layer_count = layer_count_raw.unsigned_abs();

            for _ in 0..layer_count {
                records.push(read_layer_record(&mut cursor, version)?);
            }

            for record in records.iter_mut() {
                let scanlines = record.height() as usize;
                let channel_width = record.width() as usize;
                let channel_info = record.channel_info.clone();

                for (channel_kind, channel_length) in channel_info {
                    let compression_raw = cursor.read_u16();
                    let compression = PsdChannelCompression::new(compression_raw)?;
                    let channel_data = cursor.read((channel_length - 2) as u32);

                    let channel_bytes = decode_layer_channel(
                        compression,
                        channel_data,
                        channel_width,
                        scanlines,
                        depth,
                        version,
                    )?;
                    record.channels.insert(channel_kind, channel_bytes);
                }
            }
        }

        if cursor.position() < layer_info_end {
            cursor.read((layer_info_end - cursor.position()) as u32);
        }

        let global_mask_info = if cursor.remaining() >= 4 {
            let global_mask_len = cursor.read_u32();
            GlobalMaskInfo::read(&mut cursor, global_mask_len as usize)
        } else {
            None
        };

        let mut tagged_blocks = vec![];
        while cursor.remaining() >= 8 {
            let signature = cursor.peek_4();
            if &signature != b"8BIM" && &signature != b"8B64" {
                break;
            }
            tagged_blocks.push(TaggedBlock::read(&mut cursor, version)?);
        }

        let (layers, groups, root_children) = tree::build_tree(records, psd_width, psd_height);

        let layer_names = layers
            .iter()
            .enumerate()
            .map(|(idx, layer)| (layer.name().to_string(), idx))
            .collect();
        let group_names = groups
            .iter()
            .enumerate()
            .map(|(idx, group)| (group.name().to_string(), idx))
            .collect();

        Ok(LayerAndMaskInformationSection {
            layers,
            groups,
            root_children,
            layer_names,
            group_names,
            global_mask_info,
            tagged_blocks,
            has_merged_alpha,
        })
    }

    pub fn layers(&self) -> &[PsdLayer] {
        &self.layers
    }

    pub fn groups(&self) -> &[PsdGroup] {
        &self.groups
    }

    /// The document root's immediate children, top-first (`spec.md` §4.L).
    pub fn root_children(&self) -> &[NodeRef] {
        &self.root_children
    }

    /// Section-level tagged blocks this crate doesn't fold into a layer or
    /// group (`spec.md` §4.H).
    pub fn tagged_blocks(&self) -> &[TaggedBlock] {
        &self.tagged_blocks
    }

    /// The document-wide mask overlay defaults, if this document has any
    /// (`spec.md` §3.6).
    pub fn global_mask_info(&self) -> Option<&GlobalMaskInfo> {
        self.global_mask_info.as_ref()
    }

    /// Look up a leaf layer by its (possibly Unicode) display name. Returns
    /// the first match if more than one layer shares a name.
    pub fn layer_by_name(&self, name: &str) -> Option<&PsdLayer> {
        self.layer_names.get(name).map(|&idx| &self.layers[idx])
    }

    pub fn layer_by_idx(&self, idx: usize) -> Option<&PsdLayer> {
        self.layers.get(idx)
    }

    /// Look up a group by its name. Returns the first match if more than
    /// one group shares a name.
    pub fn group_by_name(&self, name: &str) -> Option<&PsdGroup> {
        self.group_names.get(name).map(|&idx| &self.groups[idx])
    }

    pub fn group_by_idx(&self, idx: usize) -> Option<&PsdGroup> {
        self.groups.get(idx)
    }

    fn children_list_mut(&mut self, target: MutationTarget) -> Option<&mut Vec<NodeRef>> {
        match target {
            MutationTarget::Root => Some(&mut self.root_children),
            MutationTarget::Group(id) => self
                .groups
                .iter_mut()
                .find(|group| group.id == id)
                .map(|group| &mut group.children),
        }
    }

    fn no_such_group(id: u32) -> PsdError {
        PsdError::InvariantViolation {
            message: format!("no group with id {} to mutate", id),
        }
    }

    /// Append a child to the end (bottom) of a group's (or the root's)
    /// children list (`spec.md` §4.M).
    pub(crate) fn append_child(&mut self, target: MutationTarget, node: NodeRef) -> Result<(), PsdError> {
        let id_for_error = match target {
            MutationTarget::Root => None,
            MutationTarget::Group(id) => Some(id),
        };
        let children = self
            .children_list_mut(target)
            .ok_or_else(|| Self::no_such_group(id_for_error.unwrap_or_default()))?;
        children.push(node);
        Ok(())
    }

    /// Append every child in `nodes`, preserving relative order.
    pub(crate) fn extend_children(
        &mut self,
        target: MutationTarget,
        nodes: impl IntoIterator<Item = NodeRef>,
    ) -> Result<(), PsdError> {
        let id_for_error = match target {
            MutationTarget::Root => None,
            MutationTarget::Group(id) => Some(id),
        };
        let children = self
            .children_list_mut(target)
            .ok_or_else(|| Self::no_such_group(id_for_error.unwrap_or_default()))?;
        children.extend(nodes);
        Ok(())
    }

    /// Insert a child at `index` within a group's (or the root's) children
    /// list.
    pub(crate) fn insert_child(
        &mut self,
        target: MutationTarget,
        index: usize,
        node: NodeRef,
    ) -> Result<(), PsdError> {
        let id_for_error = match target {
            MutationTarget::Root => None,
            MutationTarget::Group(id) => Some(id),
        };
        let children = self
            .children_list_mut(target)
            .ok_or_else(|| Self::no_such_group(id_for_error.unwrap_or_default()))?;
        if index > children.len() {
            return Err(PsdError::InvalidField {
                field: "mutation_index",
                value: index.to_string(),
            });
        }
        children.insert(index, node);
        Ok(())
    }

    /// Remove and return the child at `index`.
    pub(crate) fn remove_child(
        &mut self,
        target: MutationTarget,
        index: usize,
    ) -> Result<NodeRef, PsdError> {
        let id_for_error = match target {
            MutationTarget::Root => None,
            MutationTarget::Group(id) => Some(id),
        };
        let children = self
            .children_list_mut(target)
            .ok_or_else(|| Self::no_such_group(id_for_error.unwrap_or_default()))?;
        if index >= children.len() {
            return Err(PsdError::InvalidField {
                field: "mutation_index",
                value: index.to_string(),
            });
        }
        Ok(children.remove(index))
    }

    /// Remove and return the last (bottommost) child, if any.
    pub(crate) fn pop_child(&mut self, target: MutationTarget) -> Option<NodeRef> {
        self.children_list_mut(target).and_then(|children| children.pop())
    }

    /// Remove every child.
    pub(crate) fn clear_children(&mut self, target: MutationTarget) -> Result<(), PsdError> {
        let id_for_error = match target {
            MutationTarget::Root => None,
            MutationTarget::Group(id) => Some(id),
        };
        let children = self
            .children_list_mut(target)
            .ok_or_else(|| Self::no_such_group(id_for_error.unwrap_or_default()))?;
        children.clear();
        Ok(())
    }

    /// Swap a child with its predecessor (moves it up/toward the top of
    /// the Layers panel). Returns `false` if `index` is already at the top
    /// or out of range.
    pub(crate) fn move_child_up(&mut self, target: MutationTarget, index: usize) -> bool {
        match self.children_list_mut(target) {
            Some(children) if index > 0 && index < children.len() => {
                children.swap(index, index - 1);
                true
            }
            _ => false,
        }
    }

    /// Swap a child with its successor (moves it down/toward the bottom).
    /// Returns `false` if `index` is already at the bottom or out of range.
    pub(crate) fn move_child_down(&mut self, target: MutationTarget, index: usize) -> bool {
        match self.children_list_mut(target) {
            Some(children) if index + 1 < children.len() => {
                children.swap(index, index + 1);
                true
            }
            _ => false,
        }
    }

    /// Rebuild the name → index lookup tables after a mutation that may
    /// have added, removed or renamed layers/groups.
    pub(crate) fn rebuild_name_indexes(&mut self) {
        self.layer_names = self
            .layers
            .iter()
            .enumerate()
            .map(|(idx, layer)| (layer.name().to_string(), idx))
            .collect();
        self.group_names = self
            .groups
            .iter()
            .enumerate()
            .map(|(idx, group)| (group.name().to_string(), idx))
            .collect();
    }

    /// Recompute every layer's clip stack after a mutation changed which
    /// children list it sits in (`spec.md` §4.L, testable property #7).
    pub(crate) fn reassign_clip_stacks(&mut self) {
        for layer in self.layers.iter_mut() {
            layer.clip_layers.clear();
        }
        tree::assign_clip_stacks(&mut self.layers, &self.groups, &self.root_children);
    }

    /// Append a newly constructed leaf layer to the document's flat layer
    /// list, returning a [`NodeRef`] that can be passed to a mutator to
    /// place it in the tree.
    pub(crate) fn push_layer(&mut self, layer: PsdLayer) -> NodeRef {
        let idx = self.layers.len();
        self.layers.push(layer);
        NodeRef::Layer(idx)
    }

    /// Serialize the layer and mask information section back to bytes
    /// (including its own length marker), flattening the logical layer
    /// tree back into on-disk, leaf-first record order via
    /// [`tree::flatten`].
    pub fn to_bytes(&self, version: PsdVersion) -> Result<Vec<u8>, PsdError> {
        let records = tree::flatten(&self.layers, &self.groups, &self.root_children, &|layer| {
            layer.to_record()
        });

        let layer_count: i16 = if self.has_merged_alpha {
            -(records.len() as i16)
        } else {
            records.len() as i16
        };

        let encoded_channels: Vec<_> = records
            .iter()
            .map(|record| record.encode_channels(version))
            .collect::<Result<_, _>>()?;

        let mut layer_info = Vec::new();
        layer_info.extend_from_slice(&layer_count.to_be_bytes());
        for (record, channels) in records.iter().zip(&encoded_channels) {
            layer_info.extend_from_slice(&record.write_header(version, channels));
        }
        for channels in &encoded_channels {
            layer_info.extend_from_slice(&LayerRecord::write_channel_data(channels));
        }

        let mut out = Vec::new();
        {
            let mut buffer = PsdBuffer::new(&mut out);
            buffer.write_length(layer_info.len() as u64, version);
            buffer.write(layer_info);

            match &self.global_mask_info {
                Some(info) => buffer.write_sized(|buf| info.write(buf)),
                None => buffer.write(0u32.to_be_bytes()),
            }

            for block in &self.tagged_blocks {
                block.write(&mut buffer, version);
            }
        }

        let mut wrapped = Vec::new();
        {
            let mut buffer = PsdBuffer::new(&mut wrapped);
            buffer.write_length(out.len() as u64, version);
            buffer.write(out);
        }
        Ok(wrapped)
    }
}

/// Decode one layer channel's data, dispatching on its compression the
/// same way the final merged image data does (`spec.md` §4.B), but scoped
/// to the layer's own bounding box rather than the whole canvas.
fn decode_layer_channel(
    compression: PsdChannelCompression,
    data: &[u8],
    width: usize,
    height: usize,
    depth: PsdDepth,
    version: PsdVersion,
) -> Result<ChannelBytes, PsdError> {
    match compression {
        PsdChannelCompression::RawData => Ok(ChannelBytes::RawData(data.to_vec())),
        PsdChannelCompression::RleCompressed => {
            let mut cursor = PsdCursor::new(data);
            let row_bytes = width * depth.bytes_per_sample();

            let mut counts = Vec::with_capacity(height);
            for _ in 0..height {
                let count = if version.uses_big_lengths() {
                    cursor.read_u32() as usize
                } else {
                    cursor.read_u16() as usize
                };
                counts.push(count);
            }

            let mut decoded = Vec::with_capacity(row_bytes * height);
            for count in counts {
                let row_packed = cursor.read(count as u32);
                decoded.extend(rle_decompress_row(row_packed, row_bytes)?);
            }
            Ok(ChannelBytes::RleCompressed(decoded))
        }
        PsdChannelCompression::ZipWithoutPrediction => Ok(ChannelBytes::Zip(zip_decompress(data)?)),
        PsdChannelCompression::ZipWithPrediction => Ok(ChannelBytes::ZipWithPrediction(
            zip_with_prediction_decompress(data, width, height, depth)?,
        )),
    }
}

/// Read one layer record: its bounding box, channel info table and
/// compositing attributes, up to (but not including) its channel image
/// data, which is read separately once every record's layout is known
/// (`spec.md` §3.4).
fn read_layer_record(cursor: &mut PsdCursor, version: PsdVersion) -> Result<LayerRecord, PsdError> {
    let top = cursor.read_i32();
    let left = cursor.read_i32();
    let bottom = cursor.read_i32();
    let right = cursor.read_i32();

    let channel_count = cursor.read_u16();
    let mut channel_info = Vec::with_capacity(channel_count as usize);
    for _ in 0..channel_count {
        let channel_id = cursor.read_i16();
        let channel_kind = PsdChannelKind::new(channel_id)?;
        let channel_length = cursor.read_length(version);
        channel_info.push((channel_kind, channel_length));
    }

    cursor.read_signature(b"8BIM", SignatureSite::LayerBlendModeSignature)?;
    let blend_mode = BlendMode::from_key(&cursor.read_4());
    let opacity = cursor.read_u8();
    let clipping = cursor.read_u8() != 0;
    let flags = LayerFlags::from_bits(cursor.read_u8());
    let _filler = cursor.read_u8();

    let extra_data_len = cursor.read_u32() as u64;
    let extra_data_end = cursor.position() + extra_data_len;

    let mask_data = MaskData::read(cursor);

    let blending_ranges_len = cursor.read_u32();
    let blending_ranges_bytes = cursor.read(blending_ranges_len);
    let mut blending_ranges_cursor = PsdCursor::new(blending_ranges_bytes);
    let blending_ranges = BlendingRanges::read(&mut blending_ranges_cursor);

    let name = cursor.read_pascal_string(4);

    let mut tagged_blocks = vec![];
    while cursor.position() < extra_data_end && cursor.remaining() >= 8 {
        let signature = cursor.peek_4();
        if &signature != b"8BIM" && &signature != b"8B64" {
            break;
        }
        tagged_blocks.push(TaggedBlock::read(cursor, version)?);
    }
    if cursor.position() < extra_data_end {
        cursor.read((extra_data_end - cursor.position()) as u32);
    }

    Ok(LayerRecord {
        name,
        top,
        left,
        bottom,
        right,
        channel_info,
        blend_mode,
        opacity,
        clipping,
        flags,
        mask_data,
        blending_ranges,
        tagged_blocks,
        channels: HashMap::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::{PsdBuffer, PsdSerialize};
    use std::io::Write as _;

    fn single_layer_record_bytes(name: &str) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(0i32.to_be_bytes()); // top
        bytes.extend(0i32.to_be_bytes()); // left
        bytes.extend(1i32.to_be_bytes()); // bottom
        bytes.extend(1i32.to_be_bytes()); // right

        bytes.extend(4u16.to_be_bytes()); // channel count
        for channel_id in [0i16, 1, 2, -1] {
            bytes.extend(channel_id.to_be_bytes());
            bytes.extend(3u32.to_be_bytes()); // 2 (compression) + 1 byte raw data
        }

        bytes.extend(*b"8BIM");
        bytes.extend(*b"norm");
        bytes.push(255); // opacity
        bytes.push(0); // clipping
        bytes.push(0); // flags
        bytes.push(0); // filler

        let mut extra = Vec::new();
        extra.extend(0u32.to_be_bytes()); // mask data length (none)
        extra.extend(0u32.to_be_bytes()); // blending ranges length (none)

        let mut name_bytes = Vec::new();
        {
            let mut name_buf = PsdBuffer::new(&mut name_bytes);
            name_buf.write_pascal_string(name, 4);
        }
        extra.extend(name_bytes);

        bytes.extend((extra.len() as u32).to_be_bytes());
        bytes.extend(extra);

        for _ in 0..4 {
            bytes.extend(0u16.to_be_bytes()); // raw compression
            bytes.push(128); // one raw sample byte
        }

        bytes
    }

    #[test]
    fn parses_a_single_leaf_layer() {
        let mut body = Vec::new();
        body.extend(1i16.to_be_bytes()); // layer count
        body.extend(single_layer_record_bytes("hello"));

        let mut bytes = Vec::new();
        bytes.extend((body.len() as u32).to_be_bytes());
        bytes.extend(body);
        bytes.extend(0u32.to_be_bytes()); // no global mask info

        let section =
            LayerAndMaskInformationSection::from_bytes(&bytes, 1, 1, PsdDepth::Eight, PsdVersion::One)
                .unwrap();

        assert_eq!(section.layers.len(), 1);
        assert_eq!(section.layers[0].name(), "hello");
        assert_eq!(section.groups.len(), 0);
    }

    #[test]
    fn empty_section_parses_to_no_layers() {
        let bytes = 0u32.to_be_bytes();
        let section =
            LayerAndMaskInformationSection::from_bytes(&bytes, 1, 1, PsdDepth::Eight, PsdVersion::One)
                .unwrap();
        assert_eq!(section.layers.len(), 0);
    }
}
