//! Folding the flat, leaf-first layer record list into the logical layer
//! tree Photoshop's Layers panel shows (`spec.md` §4.L).
//!
//! Layer records are stored bottom-to-top, and a layer group isn't a
//! single record: it's a span of records bracketed by two markers, both
//! carried as `lsct` tagged blocks. The span opens with a hidden
//! `</Layer group>` record (section divider type 3) and closes with the
//! group's own record (type 1 open / type 2 closed), which carries the
//! group's real name and blend mode. Folding is a single pass with a
//! stack: a type-3 marker pushes a new, not-yet-named frame; a type-1/2
//! record pops the innermost frame, names it from that record, and
//! attaches it as a child of whatever frame is now on top.

use std::collections::HashMap;

use crate::sections::image_resources_section::image_resource::descriptor_structure::DescriptorValue;
use crate::sections::layer_and_mask_information_section::blend_mode::BlendMode;
use crate::sections::layer_and_mask_information_section::layer::{LayerRecord, PsdLayer};
use crate::sections::layer_and_mask_information_section::tagged_block::{
    SectionDividerKind, TaggedBlock,
};

/// A reference to one of a document's logical top-level nodes: either a
/// leaf layer or a group, by index into the flat `layers`/`groups` lists
/// `build_tree` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Layer(usize),
    Group(usize),
}

/// Which children list a [`crate::Document`] mutator targets: the
/// document root, or a specific group by id (`spec.md` §4.M).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationTarget {
    Root,
    Group(u32),
}

/// A layer group, projected from the pair of records that bracket its
/// span. Groups nest via [`PsdGroup::parent_id`]; [`PsdGroup::children`]
/// holds the group's immediate logical children in on-screen (top-first)
/// order.
///
/// `bounding_record` and `close_record` are the two records the group was
/// folded from (`spec.md` §4.L, testable property #6: the bounding
/// record precedes the group's children on disk, the close record
/// succeeds them) — kept around verbatim so [`flatten`] can project the
/// tree back into on-disk order without losing any fields this crate
/// doesn't surface a dedicated accessor for.
#[derive(Debug, Clone, PartialEq)]
pub struct PsdGroup {
    pub(crate) id: u32,
    pub(crate) parent_id: Option<u32>,
    pub(crate) children: Vec<NodeRef>,
    pub(crate) bounding_record: LayerRecord,
    pub(crate) close_record: LayerRecord,
    /// Overrides `close_record`'s bounding box when an `artb`/`artd`/`abdd`
    /// tagged block was present (`spec.md` §9 "Artboards").
    pub(crate) artboard_rect: Option<(i32, i32, i32, i32)>,
}

impl PsdGroup {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        self.close_record.display_name()
    }

    pub fn parent_id(&self) -> Option<u32> {
        self.parent_id
    }

    /// Whether the group was collapsed (closed) the last time the
    /// document was saved.
    pub fn is_closed(&self) -> bool {
        section_divider(&self.close_record).map(|d| d.kind) == Some(SectionDividerKind::ClosedFolder)
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.close_record.blend_mode
    }

    /// This group's immediate logical children, top-first.
    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    /// The group's bounding box, overridden by its artboard rect if one
    /// is present (`spec.md` §9).
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        self.artboard_rect.unwrap_or((
            self.close_record.top,
            self.close_record.left,
            self.close_record.bottom,
            self.close_record.right,
        ))
    }
}

struct OpenFrame {
    id: u32,
    parent_id: Option<u32>,
    children: Vec<NodeRef>,
    bounding_record: Option<LayerRecord>,
}

/// Frame id `0` is the synthetic document root; every real group/layer
/// parent relationship is expressed as `None` for it.
fn frame_parent_id(frame: &OpenFrame) -> Option<u32> {
    if frame.id == 0 {
        None
    } else {
        Some(frame.id)
    }
}

fn section_divider(record: &LayerRecord) -> Option<&crate::sections::layer_and_mask_information_section::tagged_block::SectionDivider> {
    record.tagged_blocks.iter().find_map(|block| match block {
        TaggedBlock::SectionDivider(divider) => Some(divider),
        _ => None,
    })
}

fn artboard_rect(record: &LayerRecord) -> Option<(i32, i32, i32, i32)> {
    record.tagged_blocks.iter().find_map(|block| match block {
        TaggedBlock::ArtboardData(descriptor) => {
            let rect = match descriptor.get(b"artboardRect")? {
                DescriptorValue::Descriptor(inner) => inner.as_ref(),
                _ => return None,
            };
            let get = |key: &[u8; 4]| -> Option<f64> {
                match rect.get(key)? {
                    DescriptorValue::UnitFloat(_, value) => Some(*value),
                    DescriptorValue::Double(value) => Some(*value),
                    _ => None,
                }
            };
            Some((
                get(b"Top ")? as i32,
                get(b"Left")? as i32,
                get(b"Btom")? as i32,
                get(b"Rght")? as i32,
            ))
        }
        _ => None,
    })
}

/// Fold `records` (in on-disk, bottom-to-top order) into the flat list of
/// leaf layers plus the list of groups they (and each other) nest under,
/// along with the document root's own immediate children.
pub(crate) fn build_tree(
    records: Vec<LayerRecord>,
    psd_width: u32,
    psd_height: u32,
) -> (Vec<PsdLayer>, Vec<PsdGroup>, Vec<NodeRef>) {
    let mut layers = Vec::new();
    let mut groups: Vec<Option<PsdGroup>> = Vec::new();
    let mut stack: Vec<OpenFrame> = vec![OpenFrame {
        id: 0,
        parent_id: None,
        children: Vec::new(),
        bounding_record: None,
    }];
    let mut next_id = 1u32;

    for record in records {
        match section_divider(&record).map(|d| d.kind) {
            Some(SectionDividerKind::BoundingSectionDivider) => {
                let parent_id = stack.last().and_then(frame_parent_id);
                stack.push(OpenFrame {
                    id: next_id,
                    parent_id,
                    children: Vec::new(),
                    bounding_record: Some(record),
                });
                next_id += 1;
                groups.push(None);
            }
            Some(SectionDividerKind::OpenFolder | SectionDividerKind::ClosedFolder) => {
                if let Some(frame) = stack.pop() {
                    let group_idx = (frame.id - 1) as usize;
                    let bounding_record = frame.bounding_record.unwrap_or_else(|| record.clone());
                    let rect = artboard_rect(&record);
                    groups[group_idx] = Some(PsdGroup {
                        id: frame.id,
                        parent_id: frame.parent_id,
                        children: frame.children,
                        bounding_record,
                        close_record: record,
                        artboard_rect: rect,
                    });

                    let node = NodeRef::Group(group_idx);
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(node);
                    }
                } else {
                    log::warn!("encountered a group-closing record with no matching open group");
                }
            }
            _ => {
                let mut record = record;
                let channels = std::mem::take(&mut record.channels);
                let parent_id = stack.last().and_then(frame_parent_id);
                let layer_idx = layers.len();
                layers.push(PsdLayer::from_record(
                    &record,
                    channels,
                    parent_id,
                    psd_width,
                    psd_height,
                ));
                if let Some(frame) = stack.last_mut() {
                    frame.children.push(NodeRef::Layer(layer_idx));
                }
            }
        }
    }

    let root_children = stack
        .pop()
        .map(|frame| frame.children)
        .unwrap_or_default();

    let groups: Vec<PsdGroup> = groups
        .into_iter()
        .enumerate()
        .map(|(idx, group)| {
            group.unwrap_or_else(|| {
                log::warn!("group {} was opened but never closed; document was truncated", idx + 1);
                PsdGroup {
                    id: (idx + 1) as u32,
                    parent_id: None,
                    children: Vec::new(),
                    bounding_record: LayerRecord::empty(),
                    close_record: LayerRecord::empty(),
                    artboard_rect: None,
                }
            })
        })
        .collect();

    assign_clip_stacks(&mut layers, &groups, &root_children);

    (layers, groups, root_children)
}

/// Attach every clipping layer's index to the nearest preceding
/// non-clipping layer in the same children list (`spec.md` §4.L, testable
/// property #7). Clipping only composes within a single children list —
/// clipping never crosses group boundaries.
pub(crate) fn assign_clip_stacks(layers: &mut [PsdLayer], groups: &[PsdGroup], root_children: &[NodeRef]) {
    assign_clip_stacks_in(layers, root_children);
    for group in groups {
        assign_clip_stacks_in(layers, &group.children);
    }
}

fn assign_clip_stacks_in(layers: &mut [PsdLayer], children: &[NodeRef]) {
    let mut base: Option<usize> = None;
    for child in children {
        let NodeRef::Layer(idx) = *child else {
            base = None;
            continue;
        };
        if layers[idx].is_clipped() {
            if let Some(base_idx) = base {
                layers[base_idx].clip_layers.push(idx);
            }
        } else {
            base = Some(idx);
        }
    }
}

/// Project the logical tree back into the flat, leaf-first on-disk record
/// order `build_tree` folds (`spec.md` §4.L). `to_record` reconstructs a
/// [`LayerRecord`] (including its current channel data) from a [`PsdLayer`];
/// groups round-trip via their stored `bounding_record`/`close_record`.
pub(crate) fn flatten(
    layers: &[PsdLayer],
    groups: &[PsdGroup],
    root_children: &[NodeRef],
    to_record: &dyn Fn(&PsdLayer) -> LayerRecord,
) -> Vec<LayerRecord> {
    let mut out = Vec::new();
    flatten_children(layers, groups, root_children, to_record, &mut out);
    out
}

fn flatten_children(
    layers: &[PsdLayer],
    groups: &[PsdGroup],
    children: &[NodeRef],
    to_record: &dyn Fn(&PsdLayer) -> LayerRecord,
    out: &mut Vec<LayerRecord>,
) {
    for child in children {
        match *child {
            NodeRef::Layer(idx) => out.push(to_record(&layers[idx])),
            NodeRef::Group(idx) => {
                let group = &groups[idx];
                out.push(group.bounding_record.clone());
                flatten_children(layers, groups, &group.children, to_record, out);
                out.push(group.close_record.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::layer_and_mask_information_section::blending_ranges::BlendingRanges;
    use crate::sections::layer_and_mask_information_section::layer::LayerFlags;
    use crate::sections::layer_and_mask_information_section::mask::MaskData;
    use crate::sections::layer_and_mask_information_section::tagged_block::SectionDivider;

    fn record(name: &str, divider: Option<SectionDivider>) -> LayerRecord {
        LayerRecord {
            name: name.to_string(),
            top: 0,
            left: 0,
            bottom: 1,
            right: 1,
            channel_info: vec![],
            blend_mode: BlendMode::Normal,
            opacity: 255,
            clipping: false,
            flags: LayerFlags::default(),
            mask_data: MaskData::None,
            blending_ranges: BlendingRanges::default(),
            tagged_blocks: divider.into_iter().map(TaggedBlock::SectionDivider).collect(),
            channels: HashMap::new(),
        }
    }

    #[test]
    fn one_group_inside_another() {
        let records = vec![
            record(
                "",
                Some(SectionDivider {
                    kind: SectionDividerKind::BoundingSectionDivider,
                    blend_mode: None,
                    sub_type: None,
                }),
            ),
            record(
                "",
                Some(SectionDivider {
                    kind: SectionDividerKind::BoundingSectionDivider,
                    blend_mode: None,
                    sub_type: None,
                }),
            ),
            record("First Layer", None),
            record(
                "group inside",
                Some(SectionDivider {
                    kind: SectionDividerKind::OpenFolder,
                    blend_mode: Some(BlendMode::Normal),
                    sub_type: None,
                }),
            ),
            record(
                "group outside",
                Some(SectionDivider {
                    kind: SectionDividerKind::OpenFolder,
                    blend_mode: Some(BlendMode::Normal),
                    sub_type: None,
                }),
            ),
        ];

        let (layers, groups, root_children) = build_tree(records, 1, 1);

        assert_eq!(layers.len(), 1);
        assert_eq!(groups.len(), 2);

        let outside = groups.iter().find(|g| g.name() == "group outside").unwrap();
        let inside = groups.iter().find(|g| g.name() == "group inside").unwrap();
        assert_eq!(outside.id(), 1);
        assert_eq!(inside.id(), 2);
        assert_eq!(inside.parent_id(), Some(outside.id()));
        assert_eq!(layers[0].parent_id(), Some(inside.id()));

        // The outside group is the tree's only root child; the inside
        // group is reached by following its children list.
        assert_eq!(root_children, vec![NodeRef::Group(0)]);
        assert_eq!(outside.children(), &[NodeRef::Group(1)]);
        assert_eq!(inside.children(), &[NodeRef::Layer(0)]);
    }

    #[test]
    fn clipping_layers_attach_to_the_nearest_base_layer() {
        let mut clipped = record("clipped", None);
        clipped.clipping = true;
        let records = vec![record("base", None), clipped];

        let (layers, _groups, _root_children) = build_tree(records, 1, 1);

        assert_eq!(layers.len(), 2);
        let base_idx = layers.iter().position(|l| l.name() == "base").unwrap();
        let clipped_idx = layers.iter().position(|l| l.name() == "clipped").unwrap();
        assert_eq!(layers[base_idx].clip_layers(), &[clipped_idx]);
    }

    #[test]
    fn flatten_round_trips_a_nested_group() {
        let records = vec![
            record(
                "",
                Some(SectionDivider {
                    kind: SectionDividerKind::BoundingSectionDivider,
                    blend_mode: None,
                    sub_type: None,
                }),
            ),
            record("inner layer", None),
            record(
                "a group",
                Some(SectionDivider {
                    kind: SectionDividerKind::ClosedFolder,
                    blend_mode: Some(BlendMode::Normal),
                    sub_type: None,
                }),
            ),
        ];

        let (layers, groups, root_children) = build_tree(records, 1, 1);
        let flattened = flatten(&layers, &groups, &root_children, &|layer| {
            record(layer.name(), None)
        });

        assert_eq!(flattened.len(), 3);
        assert!(section_divider(&flattened[0])
            .map(|d| d.kind == SectionDividerKind::BoundingSectionDivider)
            .unwrap_or(false));
        assert_eq!(flattened[1].display_name(), "inner layer");
        assert_eq!(flattened[2].display_name(), "a group");
    }
}
