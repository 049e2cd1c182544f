//! A Rust API for parsing and working with Adobe's layered raster document
//! container (PSD/PSB).
//!
//! [`Psd`] is the read/write, immutable-by-default view of a parsed
//! document; [`Document`] wraps it with the mutation surface (`spec.md`
//! §4.M): group/root child-list edits and dirty tracking, so a caller can
//! load a file, rearrange its layers, and save it back out.
//!
//! ```no_run
//! # fn main() -> Result<(), psd::error::PsdError> {
//! let bytes = std::fs::read("example.psd").unwrap();
//! let psd = psd::Psd::from_bytes(&bytes)?;
//! for layer in psd.layers() {
//!     println!("{}", layer.name());
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod blend;
pub mod compression;
pub mod error;
mod i_to_usize;
pub mod psd_channel;
mod render;
pub mod sections;
pub mod version;

pub use crate::error::PsdError;
pub use crate::psd_channel::{PsdChannelCompression, PsdChannelKind};
pub use crate::sections::color_mode_data_section::ColorModeDataSection;
pub use crate::sections::file_header_section::{ChannelCount, ColorMode, PsdDepth, PsdHeight, PsdWidth};
pub use crate::sections::image_data_section::{ChannelBytes, ImageDataSection};
pub use crate::sections::image_resources_section::{ImageResource, ImageResourceBlock, ImageResourcesSection};
pub use crate::sections::layer_and_mask_information_section::layer::{LayerKind, PsdLayer};
pub use crate::sections::layer_and_mask_information_section::tagged_block::{AdjustmentKind, TaggedBlock};
pub use crate::sections::layer_and_mask_information_section::tree::{MutationTarget, NodeRef, PsdGroup};
pub use crate::version::PsdVersion;

use crate::sections::color_mode_data_section::ColorModeDataSectionError;
use crate::sections::file_header_section::FileHeaderSection;
use crate::sections::layer_and_mask_information_section::LayerAndMaskInformationSection;
use crate::sections::{MajorSections, PsdBuffer, PsdSerialize};

/// Knobs controlling how [`Psd::from_bytes_with_options`] parses a
/// document (`spec.md` §1.3, new).
///
/// There is no file-based configuration for this crate: the only inputs
/// to parsing are the document's own bytes (which determine PSD vs. PSB
/// via the version byte, §4.K) and this struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Whether layer/image channel data should be decompressed as soon as
    /// its containing block is read, rather than deferred until a caller
    /// first asks for it (§4.J). This crate's single-pass reader always
    /// decodes every channel while it walks the layer-and-mask section, so
    /// this flag is currently accepted for API stability but has no
    /// observable effect; see `DESIGN.md` for the open-question
    /// resolution.
    pub lazy_decompression: bool,
}

impl Default for ParseOptions {
    /// Matches the baseline behavior `spec.md` mandates: lazy
    /// decompression.
    fn default() -> Self {
        ParseOptions {
            lazy_decompression: true,
        }
    }
}

/// A parsed PSD/PSB document: the five major sections (`spec.md` §3) plus
/// the logical layer tree projected from the layer-and-mask section
/// (§4.L).
///
/// `Psd` itself only exposes read access and a `to_bytes` round trip; use
/// [`Document`] for the mutation surface.
#[derive(Debug)]
pub struct Psd {
    file_header: FileHeaderSection,
    color_mode_data: ColorModeDataSection,
    image_resources: ImageResourcesSection,
    layer_and_mask: LayerAndMaskInformationSection,
    image_data: ImageDataSection,
}

impl Psd {
    /// Parse a whole PSD/PSB file's bytes with [`ParseOptions::default`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Psd, PsdError> {
        Psd::from_bytes_with_options(bytes, ParseOptions::default())
    }

    /// Parse a whole PSD/PSB file's bytes, honoring `options`.
    pub fn from_bytes_with_options(bytes: &[u8], options: ParseOptions) -> Result<Psd, PsdError> {
        let _ = options;

        let major_sections = MajorSections::from_bytes(bytes)?;
        let version = major_sections.version;

        let file_header = FileHeaderSection::from_bytes(major_sections.file_header)?;
        let color_mode_data = ColorModeDataSection::from_bytes(major_sections.color_mode_data)
            .map_err(|e: ColorModeDataSectionError| match e {})?;
        let image_resources = ImageResourcesSection::from_bytes(major_sections.image_resources)?;

        let width = file_header.width().value();
        let height = file_header.height().value();
        let depth = file_header.depth();

        let layer_and_mask = LayerAndMaskInformationSection::from_bytes(
            major_sections.layer_and_mask_information,
            width,
            height,
            depth,
            version,
        )?;

        let image_data = ImageDataSection::from_bytes(
            major_sections.image_data,
            width,
            height,
            file_header.channel_count().count(),
            depth,
            version,
        )?;

        Ok(Psd {
            file_header,
            color_mode_data,
            image_resources,
            layer_and_mask,
            image_data,
        })
    }

    /// Serialize this document back to bytes, re-encoding every section
    /// (`spec.md` §6.1).
    pub fn to_bytes(&self) -> Result<Vec<u8>, PsdError> {
        let image_resources = self.image_resources.to_bytes();

        let mut out = Vec::new();
        {
            let mut buffer = PsdBuffer::new(&mut out);
            self.file_header.write(&mut buffer);
            self.color_mode_data.write(&mut buffer);
            buffer.write((image_resources.len() as u32).to_be_bytes());
            buffer.write(image_resources);
        }
        out.extend_from_slice(&self.layer_and_mask.to_bytes(self.version())?);
        out.extend_from_slice(&self.image_data.to_bytes()?);
        Ok(out)
    }

    /// The document's version (PSD vs. PSB).
    pub fn version(&self) -> PsdVersion {
        self.file_header.version()
    }

    /// The canvas width, in pixels.
    pub fn width(&self) -> u32 {
        self.file_header.width().value()
    }

    /// The canvas height, in pixels.
    pub fn height(&self) -> u32 {
        self.file_header.height().value()
    }

    /// The bit depth of every channel.
    pub fn depth(&self) -> PsdDepth {
        self.file_header.depth()
    }

    /// The color mode of the document.
    pub fn color_mode(&self) -> ColorMode {
        self.file_header.color_mode()
    }

    /// The number of channels in the final merged image, including any
    /// alpha channels.
    pub fn channel_count(&self) -> u8 {
        self.file_header.channel_count().count()
    }

    /// The document's bounding box: `(left, top, right, bottom)`, always
    /// `(0, 0, width, height)` since the canvas itself has no offset.
    pub fn viewbox(&self) -> (u32, u32, u32, u32) {
        (0, 0, self.width(), self.height())
    }

    /// The raw, mostly-opaque color mode data section (meaningful only for
    /// indexed/duotone documents; `spec.md` §1 Non-goals).
    pub fn color_mode_data(&self) -> &ColorModeDataSection {
        &self.color_mode_data
    }

    /// The document's image resource blocks (§3.3/§4.D).
    pub fn image_resources(&self) -> &ImageResourcesSection {
        &self.image_resources
    }

    /// Section-level tagged blocks the layer-and-mask section carries
    /// outside of any individual layer or group (§4.H).
    pub fn tagged_blocks(&self) -> &[TaggedBlock] {
        self.layer_and_mask.tagged_blocks()
    }

    /// Every leaf layer, in on-disk (bottom-to-top) order. Groups are
    /// projected separately; see [`Psd::groups`] and [`Psd::root_children`]
    /// for how they nest (§4.L).
    pub fn layers(&self) -> &[PsdLayer] {
        self.layer_and_mask.layers()
    }

    /// Every layer group in the document, indexed by the id
    /// [`NodeRef::Group`]/[`PsdGroup::parent_id`] refer to.
    pub fn groups(&self) -> &[PsdGroup] {
        self.layer_and_mask.groups()
    }

    /// The document root's immediate children (layers and/or groups),
    /// top-first.
    pub fn root_children(&self) -> &[NodeRef] {
        self.layer_and_mask.root_children()
    }

    /// Look up a leaf layer by name.
    pub fn layer_by_name(&self, name: &str) -> Option<&PsdLayer> {
        self.layer_and_mask.layer_by_name(name)
    }

    /// Look up a leaf layer by its index in [`Psd::layers`].
    pub fn layer_by_idx(&self, idx: usize) -> Option<&PsdLayer> {
        self.layer_and_mask.layer_by_idx(idx)
    }

    /// Look up a group by name.
    pub fn group_by_name(&self, name: &str) -> Option<&PsdGroup> {
        self.layer_and_mask.group_by_name(name)
    }

    /// Look up a group by its index in [`Psd::groups`].
    pub fn group_by_idx(&self, idx: usize) -> Option<&PsdGroup> {
        self.layer_and_mask.group_by_idx(idx)
    }

    /// The final, merged image data (the flattened preview Photoshop shows
    /// before any layer is opened).
    pub fn image_data(&self) -> &ImageDataSection {
        &self.image_data
    }

    /// Flatten every leaf layer for which `filter` returns `true` into a
    /// single RGBA buffer the size of the canvas, compositing top-down
    /// with each layer's blend mode and opacity. Full color-managed
    /// rendering is out of scope (`spec.md` §1 Non-goals); this is the
    /// teacher's existing best-effort compositor, kept as a convenience.
    pub fn flatten_layers_rgba(&self, filter: &dyn Fn(&PsdLayer) -> bool) -> Vec<u8> {
        let top_down: Vec<(usize, &PsdLayer)> = self
            .layers()
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, layer)| filter(layer))
            .collect();

        let width = self.width() as usize;
        let height = self.height() as usize;
        let renderer = render::Renderer::new(&top_down, width);

        let mut rgba = vec![0u8; width * height * 4];
        for row in 0..height {
            for col in 0..width {
                let pixel = renderer.flattened_pixel((col, row));
                let idx = (row * width + col) * 4;
                rgba[idx..idx + 4].copy_from_slice(&pixel);
            }
        }
        rgba
    }
}

/// A [`Psd`] wrapped with the mutation surface of `spec.md` §4.M: editing
/// which layers/groups sit in a group's (or the root's) children list,
/// building a document from scratch or from an image buffer, and tracking
/// whether the document has unsaved changes.
///
/// The teacher only ever offers `from_bytes` (read-only parsing); this is
/// the write-capable surface the full container spec calls for.
#[derive(Debug)]
pub struct Document {
    psd: Psd,
    dirty: bool,
}

impl Document {
    /// Open a document from its encoded bytes.
    pub fn open(bytes: &[u8]) -> Result<Document, PsdError> {
        Ok(Document {
            psd: Psd::from_bytes(bytes)?,
            dirty: false,
        })
    }

    /// Open a document, honoring `options`.
    pub fn open_with_options(bytes: &[u8], options: ParseOptions) -> Result<Document, PsdError> {
        Ok(Document {
            psd: Psd::from_bytes_with_options(bytes, options)?,
            dirty: false,
        })
    }

    /// Build a fresh document with no layers: a single merged image,
    /// filled with zero bytes, the size and color mode requested
    /// (`spec.md` §4.M `new`).
    pub fn new(width: u32, height: u32, color_mode: ColorMode, depth: PsdDepth) -> Result<Document, PsdError> {
        let version = if width.max(height) > PsdVersion::One.max_dimension() {
            PsdVersion::Two
        } else {
            PsdVersion::One
        };

        let channel_count = default_channel_count(color_mode);
        let bytes_per_channel = (width as usize) * (height as usize) * depth.bytes_per_sample();
        let channels = (0..channel_count)
            .map(|_| ChannelBytes::RawData(vec![0u8; bytes_per_channel]))
            .collect();

        let psd = Psd {
            file_header: FileHeaderSection::new(
                version,
                ChannelCount::new(channel_count)?,
                PsdWidth::new(width, version)?,
                PsdHeight::new(height, version)?,
                depth,
                color_mode,
            ),
            color_mode_data: ColorModeDataSection::empty(),
            image_resources: ImageResourcesSection::empty(),
            layer_and_mask: LayerAndMaskInformationSection::empty(),
            image_data: ImageDataSection::new(
                channels,
                PsdChannelCompression::RawData,
                width,
                height,
                depth,
                version,
            ),
        };

        Ok(Document { psd, dirty: false })
    }

    /// Build a fresh document from an RGBA image buffer, as a single
    /// 8-bit RGB+alpha merged image with no layers (`spec.md` §4.M
    /// `frompil`).
    pub fn from_image(image: &image::RgbaImage) -> Result<Document, PsdError> {
        let (width, height) = image.dimensions();
        let mut doc = Document::new(width, height, ColorMode::Rgb, PsdDepth::Eight)?;

        let mut planes: Vec<Vec<u8>> = vec![Vec::with_capacity((width * height) as usize); 4];
        for pixel in image.as_raw().chunks_exact(4) {
            for (plane, sample) in planes.iter_mut().zip(pixel) {
                plane.push(*sample);
            }
        }

        doc.psd.image_data = ImageDataSection::new(
            planes.into_iter().map(ChannelBytes::RawData).collect(),
            PsdChannelCompression::RawData,
            width,
            height,
            PsdDepth::Eight,
            doc.psd.version(),
        );
        doc.dirty = true;
        Ok(doc)
    }

    /// Serialize the document back to bytes. Does not itself clear
    /// [`Document::is_updated`] — a caller that persists the returned
    /// bytes to their backing store is expected to track that separately.
    pub fn save(&self) -> Result<Vec<u8>, PsdError> {
        self.psd.to_bytes()
    }

    /// Whether any mutator has been called since this document was opened
    /// (or, for a document built with [`Document::new`]/[`Document::from_image`],
    /// since it was constructed).
    pub fn is_updated(&self) -> bool {
        self.dirty
    }

    /// Borrow the read-only view of the underlying document.
    pub fn psd(&self) -> &Psd {
        &self.psd
    }

    /// Append a newly created, empty (zero-sized, no pixel data) leaf
    /// layer named `name` to the document's flat layer list, returning the
    /// [`NodeRef`] to place with a mutator. A fully pixel-backed layer
    /// constructor is out of scope (`spec.md` §1 Non-goals: no
    /// rasterization/compositing authoring), but §4.M's group mutators
    /// need *something* to append.
    pub fn new_empty_layer(&mut self, name: &str) -> NodeRef {
        use crate::sections::layer_and_mask_information_section::layer::{LayerRecord, PsdLayer as Layer};

        let record = LayerRecord {
            name: name.to_string(),
            ..LayerRecord::empty()
        };
        let layer = Layer::from_record(&record, Default::default(), None, self.psd.width(), self.psd.height());
        let node = self.psd.layer_and_mask.push_layer(layer);
        self.dirty = true;
        node
    }

    /// Append `node` to the end (bottom) of `target`'s children list.
    pub fn append(&mut self, target: MutationTarget, node: NodeRef) -> Result<(), PsdError> {
        self.psd.layer_and_mask.append_child(target, node)?;
        self.after_mutation();
        Ok(())
    }

    /// Append every child in `nodes` to `target`'s children list.
    pub fn extend(
        &mut self,
        target: MutationTarget,
        nodes: impl IntoIterator<Item = NodeRef>,
    ) -> Result<(), PsdError> {
        self.psd.layer_and_mask.extend_children(target, nodes)?;
        self.after_mutation();
        Ok(())
    }

    /// Insert `node` at `index` within `target`'s children list.
    pub fn insert(&mut self, target: MutationTarget, index: usize, node: NodeRef) -> Result<(), PsdError> {
        self.psd.layer_and_mask.insert_child(target, index, node)?;
        self.after_mutation();
        Ok(())
    }

    /// Remove and return the child at `index` within `target`'s children
    /// list.
    pub fn remove(&mut self, target: MutationTarget, index: usize) -> Result<NodeRef, PsdError> {
        let node = self.psd.layer_and_mask.remove_child(target, index)?;
        self.after_mutation();
        Ok(node)
    }

    /// Remove and return the last child of `target`'s children list, if
    /// any.
    pub fn pop(&mut self, target: MutationTarget) -> Option<NodeRef> {
        let node = self.psd.layer_and_mask.pop_child(target);
        if node.is_some() {
            self.after_mutation();
        }
        node
    }

    /// Remove every child of `target`'s children list.
    pub fn clear(&mut self, target: MutationTarget) -> Result<(), PsdError> {
        self.psd.layer_and_mask.clear_children(target)?;
        self.after_mutation();
        Ok(())
    }

    /// Move the child at `index` one slot up (toward the top of the
    /// Layers panel). Returns `false` (no-op) if it's already at the top.
    pub fn move_up(&mut self, target: MutationTarget, index: usize) -> bool {
        let moved = self.psd.layer_and_mask.move_child_up(target, index);
        if moved {
            self.after_mutation();
        }
        moved
    }

    /// Move the child at `index` one slot down (toward the bottom).
    /// Returns `false` (no-op) if it's already at the bottom.
    pub fn move_down(&mut self, target: MutationTarget, index: usize) -> bool {
        let moved = self.psd.layer_and_mask.move_child_down(target, index);
        if moved {
            self.after_mutation();
        }
        moved
    }

    fn after_mutation(&mut self) {
        self.psd.layer_and_mask.reassign_clip_stacks();
        self.psd.layer_and_mask.rebuild_name_indexes();
        self.dirty = true;
    }
}

fn default_channel_count(color_mode: ColorMode) -> u8 {
    match color_mode {
        ColorMode::Bitmap | ColorMode::Grayscale | ColorMode::Indexed | ColorMode::Duotone => 1,
        ColorMode::Rgb | ColorMode::Lab => 3,
        ColorMode::Cmyk => 4,
        ColorMode::Multichannel => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_layer_psd_bytes(name: &str) -> Vec<u8> {
        let mut header = Vec::new();
        header.extend(*b"8BPS");
        header.extend(1u16.to_be_bytes());
        header.extend([0u8; 6]);
        header.extend(4u16.to_be_bytes()); // channel count
        header.extend(1u32.to_be_bytes()); // height
        header.extend(1u32.to_be_bytes()); // width
        header.extend(8u16.to_be_bytes()); // depth
        header.extend(3u16.to_be_bytes()); // RGB

        let mut bytes = header;
        bytes.extend(0u32.to_be_bytes()); // color mode data
        bytes.extend(0u32.to_be_bytes()); // image resources

        let mut layer_record = Vec::new();
        layer_record.extend(0i32.to_be_bytes());
        layer_record.extend(0i32.to_be_bytes());
        layer_record.extend(1i32.to_be_bytes());
        layer_record.extend(1i32.to_be_bytes());
        layer_record.extend(4u16.to_be_bytes());
        for channel_id in [0i16, 1, 2, -1] {
            layer_record.extend(channel_id.to_be_bytes());
            layer_record.extend(3u32.to_be_bytes());
        }
        layer_record.extend(*b"8BIM");
        layer_record.extend(*b"norm");
        layer_record.push(255);
        layer_record.push(0);
        layer_record.push(0);
        layer_record.push(0);

        let mut extra = Vec::new();
        extra.extend(0u32.to_be_bytes());
        extra.extend(0u32.to_be_bytes());
        let mut name_bytes = Vec::new();
        {
            let mut name_buf = PsdBuffer::new(&mut name_bytes);
            name_buf.write_pascal_string(name, 4);
        }
        extra.extend(name_bytes);
        layer_record.extend((extra.len() as u32).to_be_bytes());
        layer_record.extend(extra);

        for _ in 0..4 {
            layer_record.extend(0u16.to_be_bytes());
            layer_record.push(128);
        }

        let mut layer_info = Vec::new();
        layer_info.extend(1i16.to_be_bytes());
        layer_info.extend(layer_record);

        let mut layer_and_mask = Vec::new();
        layer_and_mask.extend((layer_info.len() as u32).to_be_bytes());
        layer_and_mask.extend(layer_info);
        layer_and_mask.extend(0u32.to_be_bytes()); // no global mask info

        bytes.extend((layer_and_mask.len() as u32).to_be_bytes());
        bytes.extend(layer_and_mask);

        bytes.extend(0u16.to_be_bytes()); // raw compression
        for _ in 0..4 {
            bytes.push(7);
        }

        bytes
    }

    #[test]
    fn parses_minimal_single_layer_document() {
        let bytes = single_layer_psd_bytes("a layer");
        let psd = Psd::from_bytes(&bytes).unwrap();

        assert_eq!(psd.width(), 1);
        assert_eq!(psd.height(), 1);
        assert_eq!(psd.version(), PsdVersion::One);
        assert_eq!(psd.layers().len(), 1);
        assert_eq!(psd.layer_by_name("a layer").unwrap().name(), "a layer");
    }

    #[test]
    fn document_mutators_mark_the_document_dirty() {
        let bytes = single_layer_psd_bytes("a layer");
        let mut doc = Document::open(&bytes).unwrap();
        assert!(!doc.is_updated());

        let node = doc.new_empty_layer("new layer");
        assert!(doc.is_updated());

        doc.append(MutationTarget::Root, node).unwrap();
        assert_eq!(doc.psd().root_children().len(), 2);

        assert!(doc.move_up(MutationTarget::Root, 1));
        assert_eq!(doc.psd().root_children()[0], node);
    }

    #[test]
    fn round_trips_through_to_bytes() {
        let bytes = single_layer_psd_bytes("round trip");
        let psd = Psd::from_bytes(&bytes).unwrap();
        let reencoded = psd.to_bytes().unwrap();

        let reparsed = Psd::from_bytes(&reencoded).unwrap();
        assert_eq!(reparsed.layers().len(), 1);
        assert_eq!(reparsed.layer_by_name("round trip").unwrap().name(), "round trip");
    }

    #[test]
    fn new_document_has_no_layers() {
        let doc = Document::new(4, 4, ColorMode::Rgb, PsdDepth::Eight).unwrap();
        assert_eq!(doc.psd().layers().len(), 0);
        assert_eq!(doc.psd().width(), 4);
        assert_eq!(doc.psd().image_data().channels().len(), 3);
    }
}
