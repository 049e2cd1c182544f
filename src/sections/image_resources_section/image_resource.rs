//! Typed views over a handful of well-known image resource ids
//! (`spec.md` §4.D). The resource registry keeps the raw bytes of every
//! block regardless of whether it recognizes the id — these typed values
//! are read lazily from those bytes as a convenience, they're never the
//! thing that gets written back out.

pub mod descriptor_structure;
pub mod engine_data;
pub mod slices;

use crate::sections::image_resources_section::image_resource::slices::SlicesImageResource;
use crate::sections::PsdCursor;

/// A resolution/unit pair as used by [`ResolutionInfo`] (`spec.md` §4.D).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionUnit {
    /// Pixels per inch or pixels per centimeter, as a 16.16 fixed point value.
    pub resolution: f64,
    pub resolution_unit: u16,
    pub display_unit: u16,
}

/// Resource id 1005: the document's pixel density (`spec.md` §4.D).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionInfo {
    pub horizontal: ResolutionUnit,
    pub vertical: ResolutionUnit,
}

impl ResolutionInfo {
    pub(crate) fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 16 {
            return None;
        }
        let mut cursor = PsdCursor::new(bytes);
        let h_res = cursor.read_i32() as f64 / 65536.0;
        let h_res_unit = cursor.read_u16();
        let width_unit = cursor.read_u16();
        let v_res = cursor.read_i32() as f64 / 65536.0;
        let v_res_unit = cursor.read_u16();
        let height_unit = cursor.read_u16();

        Some(ResolutionInfo {
            horizontal: ResolutionUnit {
                resolution: h_res,
                resolution_unit: h_res_unit,
                display_unit: width_unit,
            },
            vertical: ResolutionUnit {
                resolution: v_res,
                resolution_unit: v_res_unit,
                display_unit: height_unit,
            },
        })
    }
}

/// Resource id 1006: Pascal-string names of the document's alpha channels,
/// in channel order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaChannelNames(pub Vec<String>);

impl AlphaChannelNames {
    pub(crate) fn parse(bytes: &[u8]) -> Self {
        let mut cursor = PsdCursor::new(bytes);
        let mut names = Vec::new();
        while cursor.remaining() > 0 {
            names.push(cursor.read_pascal_string(1));
        }
        AlphaChannelNames(names)
    }
}

/// Resource id 1010: the canvas background color, as a colorspace id plus
/// four 16-bit component values (unused components are zero).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundColor {
    pub color_space: u16,
    pub components: [u16; 4],
}

impl BackgroundColor {
    pub(crate) fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 10 {
            return None;
        }
        let mut cursor = PsdCursor::new(bytes);
        let color_space = cursor.read_u16();
        let components = [
            cursor.read_u16(),
            cursor.read_u16(),
            cursor.read_u16(),
            cursor.read_u16(),
        ];
        Some(BackgroundColor {
            color_space,
            components,
        })
    }
}

/// Resource id 1024: which layer group (by id, 0 = none) each layer, in
/// document layer order, belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGroupInfo(pub Vec<u16>);

impl LayerGroupInfo {
    pub(crate) fn parse(bytes: &[u8]) -> Self {
        let mut cursor = PsdCursor::new(bytes);
        let mut ids = Vec::with_capacity(bytes.len() / 2);
        while cursor.remaining() >= 2 {
            ids.push(cursor.read_u16());
        }
        LayerGroupInfo(ids)
    }
}

/// One ruler guide: its document-space position and orientation
/// (`spec.md` §4.D, resource id 1032).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Guide {
    /// Position multiplied by 100.
    pub position: u32,
    /// `0` = vertical, `1` = horizontal.
    pub orientation: u8,
}

/// Resource id 1032: grid spacing and ruler guides.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAndGuides {
    pub grid_cycle_horizontal: u32,
    pub grid_cycle_vertical: u32,
    pub guides: Vec<Guide>,
}

impl GridAndGuides {
    pub(crate) fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 16 {
            return None;
        }
        let mut cursor = PsdCursor::new(bytes);
        let _version = cursor.read_u32();
        let grid_cycle_horizontal = cursor.read_u32();
        let grid_cycle_vertical = cursor.read_u32();
        let guide_count = cursor.read_u32();

        let mut guides = Vec::with_capacity(guide_count as usize);
        for _ in 0..guide_count {
            if cursor.remaining() < 5 {
                break;
            }
            guides.push(Guide {
                position: cursor.read_u32(),
                orientation: cursor.read_u8(),
            });
        }

        Some(GridAndGuides {
            grid_cycle_horizontal,
            grid_cycle_vertical,
            guides,
        })
    }
}

/// Resource id 1057: which application version wrote/last touched the
/// document.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionInfo {
    pub version: u32,
    pub has_real_merged_data: bool,
    pub writer_name: String,
    pub reader_name: String,
    pub file_version: u32,
}

impl VersionInfo {
    pub(crate) fn parse(bytes: &[u8]) -> Option<Self> {
        let mut cursor = PsdCursor::new(bytes);
        if cursor.remaining() < 9 {
            return None;
        }
        let version = cursor.read_u32();
        let has_real_merged_data = cursor.read_u8() != 0;
        let writer_name = cursor.read_unicode_string();
        let reader_name = cursor.read_unicode_string();
        let file_version = cursor.read_u32();

        Some(VersionInfo {
            version,
            has_real_merged_data,
            writer_name,
            reader_name,
            file_version,
        })
    }
}

/// A typed, best-effort parse of a well-known image resource. Every
/// resource keeps its raw bytes regardless of whether it's recognized here
/// — see [`super::ImageResourceBlock`].
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum ImageResource {
    ResolutionInfo(ResolutionInfo),
    AlphaChannelNames(AlphaChannelNames),
    BackgroundColor(BackgroundColor),
    LayerGroupInfo(LayerGroupInfo),
    GridAndGuides(GridAndGuides),
    VersionInfo(VersionInfo),
    Slices(SlicesImageResource),
}

impl ImageResource {
    /// Try to parse a typed resource from a raw block's payload. Returns
    /// `None` for unrecognized ids or malformed payloads of a recognized
    /// id — either way the caller still has the raw bytes.
    pub(crate) fn parse(resource_id: i16, bytes: &[u8]) -> Option<Self> {
        match resource_id {
            1005 => ResolutionInfo::parse(bytes).map(ImageResource::ResolutionInfo),
            1006 => Some(ImageResource::AlphaChannelNames(AlphaChannelNames::parse(
                bytes,
            ))),
            1010 => BackgroundColor::parse(bytes).map(ImageResource::BackgroundColor),
            1024 => Some(ImageResource::LayerGroupInfo(LayerGroupInfo::parse(bytes))),
            1032 => GridAndGuides::parse(bytes).map(ImageResource::GridAndGuides),
            1050 => SlicesImageResource::parse(bytes).map(ImageResource::Slices),
            1057 => VersionInfo::parse(bytes).map(ImageResource::VersionInfo),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resolution_info() {
        let mut bytes = Vec::new();
        bytes.extend((72 * 65536i32).to_be_bytes());
        bytes.extend(1u16.to_be_bytes());
        bytes.extend(1u16.to_be_bytes());
        bytes.extend((72 * 65536i32).to_be_bytes());
        bytes.extend(1u16.to_be_bytes());
        bytes.extend(1u16.to_be_bytes());

        let info = ResolutionInfo::parse(&bytes).unwrap();
        assert_eq!(info.horizontal.resolution, 72.0);
        assert_eq!(info.vertical.resolution, 72.0);
    }

    #[test]
    fn parses_alpha_channel_names() {
        let mut bytes = Vec::new();
        bytes.push(4);
        bytes.extend(b"Mask");
        bytes.push(3);
        bytes.extend(b"Fur");

        let names = AlphaChannelNames::parse(&bytes);
        assert_eq!(names.0, vec!["Mask".to_string(), "Fur".to_string()]);
    }
}
