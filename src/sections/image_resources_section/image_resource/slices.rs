//! Resource id 1050: the slice tool's slice boundaries, in any of the three
//! on-disk layouts Photoshop has used (`spec.md` §4.D/§6.3 "Slices
//! V6/V7/V8").

use super::descriptor_structure::Descriptor;
use crate::error::DescriptorError;
use crate::sections::{PsdBuffer, PsdCursor, PsdSerialize};

/// A slices resource, in whichever format version produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum SlicesImageResource {
    V6(SlicesImageResourceV6),
    /// Versions 7 and 8 share a layout: a single descriptor carries the
    /// whole slice list.
    V7Or8 { version: i32, descriptor: Descriptor },
}

impl SlicesImageResource {
    pub(crate) fn parse(bytes: &[u8]) -> Option<Self> {
        Self::from_bytes(bytes).ok()
    }

    pub fn name(&self) -> &str {
        match self {
            Self::V6(format) => &format.name,
            Self::V7Or8 { descriptor, .. } => &descriptor.name,
        }
    }

    /// Slices Resource Format: Photoshop 6.0 stores a bounding rectangle
    /// and a flat list of slice blocks; 7.0 replaced the per-slice layout
    /// with a single descriptor; CS and later bumped the version number
    /// but kept the same descriptor-based layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DescriptorError> {
        let cursor = PsdCursor::new(bytes);
        let version = cursor.peek_i32();

        match version {
            6 => Ok(Self::V6(SlicesImageResourceV6::from_bytes(bytes)?)),
            7 | 8 => {
                let mut cursor = PsdCursor::new(bytes);
                let version = cursor.read_i32();
                let descriptor = Descriptor::read_versioned(&mut cursor)?;
                Ok(Self::V7Or8 { version, descriptor })
            }
            _ => Err(DescriptorError::InvalidOsType),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = PsdBuffer::new(Vec::new());
        self.write(&mut buffer);
        buffer.into_inner()
    }
}

impl PsdSerialize for SlicesImageResource {
    fn write<T: std::io::Write>(&self, buffer: &mut PsdBuffer<T>) {
        match self {
            Self::V6(format) => format.write(buffer),
            Self::V7Or8 { version, descriptor } => {
                buffer.write(version.to_be_bytes());
                descriptor.write_versioned(buffer);
            }
        }
    }
}

/// Slice header for version 6: a bounding rectangle and name for the whole
/// group, followed by one block per slice.
#[derive(Debug, Clone, PartialEq)]
pub struct SlicesImageResourceV6 {
    pub name: String,
    pub bounds: (i32, i32, i32, i32),
    pub blocks: Vec<SlicesResourceBlock>,
}

impl SlicesImageResourceV6 {
    /// +----------+--------------------------------------------------------+
    /// | 4        | Version ( = 6)                                        |
    /// | 4 * 4    | Bounding rectangle: top, left, bottom, right           |
    /// | Variable | Name of group of slices: Unicode string               |
    /// | 4        | Number of slices to follow                            |
    /// +----------+--------------------------------------------------------+
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DescriptorError> {
        let mut cursor = PsdCursor::new(bytes);

        let _version = cursor.read_i32();
        let top = cursor.read_i32();
        let left = cursor.read_i32();
        let bottom = cursor.read_i32();
        let right = cursor.read_i32();

        let name = cursor.read_unicode_string_padding(1);
        let number_of_slices = cursor.read_u32();

        let mut blocks = Vec::with_capacity(number_of_slices as usize);
        for _ in 0..number_of_slices {
            blocks.push(SlicesResourceBlock::read(&mut cursor)?);
        }

        Ok(Self {
            name,
            bounds: (top, left, bottom, right),
            blocks,
        })
    }

    fn write<T: std::io::Write>(&self, buffer: &mut PsdBuffer<T>) {
        buffer.write(6_i32.to_be_bytes());

        let (top, left, bottom, right) = self.bounds;
        buffer.write(top.to_be_bytes());
        buffer.write(left.to_be_bytes());
        buffer.write(bottom.to_be_bytes());
        buffer.write(right.to_be_bytes());

        buffer.write_unicode_string(&self.name);
        buffer.write((self.blocks.len() as u32).to_be_bytes());

        for block in &self.blocks {
            block.write(buffer);
        }
    }
}

/// One slice in a version 6 slices resource. Most fields are kept opaque
/// (`spec.md` §1 Non-goals: no slice-tool semantics), only the trailing
/// descriptor is parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct SlicesResourceBlock {
    pub id: i32,
    pub group_id: i32,
    pub origin: i32,
    pub associated_layer_id: Option<i32>,
    pub name: String,
    pub kind: i32,
    pub bounds: (i32, i32, i32, i32),
    pub url: String,
    pub target: String,
    pub message: String,
    pub alt_tag: String,
    pub cell_text_is_html: bool,
    pub cell_text: String,
    pub horizontal_alignment: i32,
    pub vertical_alignment: i32,
    pub argb_color: i32,
    pub descriptor: Option<Descriptor>,
}

impl SlicesResourceBlock {
    fn read(cursor: &mut PsdCursor) -> Result<Self, DescriptorError> {
        let id = cursor.read_i32();
        let group_id = cursor.read_i32();
        let origin = cursor.read_i32();

        let associated_layer_id = if origin == 1 {
            Some(cursor.read_i32())
        } else {
            None
        };

        let name = cursor.read_unicode_string_padding(1);
        let kind = cursor.read_i32();

        let top = cursor.read_i32();
        let left = cursor.read_i32();
        let bottom = cursor.read_i32();
        let right = cursor.read_i32();

        let url = cursor.read_unicode_string_padding(1);
        let target = cursor.read_unicode_string_padding(1);
        let message = cursor.read_unicode_string_padding(1);
        let alt_tag = cursor.read_unicode_string_padding(1);

        let cell_text_is_html = cursor.read_u8() != 0;
        let cell_text = cursor.read_unicode_string_padding(1);

        let horizontal_alignment = cursor.read_i32();
        let vertical_alignment = cursor.read_i32();
        let argb_color = cursor.read_i32();

        let descriptor = if cursor.remaining() >= 4 && cursor.peek_i32() as u32 == 16 {
            cursor.read_4();
            Some(Descriptor::read(cursor)?)
        } else {
            None
        };

        Ok(Self {
            id,
            group_id,
            origin,
            associated_layer_id,
            name,
            kind,
            bounds: (top, left, bottom, right),
            url,
            target,
            message,
            alt_tag,
            cell_text_is_html,
            cell_text,
            horizontal_alignment,
            vertical_alignment,
            argb_color,
            descriptor,
        })
    }

    fn write<T: std::io::Write>(&self, buffer: &mut PsdBuffer<T>) {
        buffer.write(self.id.to_be_bytes());
        buffer.write(self.group_id.to_be_bytes());
        buffer.write(self.origin.to_be_bytes());
        if let Some(associated_layer_id) = self.associated_layer_id {
            buffer.write(associated_layer_id.to_be_bytes());
        }

        buffer.write_unicode_string(&self.name);
        buffer.write(self.kind.to_be_bytes());

        let (top, left, bottom, right) = self.bounds;
        buffer.write(top.to_be_bytes());
        buffer.write(left.to_be_bytes());
        buffer.write(bottom.to_be_bytes());
        buffer.write(right.to_be_bytes());

        buffer.write_unicode_string(&self.url);
        buffer.write_unicode_string(&self.target);
        buffer.write_unicode_string(&self.message);
        buffer.write_unicode_string(&self.alt_tag);

        buffer.write([self.cell_text_is_html as u8]);
        buffer.write_unicode_string(&self.cell_text);

        buffer.write(self.horizontal_alignment.to_be_bytes());
        buffer.write(self.vertical_alignment.to_be_bytes());
        buffer.write(self.argb_color.to_be_bytes());

        if let Some(descriptor) = &self.descriptor {
            buffer.write(16_u32.to_be_bytes());
            descriptor.write(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::image_resources_section::image_resource::descriptor_structure::DescriptorKey;

    #[test]
    fn round_trips_a_v7_slices_resource() {
        let descriptor = Descriptor::new(DescriptorKey::terminology(b"slcs"));
        let resource = SlicesImageResource::V7Or8 {
            version: 7,
            descriptor,
        };

        let bytes = resource.to_bytes();
        let parsed = SlicesImageResource::from_bytes(&bytes).unwrap();

        assert_eq!(parsed, resource);
    }

    #[test]
    fn round_trips_a_v6_slices_resource_with_no_slices() {
        let resource = SlicesImageResource::V6(SlicesImageResourceV6 {
            name: "group".to_string(),
            bounds: (0, 0, 100, 100),
            blocks: Vec::new(),
        });

        let bytes = resource.to_bytes();
        let parsed = SlicesImageResource::from_bytes(&bytes).unwrap();

        assert_eq!(parsed, resource);
    }
}
