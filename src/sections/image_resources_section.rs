//! The image resources section: a flat list of tagged, length-prefixed
//! blocks holding everything from ruler guides to slice boundaries
//! (`spec.md` §3.3/§4.D).
//!
//! Every block's signature, id, name and raw payload are kept regardless
//! of whether this crate recognizes the id, so a block this crate has
//! never heard of still round-trips byte for byte.

pub mod image_resource;

use crate::error::{PsdError, SignatureSite};
pub use crate::sections::image_resources_section::image_resource::ImageResource;
use crate::sections::PsdCursor;

/// Signatures Photoshop has used to tag an image resource block. `8BIM` is
/// by far the common case; the others appear in resources written by
/// specific plugins/hosts (`spec.md` §4.D).
const KNOWN_SIGNATURES: [[u8; 4]; 5] = [
    *b"8BIM",
    *b"MeSa",
    *b"AgHg",
    *b"PHUT",
    *b"DCSR",
];

/// One block within the image resources section, with its signature, id
/// and name preserved alongside the raw payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageResourceBlock {
    signature: [u8; 4],
    resource_id: i16,
    name: String,
    data: Vec<u8>,
}

impl ImageResourceBlock {
    pub fn signature(&self) -> &[u8; 4] {
        &self.signature
    }

    pub fn resource_id(&self) -> i16 {
        self.resource_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// This block's raw, still-encoded payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// A best-effort typed view of this block's payload, for the ids this
    /// crate recognizes. `None` for unrecognized ids, or if a recognized
    /// id's payload doesn't match the shape this crate expects.
    pub fn parsed(&self) -> Option<ImageResource> {
        ImageResource::parse(self.resource_id, &self.data)
    }

    fn read(cursor: &mut PsdCursor) -> Result<Self, PsdError> {
        let offset = cursor.position();
        let signature = cursor.read_4();
        if !KNOWN_SIGNATURES.contains(&signature) {
            return Err(PsdError::signature(
                SignatureSite::ImageResourceBlock,
                b"8BIM",
                &signature,
                offset as usize,
            ));
        }

        let resource_id = cursor.read_i16();
        let name = cursor.read_pascal_string(2);

        let data_len = cursor.read_u32();
        let padded_len = data_len + data_len % 2;
        let data = cursor.read_checked(padded_len)?[..data_len as usize].to_vec();

        Ok(ImageResourceBlock {
            signature,
            resource_id,
            name,
            data,
        })
    }

    fn write<T: std::io::Write>(&self, buffer: &mut crate::sections::PsdBuffer<T>) {
        buffer.write(self.signature);
        buffer.write(self.resource_id.to_be_bytes());
        buffer.write_pascal_string(&self.name, 2);

        buffer.write((self.data.len() as u32).to_be_bytes());
        buffer.write(&self.data);
        if self.data.len() % 2 != 0 {
            buffer.write_padding(1);
        }
    }
}

/// The full image resources section: an ordered list of blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageResourcesSection {
    blocks: Vec<ImageResourceBlock>,
}

impl ImageResourcesSection {
    /// An image resources section with no blocks, for building a document
    /// from scratch.
    pub fn empty() -> Self {
        ImageResourcesSection { blocks: Vec::new() }
    }

    /// Parse the section body (the bytes following the section's own u32
    /// length prefix, already split off by [`crate::sections::MajorSections`]).
    pub fn from_bytes(bytes: &[u8]) -> Result<ImageResourcesSection, PsdError> {
        let mut cursor = PsdCursor::new(bytes);
        let mut blocks = Vec::new();

        while cursor.remaining() > 0 {
            blocks.push(ImageResourceBlock::read(&mut cursor)?);
        }

        Ok(ImageResourcesSection { blocks })
    }

    pub fn blocks(&self) -> &[ImageResourceBlock] {
        &self.blocks
    }

    /// The first block carrying a given resource id, if any.
    pub fn get(&self, resource_id: i16) -> Option<&ImageResourceBlock> {
        self.blocks.iter().find(|b| b.resource_id == resource_id)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = crate::sections::PsdBuffer::new(Vec::new());
        for block in &self.blocks {
            block.write(&mut buffer);
        }
        buffer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolution_info_block() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(*b"8BIM");
        bytes.extend(1005_i16.to_be_bytes());
        bytes.push(0); // empty pascal name
        bytes.push(0); // pad to even (1 len byte + 0 name bytes = 1, pad 1)

        let mut payload = Vec::new();
        payload.extend((72 * 65536i32).to_be_bytes());
        payload.extend(1u16.to_be_bytes());
        payload.extend(1u16.to_be_bytes());
        payload.extend((72 * 65536i32).to_be_bytes());
        payload.extend(1u16.to_be_bytes());
        payload.extend(1u16.to_be_bytes());

        bytes.extend((payload.len() as u32).to_be_bytes());
        bytes.extend(&payload);

        bytes
    }

    #[test]
    fn round_trips_a_known_block() {
        let bytes = resolution_info_block();
        let section = ImageResourcesSection::from_bytes(&bytes).unwrap();

        assert_eq!(section.blocks().len(), 1);
        let block = &section.blocks()[0];
        assert_eq!(block.resource_id(), 1005);
        assert!(matches!(
            block.parsed(),
            Some(ImageResource::ResolutionInfo(_))
        ));

        assert_eq!(section.to_bytes(), bytes);
    }

    #[test]
    fn unknown_ids_keep_their_raw_bytes() {
        let mut bytes = Vec::new();
        bytes.extend(*b"8BIM");
        bytes.extend(9999_i16.to_be_bytes());
        bytes.push(0);
        bytes.push(0);
        bytes.extend(4u32.to_be_bytes());
        bytes.extend([1, 2, 3, 4]);

        let section = ImageResourcesSection::from_bytes(&bytes).unwrap();
        let block = section.get(9999).unwrap();
        assert_eq!(block.data(), &[1, 2, 3, 4]);
        assert!(block.parsed().is_none());

        assert_eq!(section.to_bytes(), bytes);
    }

    #[test]
    fn rejects_an_unrecognized_signature() {
        let mut bytes = Vec::new();
        bytes.extend(*b"XXXX");
        bytes.extend(1005_i16.to_be_bytes());
        bytes.push(0);
        bytes.push(0);
        bytes.extend(0u32.to_be_bytes());

        let err = ImageResourcesSection::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, PsdError::SignatureMismatch { .. }));
    }
}
