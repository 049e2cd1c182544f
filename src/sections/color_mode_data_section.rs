use std::io::Write;
use thiserror::Error;

use super::{PsdBuffer, PsdSerialize};

/// Color mode data is only meaningful for indexed and duotone images (a
/// palette, or duotone curve data); every other color mode leaves this
/// section empty. Decoding those palette/curve formats is out of scope
/// (`spec.md` §1 Non-goals), so this section is kept as the raw bytes it
/// holds.
#[derive(Debug, PartialEq, Error)]
pub enum ColorModeDataSectionError {}

#[derive(Debug, PartialEq, Clone)]
pub struct ColorModeDataSection {
    data: Vec<u8>,
}

impl ColorModeDataSection {
    /// An empty color mode data section, for building a document from
    /// scratch (meaningful only for indexed/duotone documents; every other
    /// color mode leaves it empty regardless).
    pub fn empty() -> Self {
        ColorModeDataSection { data: Vec::new() }
    }

    /// `bytes` is the section's payload with its own 4-byte length marker
    /// already stripped (`MajorSections::from_bytes` does this for every
    /// top-level section).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ColorModeDataSectionError> {
        Ok(Self {
            data: bytes.to_vec(),
        })
    }

    /// The raw, opaque color mode data payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl PsdSerialize for ColorModeDataSection {
    fn write<T>(&self, buffer: &mut PsdBuffer<T>)
    where
        T: Write,
    {
        let data = self.data.clone();
        buffer.write_sized(move |buf| buf.write(&data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_round_trip() {
        let initial = make_section();

        // `write` emits its own length marker (matching the on-disk
        // section layout), so strip it back off the way `MajorSections`
        // does before handing the payload to `from_bytes`.
        let mut bytes: Vec<u8> = vec![];
        let mut buffer = PsdBuffer::new(&mut bytes);
        initial.write(&mut buffer);

        let result = ColorModeDataSection::from_bytes(&bytes[4..]).unwrap();
        assert_eq!(initial, result);
    }

    fn make_section() -> ColorModeDataSection {
        ColorModeDataSection {
            data: vec![1, 2, 3, 4],
        }
    }
}
