//! Layer blending ranges (`spec.md` §3.4): the "Blend If" sliders, stored
//! as a composite-gray range followed by one range per channel.

use std::io::Write;

use crate::sections::{PsdBuffer, PsdCursor, PsdSerialize};

/// A single black/white split point pair, as shown by one half of a
/// "Blend If" slider: two black-point bytes and two white-point bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlendRange {
    pub black_low: u8,
    pub black_high: u8,
    pub white_low: u8,
    pub white_high: u8,
}

impl BlendRange {
    fn read(cursor: &mut PsdCursor) -> BlendRange {
        BlendRange {
            black_low: cursor.read_u8(),
            black_high: cursor.read_u8(),
            white_low: cursor.read_u8(),
            white_high: cursor.read_u8(),
        }
    }

    fn write<T: Write>(&self, buffer: &mut PsdBuffer<T>) {
        buffer.write([
            self.black_low,
            self.black_high,
            self.white_low,
            self.white_high,
        ]);
    }
}

/// The "this layer" and "underlying layer" halves of one channel's Blend
/// If slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlendRangePair {
    pub source: BlendRange,
    pub destination: BlendRange,
}

impl BlendRangePair {
    fn read(cursor: &mut PsdCursor) -> BlendRangePair {
        BlendRangePair {
            source: BlendRange::read(cursor),
            destination: BlendRange::read(cursor),
        }
    }

    fn write<T: Write>(&self, buffer: &mut PsdBuffer<T>) {
        self.source.write(buffer);
        self.destination.write(buffer);
    }
}

/// The full blending ranges record attached to a layer: one composite-gray
/// pair followed by one pair per channel, in channel order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlendingRanges {
    pub composite_gray: BlendRangePair,
    pub channels: Vec<BlendRangePair>,
}

impl BlendingRanges {
    /// Parse the body of a layer's blending ranges block (the bytes
    /// following its own 4-byte length field).
    pub fn read(cursor: &mut PsdCursor) -> BlendingRanges {
        if cursor.remaining() < 8 {
            return BlendingRanges::default();
        }

        let composite_gray = BlendRangePair::read(cursor);
        let mut channels = Vec::new();
        while cursor.remaining() >= 8 {
            channels.push(BlendRangePair::read(cursor));
        }

        BlendingRanges {
            composite_gray,
            channels,
        }
    }
}

impl PsdSerialize for BlendingRanges {
    fn write<T: Write>(&self, buffer: &mut PsdBuffer<T>) {
        self.composite_gray.write(buffer);
        for channel in &self.channels {
            channel.write(buffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_composite_and_two_channels() {
        let ranges = BlendingRanges {
            composite_gray: BlendRangePair {
                source: BlendRange {
                    black_low: 0,
                    black_high: 255,
                    white_low: 0,
                    white_high: 255,
                },
                destination: BlendRange::default(),
            },
            channels: vec![BlendRangePair::default(), BlendRangePair::default()],
        };

        let mut bytes = Vec::new();
        let mut buffer = PsdBuffer::new(&mut bytes);
        ranges.write(&mut buffer);

        let mut cursor = PsdCursor::new(&bytes);
        let parsed = BlendingRanges::read(&mut cursor);
        assert_eq!(parsed, ranges);
    }

    #[test]
    fn empty_input_yields_default() {
        let mut cursor = PsdCursor::new(&[]);
        assert_eq!(BlendingRanges::read(&mut cursor), BlendingRanges::default());
    }
}
