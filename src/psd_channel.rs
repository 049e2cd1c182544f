use crate::error::PsdError;
use crate::sections::image_data_section::ChannelBytes;
use crate::sections::PsdCursor;
use thiserror::Error;

pub trait InsertChannelBytes {
    /// Given an index of a pixel in the current rectangle
    /// (top left is 0.. to the right of that is 1.. etc) return the index of that pixel in the
    /// RGBA image that will be generated.
    ///
    /// If the final image or layer is the size of the PSD then this will return the same idx,
    /// otherwise it will get transformed.
    fn rgba_idx(&self, idx: usize) -> usize;

    /// Given some vector of bytes, insert the bytes from the given channel into the vector.
    ///
    /// Doing it this way allows us to allocate for one vector and insert all 4 (RGBA) channels into
    /// it.
    fn insert_channel_bytes(
        &self,
        rgba: &mut Vec<u8>,
        channel_kind: &PsdChannelKind,
        channel_bytes: &ChannelBytes,
    ) {
        match channel_bytes {
            ChannelBytes::RawData(channel_bytes) => {
                let offset = channel_kind.rgba_offset().unwrap();

                for (idx, byte) in channel_bytes.iter().enumerate() {
                    let rgba_idx = self.rgba_idx(idx);
                    rgba[rgba_idx * 4 + offset] = *byte;
                }
            }
            // https://en.wikipedia.org/wiki/PackBits
            ChannelBytes::RleCompressed(channel_bytes) => {
                self.rle_decompress_channel(rgba, channel_kind, channel_bytes);
            }
            ChannelBytes::Zip(channel_bytes) | ChannelBytes::ZipWithPrediction(channel_bytes) => {
                let offset = channel_kind.rgba_offset().unwrap();

                for (idx, byte) in channel_bytes.iter().enumerate() {
                    let rgba_idx = self.rgba_idx(idx);
                    rgba[rgba_idx * 4 + offset] = *byte;
                }
            }
        }
    }

    /// rle decompress a channel (R,G,B or A) and insert it into a vector of RGBA pixels.
    ///
    /// We use the channels offset to know where to put it.. So red would go in 0, 4, 8..
    /// blue would go in 1, 5, 9.. etc
    ///
    /// https://en.wikipedia.org/wiki/PackBits - algorithm used for decompression
    fn rle_decompress_channel(
        &self,
        rgba: &mut Vec<u8>,
        channel_kind: &PsdChannelKind,
        channel_bytes: &[u8],
    ) {
        let mut cursor = PsdCursor::new(channel_bytes);

        let mut idx = 0;
        let offset = channel_kind.rgba_offset().unwrap();

        while cursor.position() != cursor.get_ref().len() as u64 {
            let header = cursor.read_i8() as i16;

            if header == -128 {
                continue;
            } else if header >= 0 {
                let bytes_to_read = 1 + header;
                for byte in cursor.read(bytes_to_read as u32) {
                    let rgba_idx = self.rgba_idx(idx);
                    rgba[rgba_idx * 4 + offset] = *byte;

                    idx += 1;
                }
            } else {
                let repeat = 1 - header;
                let byte = cursor.read_1()[0];
                for _ in 0..repeat as usize {
                    let rgba_idx = self.rgba_idx(idx);
                    rgba[rgba_idx * 4 + offset] = byte;

                    idx += 1;
                }
            };
        }
    }
}

/// How is this channel's data compressed (`spec.md` §3.4/§4.B, the id shared
/// by layer channels and the final merged image data).
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[allow(missing_docs)]
pub enum PsdChannelCompression {
    /// Not compressed
    RawData = 0,
    /// Compressed using [PackBits RLE compression](https://en.wikipedia.org/wiki/PackBits)
    RleCompressed = 1,
    /// Deflate/zlib, no prediction filtering.
    ZipWithoutPrediction = 2,
    /// Deflate/zlib with horizontal delta (prediction) filtering.
    ZipWithPrediction = 3,
}

impl PsdChannelCompression {
    /// Create a new PsdLayerChannelCompression
    pub fn new(compression: u16) -> Result<PsdChannelCompression, PsdChannelError> {
        match compression {
            0 => Ok(PsdChannelCompression::RawData),
            1 => Ok(PsdChannelCompression::RleCompressed),
            2 => Ok(PsdChannelCompression::ZipWithoutPrediction),
            3 => Ok(PsdChannelCompression::ZipWithPrediction),
            _ => Err(PsdChannelError::InvalidCompression { compression }),
        }
    }

    pub fn as_u16(&self) -> u16 {
        *self as u16
    }
}

/// The different kinds of channels a layer or the final image can carry
/// (`spec.md` §3.4: `id in 0..channel_count` for color planes, plus the
/// three negative specials).
#[derive(Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone)]
pub enum PsdChannelKind {
    /// A color plane, numbered `0..channel_count` (0=red, 1=green, 2=blue
    /// for RGB; the meaning of higher indices depends on the color mode).
    Color(u8),
    TransparencyMask,
    UserSuppliedLayerMask,
    RealUserSuppliedLayerMask,
}

/// Represents an invalid channel
#[derive(Debug, Error)]
pub enum PsdChannelError {
    #[error("{channel_id} is an invalid channel id, must be 0..=55, -1, -2, or -3.")]
    InvalidChannel { channel_id: i16 },
    #[error("{compression} is an invalid layer channel compression. Must be 0, 1, 2 or 3")]
    InvalidCompression { compression: u16 },
    #[error("channel {channel:?} not present")]
    ChannelNotFound { channel: PsdChannelKind },
    #[error("{channel:?} is not an RGBA channel")]
    NotAnRgbaChannel { channel: PsdChannelKind },
}

impl From<PsdChannelError> for PsdError {
    fn from(e: PsdChannelError) -> Self {
        match e {
            PsdChannelError::InvalidChannel { channel_id } => PsdError::InvalidField {
                field: "channel_id",
                value: channel_id.to_string(),
            },
            PsdChannelError::InvalidCompression { compression } => PsdError::InvalidField {
                field: "channel_compression",
                value: compression.to_string(),
            },
            PsdChannelError::ChannelNotFound { channel } => PsdError::InvariantViolation {
                message: format!("channel {:?} not present", channel),
            },
            PsdChannelError::NotAnRgbaChannel { channel } => PsdError::InvariantViolation {
                message: format!("{:?} is not an RGBA channel", channel),
            },
        }
    }
}

impl PsdChannelKind {
    /// Create a new PsdLayerChannel
    pub fn new(channel_id: i16) -> Result<PsdChannelKind, PsdChannelError> {
        match channel_id {
            0..=55 => Ok(PsdChannelKind::Color(channel_id as u8)),
            -1 => Ok(PsdChannelKind::TransparencyMask),
            -2 => Ok(PsdChannelKind::UserSuppliedLayerMask),
            -3 => Ok(PsdChannelKind::RealUserSuppliedLayerMask),
            _ => Err(PsdChannelError::InvalidChannel { channel_id }),
        }
    }

    /// The on-disk channel id this kind round-trips to.
    pub fn as_i16(&self) -> i16 {
        match self {
            PsdChannelKind::Color(n) => *n as i16,
            PsdChannelKind::TransparencyMask => -1,
            PsdChannelKind::UserSuppliedLayerMask => -2,
            PsdChannelKind::RealUserSuppliedLayerMask => -3,
        }
    }

    /// R -> 0
    /// G -> 1
    /// B -> 2
    /// A -> 3
    ///
    /// Anything past the first three color planes (CMYK's fourth plane,
    /// spot channels, ...) has no slot in an RGBA composite and is out of
    /// scope for `rgba()` (`spec.md` §1 Non-goals: no color management /
    /// non-RGB-to-RGB conversion).
    pub fn rgba_offset(&self) -> Result<usize, PsdChannelError> {
        match self {
            PsdChannelKind::Color(0) => Ok(0),
            PsdChannelKind::Color(1) => Ok(1),
            PsdChannelKind::Color(2) => Ok(2),
            PsdChannelKind::TransparencyMask => Ok(3),
            _ => Err(PsdChannelError::NotAnRgbaChannel { channel: *self }),
        }
    }
}
