//! The PSD/PSB version distinction.
//!
//! A handful of length and count fields widen from 32 to 64 bits, or from
//! 16-bit to 32-bit row counts, depending on whether the file is a plain
//! PSD (`version == 1`) or a large document PSB (`version == 2`). Every
//! length-aware reader/writer in the crate takes a [`PsdVersion`] so this
//! widening only has to be decided in one place.

/// Which on-disk layout variant a document uses.
///
/// See `spec.md` §3.1 and §4.K for the fields this affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PsdVersion {
    /// Regular `.psd`: 32-bit lengths, max 30,000px per side, max 56 channels.
    One,
    /// Large document format `.psb`: the layer-and-mask section's length
    /// and a handful of nested lengths widen to 64 bits; max 300,000px per
    /// side.
    Two,
}

impl PsdVersion {
    /// Build a [`PsdVersion`] from the file header's raw version field.
    pub fn from_u16(version: u16) -> Option<Self> {
        match version {
            1 => Some(PsdVersion::One),
            2 => Some(PsdVersion::Two),
            _ => None,
        }
    }

    /// The raw on-disk version number.
    pub fn as_u16(self) -> u16 {
        match self {
            PsdVersion::One => 1,
            PsdVersion::Two => 2,
        }
    }

    /// Whether this version uses 64-bit lengths for the "big" fields
    /// (layer-and-mask section length, per-channel data length for the big
    /// keys listed in §4.H/§4.K).
    pub fn uses_big_lengths(self) -> bool {
        matches!(self, PsdVersion::Two)
    }

    /// Max canvas dimension, in pixels, for this version (§3.1).
    pub fn max_dimension(self) -> u32 {
        match self {
            PsdVersion::One => 30_000,
            PsdVersion::Two => 300_000,
        }
    }
}

/// The closed set of tagged-block keys whose length field is 64-bit in a
/// PSB document (§4.H, §4.K). Every other key keeps a 32-bit length even
/// in a PSB file.
pub const BIG_LENGTH_TAGGED_BLOCK_KEYS: &[&[u8; 4]] = &[
    b"LMsk", b"Lr16", b"Lr32", b"Layr", b"Mt16", b"Mt32", b"Mtrn", b"Alph", b"FMsk", b"lnk2",
    b"FEid", b"FXid", b"PxSD",
];

/// Whether a given 4-byte tagged-block key uses a 64-bit length in PSB
/// documents. Irrelevant (always `false`) for plain PSD documents.
pub fn tagged_block_uses_big_length(key: &[u8; 4]) -> bool {
    BIG_LENGTH_TAGGED_BLOCK_KEYS.contains(&key)
}
