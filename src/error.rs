//! Unified error taxonomy for the crate.
//!
//! Every fallible operation in this crate ultimately returns (or converts
//! into) a [`PsdError`]. Component-local error enums exist where a single
//! section needs several distinct failure shapes; they all carry a
//! `#[from]` conversion into `PsdError` so callers can match on the
//! top-level kind without digging through every section's error type.

use thiserror::Error;

/// The kind of on-disk location a [`PsdError::SignatureMismatch`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SignatureSite {
    FileHeader,
    ImageResourceBlock,
    LayerBlendModeSignature,
    TaggedBlock,
}

/// The unified, top level error type for the crate.
///
/// Mirrors the taxonomy of recoverable vs. fatal error kinds: `EnumUnknown`
/// and `InvalidField` are logged and recovered from in place wherever
/// possible (the raw value is kept); every other variant aborts the parse
/// of the document and is propagated to the caller.
#[derive(Debug, Error)]
pub enum PsdError {
    /// A magic number or per-block sentinel byte sequence did not match.
    #[error("signature mismatch at {site:?}, offset {offset}: expected {expected:?}, found {found:?}")]
    SignatureMismatch {
        /// Where in the container this signature was expected.
        site: SignatureSite,
        /// The expected byte sequence.
        expected: Vec<u8>,
        /// The byte sequence actually found.
        found: Vec<u8>,
        /// Byte offset within the section being parsed.
        offset: usize,
    },

    /// The header's version field was not 1 or 2.
    #[error("unsupported PSD/PSB version: {found} (expected 1 or 2)")]
    UnsupportedVersion {
        /// The version byte actually read.
        found: u16,
    },

    /// A numeric or 4-byte token did not match any known enum member.
    ///
    /// Recoverable: the caller should log a warning and keep the raw value.
    #[error("unrecognized {kind} value: {raw}")]
    EnumUnknown {
        /// Which enum this value was supposed to belong to (e.g. "blend mode").
        kind: &'static str,
        /// The raw value, formatted for display.
        raw: String,
    },

    /// A sub-parser attempted to read past the end of its declared length
    /// window.
    #[error("read past the end of a length-delimited block at byte {at}")]
    LengthOverrun {
        /// Offset (relative to the start of the block) where the overrun was detected.
        at: usize,
    },

    /// End of input was reached before a mandatory field could be read.
    #[error("truncated input: expected at least {needed} more byte(s), found {available}")]
    TruncatedInput {
        /// How many bytes the read required.
        needed: usize,
        /// How many bytes were actually available.
        available: usize,
    },

    /// A field's value was outside its legal range.
    ///
    /// Recoverable by skipping the field and keeping a best-effort default.
    #[error("invalid value for field `{field}`: {value}")]
    InvalidField {
        /// The name of the offending field.
        field: &'static str,
        /// The value, formatted for display.
        value: String,
    },

    /// A channel codec (RLE/zlib) encountered malformed input.
    #[error("codec error ({kind}): {message}")]
    CodecError {
        /// Which codec failed (e.g. "rle", "zip").
        kind: &'static str,
        /// A human readable description.
        message: String,
    },

    /// A post-parse structural invariant did not hold.
    ///
    /// Reported but does not abort the load; the caller receives a partial
    /// document alongside the collected invariant violations.
    #[error("invariant violated: {message}")]
    InvariantViolation {
        /// A human readable description of the violated invariant.
        message: String,
    },
}

impl PsdError {
    pub(crate) fn truncated(needed: usize, available: usize) -> Self {
        PsdError::TruncatedInput { needed, available }
    }

    pub(crate) fn signature(
        site: SignatureSite,
        expected: &[u8],
        found: &[u8],
        offset: usize,
    ) -> Self {
        PsdError::SignatureMismatch {
            site,
            expected: expected.to_vec(),
            found: found.to_vec(),
            offset,
        }
    }
}

/// Errors specific to parsing the fixed file header (`spec.md` §3.1 / §4.C).
#[derive(Debug, Error)]
pub enum FileHeaderSectionError {
    #[error("a file header section is exactly 26 bytes, got {length}")]
    IncorrectLength { length: usize },
    #[error("invalid PSD/PSB signature")]
    InvalidSignature,
    #[error("invalid header version: {version} (must be 1 or 2)")]
    InvalidVersion { version: u16 },
    #[error("reserved header bytes must be zero")]
    InvalidReserved,
    #[error("invalid channel count {channel_count}: must be 1..=56")]
    InvalidChannelCount { channel_count: u8 },
    #[error("invalid width {width}: must be 1..={max}")]
    InvalidWidth { width: u32, max: u32 },
    #[error("invalid height {height}: must be 1..={max}")]
    InvalidHeight { height: u32, max: u32 },
    #[error("invalid depth {depth}: must be 1, 8, 16 or 32")]
    InvalidDepth { depth: u16 },
    #[error("invalid color mode {color_mode}")]
    InvalidColorMode { color_mode: u16 },
}

impl From<FileHeaderSectionError> for PsdError {
    fn from(e: FileHeaderSectionError) -> Self {
        match e {
            FileHeaderSectionError::IncorrectLength { length } => PsdError::TruncatedInput {
                needed: 26,
                available: length,
            },
            FileHeaderSectionError::InvalidSignature => PsdError::SignatureMismatch {
                site: SignatureSite::FileHeader,
                expected: b"8BPS".to_vec(),
                found: vec![],
                offset: 0,
            },
            FileHeaderSectionError::InvalidVersion { version } => {
                PsdError::UnsupportedVersion { found: version }
            }
            FileHeaderSectionError::InvalidReserved => PsdError::InvalidField {
                field: "reserved",
                value: "non-zero".into(),
            },
            FileHeaderSectionError::InvalidChannelCount { channel_count } => {
                PsdError::InvalidField {
                    field: "channel_count",
                    value: channel_count.to_string(),
                }
            }
            FileHeaderSectionError::InvalidWidth { width, .. } => PsdError::InvalidField {
                field: "width",
                value: width.to_string(),
            },
            FileHeaderSectionError::InvalidHeight { height, .. } => PsdError::InvalidField {
                field: "height",
                value: height.to_string(),
            },
            FileHeaderSectionError::InvalidDepth { depth } => PsdError::InvalidField {
                field: "depth",
                value: depth.to_string(),
            },
            FileHeaderSectionError::InvalidColorMode { color_mode } => PsdError::InvalidField {
                field: "color_mode",
                value: color_mode.to_string(),
            },
        }
    }
}

/// Errors from the channel codecs (`spec.md` §4.B).
#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("packbits run at offset {offset} would overrun the declared row size ({row_len} bytes)")]
    RleRowOverrun { offset: usize, row_len: usize },
    #[error("zlib stream error: {0}")]
    Zlib(String),
    #[error("prediction filtering is not defined for 1-bit depth")]
    PredictionUnsupportedDepth,
}

impl From<CompressionError> for PsdError {
    fn from(e: CompressionError) -> Self {
        PsdError::CodecError {
            kind: "compression",
            message: e.to_string(),
        }
    }
}

/// Errors from the descriptor tree reader (`spec.md` §3.9 / §4.E).
#[derive(Debug, Error, PartialEq)]
pub enum DescriptorError {
    #[error("unrecognized descriptor OSType tag")]
    InvalidOsType,
    #[error("unrecognized unit-float unit token")]
    InvalidUnitToken,
}

impl From<DescriptorError> for PsdError {
    fn from(e: DescriptorError) -> Self {
        PsdError::InvalidField {
            field: "descriptor_ostype",
            value: e.to_string(),
        }
    }
}

/// Errors from the engine-data tokenizer/parser (`spec.md` §3.10 / §4.F).
#[derive(Debug, Error, PartialEq)]
pub enum EngineDataError {
    #[error("unexpected end of input while tokenizing engine data")]
    UnexpectedEof,
    #[error("unexpected token {found:?} while parsing engine data")]
    UnexpectedToken { found: String },
    #[error("unterminated string literal in engine data")]
    UnterminatedString,
}

impl From<EngineDataError> for PsdError {
    fn from(e: EngineDataError) -> Self {
        PsdError::CodecError {
            kind: "engine_data",
            message: e.to_string(),
        }
    }
}

/// Errors from the tagged-block dispatcher (`spec.md` §4.H).
#[derive(Debug, Error)]
pub enum TaggedBlockError {
    #[error("invalid tagged block signature")]
    InvalidSignature,
}

impl From<TaggedBlockError> for PsdError {
    fn from(_: TaggedBlockError) -> Self {
        PsdError::SignatureMismatch {
            site: SignatureSite::TaggedBlock,
            expected: b"8BIM/8B64".to_vec(),
            found: vec![],
            offset: 0,
        }
    }
}

/// Errors from vector-path record parsing (`spec.md` §3.11 / §4.G).
#[derive(Debug, Error, PartialEq)]
pub enum VectorPathError {
    #[error("unrecognized path record selector {selector}")]
    UnknownSelector { selector: u16 },
}

impl From<VectorPathError> for PsdError {
    fn from(e: VectorPathError) -> Self {
        PsdError::InvalidField {
            field: "vector_path_selector",
            value: e.to_string(),
        }
    }
}
