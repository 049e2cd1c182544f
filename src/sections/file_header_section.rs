use crate::error::FileHeaderSectionError;
use crate::sections::{PsdBuffer, PsdCursor, PsdSerialize};
use crate::version::PsdVersion;
use std::io::Write;

/// Bytes representing the string "8BPS".
const EXPECTED_PSD_SIGNATURE: [u8; 4] = [56, 66, 80, 83];
/// Bytes representing the Reserved section of the header
const EXPECTED_RESERVED: [u8; 6] = [0; 6];

/// The FileHeaderSection comes from the first 26 bytes in the PSD file.
///
/// # [Adobe Docs](https://www.adobe.com/devnet-apps/photoshop/fileformatashtml/)
///
/// | Length | Description                                                                                                                                          |
/// |--------|------------------------------------------------------------------------------------------------------------------------------------------------------|
/// | 4      | Signature: always equal to '8BPS'.                                                                                                                    |
/// | 2      | Version: 1 for PSD, 2 for PSB.                                                                                                                        |
/// | 6      | Reserved: must be zero.                                                                                                                               |
/// | 2      | The number of channels in the image, including any alpha channels. Supported range is 1 to 56.                                                       |
/// | 4      | The height of the image in pixels.                                                                                                                    |
/// | 4      | The width of the image in pixels.                                                                                                                     |
/// | 2      | Depth: the number of bits per channel. Supported values are 1, 8, 16 and 32.                                                                          |
/// | 2      | The color mode of the file.                                                                                                                           |
#[derive(Debug)]
pub struct FileHeaderSection {
    pub(in crate) version: PsdVersion,
    pub(in crate) channel_count: ChannelCount,
    pub(in crate) width: PsdWidth,
    pub(in crate) height: PsdHeight,
    pub(in crate) depth: PsdDepth,
    pub(in crate) color_mode: ColorMode,
}

impl FileHeaderSection {
    /// Construct a header directly, for building a document from scratch
    /// rather than parsing one (`spec.md` §4.M `new`/`frompil`).
    pub fn new(
        version: PsdVersion,
        channel_count: ChannelCount,
        width: PsdWidth,
        height: PsdHeight,
        depth: PsdDepth,
        color_mode: ColorMode,
    ) -> FileHeaderSection {
        FileHeaderSection {
            version,
            channel_count,
            width,
            height,
            depth,
            color_mode,
        }
    }

    /// Create a FileHeaderSection from the first 26 bytes of a PSD/PSB file.
    pub fn from_bytes(bytes: &[u8]) -> Result<FileHeaderSection, FileHeaderSectionError> {
        if bytes.len() != 26 {
            return Err(FileHeaderSectionError::IncorrectLength {
                length: bytes.len(),
            });
        }

        let mut cursor = PsdCursor::new(bytes);

        let signature = cursor.read_4();
        if signature != EXPECTED_PSD_SIGNATURE {
            return Err(FileHeaderSectionError::InvalidSignature);
        }

        let version_raw = cursor.read_u16();
        let version = PsdVersion::from_u16(version_raw)
            .ok_or(FileHeaderSectionError::InvalidVersion { version: version_raw })?;

        let reserved = cursor.read_6();
        if reserved != EXPECTED_RESERVED {
            return Err(FileHeaderSectionError::InvalidReserved);
        }

        let channel_count = ChannelCount::new(cursor.read_u16() as u8)?;
        let height = PsdHeight::new(cursor.read_u32(), version)?;
        let width = PsdWidth::new(cursor.read_u32(), version)?;
        let depth = PsdDepth::new(cursor.read_u16() as u8)?;
        let color_mode = ColorMode::new(cursor.read_u16() as u8)?;

        Ok(FileHeaderSection {
            version,
            channel_count,
            width,
            height,
            depth,
            color_mode,
        })
    }

    /// The document's version (PSD vs. PSB).
    pub fn version(&self) -> PsdVersion {
        self.version
    }

    /// The number of channels in the image.
    pub fn channel_count(&self) -> ChannelCount {
        self.channel_count
    }

    /// The width of the image, in pixels.
    pub fn width(&self) -> PsdWidth {
        self.width
    }

    /// The height of the image, in pixels.
    pub fn height(&self) -> PsdHeight {
        self.height
    }

    /// The bit depth of the image.
    pub fn depth(&self) -> PsdDepth {
        self.depth
    }

    /// The color mode of the image.
    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }
}

impl PsdSerialize for FileHeaderSection {
    fn write<T: Write>(&self, buffer: &mut PsdBuffer<T>) {
        buffer.write(EXPECTED_PSD_SIGNATURE);
        buffer.write(self.version.as_u16().to_be_bytes());
        buffer.write(EXPECTED_RESERVED);
        buffer.write((self.channel_count.count() as u16).to_be_bytes());
        buffer.write(self.height.0.to_be_bytes());
        buffer.write(self.width.0.to_be_bytes());
        buffer.write((self.depth as u16).to_be_bytes());
        buffer.write((self.color_mode as u16).to_be_bytes());
    }
}

/// The number of channels in the image, including any alpha channels.
/// Supported range is 1 to 56.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCount(u8);

impl ChannelCount {
    /// Create a new ChannelCount
    pub fn new(channel_count: u8) -> Result<ChannelCount, FileHeaderSectionError> {
        if channel_count < 1 || channel_count > 56 {
            return Err(FileHeaderSectionError::InvalidChannelCount { channel_count });
        }

        Ok(ChannelCount(channel_count))
    }

    /// Return the channel count
    pub fn count(&self) -> u8 {
        self.0
    }
}

/// The height of the image in pixels. 1 to 30,000 for PSD, 1 to 300,000 for
/// PSB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsdHeight(pub(in crate) u32);

impl PsdHeight {
    /// Create a new PsdHeight, validated against the document's version.
    pub fn new(height: u32, version: PsdVersion) -> Result<PsdHeight, FileHeaderSectionError> {
        let max = version.max_dimension();
        if height < 1 || height > max {
            return Err(FileHeaderSectionError::InvalidHeight { height, max });
        }

        Ok(PsdHeight(height))
    }

    /// The raw pixel height.
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// The width of the image in pixels. 1 to 30,000 for PSD, 1 to 300,000 for
/// PSB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsdWidth(pub(in crate) u32);

impl PsdWidth {
    /// Create a new PsdWidth, validated against the document's version.
    pub fn new(width: u32, version: PsdVersion) -> Result<PsdWidth, FileHeaderSectionError> {
        let max = version.max_dimension();
        if width < 1 || width > max {
            return Err(FileHeaderSectionError::InvalidWidth { width, max });
        }

        Ok(PsdWidth(width))
    }

    /// The raw pixel width.
    pub fn value(&self) -> u32 {
        self.0
    }
}

/// Depth: the number of bits per channel. Supported values are 1, 8, 16 and 32.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum PsdDepth {
    One = 1,
    Eight = 8,
    Sixteen = 16,
    ThirtyTwo = 32,
}

impl PsdDepth {
    /// Create a new PsdDepth
    pub fn new(depth: u8) -> Result<PsdDepth, FileHeaderSectionError> {
        match depth {
            1 => Ok(PsdDepth::One),
            8 => Ok(PsdDepth::Eight),
            16 => Ok(PsdDepth::Sixteen),
            32 => Ok(PsdDepth::ThirtyTwo),
            _ => Err(FileHeaderSectionError::InvalidDepth { depth: depth as u16 }),
        }
    }

    /// The number of bytes a single channel sample occupies.
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            PsdDepth::One => 1, // 8 pixels are packed per byte; callers unpack separately.
            PsdDepth::Eight => 1,
            PsdDepth::Sixteen => 2,
            PsdDepth::ThirtyTwo => 4,
        }
    }

    /// The inverse of [`Self::bytes_per_sample`], used when re-deriving a
    /// layer channel's depth from its already-decoded byte length (layer
    /// channels don't carry their own depth field; they inherit the
    /// document's).
    pub fn from_bytes_per_sample(bytes_per_sample: usize) -> PsdDepth {
        match bytes_per_sample {
            2 => PsdDepth::Sixteen,
            4 => PsdDepth::ThirtyTwo,
            _ => PsdDepth::Eight,
        }
    }
}

/// The color mode of the file.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[allow(missing_docs)]
pub enum ColorMode {
    Bitmap = 0,
    Grayscale = 1,
    Indexed = 2,
    Rgb = 3,
    Cmyk = 4,
    Multichannel = 7,
    Duotone = 8,
    Lab = 9,
}

impl ColorMode {
    /// Create a new ColorMode
    pub fn new(color_mode: u8) -> Result<ColorMode, FileHeaderSectionError> {
        match color_mode {
            0 => Ok(ColorMode::Bitmap),
            1 => Ok(ColorMode::Grayscale),
            2 => Ok(ColorMode::Indexed),
            3 => Ok(ColorMode::Rgb),
            4 => Ok(ColorMode::Cmyk),
            7 => Ok(ColorMode::Multichannel),
            8 => Ok(ColorMode::Duotone),
            9 => Ok(ColorMode::Lab),
            _ => Err(FileHeaderSectionError::InvalidColorMode {
                color_mode: color_mode as u16,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_channel_count() {
        for channel_count in 1..=56 {
            assert!(ChannelCount::new(channel_count).is_ok());
        }
    }

    #[test]
    fn invalid_channel_count() {
        assert!(ChannelCount::new(0).is_err());
        assert!(ChannelCount::new(57).is_err());
    }

    #[test]
    fn incorrect_file_header_section_length() {
        let too_short = [0; 25];

        match FileHeaderSection::from_bytes(&too_short) {
            Err(FileHeaderSectionError::IncorrectLength { length }) => assert_eq!(length, 25),
            _ => panic!("Should have returned incorrect length error"),
        };
    }

    #[test]
    fn first_four_bytes_incorrect() {
        let bytes = make_bytes();

        match FileHeaderSection::from_bytes(&bytes) {
            Err(FileHeaderSectionError::InvalidSignature) => {}
            _ => panic!("Should have returned invalid signature error"),
        };
    }

    #[test]
    fn version_incorrect() {
        let mut bytes = make_bytes();
        bytes[0..4].copy_from_slice(&EXPECTED_PSD_SIGNATURE);
        bytes[4..6].copy_from_slice(&[0, 9]);

        match FileHeaderSection::from_bytes(&bytes) {
            Err(FileHeaderSectionError::InvalidVersion { version: 9 }) => {}
            _ => panic!("Should have returned invalid version error"),
        };
    }

    #[test]
    fn psb_version_accepted() {
        let mut bytes = make_bytes();
        bytes[0..4].copy_from_slice(&EXPECTED_PSD_SIGNATURE);
        bytes[4..6].copy_from_slice(&[0, 2]);
        bytes[6..12].copy_from_slice(&EXPECTED_RESERVED);
        bytes[12..14].copy_from_slice(&1u16.to_be_bytes());
        bytes[14..18].copy_from_slice(&100u32.to_be_bytes());
        bytes[18..22].copy_from_slice(&100u32.to_be_bytes());
        bytes[22..24].copy_from_slice(&8u16.to_be_bytes());
        bytes[24..26].copy_from_slice(&3u16.to_be_bytes());

        let header = FileHeaderSection::from_bytes(&bytes).unwrap();
        assert_eq!(header.version(), PsdVersion::Two);
    }

    #[test]
    fn invalid_reserved_section() {
        let mut bytes = make_bytes();
        bytes[0..4].copy_from_slice(&EXPECTED_PSD_SIGNATURE);
        bytes[4..6].copy_from_slice(&[0, 1]);

        match FileHeaderSection::from_bytes(&bytes) {
            Err(FileHeaderSectionError::InvalidReserved) => {}
            _ => panic!("Should have returned reserved section error"),
        };
    }

    // [0, 1, 2, ..., 25]
    fn make_bytes() -> [u8; 26] {
        let mut bytes = [0; 26];
        for i in 0..26 {
            bytes[i] = i as u8;
        }

        bytes
    }
}
