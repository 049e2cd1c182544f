use crate::compression::{rle_decompress_row, zip_decompress, zip_with_prediction_decompress};
use crate::error::PsdError;
use crate::psd_channel::PsdChannelCompression;
use crate::sections::file_header_section::PsdDepth;
use crate::sections::PsdCursor;
use crate::version::PsdVersion;

/// The ImageDataSection comes from the final section in the PSD that contains the pixel data
/// of the final PSD image (the one that comes from combining all of the layers).
///
/// # [Adobe Docs](https://www.adobe.com/devnet-apps/photoshop/fileformatashtml/)
///
/// The last section of a Photoshop file contains the image pixel data.
/// Image data is stored in planar order: first all the red data, then all the green data, etc.
/// Each plane is stored in scan-line order, with no pad bytes,
///
/// | Length   | Description                                                                                                                                                                                                                                                                                                                                                                                                                                                              |
/// |----------|--------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------------|
/// | 2        | Compression method, shared across every plane: <br> 0 = Raw image data <br> 1 = RLE compressed: the image data starts with the byte counts for all the scan lines (rows * channels), with each count a two-byte (v1) or four-byte (v2) value. The RLE compressed data follows, each scan line compressed separately (PackBits, as used by the TIFF standard). <br> 2 = ZIP without prediction <br> 3 = ZIP with prediction.                                          |
/// | Variable | The image data. Planar order = RRR GGG BBB, etc.                                                                                                                                                                                                                                                                                                                                                                                                                         |
#[derive(Debug, Clone)]
pub struct ImageDataSection {
    /// The compression method shared by every channel plane (§3.8).
    pub(in crate) compression: PsdChannelCompression,
    /// One entry per channel, in ascending channel-id order.
    pub(in crate) channels: Vec<ChannelBytes>,
    width: u32,
    height: u32,
    depth: PsdDepth,
    version: PsdVersion,
}

impl ImageDataSection {
    /// Construct a merged image data section directly from already-decoded
    /// channel planes, for building a document from scratch (`spec.md`
    /// §4.M `new`/`frompil`). `channels` must be in ascending channel-id
    /// order, one entry per channel.
    pub fn new(
        channels: Vec<ChannelBytes>,
        compression: PsdChannelCompression,
        width: u32,
        height: u32,
        depth: PsdDepth,
        version: PsdVersion,
    ) -> ImageDataSection {
        ImageDataSection {
            compression,
            channels,
            width,
            height,
            depth,
            version,
        }
    }

    /// Create an ImageDataSection from the bytes in the corresponding section in a PSD file
    /// (including the length marker).
    pub fn from_bytes(
        bytes: &[u8],
        psd_width: u32,
        psd_height: u32,
        channel_count: u8,
        depth: PsdDepth,
        version: PsdVersion,
    ) -> Result<ImageDataSection, PsdError> {
        let mut cursor = PsdCursor::new(bytes);
        let channel_count = channel_count as usize;

        let compression_raw = cursor.read_u16();
        let compression = PsdChannelCompression::new(compression_raw)?;

        let bytes_per_channel = (psd_width * psd_height) as usize * depth.bytes_per_sample();

        let channels = match compression {
            PsdChannelCompression::RawData => {
                let total_channel_bytes = bytes_per_channel * channel_count;
                let remaining = cursor.read_checked(total_channel_bytes as u32)?;
                remaining
                    .chunks(bytes_per_channel)
                    .map(|chunk| ChannelBytes::RawData(chunk.to_vec()))
                    .collect()
            }
            PsdChannelCompression::RleCompressed => {
                let row_bytes = psd_width as usize * depth.bytes_per_sample();

                let mut row_counts = vec![Vec::with_capacity(psd_height as usize); channel_count];
                for counts in row_counts.iter_mut() {
                    for _ in 0..psd_height {
                        let count = if version.uses_big_lengths() {
                            cursor.read_u32() as usize
                        } else {
                            cursor.read_u16() as usize
                        };
                        counts.push(count);
                    }
                }

                let mut channels = Vec::with_capacity(channel_count);
                for counts in &row_counts {
                    let total: usize = counts.iter().sum();
                    let packed = cursor.read_checked(total as u32)?;

                    let mut decoded = Vec::with_capacity(row_bytes * psd_height as usize);
                    let mut offset = 0;
                    for &count in counts {
                        let row_packed = &packed[offset..offset + count];
                        decoded.extend(rle_decompress_row(row_packed, row_bytes)?);
                        offset += count;
                    }

                    channels.push(ChannelBytes::RleCompressed(decoded));
                }
                channels
            }
            PsdChannelCompression::ZipWithoutPrediction => {
                let remaining = cursor.read(cursor.remaining() as u32);
                let decompressed = zip_decompress(remaining)?;
                split_planar_channels(&decompressed, bytes_per_channel, channel_count)?
                    .into_iter()
                    .map(ChannelBytes::Zip)
                    .collect()
            }
            PsdChannelCompression::ZipWithPrediction => {
                let remaining = cursor.read(cursor.remaining() as u32);
                let width = psd_width as usize;
                let height = psd_height as usize;
                let decompressed =
                    zip_with_prediction_decompress(remaining, width, height, depth)?;
                split_planar_channels(&decompressed, bytes_per_channel, channel_count)?
                    .into_iter()
                    .map(ChannelBytes::ZipWithPrediction)
                    .collect()
            }
        };

        Ok(ImageDataSection {
            compression,
            channels,
            width: psd_width,
            height: psd_height,
            depth,
            version,
        })
    }

    pub fn channels(&self) -> &[ChannelBytes] {
        &self.channels
    }

    pub fn compression(&self) -> PsdChannelCompression {
        self.compression
    }

    /// Serialize this section back to bytes (§3.8), re-encoding every
    /// channel with whichever compression this section was constructed
    /// with.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PsdError> {
        let mut out = self.compression.as_u16().to_be_bytes().to_vec();

        match self.compression {
            PsdChannelCompression::RawData => {
                for channel in &self.channels {
                    out.extend_from_slice(channel.raw_bytes());
                }
            }
            PsdChannelCompression::RleCompressed => {
                let row_bytes = self.width as usize * self.depth.bytes_per_sample();
                let mut packed_rows: Vec<Vec<Vec<u8>>> = Vec::with_capacity(self.channels.len());
                for channel in &self.channels {
                    let raw = channel.raw_bytes();
                    let mut rows = Vec::with_capacity(self.height as usize);
                    for row in raw.chunks(row_bytes) {
                        rows.push(crate::compression::rle_compress(row));
                    }
                    packed_rows.push(rows);
                }
                for rows in &packed_rows {
                    for row in rows {
                        if self.version.uses_big_lengths() {
                            out.extend_from_slice(&(row.len() as u32).to_be_bytes());
                        } else {
                            out.extend_from_slice(&(row.len() as u16).to_be_bytes());
                        }
                    }
                }
                for rows in &packed_rows {
                    for row in rows {
                        out.extend_from_slice(row);
                    }
                }
            }
            PsdChannelCompression::ZipWithoutPrediction => {
                let mut raw = Vec::new();
                for channel in &self.channels {
                    raw.extend_from_slice(channel.raw_bytes());
                }
                out.extend_from_slice(&crate::compression::zip_compress(&raw));
            }
            PsdChannelCompression::ZipWithPrediction => {
                let mut raw = Vec::new();
                for channel in &self.channels {
                    raw.extend_from_slice(channel.raw_bytes());
                }
                let compressed = crate::compression::zip_with_prediction_compress(
                    &raw,
                    self.width as usize,
                    self.height as usize,
                    self.depth,
                )?;
                out.extend_from_slice(&compressed);
            }
        }

        Ok(out)
    }
}

fn split_planar_channels(
    decompressed: &[u8],
    bytes_per_channel: usize,
    channel_count: usize,
) -> Result<Vec<Vec<u8>>, PsdError> {
    let total = bytes_per_channel * channel_count;
    if decompressed.len() < total {
        return Err(PsdError::truncated(total, decompressed.len()));
    }

    Ok(decompressed[..total]
        .chunks(bytes_per_channel)
        .map(|chunk| chunk.to_vec())
        .collect())
}

/// The decoded bytes for a single channel plane, still tagged with which
/// codec produced them. RLE/raw/zip channels are all fully materialized as
/// raw samples once read; only the tag distinguishes which compression
/// they'd round-trip back out with.
#[derive(Debug, Clone)]
pub enum ChannelBytes {
    RawData(Vec<u8>),
    /// Already PackBits-decoded into raw samples.
    RleCompressed(Vec<u8>),
    /// Already zlib-decompressed (and, if it came from the prediction
    /// variant, already un-delta-filtered).
    Zip(Vec<u8>),
    ZipWithPrediction(Vec<u8>),
}

impl ChannelBytes {
    /// The decoded raw sample bytes, regardless of which codec tag this
    /// variant carries.
    pub fn raw_bytes(&self) -> &[u8] {
        match self {
            ChannelBytes::RawData(b)
            | ChannelBytes::RleCompressed(b)
            | ChannelBytes::Zip(b)
            | ChannelBytes::ZipWithPrediction(b) => b,
        }
    }
}

impl From<&[u8]> for ChannelBytes {
    fn from(bytes: &[u8]) -> Self {
        ChannelBytes::RawData(bytes.to_vec())
    }
}
