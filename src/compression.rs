use crate::error::CompressionError;
use crate::sections::file_header_section::PsdDepth;
use crate::sections::PsdCursor;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Lazily decodes PackBits (RLE) compressed bytes, one decompressed byte at a
/// time. https://en.wikipedia.org/wiki/PackBits
pub(crate) struct RLECompressed<'a> {
    cursor: PsdCursor<'a>,
    repeat: usize,
    literal: Option<u8>,
}

impl<'a> RLECompressed<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> RLECompressed<'a> {
        RLECompressed {
            cursor: PsdCursor::new(bytes),
            literal: None,
            repeat: 0,
        }
    }
}

impl<'a> Iterator for RLECompressed<'a> {
    type Item = u8;

    fn next(&mut self) -> Option<Self::Item> {
        if self.repeat > 0 {
            self.repeat -= 1;
            return match self.literal {
                Some(_) => self.literal,
                None => Some(self.cursor.read_u8()),
            };
        }

        if self.cursor.position() >= self.cursor.get_ref().len() as u64 {
            return None;
        }

        if self.repeat == 0 {
            let header = self.cursor.read_i8() as i16;
            if header == -128 || self.cursor.position() == self.cursor.get_ref().len() as u64 {
                return self.next();
            }

            if header >= 0 {
                self.literal = None;
                self.repeat = 1 + header as usize
            } else {
                self.literal = Some(self.cursor.read_u8());
                self.repeat = (1 - header) as usize
            }
        }

        self.next()
    }
}

/// Decode one PackBits-compressed row, stopping as soon as exactly
/// `row_byte_count` output bytes have been produced (a run that would
/// produce more than the remainder needed is truncated, not rejected —
/// that's simply where the next row's control byte begins). It is only an
/// error if the input runs out before the declared row size is reached.
pub(crate) fn rle_decompress_row(
    bytes: &[u8],
    row_byte_count: usize,
) -> Result<Vec<u8>, CompressionError> {
    let mut cursor = PsdCursor::new(bytes);
    let mut out = Vec::with_capacity(row_byte_count);

    while out.len() < row_byte_count {
        if cursor.remaining() == 0 {
            return Err(CompressionError::RleRowOverrun {
                offset: cursor.position() as usize,
                row_len: row_byte_count,
            });
        }

        let header = cursor.read_i8() as i16;
        if header == -128 {
            continue;
        } else if header >= 0 {
            let n = 1 + header as usize;
            if cursor.remaining() < n {
                return Err(CompressionError::RleRowOverrun {
                    offset: cursor.position() as usize,
                    row_len: row_byte_count,
                });
            }
            let take = n.min(row_byte_count - out.len());
            let literal = cursor.read(n as u32);
            out.extend_from_slice(&literal[..take]);
        } else {
            let n = (1 - header) as usize;
            let take = n.min(row_byte_count - out.len());
            let byte = cursor.read_u8();
            out.extend(std::iter::repeat(byte).take(take));
        }
    }

    Ok(out)
}

/// PackBits-encode a full run of raw bytes (used by the write path).
pub(crate) fn rle_compress(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        // Look for a run of identical bytes.
        let mut run_len = 1;
        while i + run_len < raw.len() && run_len < 128 && raw[i + run_len] == raw[i] {
            run_len += 1;
        }

        if run_len >= 2 {
            out.push((1 - run_len as i16) as u8);
            out.push(raw[i]);
            i += run_len;
            continue;
        }

        // Otherwise gather a literal run, up to 128 bytes or until a repeat starts.
        let literal_start = i;
        let mut literal_len = 1;
        i += 1;
        while i < raw.len() && literal_len < 128 {
            let next_run = {
                let mut r = 1;
                while i + r < raw.len() && r < 128 && raw[i + r] == raw[i] {
                    r += 1;
                }
                r
            };
            if next_run >= 2 {
                break;
            }
            literal_len += 1;
            i += 1;
        }

        out.push((literal_len - 1) as u8);
        out.extend_from_slice(&raw[literal_start..literal_start + literal_len]);
    }

    out
}

/// Decompress a zlib/deflate (RFC 1950) encoded channel, no prediction
/// filtering applied.
pub(crate) fn zip_decompress(bytes: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CompressionError::Zlib(e.to_string()))?;
    Ok(out)
}

/// Compress raw channel bytes with zlib/deflate, no prediction filtering.
pub(crate) fn zip_compress(raw: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(raw)
        .expect("writing to an in-memory zlib encoder cannot fail");
    encoder
        .finish()
        .expect("finishing an in-memory zlib encoder cannot fail")
}

/// Decompress a zlib-encoded, horizontally delta-filtered ("predicted")
/// channel and undo the prediction filter.
///
/// For 8-bit depth each row is a simple running sum: `row[i] += row[i-1]`.
/// For 16-bit depth each row is a running sum over whole big-endian `u16`
/// samples, `sample[i] = sample[i] + sample[i-1] (mod 2^16)`, with the carry
/// between a sample's high and low byte handled by doing the arithmetic on
/// the reassembled 16-bit value rather than on each byte independently. For
/// 32-bit depth each row is first laid out as four consecutive byte planes
/// (all most-significant bytes, then the next-most-significant, and so on);
/// the 8-bit running-sum recurrence is then applied once across the full
/// `width * 4` planarized row (carrying across plane boundaries) before the
/// planes are re-interleaved into big-endian samples.
pub(crate) fn zip_with_prediction_decompress(
    bytes: &[u8],
    width: usize,
    height: usize,
    depth: PsdDepth,
) -> Result<Vec<u8>, CompressionError> {
    let decompressed = zip_decompress(bytes)?;
    unpredict(decompressed, width, height, depth)
}

/// Apply the horizontal delta filter and zlib-compress the result. Inverse
/// of [`zip_with_prediction_decompress`].
pub(crate) fn zip_with_prediction_compress(
    raw: &[u8],
    width: usize,
    height: usize,
    depth: PsdDepth,
) -> Result<Vec<u8>, CompressionError> {
    let predicted = predict(raw.to_vec(), width, height, depth)?;
    Ok(zip_compress(&predicted))
}

fn unpredict(
    mut data: Vec<u8>,
    width: usize,
    height: usize,
    depth: PsdDepth,
) -> Result<Vec<u8>, CompressionError> {
    match depth {
        PsdDepth::One => return Err(CompressionError::PredictionUnsupportedDepth),
        PsdDepth::Eight => {
            let row_bytes = width;
            for row in 0..height {
                let start = row * row_bytes;
                for i in 1..width {
                    data[start + i] = data[start + i].wrapping_add(data[start + i - 1]);
                }
            }
        }
        PsdDepth::Sixteen => {
            let row_bytes = width * 2;
            for row in 0..height {
                let start = row * row_bytes;
                for i in 1..width {
                    let prev = u16::from_be_bytes([data[start + (i - 1) * 2], data[start + (i - 1) * 2 + 1]]);
                    let cur = u16::from_be_bytes([data[start + i * 2], data[start + i * 2 + 1]]);
                    let sum = cur.wrapping_add(prev).to_be_bytes();
                    data[start + i * 2] = sum[0];
                    data[start + i * 2 + 1] = sum[1];
                }
            }
        }
        PsdDepth::ThirtyTwo => {
            let row_bytes = width * 4;
            for row in 0..height {
                let start = row * row_bytes;
                for i in 1..row_bytes {
                    data[start + i] = data[start + i].wrapping_add(data[start + i - 1]);
                }
            }
            data = deplanarize_32_bit(&data, width, height);
        }
    }

    Ok(data)
}

fn predict(
    mut data: Vec<u8>,
    width: usize,
    height: usize,
    depth: PsdDepth,
) -> Result<Vec<u8>, CompressionError> {
    match depth {
        PsdDepth::One => return Err(CompressionError::PredictionUnsupportedDepth),
        PsdDepth::Eight => {
            let row_bytes = width;
            for row in 0..height {
                let start = row * row_bytes;
                for i in (1..width).rev() {
                    data[start + i] = data[start + i].wrapping_sub(data[start + i - 1]);
                }
            }
        }
        PsdDepth::Sixteen => {
            let row_bytes = width * 2;
            for row in 0..height {
                let start = row * row_bytes;
                for i in (1..width).rev() {
                    let prev = u16::from_be_bytes([data[start + (i - 1) * 2], data[start + (i - 1) * 2 + 1]]);
                    let cur = u16::from_be_bytes([data[start + i * 2], data[start + i * 2 + 1]]);
                    let diff = cur.wrapping_sub(prev).to_be_bytes();
                    data[start + i * 2] = diff[0];
                    data[start + i * 2 + 1] = diff[1];
                }
            }
        }
        PsdDepth::ThirtyTwo => {
            let planarized = planarize_32_bit(&data, width, height);
            data = planarized;
            let row_bytes = width * 4;
            for row in 0..height {
                let start = row * row_bytes;
                for i in (1..row_bytes).rev() {
                    data[start + i] = data[start + i].wrapping_sub(data[start + i - 1]);
                }
            }
        }
    }

    Ok(data)
}

/// Split big-endian 32-bit samples into four consecutive byte planes per row.
fn planarize_32_bit(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    let row_bytes = width * 4;
    let mut out = vec![0u8; data.len()];
    for row in 0..height {
        let start = row * row_bytes;
        for i in 0..width {
            for plane in 0..4 {
                out[start + plane * width + i] = data[start + i * 4 + plane];
            }
        }
    }
    out
}

/// Inverse of [`planarize_32_bit`]: re-interleave four byte planes back into
/// big-endian 32-bit samples.
fn deplanarize_32_bit(data: &[u8], width: usize, height: usize) -> Vec<u8> {
    let row_bytes = width * 4;
    let mut out = vec![0u8; data.len()];
    for row in 0..height {
        let start = row * row_bytes;
        for i in 0..width {
            for plane in 0..4 {
                out[start + i * 4 + plane] = data[start + plane * width + i];
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let empty = vec![];
        assert_eq!(RLECompressed::new(&empty).collect::<Vec<u8>>(), empty);
    }

    #[test]
    fn test_literal() {
        let value = vec![0, 1, 0, 2, 0, 3, 0, 4];
        assert_eq!(
            RLECompressed::new(&value).collect::<Vec<u8>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn test_repeat() {
        let value = vec![253, 1];
        assert_eq!(
            RLECompressed::new(&value).collect::<Vec<u8>>(),
            vec![1, 1, 1, 1]
        );
    }

    #[test]
    fn rle_round_trip() {
        let raw = vec![1, 1, 1, 1, 2, 3, 4, 5, 5, 5, 9];
        let packed = rle_compress(&raw);
        let unpacked: Vec<u8> = RLECompressed::new(&packed).collect();
        assert_eq!(unpacked, raw);
    }

    #[test]
    fn zip_round_trip() {
        let raw = vec![10, 20, 30, 40, 50, 60, 70, 80];
        let compressed = zip_compress(&raw);
        let decompressed = zip_decompress(&compressed).unwrap();
        assert_eq!(decompressed, raw);
    }

    #[test]
    fn zip_with_prediction_round_trip_8_bit() {
        let raw: Vec<u8> = (0..16u8).collect();
        let compressed = zip_with_prediction_compress(&raw, 4, 4, PsdDepth::Eight).unwrap();
        let decompressed =
            zip_with_prediction_decompress(&compressed, 4, 4, PsdDepth::Eight).unwrap();
        assert_eq!(decompressed, raw);
    }

    #[test]
    fn rle_decompress_row_truncates_a_run_at_the_declared_row_size() {
        // header 0xfd (-3) repeats the next byte 1-(-3)=4 times.
        let row = vec![0xfd, 0x01];
        assert_eq!(rle_decompress_row(&row, 3).unwrap(), vec![0x01, 0x01, 0x01]);
    }

    #[test]
    fn rle_decompress_row_errors_when_the_declared_row_size_overruns_the_input() {
        let row = vec![0xfd, 0x01];
        assert!(rle_decompress_row(&row, 5).is_err());
    }

    #[test]
    fn zip_with_prediction_round_trip_16_bit() {
        let raw: Vec<u8> = (0..(4 * 4 * 2) as u32).map(|n| n as u8).collect();
        let compressed = zip_with_prediction_compress(&raw, 4, 4, PsdDepth::Sixteen).unwrap();
        let decompressed =
            zip_with_prediction_decompress(&compressed, 4, 4, PsdDepth::Sixteen).unwrap();
        assert_eq!(decompressed, raw);
    }

    #[test]
    fn unpredict_16_bit_carries_across_the_sample_not_just_the_byte() {
        // One row, two u16 samples: 0xFFFF then a delta of 1, so the carry
        // into the low byte must ripple into the high byte too.
        let predicted: Vec<u8> = vec![0xFF, 0xFF, 0x00, 0x01];
        let decoded = unpredict(predicted, 2, 1, PsdDepth::Sixteen).unwrap();
        assert_eq!(u16::from_be_bytes([decoded[0], decoded[1]]), 0xFFFF);
        assert_eq!(u16::from_be_bytes([decoded[2], decoded[3]]), 0x0000);
    }

    #[test]
    fn zip_with_prediction_round_trip_32_bit() {
        let raw: Vec<u8> = (0..(4 * 4 * 4) as u32).map(|n| n as u8).collect();
        let compressed = zip_with_prediction_compress(&raw, 4, 4, PsdDepth::ThirtyTwo).unwrap();
        let decompressed =
            zip_with_prediction_decompress(&compressed, 4, 4, PsdDepth::ThirtyTwo).unwrap();
        assert_eq!(decompressed, raw);
    }
}
