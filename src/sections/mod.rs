use crate::error::{PsdError, SignatureSite};
use crate::version::PsdVersion;
use std::io::Write;

pub mod color_mode_data_section;
pub mod file_header_section;
pub mod image_data_section;
pub mod image_resources_section;
pub mod layer_and_mask_information_section;

/// A read-only cursor over a borrowed byte slice.
///
/// Every primitive read here is infallible by design: callers that need to
/// validate a length before handing a sub-slice off to a `PsdCursor`
/// (the five major sections, length-delimited tagged blocks, descriptor
/// fields) do so once, up front, and return a [`PsdError`] if the bytes
/// aren't there. Once a window of bytes is known to be long enough for the
/// structure being read, reading it back out doesn't need its own
/// `Result` plumbing.
#[derive(Debug, Clone)]
pub struct PsdCursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> PsdCursor<'a> {
    /// Wrap a byte slice in a new cursor positioned at offset 0.
    pub fn new(bytes: &'a [u8]) -> Self {
        PsdCursor { bytes, position: 0 }
    }

    /// Current read offset, in bytes, from the start of the slice.
    pub fn position(&self) -> u64 {
        self.position as u64
    }

    /// Move the read offset to an absolute byte position.
    pub fn set_position(&mut self, position: u64) {
        self.position = position as usize;
    }

    /// The full underlying slice (not just what remains unread).
    pub fn get_ref(&self) -> &'a [u8] {
        self.bytes
    }

    /// How many bytes remain unread.
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.position)
    }

    /// Validate that at least `needed` bytes remain, without consuming them.
    pub fn require(&self, needed: usize) -> Result<(), PsdError> {
        if self.remaining() < needed {
            Err(PsdError::truncated(needed, self.remaining()))
        } else {
            Ok(())
        }
    }

    /// Read `length` bytes and advance past them.
    pub fn read(&mut self, length: u32) -> &'a [u8] {
        let length = length as usize;
        let start = self.position;
        let end = start + length;
        self.position = end;
        &self.bytes[start..end]
    }

    /// Read `length` bytes, returning a `PsdError` instead of panicking if
    /// the slice is too short. Used by the entry points that must surface
    /// `TruncatedInput`/`LengthOverrun` as real errors (§7).
    pub fn read_checked(&mut self, length: u32) -> Result<&'a [u8], PsdError> {
        self.require(length as usize)?;
        Ok(self.read(length))
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let start = self.position;
        self.position += N;
        self.bytes[start..start + N].try_into().unwrap()
    }

    pub fn read_1(&mut self) -> [u8; 1] {
        self.take()
    }
    pub fn read_2(&mut self) -> [u8; 2] {
        self.take()
    }
    pub fn read_4(&mut self) -> [u8; 4] {
        self.take()
    }
    pub fn read_6(&mut self) -> [u8; 6] {
        self.take()
    }
    pub fn read_8(&mut self) -> [u8; 8] {
        self.take()
    }

    pub fn read_u8(&mut self) -> u8 {
        u8::from_be_bytes(self.take())
    }
    pub fn read_i8(&mut self) -> i8 {
        i8::from_be_bytes(self.take())
    }
    pub fn read_u16(&mut self) -> u16 {
        u16::from_be_bytes(self.take())
    }
    pub fn read_i16(&mut self) -> i16 {
        i16::from_be_bytes(self.take())
    }
    pub fn read_u32(&mut self) -> u32 {
        u32::from_be_bytes(self.take())
    }
    pub fn read_i32(&mut self) -> i32 {
        i32::from_be_bytes(self.take())
    }
    pub fn read_u64(&mut self) -> u64 {
        u64::from_be_bytes(self.take())
    }
    pub fn read_i64(&mut self) -> i64 {
        i64::from_be_bytes(self.take())
    }
    pub fn read_f32(&mut self) -> f32 {
        f32::from_be_bytes(self.take())
    }
    pub fn read_f64(&mut self) -> f64 {
        f64::from_be_bytes(self.take())
    }

    /// Read a length field whose width depends on the document version:
    /// 32-bit for `PsdVersion::One`, 64-bit for `PsdVersion::Two` (§4.K).
    pub fn read_length(&mut self, version: PsdVersion) -> u64 {
        if version.uses_big_lengths() {
            self.read_u64()
        } else {
            self.read_u32() as u64
        }
    }

    /// Peek at the next 4 bytes without advancing.
    pub fn peek_4(&self) -> [u8; 4] {
        self.bytes[self.position..self.position + 4]
            .try_into()
            .unwrap()
    }

    /// Peek at the next 4 bytes, interpreted as a big-endian `i32`, without
    /// advancing.
    pub fn peek_i32(&self) -> i32 {
        i32::from_be_bytes(self.peek_4())
    }

    /// Assert the next 4 bytes equal `expected`, consuming them either way;
    /// returns a `SignatureMismatch` if they don't.
    pub fn read_signature(
        &mut self,
        expected: &'static [u8; 4],
        site: SignatureSite,
    ) -> Result<(), PsdError> {
        let offset = self.position;
        let found = self.read_4();
        if &found != expected {
            return Err(PsdError::signature(site, expected, &found, offset));
        }
        Ok(())
    }

    /// Read a Pascal (length-prefixed) string, padded so the total
    /// (1 length byte + string bytes) is a multiple of `pad_to`.
    pub fn read_pascal_string(&mut self, pad_to: usize) -> String {
        let length = self.read_u8() as usize;
        let bytes = self.read(length as u32);
        let string = String::from_utf8_lossy(bytes).into_owned();

        let total = 1 + length;
        let padding = (pad_to - (total % pad_to)) % pad_to;
        if padding > 0 {
            self.read(padding as u32);
        }

        string
    }

    /// Read a Unicode string: a 4-byte `u32` character count followed by
    /// that many UTF-16BE code units (no padding).
    pub fn read_unicode_string(&mut self) -> String {
        let char_count = self.read_u32() as usize;
        self.read_unicode_chars(char_count)
    }

    /// Like [`PsdCursor::read_unicode_string`], but the total byte length
    /// consumed (4 + 2*char_count) is padded to a multiple of `pad_to`.
    pub fn read_unicode_string_padding(&mut self, pad_to: usize) -> String {
        let char_count = self.read_u32() as usize;
        let string = self.read_unicode_chars(char_count);

        let total = 4 + char_count * 2;
        let padding = (pad_to - (total % pad_to)) % pad_to;
        if padding > 0 {
            self.read(padding as u32);
        }

        string
    }

    fn read_unicode_chars(&mut self, char_count: usize) -> String {
        let mut units = Vec::with_capacity(char_count);
        for _ in 0..char_count {
            units.push(self.read_u16());
        }
        String::from_utf16_lossy(&units)
    }
}

/// A write sink paired with the length-block and string-encoding helpers
/// every serializer in this crate needs.
pub struct PsdBuffer<T> {
    sink: T,
}

impl<T> PsdBuffer<T>
where
    T: Write,
{
    pub fn new(sink: T) -> Self {
        PsdBuffer { sink }
    }

    pub fn into_inner(self) -> T {
        self.sink
    }

    /// Write raw bytes verbatim.
    pub fn write<B: AsRef<[u8]>>(&mut self, bytes: B) {
        self.sink
            .write_all(bytes.as_ref())
            .expect("writing to an in-memory PsdBuffer sink cannot fail");
    }

    /// Write `count` zero bytes.
    pub fn write_padding(&mut self, count: usize) {
        self.write(vec![0u8; count]);
    }

    /// Write a Unicode string in the on-disk form `read_unicode_string`
    /// reads back: a 4-byte character count followed by UTF-16BE units.
    pub fn write_unicode_string(&mut self, string: &str) {
        let units: Vec<u16> = string.encode_utf16().collect();
        self.write((units.len() as u32).to_be_bytes());
        for unit in units {
            self.write(unit.to_be_bytes());
        }
    }

    /// Write a Pascal string, padded so that (1 + bytes.len()) is a
    /// multiple of `pad_to`.
    pub fn write_pascal_string(&mut self, string: &str, pad_to: usize) {
        let bytes = string.as_bytes();
        self.write([bytes.len() as u8]);
        self.write(bytes);

        let total = 1 + bytes.len();
        let padding = (pad_to - (total % pad_to)) % pad_to;
        if padding > 0 {
            self.write_padding(padding);
        }
    }

    /// Write a length placeholder, run `body` against a scratch buffer, then
    /// write the resulting byte count followed by the scratch buffer's
    /// contents. This is the "scoped length-block guard" pattern used
    /// throughout the container grammar (section lengths, tagged-block
    /// lengths, descriptor-list lengths) — building the body into a scratch
    /// `Vec<u8>` first means the length never has to be backpatched, so the
    /// sink only needs to implement `Write`.
    pub fn write_sized(&mut self, body: impl FnOnce(&mut PsdBuffer<Vec<u8>>)) {
        let mut scratch = PsdBuffer::new(Vec::new());
        body(&mut scratch);
        let scratch = scratch.into_inner();

        self.write((scratch.len() as u32).to_be_bytes());
        self.write(scratch);
    }

    /// Like [`PsdBuffer::write_sized`], but with a 64-bit length field, for
    /// the PSB "big key" tagged blocks (§4.H/§4.K).
    pub fn write_sized64(&mut self, body: impl FnOnce(&mut PsdBuffer<Vec<u8>>)) {
        let mut scratch = PsdBuffer::new(Vec::new());
        body(&mut scratch);
        let scratch = scratch.into_inner();

        self.write((scratch.len() as u64).to_be_bytes());
        self.write(scratch);
    }

    /// Write a version-dependent length field (§4.K), without the
    /// length-block body guard — used where the length and the data are
    /// written by different call sites.
    pub fn write_length(&mut self, length: u64, version: PsdVersion) {
        if version.uses_big_lengths() {
            self.write(length.to_be_bytes());
        } else {
            self.write((length as u32).to_be_bytes());
        }
    }
}

/// Implemented by every structure that can serialize itself onto a
/// [`PsdBuffer`].
pub trait PsdSerialize {
    fn write<T: Write>(&self, buffer: &mut PsdBuffer<T>);
}

/// Implemented by every structure that can be parsed from a standalone byte
/// slice (as opposed to a structure read inline from a shared `PsdCursor`
/// that several sibling fields also read from).
pub trait PsdDeserialize: Sized {
    type Error;

    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Error>;
}

/// Wraps a `&str` so it can be passed to an API expecting `impl
/// PsdSerialize` (descriptor keys, slice names) without every call site
/// repeating the Unicode-string encoding by hand.
pub struct AsUnicodeString<'a>(pub &'a str);

impl PsdSerialize for AsUnicodeString<'_> {
    fn write<T: Write>(&self, buffer: &mut PsdBuffer<T>) {
        buffer.write_unicode_string(self.0);
    }
}

/// The five top-level sections of a PSD/PSB file, sliced out of the whole
/// file buffer by [`MajorSections::from_bytes`] (§3, top of the grammar).
#[derive(Debug)]
pub struct MajorSections<'a> {
    pub version: PsdVersion,
    pub file_header: &'a [u8],
    pub color_mode_data: &'a [u8],
    pub image_resources: &'a [u8],
    pub layer_and_mask_information: &'a [u8],
    pub image_data: &'a [u8],
}

const FILE_HEADER_LENGTH: usize = 26;

impl<'a> MajorSections<'a> {
    /// Split a whole PSD/PSB file buffer into its five major sections.
    ///
    /// This is the single place in the crate where length fields are
    /// trusted without having already been validated by an enclosing
    /// window, so every slice operation here is bounds-checked and
    /// surfaces a real [`PsdError`] rather than panicking.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self, PsdError> {
        if bytes.len() < FILE_HEADER_LENGTH {
            return Err(PsdError::truncated(FILE_HEADER_LENGTH, bytes.len()));
        }
        let file_header = &bytes[..FILE_HEADER_LENGTH];

        let version_raw = u16::from_be_bytes(file_header[4..6].try_into().unwrap());
        let version =
            PsdVersion::from_u16(version_raw).ok_or(PsdError::UnsupportedVersion { found: version_raw })?;

        let mut cursor = PsdCursor::new(&bytes[FILE_HEADER_LENGTH..]);

        cursor.require(4)?;
        let color_mode_data_length = cursor.read_u32();
        let color_mode_data = cursor.read_checked(color_mode_data_length)?;

        cursor.require(4)?;
        let image_resources_length = cursor.read_u32();
        let image_resources = cursor.read_checked(image_resources_length)?;

        let layer_and_mask_length = if version.uses_big_lengths() {
            cursor.require(8)?;
            cursor.read_u64()
        } else {
            cursor.require(4)?;
            cursor.read_u32() as u64
        };
        let layer_and_mask_information = cursor.read_checked(layer_and_mask_length as u32)?;

        let remaining_start = cursor.position() as usize;
        let image_data = &cursor.get_ref()[remaining_start..];

        Ok(MajorSections {
            version,
            file_header,
            color_mode_data,
            image_resources,
            layer_and_mask_information,
            image_data,
        })
    }
}
