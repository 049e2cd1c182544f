//! The descriptor tree (`spec.md` §3.9 / §4.E).
//!
//! A descriptor is a self-describing, recursively typed key/value map used
//! pervasively inside tagged blocks, layer effects, vector strokes, type
//! tool settings and several image resources (Slices among them). This
//! module is the single reader/writer for that structure; every other
//! component that embeds a descriptor (tagged blocks, slices, layer
//! comps, ...) calls into [`Descriptor::read`] / [`Descriptor::write`]
//! rather than re-implementing the OSType dispatch.

use std::io::Write;

use crate::error::DescriptorError;
use crate::sections::{AsUnicodeString, PsdBuffer, PsdCursor, PsdSerialize};

pub use crate::error::DescriptorError as ImageResourcesDescriptorError;

/// A descriptor key is either one of the ~1000 closed-vocabulary 4-byte
/// terminology tokens (written with an explicit zero length prefix) or an
/// arbitrary byte string (written with its real length).
///
/// Rather than reconstructing the source's run-time "seen before" cache of
/// unknown terminology codes (`spec.md` §4.E, §9 "Self-referential name
/// sets"), we remember *which form the key was read in* and always write
/// it back the same way. This is simpler than a precomputed closed set,
/// never needs updating as Adobe adds new terminology, and still satisfies
/// every round-trip invariant in §8 — see `DESIGN.md`'s open questions for
/// the reasoning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorKey {
    /// A 4-byte terminology code, written with a zero length prefix.
    Terminology([u8; 4]),
    /// An explicit-length key (a plugin- or script-defined name).
    Literal(Vec<u8>),
}

impl DescriptorKey {
    /// Build a key from a known terminology token.
    pub fn terminology(token: &[u8; 4]) -> Self {
        DescriptorKey::Terminology(*token)
    }

    /// Build a key from an arbitrary literal byte string.
    pub fn literal(bytes: impl Into<Vec<u8>>) -> Self {
        DescriptorKey::Literal(bytes.into())
    }

    /// The raw bytes of this key, regardless of which form it was read in.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            DescriptorKey::Terminology(token) => token,
            DescriptorKey::Literal(bytes) => bytes,
        }
    }

    /// Whether this key's bytes equal a given 4-byte token.
    pub fn matches(&self, token: &[u8; 4]) -> bool {
        self.as_bytes() == token
    }

    fn read(cursor: &mut PsdCursor) -> Self {
        let length = cursor.read_u32();
        if length == 0 {
            DescriptorKey::Terminology(cursor.read_4())
        } else {
            DescriptorKey::Literal(cursor.read(length).to_vec())
        }
    }

    fn write<T: Write>(&self, buffer: &mut PsdBuffer<T>) {
        match self {
            DescriptorKey::Terminology(token) => {
                buffer.write(0u32.to_be_bytes());
                buffer.write(token);
            }
            DescriptorKey::Literal(bytes) => {
                buffer.write((bytes.len() as u32).to_be_bytes());
                buffer.write(bytes);
            }
        }
    }
}

/// The unit a [`DescriptorValue::UnitFloat`]/[`DescriptorValue::UnitFloats`]
/// value is expressed in (`spec.md` §3.9). These six codes are the ones
/// `spec.md` documents explicit byte values for; see `DESIGN.md`'s open
/// questions for why this list stops there instead of guessing at more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum UnitToken {
    Angle,
    Density,
    Distance,
    None,
    Percent,
    Pixels,
}

const UNIT_TOKENS: &[(&[u8; 4], UnitToken)] = &[
    (b"#Ang", UnitToken::Angle),
    (b"#Rsl", UnitToken::Density),
    (b"#Rlt", UnitToken::Distance),
    (b"#Nne", UnitToken::None),
    (b"#Prc", UnitToken::Percent),
    (b"#Pxl", UnitToken::Pixels),
];

impl UnitToken {
    fn from_bytes(bytes: [u8; 4]) -> Option<Self> {
        UNIT_TOKENS
            .iter()
            .find(|(token, _)| **token == bytes)
            .map(|(_, unit)| *unit)
    }

    fn to_bytes(self) -> [u8; 4] {
        *UNIT_TOKENS
            .iter()
            .find(|(_, unit)| *unit == self)
            .expect("every UnitToken variant has a table entry")
            .0
    }
}

/// A reference item's sub-selector (`spec.md` §3.9 — six/seven sub-kinds a
/// `Reference` value's entries can take).
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum ReferenceItem {
    Property {
        name: String,
        class_id: DescriptorKey,
        key_id: DescriptorKey,
    },
    Class {
        name: String,
        class_id: DescriptorKey,
    },
    EnumeratedReference {
        name: String,
        class_id: DescriptorKey,
        key_id: DescriptorKey,
        enum_field: DescriptorKey,
    },
    Offset {
        name: String,
        class_id: DescriptorKey,
        value: u32,
    },
    Identifier(i32),
    Index(i32),
    Name {
        name: String,
        class_id: DescriptorKey,
        value: String,
    },
}

/// One value inside a [`Descriptor`]'s item map, tagged by its on-wire
/// OSType (`spec.md` §3.9).
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum DescriptorValue {
    Reference(Vec<ReferenceItem>),
    Descriptor(Box<Descriptor>),
    List(Vec<DescriptorValue>),
    Double(f64),
    UnitFloat(UnitToken, f64),
    /// The plural `UnFl` form: one unit shared across several float values.
    UnitFloats(UnitToken, Vec<f64>),
    String(String),
    Enumerated {
        type_id: DescriptorKey,
        value: DescriptorKey,
    },
    LargeInteger(i64),
    Integer(i32),
    Boolean(bool),
    GlobalObject(Box<Descriptor>),
    Class {
        name: String,
        class_id: DescriptorKey,
    },
    GlobalClass {
        name: String,
        class_id: DescriptorKey,
    },
    /// The `Clss` token: a third class-structure spelling, usable both as a
    /// reference sub-selector ([`ReferenceItem::Class`]) and, per the
    /// original reader, as a general descriptor value in its own right.
    ReferenceClass {
        name: String,
        class_id: DescriptorKey,
    },
    Alias(Vec<u8>),
    RawData(Vec<u8>),
    ObjectArray {
        class_id: DescriptorKey,
        items: Vec<DescriptorValue>,
    },
    /// Opaque path/alias payload; the on-disk shape beyond a length prefix
    /// is not documented in `spec.md` and is kept as raw bytes.
    Path(Vec<u8>),
}

const OS_TYPE_REFERENCE: &[u8; 4] = b"obj ";
const OS_TYPE_DESCRIPTOR: &[u8; 4] = b"Objc";
const OS_TYPE_LIST: &[u8; 4] = b"VlLs";
const OS_TYPE_DOUBLE: &[u8; 4] = b"doub";
const OS_TYPE_UNIT_FLOAT: &[u8; 4] = b"UntF";
const OS_TYPE_UNIT_FLOATS: &[u8; 4] = b"UnFl";
const OS_TYPE_TEXT: &[u8; 4] = b"TEXT";
const OS_TYPE_ENUMERATED: &[u8; 4] = b"enum";
const OS_TYPE_INTEGER: &[u8; 4] = b"long";
const OS_TYPE_LARGE_INTEGER: &[u8; 4] = b"comp";
const OS_TYPE_BOOL: &[u8; 4] = b"bool";
const OS_TYPE_GLOBAL_OBJECT: &[u8; 4] = b"GlbO";
const OS_TYPE_CLASS: &[u8; 4] = b"type";
const OS_TYPE_GLOBAL_CLASS: &[u8; 4] = b"GlbC";
const OS_TYPE_ALIAS: &[u8; 4] = b"alis";
const OS_TYPE_RAW_DATA: &[u8; 4] = b"tdta";
const OS_TYPE_OBJECT_ARRAY: &[u8; 4] = b"ObAr";
const OS_TYPE_PATH: &[u8; 4] = b"Pth ";

const REF_PROPERTY: &[u8; 4] = b"prop";
const REF_CLASS: &[u8; 4] = b"Clss";
const REF_ENUMERATED_REFERENCE: &[u8; 4] = b"Enmr";
const REF_OFFSET: &[u8; 4] = b"rele";
const REF_IDENTIFIER: &[u8; 4] = b"Idnt";
const REF_INDEX: &[u8; 4] = b"indx";
const REF_NAME: &[u8; 4] = b"name";

/// A recursively nested key/value tree (`spec.md` §3.9). Equality is
/// structural and insertion order is preserved — both required for the
/// round-trip invariant of §8.3.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// The human-readable name attached to the class id (often empty).
    pub name: String,
    /// This descriptor's class, e.g. `Clrs` for a color descriptor.
    pub class_id: DescriptorKey,
    /// Items in insertion order.
    pub items: Vec<(DescriptorKey, DescriptorValue)>,
}

impl Descriptor {
    /// Build an empty descriptor with the given class id.
    pub fn new(class_id: DescriptorKey) -> Self {
        Descriptor {
            name: String::new(),
            class_id,
            items: Vec::new(),
        }
    }

    /// Append an item, preserving insertion order.
    pub fn insert(&mut self, key: DescriptorKey, value: DescriptorValue) {
        self.items.push((key, value));
    }

    /// Look up a value by a known 4-byte terminology token.
    pub fn get(&self, key: &[u8; 4]) -> Option<&DescriptorValue> {
        self.items.iter().find(|(k, _)| k.matches(key)).map(|(_, v)| v)
    }

    /// Parse a descriptor from its on-wire form (§4.E's pseudocode).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DescriptorError> {
        let mut cursor = PsdCursor::new(bytes);
        Self::read(&mut cursor)
    }

    /// Serialize this descriptor to a standalone byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = PsdBuffer::new(Vec::new());
        self.write(&mut buffer);
        buffer.into_inner()
    }

    pub(crate) fn read(cursor: &mut PsdCursor) -> Result<Descriptor, DescriptorError> {
        let name = cursor.read_unicode_string();
        let class_id = DescriptorKey::read(cursor);
        let count = cursor.read_u32();

        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let key = DescriptorKey::read(cursor);
            let value = DescriptorValue::read(cursor)?;
            items.push((key, value));
        }

        Ok(Descriptor {
            name,
            class_id,
            items,
        })
    }
}

/// The 4-byte format version (always `16`) that precedes a descriptor
/// wherever one is embedded standalone — type tool settings, vector
/// stroke/fill content, the Slices V6/V7/V8 image resource. Kept distinct
/// from a bare [`Descriptor`] since not every embedding site has this
/// prefix (list/reference items and nested descriptors don't).
pub const EXPECTED_DESCRIPTOR_VERSION: u32 = 16;

impl Descriptor {
    /// Read a version-prefixed descriptor, checking the version equals
    /// [`EXPECTED_DESCRIPTOR_VERSION`].
    pub(crate) fn read_versioned(cursor: &mut PsdCursor) -> Result<Descriptor, DescriptorError> {
        let version = cursor.read_u32();
        if version != EXPECTED_DESCRIPTOR_VERSION {
            return Err(DescriptorError::InvalidOsType);
        }
        Descriptor::read(cursor)
    }

    /// Write this descriptor prefixed with [`EXPECTED_DESCRIPTOR_VERSION`].
    pub(crate) fn write_versioned<T: Write>(&self, buffer: &mut PsdBuffer<T>) {
        buffer.write(EXPECTED_DESCRIPTOR_VERSION.to_be_bytes());
        self.write(buffer);
    }
}

impl PsdSerialize for Descriptor {
    fn write<T: Write>(&self, buffer: &mut PsdBuffer<T>) {
        buffer.write_unicode_string(&self.name);
        self.class_id.write(buffer);
        buffer.write((self.items.len() as u32).to_be_bytes());
        for (key, value) in &self.items {
            key.write(buffer);
            value.write(buffer);
        }
    }
}

impl DescriptorValue {
    fn read(cursor: &mut PsdCursor) -> Result<DescriptorValue, DescriptorError> {
        let os_type = cursor.read_4();

        Ok(match &os_type {
            OS_TYPE_REFERENCE => DescriptorValue::Reference(Self::read_reference(cursor)?),
            OS_TYPE_DESCRIPTOR => {
                DescriptorValue::Descriptor(Box::new(Descriptor::read(cursor)?))
            }
            OS_TYPE_GLOBAL_OBJECT => {
                DescriptorValue::GlobalObject(Box::new(Descriptor::read(cursor)?))
            }
            OS_TYPE_LIST => DescriptorValue::List(Self::read_list(cursor)?),
            OS_TYPE_DOUBLE => DescriptorValue::Double(cursor.read_f64()),
            OS_TYPE_UNIT_FLOAT => {
                let unit = UnitToken::from_bytes(cursor.read_4())
                    .ok_or(DescriptorError::InvalidUnitToken)?;
                DescriptorValue::UnitFloat(unit, cursor.read_f64())
            }
            OS_TYPE_UNIT_FLOATS => {
                let unit = UnitToken::from_bytes(cursor.read_4())
                    .ok_or(DescriptorError::InvalidUnitToken)?;
                let count = cursor.read_u32();
                let values = (0..count).map(|_| cursor.read_f64()).collect();
                DescriptorValue::UnitFloats(unit, values)
            }
            OS_TYPE_TEXT => DescriptorValue::String(cursor.read_unicode_string()),
            OS_TYPE_ENUMERATED => DescriptorValue::Enumerated {
                type_id: DescriptorKey::read(cursor),
                value: DescriptorKey::read(cursor),
            },
            OS_TYPE_LARGE_INTEGER => DescriptorValue::LargeInteger(cursor.read_i64()),
            OS_TYPE_INTEGER => DescriptorValue::Integer(cursor.read_i32()),
            OS_TYPE_BOOL => DescriptorValue::Boolean(cursor.read_u8() != 0),
            OS_TYPE_CLASS => {
                let name = cursor.read_unicode_string();
                let class_id = DescriptorKey::read(cursor);
                DescriptorValue::Class { name, class_id }
            }
            OS_TYPE_GLOBAL_CLASS => {
                let name = cursor.read_unicode_string();
                let class_id = DescriptorKey::read(cursor);
                DescriptorValue::GlobalClass { name, class_id }
            }
            REF_CLASS => {
                let name = cursor.read_unicode_string();
                let class_id = DescriptorKey::read(cursor);
                DescriptorValue::ReferenceClass { name, class_id }
            }
            OS_TYPE_ALIAS => {
                let length = cursor.read_u32();
                DescriptorValue::Alias(cursor.read(length).to_vec())
            }
            OS_TYPE_RAW_DATA => {
                let length = cursor.read_u32();
                DescriptorValue::RawData(cursor.read(length).to_vec())
            }
            OS_TYPE_OBJECT_ARRAY => {
                let class_id = DescriptorKey::read(cursor);
                let count = cursor.read_u32();
                let mut items = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    items.push(DescriptorValue::read(cursor)?);
                }
                DescriptorValue::ObjectArray { class_id, items }
            }
            OS_TYPE_PATH => {
                let length = cursor.read_u32();
                DescriptorValue::Path(cursor.read(length).to_vec())
            }
            _ => return Err(DescriptorError::InvalidOsType),
        })
    }

    fn read_list(cursor: &mut PsdCursor) -> Result<Vec<DescriptorValue>, DescriptorError> {
        let count = cursor.read_u32();
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            values.push(DescriptorValue::read(cursor)?);
        }
        Ok(values)
    }

    fn read_reference(cursor: &mut PsdCursor) -> Result<Vec<ReferenceItem>, DescriptorError> {
        let count = cursor.read_u32();
        let mut items = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let selector = cursor.read_4();
            items.push(match &selector {
                REF_PROPERTY => ReferenceItem::Property {
                    name: cursor.read_unicode_string(),
                    class_id: DescriptorKey::read(cursor),
                    key_id: DescriptorKey::read(cursor),
                },
                REF_CLASS => ReferenceItem::Class {
                    name: cursor.read_unicode_string(),
                    class_id: DescriptorKey::read(cursor),
                },
                REF_ENUMERATED_REFERENCE => ReferenceItem::EnumeratedReference {
                    name: cursor.read_unicode_string(),
                    class_id: DescriptorKey::read(cursor),
                    key_id: DescriptorKey::read(cursor),
                    enum_field: DescriptorKey::read(cursor),
                },
                REF_OFFSET => ReferenceItem::Offset {
                    name: cursor.read_unicode_string(),
                    class_id: DescriptorKey::read(cursor),
                    value: cursor.read_u32(),
                },
                REF_IDENTIFIER => ReferenceItem::Identifier(cursor.read_i32()),
                REF_INDEX => ReferenceItem::Index(cursor.read_i32()),
                REF_NAME => ReferenceItem::Name {
                    name: cursor.read_unicode_string(),
                    class_id: DescriptorKey::read(cursor),
                    value: cursor.read_unicode_string(),
                },
                _ => return Err(DescriptorError::InvalidOsType),
            });
        }

        Ok(items)
    }

    fn write<T: Write>(&self, buffer: &mut PsdBuffer<T>) {
        match self {
            DescriptorValue::Reference(items) => {
                buffer.write(OS_TYPE_REFERENCE);
                buffer.write((items.len() as u32).to_be_bytes());
                for item in items {
                    item.write(buffer);
                }
            }
            DescriptorValue::Descriptor(descriptor) => {
                buffer.write(OS_TYPE_DESCRIPTOR);
                descriptor.write(buffer);
            }
            DescriptorValue::GlobalObject(descriptor) => {
                buffer.write(OS_TYPE_GLOBAL_OBJECT);
                descriptor.write(buffer);
            }
            DescriptorValue::List(values) => {
                buffer.write(OS_TYPE_LIST);
                buffer.write((values.len() as u32).to_be_bytes());
                for value in values {
                    value.write(buffer);
                }
            }
            DescriptorValue::Double(value) => {
                buffer.write(OS_TYPE_DOUBLE);
                buffer.write(value.to_be_bytes());
            }
            DescriptorValue::UnitFloat(unit, value) => {
                buffer.write(OS_TYPE_UNIT_FLOAT);
                buffer.write(unit.to_bytes());
                buffer.write(value.to_be_bytes());
            }
            DescriptorValue::UnitFloats(unit, values) => {
                buffer.write(OS_TYPE_UNIT_FLOATS);
                buffer.write(unit.to_bytes());
                buffer.write((values.len() as u32).to_be_bytes());
                for value in values {
                    buffer.write(value.to_be_bytes());
                }
            }
            DescriptorValue::String(value) => {
                buffer.write(OS_TYPE_TEXT);
                buffer.write_unicode_string(value);
            }
            DescriptorValue::Enumerated { type_id, value } => {
                buffer.write(OS_TYPE_ENUMERATED);
                type_id.write(buffer);
                value.write(buffer);
            }
            DescriptorValue::LargeInteger(value) => {
                buffer.write(OS_TYPE_LARGE_INTEGER);
                buffer.write(value.to_be_bytes());
            }
            DescriptorValue::Integer(value) => {
                buffer.write(OS_TYPE_INTEGER);
                buffer.write(value.to_be_bytes());
            }
            DescriptorValue::Boolean(value) => {
                buffer.write(OS_TYPE_BOOL);
                buffer.write([if *value { 1u8 } else { 0u8 }]);
            }
            DescriptorValue::Class { name, class_id } => {
                buffer.write(OS_TYPE_CLASS);
                AsUnicodeString(name).write(buffer);
                class_id.write(buffer);
            }
            DescriptorValue::GlobalClass { name, class_id } => {
                buffer.write(OS_TYPE_GLOBAL_CLASS);
                AsUnicodeString(name).write(buffer);
                class_id.write(buffer);
            }
            DescriptorValue::ReferenceClass { name, class_id } => {
                buffer.write(REF_CLASS);
                AsUnicodeString(name).write(buffer);
                class_id.write(buffer);
            }
            DescriptorValue::Alias(data) => {
                buffer.write(OS_TYPE_ALIAS);
                buffer.write((data.len() as u32).to_be_bytes());
                buffer.write(data);
            }
            DescriptorValue::RawData(data) => {
                buffer.write(OS_TYPE_RAW_DATA);
                buffer.write((data.len() as u32).to_be_bytes());
                buffer.write(data);
            }
            DescriptorValue::ObjectArray { class_id, items } => {
                buffer.write(OS_TYPE_OBJECT_ARRAY);
                class_id.write(buffer);
                buffer.write((items.len() as u32).to_be_bytes());
                for item in items {
                    item.write(buffer);
                }
            }
            DescriptorValue::Path(data) => {
                buffer.write(OS_TYPE_PATH);
                buffer.write((data.len() as u32).to_be_bytes());
                buffer.write(data);
            }
        }
    }
}

impl ReferenceItem {
    fn write<T: Write>(&self, buffer: &mut PsdBuffer<T>) {
        match self {
            ReferenceItem::Property {
                name,
                class_id,
                key_id,
            } => {
                buffer.write(REF_PROPERTY);
                AsUnicodeString(name).write(buffer);
                class_id.write(buffer);
                key_id.write(buffer);
            }
            ReferenceItem::Class { name, class_id } => {
                buffer.write(REF_CLASS);
                AsUnicodeString(name).write(buffer);
                class_id.write(buffer);
            }
            ReferenceItem::EnumeratedReference {
                name,
                class_id,
                key_id,
                enum_field,
            } => {
                buffer.write(REF_ENUMERATED_REFERENCE);
                AsUnicodeString(name).write(buffer);
                class_id.write(buffer);
                key_id.write(buffer);
                enum_field.write(buffer);
            }
            ReferenceItem::Offset {
                name,
                class_id,
                value,
            } => {
                buffer.write(REF_OFFSET);
                AsUnicodeString(name).write(buffer);
                class_id.write(buffer);
                buffer.write(value.to_be_bytes());
            }
            ReferenceItem::Identifier(value) => {
                buffer.write(REF_IDENTIFIER);
                buffer.write(value.to_be_bytes());
            }
            ReferenceItem::Index(value) => {
                buffer.write(REF_INDEX);
                buffer.write(value.to_be_bytes());
            }
            ReferenceItem::Name {
                name,
                class_id,
                value,
            } => {
                buffer.write(REF_NAME);
                AsUnicodeString(name).write(buffer);
                class_id.write(buffer);
                AsUnicodeString(value).write(buffer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_descriptor() -> Descriptor {
        let mut d = Descriptor::new(DescriptorKey::terminology(b"Clrs"));
        d.insert(DescriptorKey::terminology(b"Rd  "), DescriptorValue::Integer(255));
        d.insert(DescriptorKey::terminology(b"Grn "), DescriptorValue::Integer(128));
        d.insert(DescriptorKey::terminology(b"Bl  "), DescriptorValue::Integer(0));
        d
    }

    #[test]
    fn descriptor_round_trip() {
        let d = rgb_descriptor();
        let bytes = d.to_bytes();
        let parsed = Descriptor::from_bytes(&bytes).unwrap();
        assert_eq!(d, parsed);
    }

    #[test]
    fn unknown_literal_key_round_trips_with_explicit_length() {
        let mut d = Descriptor::new(DescriptorKey::terminology(b"null"));
        d.insert(
            DescriptorKey::literal(b"myCustomPluginKey".to_vec()),
            DescriptorValue::Boolean(true),
        );
        let parsed = Descriptor::from_bytes(&d.to_bytes()).unwrap();
        assert_eq!(d, parsed);
    }

    #[test]
    fn nested_descriptor_and_list_round_trip() {
        let mut inner = Descriptor::new(DescriptorKey::terminology(b"Grsc"));
        inner.insert(DescriptorKey::terminology(b"Gry "), DescriptorValue::Double(0.5));

        let mut outer = Descriptor::new(DescriptorKey::terminology(b"Lvls"));
        outer.insert(
            DescriptorKey::terminology(b"Chnl"),
            DescriptorValue::List(vec![
                DescriptorValue::Descriptor(Box::new(inner)),
                DescriptorValue::UnitFloat(UnitToken::Percent, 42.0),
                DescriptorValue::String("hello".into()),
            ]),
        );

        let parsed = Descriptor::from_bytes(&outer.to_bytes()).unwrap();
        assert_eq!(outer, parsed);
    }

    #[test]
    fn reference_with_every_selector_round_trips() {
        let mut d = Descriptor::new(DescriptorKey::terminology(b"null"));
        d.insert(
            DescriptorKey::terminology(b"null"),
            DescriptorValue::Reference(vec![
                ReferenceItem::Property {
                    name: "".into(),
                    class_id: DescriptorKey::terminology(b"Lyr "),
                    key_id: DescriptorKey::terminology(b"Opct"),
                },
                ReferenceItem::Class {
                    name: "".into(),
                    class_id: DescriptorKey::terminology(b"Lyr "),
                },
                ReferenceItem::EnumeratedReference {
                    name: "".into(),
                    class_id: DescriptorKey::terminology(b"Ordn"),
                    key_id: DescriptorKey::terminology(b"Ordn"),
                    enum_field: DescriptorKey::terminology(b"Trgt"),
                },
                ReferenceItem::Offset {
                    name: "".into(),
                    class_id: DescriptorKey::terminology(b"Lyr "),
                    value: 1,
                },
                ReferenceItem::Identifier(7),
                ReferenceItem::Index(0),
                ReferenceItem::Name {
                    name: "".into(),
                    class_id: DescriptorKey::terminology(b"Lyr "),
                    value: "Background".into(),
                },
            ]),
        );

        let parsed = Descriptor::from_bytes(&d.to_bytes()).unwrap();
        assert_eq!(d, parsed);
    }

    #[test]
    fn unrecognized_ostype_is_an_error() {
        let mut bytes = Vec::new();
        // name
        bytes.extend(0u32.to_be_bytes());
        // class id: terminology
        bytes.extend(0u32.to_be_bytes());
        bytes.extend(b"Xxxx");
        // item count
        bytes.extend(1u32.to_be_bytes());
        // key
        bytes.extend(0u32.to_be_bytes());
        bytes.extend(b"Xxxx");
        // bogus OSType
        bytes.extend(b"????");

        assert_eq!(Descriptor::from_bytes(&bytes), Err(DescriptorError::InvalidOsType));
    }
}
