//! Layer mask data (`spec.md` §3.5).

use std::io::Write;

use crate::sections::{PsdBuffer, PsdCursor, PsdSerialize};

/// Per-channel parameters applied to a user or vector mask when the
/// "parameters applied" flag is set: a density byte and/or a feather
/// distance, selected by a bitmask in the mask record.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaskParameters {
    pub user_mask_density: Option<u8>,
    pub user_mask_feather: Option<f64>,
    pub vector_mask_density: Option<u8>,
    pub vector_mask_feather: Option<f64>,
}

const PARAM_USER_DENSITY: u8 = 0b0001;
const PARAM_USER_FEATHER: u8 = 0b0010;
const PARAM_VECTOR_DENSITY: u8 = 0b0100;
const PARAM_VECTOR_FEATHER: u8 = 0b1000;

impl MaskParameters {
    fn read(cursor: &mut PsdCursor, selector: u8) -> Self {
        let mut params = MaskParameters::default();
        if selector & PARAM_USER_DENSITY != 0 {
            params.user_mask_density = Some(cursor.read_u8());
        }
        if selector & PARAM_USER_FEATHER != 0 {
            params.user_mask_feather = Some(cursor.read_f64());
        }
        if selector & PARAM_VECTOR_DENSITY != 0 {
            params.vector_mask_density = Some(cursor.read_u8());
        }
        if selector & PARAM_VECTOR_FEATHER != 0 {
            params.vector_mask_feather = Some(cursor.read_f64());
        }
        params
    }

    fn selector(&self) -> u8 {
        let mut selector = 0;
        if self.user_mask_density.is_some() {
            selector |= PARAM_USER_DENSITY;
        }
        if self.user_mask_feather.is_some() {
            selector |= PARAM_USER_FEATHER;
        }
        if self.vector_mask_density.is_some() {
            selector |= PARAM_VECTOR_DENSITY;
        }
        if self.vector_mask_feather.is_some() {
            selector |= PARAM_VECTOR_FEATHER;
        }
        selector
    }

    fn write<T: Write>(&self, buffer: &mut PsdBuffer<T>) {
        if let Some(d) = self.user_mask_density {
            buffer.write([d]);
        }
        if let Some(f) = self.user_mask_feather {
            buffer.write(f.to_be_bytes());
        }
        if let Some(d) = self.vector_mask_density {
            buffer.write([d]);
        }
        if let Some(f) = self.vector_mask_feather {
            buffer.write(f.to_be_bytes());
        }
    }
}

/// Mask-record flag bits (shared by the user-mask and "real" mask flag bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaskFlags(u8);

impl MaskFlags {
    pub const POSITION_RELATIVE_TO_LAYER: MaskFlags = MaskFlags(1 << 0);
    pub const MASK_DISABLED: MaskFlags = MaskFlags(1 << 1);
    pub const INVERT_MASK_WHEN_BLENDING: MaskFlags = MaskFlags(1 << 2);
    pub const MASK_FROM_RENDERING_OTHER_DATA: MaskFlags = MaskFlags(1 << 3);
    pub const PARAMETERS_APPLIED: MaskFlags = MaskFlags(1 << 4);

    pub fn empty() -> Self {
        MaskFlags(0)
    }

    pub fn from_bits_truncate(bits: u8) -> Self {
        MaskFlags(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: MaskFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for MaskFlags {
    type Output = MaskFlags;

    fn bitor(self, rhs: MaskFlags) -> MaskFlags {
        MaskFlags(self.0 | rhs.0)
    }
}

/// A user (pixel) mask's bounding box and default fill color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserMask {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
    pub default_color: u8,
    pub flags: MaskFlags,
}

/// Layer mask data: absent, a plain user mask, or a user mask paired with a
/// "real" (composed) mask plus optional per-mask feather/density parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum MaskData {
    None,
    User(UserMask),
    UserAndReal {
        user: UserMask,
        real_flags: MaskFlags,
        real_default_color: u8,
        real_top: i32,
        real_left: i32,
        real_bottom: i32,
        real_right: i32,
        parameters: Option<MaskParameters>,
    },
}

impl MaskData {
    pub(crate) fn read(cursor: &mut PsdCursor) -> MaskData {
        let length = cursor.read_u32();
        if length == 0 {
            return MaskData::None;
        }

        let start = cursor.position();
        let top = cursor.read_i32();
        let left = cursor.read_i32();
        let bottom = cursor.read_i32();
        let right = cursor.read_i32();
        let default_color = cursor.read_u8();
        let flags = MaskFlags::from_bits_truncate(cursor.read_u8());

        let user = UserMask {
            top,
            left,
            bottom,
            right,
            default_color,
            flags,
        };

        let consumed = cursor.position() - start;
        if consumed >= length as u64 {
            // Skip any trailing padding inside the declared length.
            let remaining = length as u64 - consumed;
            if remaining > 0 {
                cursor.read(remaining as u32);
            }
            return MaskData::User(user);
        }

        // >= 36 bytes: real mask + user mask, real bbox overrides at the end.
        let parameters_applied = flags.contains(MaskFlags::PARAMETERS_APPLIED);
        let real_flags = MaskFlags::from_bits_truncate(cursor.read_u8());
        let real_default_color = cursor.read_u8();
        let real_top = cursor.read_i32();
        let real_left = cursor.read_i32();
        let real_bottom = cursor.read_i32();
        let real_right = cursor.read_i32();

        let parameters = if parameters_applied {
            let selector = cursor.read_u8();
            Some(MaskParameters::read(cursor, selector))
        } else {
            None
        };

        let consumed = cursor.position() - start;
        if consumed < length as u64 {
            cursor.read((length as u64 - consumed) as u32);
        }

        MaskData::UserAndReal {
            user,
            real_flags,
            real_default_color,
            real_top,
            real_left,
            real_bottom,
            real_right,
            parameters,
        }
    }
}

impl PsdSerialize for MaskData {
    fn write<T: Write>(&self, buffer: &mut PsdBuffer<T>) {
        match self {
            MaskData::None => buffer.write(0u32.to_be_bytes()),
            MaskData::User(mask) => {
                buffer.write_sized(|buf| {
                    buf.write(mask.top.to_be_bytes());
                    buf.write(mask.left.to_be_bytes());
                    buf.write(mask.bottom.to_be_bytes());
                    buf.write(mask.right.to_be_bytes());
                    buf.write([mask.default_color]);
                    buf.write([mask.flags.bits()]);
                });
            }
            MaskData::UserAndReal {
                user,
                real_flags,
                real_default_color,
                real_top,
                real_left,
                real_bottom,
                real_right,
                parameters,
            } => {
                buffer.write_sized(|buf| {
                    buf.write(user.top.to_be_bytes());
                    buf.write(user.left.to_be_bytes());
                    buf.write(user.bottom.to_be_bytes());
                    buf.write(user.right.to_be_bytes());
                    buf.write([user.default_color]);
                    buf.write([user.flags.bits()]);
                    buf.write([real_flags.bits()]);
                    buf.write([*real_default_color]);
                    buf.write(real_top.to_be_bytes());
                    buf.write(real_left.to_be_bytes());
                    buf.write(real_bottom.to_be_bytes());
                    buf.write(real_right.to_be_bytes());
                    if let Some(params) = parameters {
                        buf.write([params.selector()]);
                        params.write(buf);
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mask_round_trips() {
        let mask = MaskData::None;
        let mut bytes = Vec::new();
        let mut buffer = PsdBuffer::new(&mut bytes);
        mask.write(&mut buffer);

        let mut cursor = PsdCursor::new(&bytes);
        assert_eq!(MaskData::read(&mut cursor), mask);
    }

    #[test]
    fn user_mask_round_trips() {
        let mask = MaskData::User(UserMask {
            top: 0,
            left: 0,
            bottom: 100,
            right: 100,
            default_color: 255,
            flags: MaskFlags::MASK_DISABLED,
        });
        let mut bytes = Vec::new();
        let mut buffer = PsdBuffer::new(&mut bytes);
        mask.write(&mut buffer);

        let mut cursor = PsdCursor::new(&bytes);
        assert_eq!(MaskData::read(&mut cursor), mask);
    }

    #[test]
    fn user_and_real_mask_round_trips_with_parameters() {
        let mask = MaskData::UserAndReal {
            user: UserMask {
                top: 1,
                left: 2,
                bottom: 50,
                right: 60,
                default_color: 0,
                flags: MaskFlags::PARAMETERS_APPLIED,
            },
            real_flags: MaskFlags::empty(),
            real_default_color: 255,
            real_top: 1,
            real_left: 2,
            real_bottom: 50,
            real_right: 60,
            parameters: Some(MaskParameters {
                user_mask_density: Some(128),
                user_mask_feather: Some(2.5),
                vector_mask_density: None,
                vector_mask_feather: None,
            }),
        };
        let mut bytes = Vec::new();
        let mut buffer = PsdBuffer::new(&mut bytes);
        mask.write(&mut buffer);

        let mut cursor = PsdCursor::new(&bytes);
        assert_eq!(MaskData::read(&mut cursor), mask);
    }
}
