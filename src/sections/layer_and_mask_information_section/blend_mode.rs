//! Layer blend modes (`spec.md` §3.4): a 4-byte OSType key stored in every
//! layer record, identifying which of Photoshop's compositing functions
//! combines that layer with what's beneath it.

/// One of Photoshop's layer blend modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    PassThrough,
    Normal,
    Dissolve,
    Darken,
    Multiply,
    ColorBurn,
    LinearBurn,
    DarkerColor,
    Lighten,
    Screen,
    ColorDodge,
    LinearDodge,
    LighterColor,
    Overlay,
    SoftLight,
    HardLight,
    VividLight,
    LinearLight,
    PinLight,
    HardMix,
    Difference,
    Exclusion,
    Subtract,
    Divide,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    /// Map a blend mode key (the 4 bytes following the `8BIM` signature in
    /// a layer record) to a `BlendMode`. Unrecognized keys fall back to
    /// `Normal` rather than erroring, since a blend mode this crate
    /// doesn't know about shouldn't prevent the rest of the layer from
    /// being read.
    pub fn from_key(key: &[u8; 4]) -> BlendMode {
        match key {
            b"pass" => BlendMode::PassThrough,
            b"norm" => BlendMode::Normal,
            b"diss" => BlendMode::Dissolve,
            b"dark" => BlendMode::Darken,
            b"mul " => BlendMode::Multiply,
            b"idiv" => BlendMode::ColorBurn,
            b"lbrn" => BlendMode::LinearBurn,
            b"dkCl" => BlendMode::DarkerColor,
            b"lite" => BlendMode::Lighten,
            b"scrn" => BlendMode::Screen,
            b"div " => BlendMode::ColorDodge,
            b"lddg" => BlendMode::LinearDodge,
            b"lgCl" => BlendMode::LighterColor,
            b"over" => BlendMode::Overlay,
            b"sLit" => BlendMode::SoftLight,
            b"hLit" => BlendMode::HardLight,
            b"vLit" => BlendMode::VividLight,
            b"lLit" => BlendMode::LinearLight,
            b"pLit" => BlendMode::PinLight,
            b"hMix" => BlendMode::HardMix,
            b"diff" => BlendMode::Difference,
            b"smud" => BlendMode::Exclusion,
            b"fsub" => BlendMode::Subtract,
            b"fdiv" => BlendMode::Divide,
            b"hue " => BlendMode::Hue,
            b"sat " => BlendMode::Saturation,
            b"colr" => BlendMode::Color,
            b"lum " => BlendMode::Luminosity,
            _ => {
                log::warn!(
                    "Unrecognized blend mode key {:?}, defaulting to Normal",
                    String::from_utf8_lossy(key)
                );
                BlendMode::Normal
            }
        }
    }

    pub fn as_key(&self) -> &'static [u8; 4] {
        match self {
            BlendMode::PassThrough => b"pass",
            BlendMode::Normal => b"norm",
            BlendMode::Dissolve => b"diss",
            BlendMode::Darken => b"dark",
            BlendMode::Multiply => b"mul ",
            BlendMode::ColorBurn => b"idiv",
            BlendMode::LinearBurn => b"lbrn",
            BlendMode::DarkerColor => b"dkCl",
            BlendMode::Lighten => b"lite",
            BlendMode::Screen => b"scrn",
            BlendMode::ColorDodge => b"div ",
            BlendMode::LinearDodge => b"lddg",
            BlendMode::LighterColor => b"lgCl",
            BlendMode::Overlay => b"over",
            BlendMode::SoftLight => b"sLit",
            BlendMode::HardLight => b"hLit",
            BlendMode::VividLight => b"vLit",
            BlendMode::LinearLight => b"lLit",
            BlendMode::PinLight => b"pLit",
            BlendMode::HardMix => b"hMix",
            BlendMode::Difference => b"diff",
            BlendMode::Exclusion => b"smud",
            BlendMode::Subtract => b"fsub",
            BlendMode::Divide => b"fdiv",
            BlendMode::Hue => b"hue ",
            BlendMode::Saturation => b"sat ",
            BlendMode::Color => b"colr",
            BlendMode::Luminosity => b"lum ",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_known_key() {
        let keys: &[&[u8; 4]] = &[
            b"pass", b"norm", b"diss", b"dark", b"mul ", b"idiv", b"lbrn", b"dkCl", b"lite",
            b"scrn", b"div ", b"lddg", b"lgCl", b"over", b"sLit", b"hLit", b"vLit", b"lLit",
            b"pLit", b"hMix", b"diff", b"smud", b"fsub", b"fdiv", b"hue ", b"sat ", b"colr",
            b"lum ",
        ];
        for key in keys {
            let mode = BlendMode::from_key(key);
            assert_eq!(mode.as_key(), *key);
        }
    }

    #[test]
    fn unknown_key_defaults_to_normal() {
        assert_eq!(BlendMode::from_key(b"xxxx"), BlendMode::Normal);
    }
}
