//! Color specifications from the settings file.

/// How a color is allocated in a colormap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorSpec {
    /// `#rgb` or `#rrggbb`, scaled to 16-bit channels
    Rgb(u16, u16, u16),
    /// Server color database name, e.g. `black`
    Named(String),
}

impl ColorSpec {
    /// Parse a setting value. Anything not starting with `#` is a name.
    pub fn parse(value: &str) -> Option<Self> {
        let Some(hex) = value.strip_prefix('#') else {
            return (!value.is_empty()).then(|| Self::Named(value.to_owned()));
        };
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let digits = match hex.len() {
            3 => 1,
            6 => 2,
            _ => return None,
        };
        let channel = |i: usize| -> Option<u16> {
            let field = u16::from_str_radix(hex.get(i * digits..(i + 1) * digits)?, 16).ok()?;
            // 0xf -> 0xffff, 0xff -> 0xffff
            Some(if digits == 1 { field * 0x1111 } else { field * 0x0101 })
        };
        Some(Self::Rgb(channel(0)?, channel(1)?, channel(2)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_scale_to_16_bits() {
        assert_eq!(ColorSpec::parse("#006600"), Some(ColorSpec::Rgb(0, 0x6666, 0)));
        assert_eq!(ColorSpec::parse("#fff"), Some(ColorSpec::Rgb(0xffff, 0xffff, 0xffff)));
        assert_eq!(ColorSpec::parse("#FF0080"), Some(ColorSpec::Rgb(0xffff, 0, 0x8080)));
    }

    #[test]
    fn names_pass_through() {
        assert_eq!(ColorSpec::parse("black"), Some(ColorSpec::Named("black".into())));
    }

    #[test]
    fn malformed_values_are_rejected() {
        for value in ["", "#", "#12", "#12345", "#gg0000", "#+f0000"] {
            assert_eq!(ColorSpec::parse(value), None, "{value}");
        }
    }
}
