use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ColorError {
    #[error("invalid hex color {0:?}, expected #rrggbb")]
    InvalidHex(String),
    #[error("a color scale needs at least one stop")]
    NoStops,
    #[error("color domain [{0}, {1}] must be finite and increasing")]
    InvalidDomain(f64, f64),
}

/// Continuous color scale with evenly spaced stops over a fixed domain.
/// Values outside the domain clamp to the end colors.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    stops: Vec<Rgb<u8>>,
    domain: [f64; 2],
}

impl ColorScale {
    pub fn new(hex_stops: &[String], domain: [f64; 2]) -> Result<Self, ColorError> {
        if hex_stops.is_empty() {
            return Err(ColorError::NoStops);
        }
        let [lo, hi] = domain;
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(ColorError::InvalidDomain(lo, hi));
        }
        let stops = hex_stops
            .iter()
            .map(|h| hex_to_rgb(h))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { stops, domain })
    }

    pub fn color_at(&self, value: f64) -> Rgb<u8> {
        let [lo, hi] = self.domain;
        if self.stops.len() == 1 {
            return self.stops[0];
        }
        let t = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
        let segments = (self.stops.len() - 1) as f64;
        let pos = t * segments;
        let i = (pos.floor() as usize).min(self.stops.len() - 2);
        let frac = pos - i as f64;
        let (a, b) = (self.stops[i], self.stops[i + 1]);
        let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
        Rgb([lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2])])
    }

    pub fn hex_at(&self, value: f64) -> String {
        rgb_to_hex(self.color_at(value))
    }
}

pub fn hex_to_rgb(hex: &str) -> Result<Rgb<u8>, ColorError> {
    let invalid = || ColorError::InvalidHex(hex.to_string());
    let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
    };
    Ok(Rgb([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
}

pub fn rgb_to_hex(color: Rgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

/// Render the scale as a horizontal gradient strip, low end on the left.
pub fn colorbar_png(scale: &ColorScale, width: u32, height: u32) -> image::ImageResult<Vec<u8>> {
    let [lo, hi] = scale.domain;
    let span = width.saturating_sub(1).max(1) as f64;
    let img: RgbImage = ImageBuffer::from_fn(width, height, |x, _| {
        scale.color_at(lo + (x as f64 / span) * (hi - lo))
    });

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rally_scale() -> ColorScale {
        let stops = ["#61c462", "#ffff00", "#f89406", "#ee5f5a"].map(String::from);
        ColorScale::new(&stops, [0.0, 100.0]).unwrap()
    }

    #[test]
    fn parses_and_formats_hex() {
        assert_eq!(hex_to_rgb("#61c462").unwrap(), Rgb([0x61, 0xc4, 0x62]));
        assert_eq!(rgb_to_hex(Rgb([0xee, 0x5f, 0x5a])), "#ee5f5a");
        assert!(hex_to_rgb("61c462").is_err());
        assert!(hex_to_rgb("#61c4").is_err());
        assert!(hex_to_rgb("#zzzzzz").is_err());
    }

    #[test]
    fn signed_or_spaced_digits_are_not_hex() {
        for bad in ["#+1+2+3", "#-1-2-3", "# 1 2 3", "#+ff+ff"] {
            assert_eq!(hex_to_rgb(bad), Err(ColorError::InvalidHex(bad.to_string())));
        }
        assert_eq!(hex_to_rgb("#FFaa00").unwrap(), Rgb([0xff, 0xaa, 0x00]));
    }

    #[test]
    fn stops_land_on_even_fractions_of_domain() {
        let scale = rally_scale();
        assert_eq!(scale.hex_at(0.0), "#61c462");
        assert_eq!(scale.hex_at(100.0 / 3.0), "#ffff00");
        assert_eq!(scale.hex_at(200.0 / 3.0), "#f89406");
        assert_eq!(scale.hex_at(100.0), "#ee5f5a");
    }

    #[test]
    fn values_outside_domain_clamp() {
        let scale = rally_scale();
        assert_eq!(scale.hex_at(150.0), scale.hex_at(100.0));
        assert_eq!(scale.hex_at(-5.0), scale.hex_at(0.0));
    }

    #[test]
    fn rejects_bad_domain_and_empty_scale() {
        assert_eq!(
            ColorScale::new(&["#000000".to_string()], [100.0, 0.0]).unwrap_err(),
            ColorError::InvalidDomain(100.0, 0.0)
        );
        assert_eq!(ColorScale::new(&[], [0.0, 100.0]).unwrap_err(), ColorError::NoStops);
    }

    #[test]
    fn colorbar_is_a_decodable_png() {
        let scale = rally_scale();
        let bytes = colorbar_png(&scale, 64, 4).unwrap();
        let img = image::load_from_memory_with_format(&bytes, ImageFormat::Png)
            .unwrap()
            .to_rgb8();
        assert_eq!(img.dimensions(), (64, 4));
        assert_eq!(*img.get_pixel(0, 0), Rgb([0x61, 0xc4, 0x62]));
        assert_eq!(*img.get_pixel(63, 3), Rgb([0xee, 0x5f, 0x5a]));
    }
}
