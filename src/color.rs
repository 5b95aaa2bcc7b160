/// Lightness at or below this is treated as black.
pub const BLACK_EPSILON: f32 = 1e-5;
const HUE_SNAP: f32 = 1e-6;

/// Hue/saturation/lightness, every component in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

/// Linear RGB intensities in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Hsl {
    pub const BLACK: Hsl = Hsl { h: 0.0, s: 0.0, l: 0.0 };

    pub const fn new(h: f32, s: f32, l: f32) -> Self {
        Self { h, s, l }
    }

    pub fn is_black(&self) -> bool {
        self.l.abs() <= BLACK_EPSILON
    }

    /// True when `other` is within `hue_tol` on hue and within `sl_tol` on both
    /// saturation and lightness.
    pub fn close_to(&self, other: &Hsl, hue_tol: f32, sl_tol: f32) -> bool {
        (self.h - other.h).abs() <= hue_tol
            && (self.s - other.s).abs() <= sl_tol
            && (self.l - other.l).abs() <= sl_tol
    }

    pub fn with_lightness(self, l: f32) -> Self {
        Self { l, ..self }
    }

    pub fn to_rgb(&self) -> Rgb {
        let h = self.h.rem_euclid(1.0);
        let s = self.s.clamp(0.0, 1.0);
        let l = self.l.clamp(0.0, 1.0);
        if s == 0.0 {
            return Rgb { r: l, g: l, b: l };
        }
        let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let m1 = 2.0 * l - m2;
        Rgb {
            r: hue_channel(m1, m2, h + 1.0 / 3.0),
            g: hue_channel(m1, m2, h),
            b: hue_channel(m1, m2, h - 1.0 / 3.0),
        }
    }

    /// 8-bit channels, truncating.
    pub fn to_rgb8(&self) -> (u8, u8, u8) {
        let c = self.to_rgb();
        (to_u8(c.r), to_u8(c.g), to_u8(c.b))
    }
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn channels(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_hsl(&self) -> Hsl {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let l = (min + max) / 2.0;
        if (max - min).abs() <= f32::EPSILON {
            return Hsl::new(0.0, 0.0, l);
        }
        let span = max - min;
        let s = if l <= 0.5 {
            span / (max + min)
        } else {
            span / (2.0 - max - min)
        };
        let rc = (max - self.r) / span;
        let gc = (max - self.g) / span;
        let bc = (max - self.b) / span;
        let h = if self.r == max {
            bc - gc
        } else if self.g == max {
            2.0 + rc - bc
        } else {
            4.0 + gc - rc
        };
        // Rounding leaves red a hair below zero, which rem_euclid sends to ~1.0.
        let h = (h / 6.0).rem_euclid(1.0);
        Hsl::new(if h >= 1.0 - HUE_SNAP { 0.0 } else { h }, s, l)
    }
}

fn hue_channel(m1: f32, m2: f32, hue: f32) -> f32 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

/// Adds `delta` and wraps back into 0..1 once past 1.0.
pub fn wrap_unit(v: f32, delta: f32) -> f32 {
    let out = v + delta;
    if out > 1.0 { out - 1.0 } else { out }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_red_round_trips() {
        let red = Hsl::new(0.0, 1.0, 0.5);
        assert_eq!(red.to_rgb8(), (255, 0, 0));
        let back = red.to_rgb().to_hsl();
        assert!(back.close_to(&red, 1e-4, 1e-4), "{back:?}");
    }

    #[test]
    fn hue_just_below_zero_maps_to_red() {
        let rgb = Rgb { r: 1.0, g: 0.0, b: 3.6e-7 };
        let hsl = rgb.to_hsl();
        assert!((0.0..1.0).contains(&hsl.h), "{hsl:?}");
        assert!(hsl.close_to(&Hsl::new(0.0, 1.0, 0.5), 1e-4, 1e-4), "{hsl:?}");
    }

    #[test]
    fn hue_above_one_wraps() {
        assert_eq!(Hsl::new(1.5, 1.0, 0.5).to_rgb8(), Hsl::new(0.5, 1.0, 0.5).to_rgb8());
    }

    #[test]
    fn grey_has_no_saturation() {
        let grey = Rgb::new(0.4, 0.4, 0.4).to_hsl();
        assert_eq!(grey.s, 0.0);
        assert!((grey.l - 0.4).abs() < 1e-6);
    }
}
