use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Endless rainbow: each item is the current hue at full saturation and 50%
/// lightness, after which the hue moves on by one degree.
#[derive(Clone, Debug, Default)]
pub struct ColorCycle {
    hue: u16,
}

impl ColorCycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hue(&self) -> u16 {
        self.hue
    }
}

impl Iterator for ColorCycle {
    type Item = Rgb;

    fn next(&mut self) -> Option<Rgb> {
        let color = hsl_to_rgb(f64::from(self.hue) / 360.0, 1.0, 0.5);
        self.hue = (self.hue + 1) % 360;
        Some(color)
    }
}

pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> Rgb {
    let (r, g, b) = if s == 0.0 {
        (l, l, l)
    } else {
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        (
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
        )
    };
    Rgb {
        r: to_byte(r),
        g: to_byte(g),
        b: to_byte(b),
    }
}

fn hue_to_channel(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

fn to_byte(channel: f64) -> u8 {
    (channel * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_red_and_walks_the_hue() {
        let mut cycle = ColorCycle::new();
        assert_eq!(cycle.next().unwrap().to_string(), "#ff0000");
        assert_eq!(cycle.hue(), 1);
        let yellow = cycle.by_ref().nth(59).unwrap();
        assert_eq!(yellow.to_string(), "#ffff00");
        assert_eq!(cycle.hue(), 61);
    }

    #[test]
    fn wraps_after_full_turn() {
        let mut cycle = ColorCycle::new();
        let first = cycle.next().unwrap();
        for _ in 1..360 {
            cycle.next();
        }
        assert_eq!(cycle.hue(), 0);
        assert_eq!(cycle.next().unwrap(), first);
    }

    #[test]
    fn is_deterministic_across_instances() {
        let a = ColorCycle::new().take(720).collect::<Vec<_>>();
        let b = ColorCycle::new().take(720).collect::<Vec<_>>();
        assert_eq!(a, b);
        assert_eq!(a[0], a[360]);
    }

    #[test]
    fn grey_when_unsaturated() {
        assert_eq!(hsl_to_rgb(0.3, 0.0, 0.5).to_string(), "#808080");
    }
}
