use serde::{Deserialize, Serialize};

use crate::error::{BumpError, BumpResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Modulate this colour's alpha by a paint alpha (0-255).
    pub fn with_alpha_scaled(self, alpha: u8) -> Self {
        let a = (self.a as u16 * alpha as u16 + 127) / 255;
        Self { a: a as u8, ..self }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Rgba,
}

impl GradientStop {
    pub const fn new(offset: f32, color: Rgba) -> Self {
        Self { offset, color }
    }
}

/// Radial gradient colours from the centre (offset 0) to the edge (offset 1).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorRamp {
    stops: Vec<GradientStop>,
}

impl ColorRamp {
    pub fn new(stops: Vec<GradientStop>) -> BumpResult<Self> {
        let ramp = Self { stops };
        ramp.validate()?;
        Ok(ramp)
    }

    /// Transparent green core through yellow and orange to an opaque red rim.
    pub fn heat() -> Self {
        Self {
            stops: vec![
                GradientStop::new(0.0, Rgba::new(0, 255, 0, 0)),
                GradientStop::new(0.3, Rgba::new(0, 255, 0, 100)),
                GradientStop::new(0.6, Rgba::new(255, 255, 0, 150)),
                GradientStop::new(0.8, Rgba::new(255, 165, 0, 200)),
                GradientStop::new(1.0, Rgba::new(255, 0, 0, 255)),
            ],
        }
    }

    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }

    pub fn validate(&self) -> BumpResult<()> {
        if self.stops.is_empty() {
            return Err(BumpError::InvalidConfig(
                "color ramp needs at least one stop".to_string(),
            ));
        }
        if self
            .stops
            .iter()
            .any(|s| !(0.0..=1.0).contains(&s.offset))
        {
            return Err(BumpError::InvalidConfig(
                "color ramp offsets must lie in [0, 1]".to_string(),
            ));
        }
        if self.stops.windows(2).any(|w| w[1].offset < w[0].offset) {
            return Err(BumpError::InvalidConfig(
                "color ramp offsets must be ascending".to_string(),
            ));
        }
        Ok(())
    }

    /// Colour at `t` along the ramp, clamping outside the first and last stop.
    pub fn sample(&self, t: f32) -> Rgba {
        let (first, last) = match (self.stops.first(), self.stops.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Rgba::new(0, 0, 0, 0),
        };
        if t.is_nan() || t <= first.offset {
            return first.color;
        }
        if t >= last.offset {
            return last.color;
        }

        for pair in self.stops.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            if t <= hi.offset {
                let span = hi.offset - lo.offset;
                if span <= f32::EPSILON {
                    return hi.color;
                }
                let f = (t - lo.offset) / span;
                return Rgba {
                    r: lerp(lo.color.r, hi.color.r, f),
                    g: lerp(lo.color.g, hi.color.g, f),
                    b: lerp(lo.color.b, hi.color.b, f),
                    a: lerp(lo.color.a, hi.color.a, f),
                };
            }
        }
        last.color
    }
}

impl Default for ColorRamp {
    fn default() -> Self {
        Self::heat()
    }
}

fn lerp(a: u8, b: u8, f: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * f).round().clamp(0.0, 255.0) as u8
}
