//! Viewport-aware heatmap rendering.
//!
//! [`render`] is a pure function of a store snapshot, the screen rectangle,
//! the geo→pixel projection and a [`RenderConfig`]. It performs, in order:
//!
//! 1. cull: keep points whose projected pixel lies inside the viewport grown
//!    by `viewport_margin` on every side (half-open: min inclusive, max
//!    exclusive), so circles straddling the edge do not pop. Pixels are
//!    compared as projected, without truncating to whole pixels first;
//! 2. subsample: above `render_budget` visible points keep every
//!    `floor(n / budget)`-th point starting at index 0;
//! 3. normalise weights over the kept subset with a span floor of 0.1;
//! 4. map each normalised weight to `radius · (0.5 + 0.5·w)`.
//!
//! Commands come out in snapshot order (oldest first), so newer points are
//! drawn on top.

use geo::{Coord, Rect};
use log::trace;
use serde::{Deserialize, Serialize};

use super::projection::Projection;
use super::ramp::{ColorRamp, GradientStop};
use crate::error::{BumpError, BumpResult};
use crate::store::PointSnapshot;

/// Minimum weight span used for normalisation.
pub const MIN_WEIGHT_SPAN: f64 = 0.1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Circle radius in pixels for the heaviest visible point.
    pub radius: f64,
    /// Global opacity in [0, 1] applied over the colour ramp.
    pub opacity: f32,
    /// Visible point count above which the set is subsampled.
    pub render_budget: usize,
    /// Pixels added to every side of the viewport before culling.
    pub viewport_margin: f64,
    pub ramp: ColorRamp,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            radius: 80.0,
            opacity: 0.6,
            render_budget: 500,
            viewport_margin: 100.0,
            ramp: ColorRamp::heat(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> BumpResult<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(BumpError::InvalidConfig(format!(
                "heatmap radius must be positive, got {}",
                self.radius
            )));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(BumpError::InvalidConfig(format!(
                "heatmap opacity must be within [0, 1], got {}",
                self.opacity
            )));
        }
        if self.render_budget == 0 {
            return Err(BumpError::InvalidConfig(
                "render budget must be at least 1".to_string(),
            ));
        }
        if !(self.viewport_margin.is_finite() && self.viewport_margin >= 0.0) {
            return Err(BumpError::InvalidConfig(format!(
                "viewport margin must be non-negative, got {}",
                self.viewport_margin
            )));
        }
        self.ramp.validate()
    }

    /// Paint alpha (0-255) for the configured opacity.
    pub fn alpha(&self) -> u8 {
        (self.opacity.clamp(0.0, 1.0) * 255.0) as u8
    }
}

/// One filled circle with the frame's radial gradient.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawCommand {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub alpha: u8,
    pub normalized_weight: f64,
}

impl DrawCommand {
    pub fn center(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }
}

/// Output of one render pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatmapFrame {
    /// Gradient shared by every command, centre to edge.
    pub ramp: ColorRamp,
    /// Number of points that survived culling, before subsampling.
    pub visible: usize,
    pub commands: Vec<DrawCommand>,
}

impl HeatmapFrame {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Ramp stops with the paint alpha folded into each colour.
    pub fn effective_stops(&self, alpha: u8) -> Vec<GradientStop> {
        self.ramp
            .stops()
            .iter()
            .map(|s| GradientStop::new(s.offset, s.color.with_alpha_scaled(alpha)))
            .collect()
    }
}

/// Min/span pair used to map weights into [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightRange {
    pub min: f64,
    pub span: f64,
}

impl WeightRange {
    pub fn of<I>(weights: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let (min, max) = weights
            .into_iter()
            .fold(None, |acc: Option<(f64, f64)>, w| match acc {
                None => Some((w, w)),
                Some((lo, hi)) => Some((lo.min(w), hi.max(w))),
            })?;
        Some(Self {
            min,
            span: (max - min).max(MIN_WEIGHT_SPAN),
        })
    }

    pub fn normalize(&self, weight: f64) -> f64 {
        ((weight - self.min) / self.span).clamp(0.0, 1.0)
    }
}

/// Viewport grown by `margin` pixels on every side.
pub fn expand(viewport: &Rect<f64>, margin: f64) -> Rect<f64> {
    let min = viewport.min();
    let max = viewport.max();
    Rect::new(
        Coord {
            x: min.x - margin,
            y: min.y - margin,
        },
        Coord {
            x: max.x + margin,
            y: max.y + margin,
        },
    )
}

fn contains(bounds: &Rect<f64>, pixel: Coord<f64>) -> bool {
    let min = bounds.min();
    let max = bounds.max();
    pixel.x >= min.x && pixel.x < max.x && pixel.y >= min.y && pixel.y < max.y
}

/// Indices kept out of `n` items under `budget`: all of them when `n <= budget`,
/// otherwise `0, s, 2s, …` with `s = floor(n / budget)`.
pub fn subsample_indices(n: usize, budget: usize) -> impl Iterator<Item = usize> {
    let budget = budget.max(1);
    let stride = if n > budget { n / budget } else { 1 };
    (0..n).step_by(stride)
}

pub fn render<P>(
    snapshot: &PointSnapshot,
    viewport: &Rect<f64>,
    projection: &P,
    config: &RenderConfig,
) -> HeatmapFrame
where
    P: Projection + ?Sized,
{
    let bounds = expand(viewport, config.viewport_margin);

    let visible: Vec<(Coord<f64>, f64)> = snapshot
        .iter()
        .filter_map(|p| {
            let pixel = projection.to_pixels(p.latitude, p.longitude);
            contains(&bounds, pixel).then_some((pixel, p.weight))
        })
        .collect();

    let mut frame = HeatmapFrame {
        ramp: config.ramp.clone(),
        visible: visible.len(),
        commands: Vec::new(),
    };

    let selected: Vec<(Coord<f64>, f64)> = subsample_indices(visible.len(), config.render_budget)
        .map(|i| visible[i])
        .collect();

    let range = match WeightRange::of(selected.iter().map(|(_, w)| *w)) {
        Some(range) => range,
        None => return frame,
    };

    let alpha = config.alpha();
    frame.commands = selected
        .into_iter()
        .map(|(pixel, weight)| {
            let normalized_weight = range.normalize(weight);
            DrawCommand {
                x: pixel.x,
                y: pixel.y,
                radius: config.radius * (0.5 + 0.5 * normalized_weight),
                alpha,
                normalized_weight,
            }
        })
        .collect();

    trace!(
        "heatmap frame: {} of {} points visible, {} drawn",
        frame.visible,
        snapshot.len(),
        frame.commands.len()
    );
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WeightedGeoPoint;
    use approx::assert_relative_eq;

    // Degrees used directly as pixels: x = longitude, y = latitude
    fn flat(lat: f64, lon: f64) -> Coord<f64> {
        Coord { x: lon, y: lat }
    }

    fn screen() -> Rect<f64> {
        Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1000.0, y: 800.0 })
    }

    fn snapshot(points: &[(f64, f64, f64)]) -> PointSnapshot {
        points
            .iter()
            .map(|&(x, y, w)| WeightedGeoPoint::new(y, x, w))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_weight_normalization_and_radii() {
        // Weights 1, 5, 10 normalise to 0, 4/9, 1
        let snap = snapshot(&[(100.0, 100.0, 1.0), (200.0, 200.0, 5.0), (300.0, 300.0, 10.0)]);
        let frame = render(&snap, &screen(), &flat, &RenderConfig::default());

        assert_eq!(frame.len(), 3);
        let weights: Vec<f64> = frame.commands.iter().map(|c| c.normalized_weight).collect();
        assert_relative_eq!(weights[0], 0.0);
        assert_relative_eq!(weights[1], 4.0 / 9.0, epsilon = 1e-12);
        assert_relative_eq!(weights[2], 1.0);

        let radii: Vec<f64> = frame.commands.iter().map(|c| c.radius).collect();
        assert!(radii[0] < radii[1] && radii[1] < radii[2]);
        assert_relative_eq!(radii[0], 40.0);
        assert_relative_eq!(radii[2], 80.0);
    }

    #[test]
    fn test_empty_snapshot_draws_nothing() {
        let frame = render(
            &PointSnapshot::default(),
            &screen(),
            &flat,
            &RenderConfig::default(),
        );
        assert!(frame.is_empty());
        assert_eq!(frame.visible, 0);
    }

    #[test]
    fn test_points_outside_margin_are_culled() {
        let snap = snapshot(&[
            (-150.0, 400.0, 1.0), // beyond left margin
            (-50.0, 400.0, 2.0),  // inside left margin
            (1099.0, 400.0, 3.0), // inside right margin
            (1100.0, 400.0, 4.0), // on the exclusive right edge
            (500.0, -101.0, 5.0), // above top margin
            (500.0, 899.0, 6.0),  // inside bottom margin
        ]);
        let frame = render(&snap, &screen(), &flat, &RenderConfig::default());

        let xs: Vec<(f64, f64)> = frame.commands.iter().map(|c| (c.x, c.y)).collect();
        assert_eq!(xs, vec![(-50.0, 400.0), (1099.0, 400.0), (500.0, 899.0)]);
    }

    #[test]
    fn test_nothing_in_view_draws_nothing() {
        let snap = snapshot(&[(5000.0, 5000.0, 3.0), (-900.0, 10.0, 1.0)]);
        let frame = render(&snap, &screen(), &flat, &RenderConfig::default());
        assert!(frame.is_empty());
    }

    #[test]
    fn test_no_command_outside_expanded_viewport() {
        let points: Vec<(f64, f64, f64)> = (0..40)
            .flat_map(|i| (0..40).map(move |j| (i as f64 * 50.0 - 400.0, j as f64 * 40.0 - 300.0, 1.0 + i as f64)))
            .collect();
        let config = RenderConfig {
            render_budget: 10_000,
            ..RenderConfig::default()
        };
        let frame = render(&snapshot(&points), &screen(), &flat, &config);

        assert!(!frame.is_empty());
        for c in &frame.commands {
            assert!(c.x >= -100.0 && c.x < 1100.0);
            assert!(c.y >= -100.0 && c.y < 900.0);
        }
    }

    #[test]
    fn test_subsample_uses_fixed_stride() {
        // 1200 visible points, budget 500 -> stride 2 -> indices 0, 2, 4, ...
        let points: Vec<(f64, f64, f64)> = (0..1200)
            .map(|i| (i as f64 * 0.5, 10.0, 1.0 + i as f64))
            .collect();
        let frame = render(&snapshot(&points), &screen(), &flat, &RenderConfig::default());

        assert_eq!(frame.visible, 1200);
        assert_eq!(frame.len(), 600);
        for (k, c) in frame.commands.iter().enumerate() {
            assert_eq!(c.x, (2 * k) as f64 * 0.5);
        }
    }

    #[test]
    fn test_stride_applies_to_visible_points_only() {
        // 1200 visible points, each followed by one far off-screen
        let points: Vec<(f64, f64, f64)> = (0..1200)
            .flat_map(|i| {
                [
                    (i as f64 * 0.5, 10.0, 1.0 + i as f64),
                    (5000.0, 5000.0, 1.0 + i as f64),
                ]
            })
            .collect();
        let frame = render(&snapshot(&points), &screen(), &flat, &RenderConfig::default());

        assert_eq!(frame.visible, 1200);
        assert_eq!(frame.len(), 600);
        for (k, c) in frame.commands.iter().enumerate() {
            assert_eq!(c.center(), Coord { x: (2 * k) as f64 * 0.5, y: 10.0 });
        }
    }

    #[test]
    fn test_subsample_indices() {
        assert_eq!(subsample_indices(3, 500).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(subsample_indices(10, 3).collect::<Vec<_>>(), vec![0, 3, 6, 9]);
        assert_eq!(subsample_indices(999, 500).count(), 999);
        assert_eq!(subsample_indices(1000, 500).count(), 500);
        assert_eq!(subsample_indices(0, 500).count(), 0);
    }

    #[test]
    fn test_render_is_deterministic() {
        let points: Vec<(f64, f64, f64)> = (0..2345)
            .map(|i| ((i * 37 % 1000) as f64, (i * 11 % 800) as f64, 0.2 + (i % 17) as f64))
            .collect();
        let snap = snapshot(&points);
        let first = render(&snap, &screen(), &flat, &RenderConfig::default());
        let second = render(&snap, &screen(), &flat, &RenderConfig::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_uniform_weights_use_span_floor() {
        let snap = snapshot(&[(10.0, 10.0, 2.0), (20.0, 20.0, 2.0)]);
        let frame = render(&snap, &screen(), &flat, &RenderConfig::default());
        assert!(frame.commands.iter().all(|c| c.normalized_weight == 0.0));
        assert!(frame.commands.iter().all(|c| c.radius == 40.0));

        let snap = snapshot(&[(10.0, 10.0, 1.0), (20.0, 20.0, 1.05)]);
        let frame = render(&snap, &screen(), &flat, &RenderConfig::default());
        assert_relative_eq!(frame.commands[1].normalized_weight, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_draw_order_follows_insertion() {
        let snap = snapshot(&[(10.0, 10.0, 10.0), (10.0, 10.0, 5.0), (10.0, 10.0, 1.0)]);
        let frame = render(&snap, &screen(), &flat, &RenderConfig::default());
        let radii: Vec<f64> = frame.commands.iter().map(|c| c.radius).collect();
        assert!(radii[0] > radii[1] && radii[1] > radii[2]);
    }

    #[test]
    fn test_unprojectable_points_are_culled() {
        let snap = snapshot(&[(10.0, 10.0, 1.0), (20.0, 20.0, 2.0)]);
        let broken = |lat: f64, lon: f64| {
            if lat > 15.0 {
                Coord { x: f64::NAN, y: f64::NAN }
            } else {
                Coord { x: lon, y: lat }
            }
        };
        let frame = render(&snap, &screen(), &broken, &RenderConfig::default());
        assert_eq!(frame.len(), 1);
    }

    #[test]
    fn test_opacity_becomes_paint_alpha() {
        let snap = snapshot(&[(10.0, 10.0, 1.0)]);
        let frame = render(&snap, &screen(), &flat, &RenderConfig::default());
        assert_eq!(frame.commands[0].alpha, 153);

        let stops = frame.effective_stops(frame.commands[0].alpha);
        assert_eq!(stops.len(), 5);
        assert_eq!(stops[4].color.a, 153);
        assert_eq!(stops[0].color.a, 0);
    }

    #[test]
    fn test_config_validation() {
        assert!(RenderConfig::default().validate().is_ok());
        let bad = RenderConfig {
            opacity: 1.5,
            ..RenderConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = RenderConfig {
            render_budget: 0,
            ..RenderConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
