use geo::{Coord, Rect};

/// Tile edge in pixels for slippy-map zoom levels.
pub const TILE_SIZE: f64 = 256.0;

/// Web Mercator is undefined at the poles; latitudes are clamped to this.
const MAX_LATITUDE: f64 = 85.05112878;

/// Geo → screen-pixel transform supplied by the map host for one render pass.
pub trait Projection {
    fn to_pixels(&self, latitude: f64, longitude: f64) -> Coord<f64>;
}

impl<F> Projection for F
where
    F: Fn(f64, f64) -> Coord<f64>,
{
    fn to_pixels(&self, latitude: f64, longitude: f64) -> Coord<f64> {
        self(latitude, longitude)
    }
}

/// Web Mercator (EPSG:3857) view of `width`×`height` pixels centred on a
/// coordinate at a fractional zoom level.
///
/// Pixel space has its origin at the top-left of the view, x to the east
/// and y to the south, matching screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WebMercatorProjection {
    center_lat: f64,
    center_lon: f64,
    zoom: f64,
    width: f64,
    height: f64,
}

impl WebMercatorProjection {
    pub fn new(center_lat: f64, center_lon: f64, zoom: f64, width: f64, height: f64) -> Self {
        Self {
            center_lat,
            center_lon,
            zoom,
            width,
            height,
        }
    }

    pub fn recenter(&mut self, latitude: f64, longitude: f64) {
        self.center_lat = latitude;
        self.center_lon = longitude;
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_lat, self.center_lon)
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// The visible screen rectangle, `(0, 0)` to `(width, height)`.
    pub fn screen_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord { x: 0.0, y: 0.0 },
            Coord {
                x: self.width,
                y: self.height,
            },
        )
    }

    /// Inverse of [`Projection::to_pixels`], returning `(latitude, longitude)`.
    pub fn from_pixels(&self, pixel: Coord<f64>) -> (f64, f64) {
        let size = world_size(self.zoom);
        let center = world_pixels(self.center_lat, self.center_lon, size);
        let world_x = pixel.x - self.width / 2.0 + center.x;
        let world_y = pixel.y - self.height / 2.0 + center.y;

        let lon = world_x / size * 360.0 - 180.0;
        let lat = (std::f64::consts::PI * (1.0 - 2.0 * world_y / size))
            .sinh()
            .atan()
            .to_degrees();
        (lat, lon)
    }
}

impl Projection for WebMercatorProjection {
    fn to_pixels(&self, latitude: f64, longitude: f64) -> Coord<f64> {
        let size = world_size(self.zoom);
        let center = world_pixels(self.center_lat, self.center_lon, size);
        let point = world_pixels(latitude, longitude, size);
        Coord {
            x: point.x - center.x + self.width / 2.0,
            y: point.y - center.y + self.height / 2.0,
        }
    }
}

fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Absolute Mercator pixel position at the given world size
fn world_pixels(latitude: f64, longitude: f64, size: f64) -> Coord<f64> {
    let lat_rad = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (longitude + 180.0) / 360.0 * size;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * size;
    Coord { x, y }
}
