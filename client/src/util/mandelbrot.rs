//! Escape-time Mandelbrot renderer for the Explore page.
//!
//! Pure arithmetic: [`render`] fills an RGBA buffer that the page hands to a
//! canvas as `ImageData`. Each pixel is coloured by how many iterations its
//! point needs to escape, looked up in a gradient that runs blue, magenta,
//! then black. Points that never escape land on the last (black) entry.

#[cfg(test)]
#[path = "mandelbrot_test.rs"]
mod mandelbrot_test;

/// Iteration cap; also the palette length.
pub const MAX_ITERATIONS: usize = 30;

pub const RENDER_WIDTH: u32 = 1024;
pub const RENDER_HEIGHT: u32 = 768;

/// Region of the complex plane mapped onto the image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Viewport {
    /// The whole set, framed for a 4:3 image.
    pub const FULL: Self = Self { x_min: -2.333, x_max: 1.0, y_min: -1.25, y_max: 1.25 };

    /// Complex coordinate of pixel (`px`, `py`). Row 0 is `y_max`.
    #[must_use]
    pub fn point(&self, px: u32, py: u32, width: u32, height: u32) -> (f64, f64) {
        let x = f64::from(px) / f64::from(width) * (self.x_max - self.x_min) + self.x_min;
        let y = f64::from(py) / f64::from(height) * (self.y_min - self.y_max) + self.y_max;
        (x, y)
    }
}

/// Iterations of `z = z² + c` from zero until `|z| > 2`, capped at
/// [`MAX_ITERATIONS`]. Always at least 1.
#[must_use]
pub fn iterate(x0: f64, y0: f64) -> usize {
    let (mut x, mut y) = (0.0_f64, 0.0_f64);
    let mut iteration = 0;
    while x * x + y * y <= 4.0 && iteration < MAX_ITERATIONS {
        (x, y) = (x * x - y * y + x0, 2.0 * x * y + y0);
        iteration += 1;
    }
    iteration
}

/// Linear RGB stops the gradient passes through, evenly spaced.
const STOPS: [[f64; 3]; 3] = [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [0.000_001, 0.0, 0.0]];

/// [`MAX_ITERATIONS`] colours sampled evenly from the first stop to the last,
/// interpolated in HSV along the shorter way round the hue circle.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn palette() -> Vec<[u8; 3]> {
    let stops: Vec<Hsv> = STOPS.iter().map(|&rgb| Hsv::from_rgb(rgb)).collect();
    let segments = (stops.len() - 1) as f64;
    let last = (MAX_ITERATIONS - 1) as f64;

    (0..MAX_ITERATIONS)
        .map(|i| {
            let t = i as f64 / last * segments;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let segment = (t.floor() as usize).min(stops.len() - 2);
            let color = stops[segment].mix(stops[segment + 1], t - segment as f64);
            color.to_rgb().map(to_byte)
        })
        .collect()
}

/// RGBA pixels, row-major, `width * height * 4` bytes.
#[must_use]
pub fn render(viewport: &Viewport, width: u32, height: u32) -> Vec<u8> {
    let colors = palette();
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for py in 0..height {
        for px in 0..width {
            let (x, y) = viewport.point(px, py, width, height);
            let [r, g, b] = colors[iterate(x, y) - 1];
            pixels.extend_from_slice(&[r, g, b, u8::MAX]);
        }
    }
    pixels
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_byte(channel: f64) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Hsv {
    /// Degrees in `[0, 360)`.
    hue: f64,
    saturation: f64,
    value: f64,
}

impl Hsv {
    fn from_rgb([r, g, b]: [f64; 3]) -> Self {
        let max = r.max(g).max(b);
        let delta = max - r.min(g).min(b);
        let hue = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let saturation = if max == 0.0 { 0.0 } else { delta / max };
        Self { hue, saturation, value: max }
    }

    fn to_rgb(self) -> [f64; 3] {
        let chroma = self.value * self.saturation;
        let sector = self.hue.rem_euclid(360.0) / 60.0;
        let x = chroma * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (r, g, b) = match sector as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = self.value - chroma;
        [r + m, g + m, b + m]
    }

    fn mix(self, other: Self, t: f64) -> Self {
        let mut turn = other.hue - self.hue;
        if turn > 180.0 {
            turn -= 360.0;
        } else if turn < -180.0 {
            turn += 360.0;
        }
        Self {
            hue: (self.hue + turn * t).rem_euclid(360.0),
            saturation: self.saturation + (other.saturation - self.saturation) * t,
            value: self.value + (other.value - self.value) * t,
        }
    }
}
