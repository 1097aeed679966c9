//! Minimal raster drawing on top of `image::RgbImage`.

use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};

use super::DiagnosticResult;

pub(super) const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
pub(super) const GRID: Rgb<u8> = Rgb([220, 220, 220]);
pub(super) const AXIS: Rgb<u8> = Rgb([120, 120, 120]);
pub(super) const BLUE: Rgb<u8> = Rgb([31, 119, 180]);
pub(super) const ORANGE: Rgb<u8> = Rgb([255, 127, 14]);
pub(super) const RED: Rgb<u8> = Rgb([214, 39, 40]);

/// Plot area inside the image, in pixels.
#[derive(Debug, Clone, Copy)]
pub(super) struct PlotArea {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl PlotArea {
    /// Area with a uniform margin.
    pub fn with_margin(image_width: u32, image_height: u32, margin: u32) -> Self {
        Self {
            left: margin,
            top: margin,
            width: image_width.saturating_sub(2 * margin).max(1),
            height: image_height.saturating_sub(2 * margin).max(1),
        }
    }

    /// Row for `value` in `[min, max]` (max at the top), clamped to the area.
    pub fn row(&self, value: f64, min: f64, max: f64) -> u32 {
        let span = if max > min { max - min } else { 1.0 };
        let frac = ((value - min) / span).clamp(0.0, 1.0);
        self.top + ((1.0 - frac) * (self.height - 1) as f64).round() as u32
    }

    /// Column for `value` in `[min, max]`, clamped to the area.
    pub fn column(&self, value: f64, min: f64, max: f64) -> u32 {
        let span = if max > min { max - min } else { 1.0 };
        let frac = ((value - min) / span).clamp(0.0, 1.0);
        self.left + (frac * (self.width - 1) as f64).round() as u32
    }
}

/// White canvas.
pub(super) fn blank(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, BACKGROUND)
}

/// Blend `color` over the pixel at `(x, y)` with opacity `alpha`.
pub(super) fn blend(image: &mut RgbImage, x: u32, y: u32, color: Rgb<u8>, alpha: f64) {
    if x >= image.width() || y >= image.height() {
        return;
    }
    let pixel = image.get_pixel_mut(x, y);
    for (dst, src) in pixel.0.iter_mut().zip(color.0) {
        *dst = (*dst as f64 * (1.0 - alpha) + src as f64 * alpha).round() as u8;
    }
}

/// Vertical run from `y0` to `y1` (either order), inclusive.
pub(super) fn vline(image: &mut RgbImage, x: u32, y0: u32, y1: u32, color: Rgb<u8>, alpha: f64) {
    let (lo, hi) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
    for y in lo..=hi {
        blend(image, x, y, color, alpha);
    }
}

/// Horizontal line across the plot area.
pub(super) fn hline(image: &mut RgbImage, area: &PlotArea, y: u32, color: Rgb<u8>) {
    for x in area.left..area.left + area.width {
        blend(image, x, y, color, 1.0);
    }
}

/// Rectangle outline around the plot area.
pub(super) fn frame(image: &mut RgbImage, area: &PlotArea) {
    let right = area.left + area.width - 1;
    let bottom = area.top + area.height - 1;
    hline(image, area, area.top, AXIS);
    hline(image, area, bottom, AXIS);
    vline(image, area.left, area.top, bottom, AXIS, 1.0);
    vline(image, right, area.top, bottom, AXIS, 1.0);
}

/// Encode as PNG, creating the parent directory if needed.
pub(super) fn save_png(image: &RgbImage, path: &Path) -> DiagnosticResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_put_max_at_top() {
        let area = PlotArea::with_margin(100, 60, 10);
        assert_eq!(area.row(1.0, -1.0, 1.0), 10);
        assert_eq!(area.row(-1.0, -1.0, 1.0), 10 + 39);
        assert_eq!(area.row(5.0, -1.0, 1.0), 10);
    }

    #[test]
    fn blend_is_clipped_to_image() {
        let mut image = blank(4, 4);
        blend(&mut image, 10, 10, RED, 1.0);
        blend(&mut image, 1, 1, RED, 1.0);
        assert_eq!(*image.get_pixel(1, 1), RED);
        assert_eq!(*image.get_pixel(0, 0), BACKGROUND);
    }
}
