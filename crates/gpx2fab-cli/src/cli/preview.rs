//! Raster preview of a rendered drawing.

use std::io::Cursor;

use anyhow::{Context, anyhow};
use image::{DynamicImage, ImageFormat, RgbaImage};
use resvg::usvg;
use tiny_skia::Pixmap;

/// Preview resolution.
pub const PREVIEW_DPI: f64 = 150.0;

const MM_PER_INCH: f64 = 25.4;

/// Pixel size of a page at the given resolution.
pub fn preview_size(width_mm: f64, height_mm: f64, dpi: f64) -> (u32, u32) {
    let px = |mm: f64| (mm / MM_PER_INCH * dpi).round().max(1.0) as u32;
    (px(width_mm), px(height_mm))
}

/// Rasterize an SVG page of `width_mm` x `height_mm` to PNG bytes.
pub fn render_png(svg: &[u8], width_mm: f64, height_mm: f64, dpi: f64) -> anyhow::Result<Vec<u8>> {
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_data(svg, &options).context("parsing drawing for preview")?;

    let (width, height) = preview_size(width_mm, height_mm, dpi);
    let size = tree.size();
    let sx = width as f32 / size.width();
    let sy = height as f32 / size.height();

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| anyhow!("cannot create a {width}x{height} preview"))?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(&tree, tiny_skia::Transform::from_scale(sx, sy), &mut pixmap.as_mut());

    let rgba = RgbaImage::from_raw(width, height, pixmap.take())
        .ok_or_else(|| anyhow!("preview buffer has the wrong size"))?;
    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(rgba)
        .write_to(&mut png, ImageFormat::Png)
        .context("encoding preview")?;
    Ok(png.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a5_at_150_dpi() {
        assert_eq!(preview_size(210.0, 148.0, PREVIEW_DPI), (1240, 874));
    }

    #[test]
    fn renders_png_of_page_size() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="25.4mm" height="50.8mm" viewBox="0 0 25.4 50.8"><path d="M0,0 L25.4,50.8" stroke="black" stroke-width="1"/></svg>"#;
        let png = render_png(svg, 25.4, 50.8, PREVIEW_DPI).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (150, 300));
    }
}
