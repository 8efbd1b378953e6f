//! CPU compositor: background + annotation overlay → one RGBA bitmap.

use crate::png_io::decode_png;
use kurbo::Point;
use pdfink_core::export::{ExportError, PageFlattener};
use pdfink_core::raster::PageBitmap;
use pdfink_core::shapes::{Image, ImageFormat, Shape, ShapeTrait};
use pdfink_core::surface::PageSurface;

/// Flattens surfaces on the CPU.
///
/// Shapes are drawn in insertion order over a copy of the surface background.
/// Glyph rasterization stays with richer renderer implementations; text is
/// marked by its layout extent here.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterFlattener;

impl RasterFlattener {
    pub fn new() -> Self {
        Self
    }
}

impl PageFlattener for RasterFlattener {
    fn flatten(&self, surface: &PageSurface) -> Result<PageBitmap, ExportError> {
        let mut out = surface.background().clone();
        for shape in surface.objects() {
            draw_shape(&mut out, shape);
        }
        Ok(out)
    }
}

fn draw_shape(bitmap: &mut PageBitmap, shape: &Shape) {
    match shape {
        Shape::Freehand(stroke) => {
            stroke_polyline(
                bitmap,
                &stroke.points,
                stroke.style.border_width,
                stroke.style.color.rgba(),
            );
        }
        Shape::Rectangle(rect) => {
            let r = rect.as_rect();
            let corners = [
                Point::new(r.x0, r.y0),
                Point::new(r.x1, r.y0),
                Point::new(r.x1, r.y1),
                Point::new(r.x0, r.y1),
            ];
            fill_polygon(bitmap, &corners, rect.style.color.rgba());
            stroke_closed(
                bitmap,
                &corners,
                rect.style.border_width,
                rect.style.border_color.rgba(),
            );
        }
        Shape::Arrow(arrow) => {
            let ink = arrow.style.color.rgba();
            stroke_polyline(
                bitmap,
                &[arrow.start, arrow.end],
                arrow.style.border_width,
                ink,
            );
            for triangle in arrow.head_triangles() {
                fill_polygon(bitmap, &triangle, ink);
            }
        }
        Shape::Text(text) => {
            // Mark the layout extent; glyphs are an external concern.
            let b = text.bounds();
            let corners = [
                Point::new(b.x0, b.y0),
                Point::new(b.x1, b.y0),
                Point::new(b.x1, b.y1),
                Point::new(b.x0, b.y1),
            ];
            stroke_closed(bitmap, &corners, 1.0, text.style.color.rgba());
        }
        Shape::Image(image) => blit_image(bitmap, image),
    }
}

fn blit_image(bitmap: &mut PageBitmap, image: &Image) {
    let decoded = match (image.format, image.data()) {
        (ImageFormat::Png, Some(bytes)) => decode_png(&bytes),
        (format, Some(_)) => Err(ExportError::Encode(format!(
            "no raster decoder for {format:?}"
        ))),
        (_, None) => Err(ExportError::Encode("invalid base64 payload".to_string())),
    };
    let source = match decoded {
        Ok(source) => source,
        Err(err) => {
            log::warn!("image blit skipped: {err}");
            // Mark the placement so the flattened page still shows it.
            let b = image.bounds();
            let corners = [
                Point::new(b.x0, b.y0),
                Point::new(b.x1, b.y0),
                Point::new(b.x1, b.y1),
                Point::new(b.x0, b.y1),
            ];
            stroke_closed(bitmap, &corners, 1.0, image.style.border_color.rgba());
            return;
        }
    };
    if source.width == 0 || source.height == 0 || image.width <= 0.0 || image.height <= 0.0 {
        return;
    }

    // Nearest-neighbor scale to the display size.
    let out_w = image.width.round().max(1.0) as i64;
    let out_h = image.height.round().max(1.0) as i64;
    let origin_x = image.position.x.round() as i64;
    let origin_y = image.position.y.round() as i64;
    for dy in 0..out_h {
        for dx in 0..out_w {
            let sx = (dx * source.width as i64 / out_w) as u32;
            let sy = (dy * source.height as i64 / out_h) as u32;
            blend_pixel(bitmap, origin_x + dx, origin_y + dy, source.pixel(sx, sy));
        }
    }
}

/// Alpha-over blend of one pixel, with bounds guarding.
fn blend_pixel(bitmap: &mut PageBitmap, x: i64, y: i64, src: [u8; 4]) {
    if x < 0 || y < 0 || x >= bitmap.width as i64 || y >= bitmap.height as i64 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    let sa = src[3] as u32;
    let blended = match sa {
        0 => return,
        255 => src,
        _ => {
            let dst = bitmap.pixel(x, y);
            let inv = 255 - sa;
            [
                ((src[0] as u32 * sa + dst[0] as u32 * inv) / 255) as u8,
                ((src[1] as u32 * sa + dst[1] as u32 * inv) / 255) as u8,
                ((src[2] as u32 * sa + dst[2] as u32 * inv) / 255) as u8,
                (sa + dst[3] as u32 * inv / 255).min(255) as u8,
            ]
        }
    };
    bitmap.set_pixel(x, y, blended);
}

/// Stamp a filled disc, the brush footprint for stroked lines.
fn draw_disc(bitmap: &mut PageBitmap, center: Point, radius: f64, color: [u8; 4]) {
    let r = radius.max(0.5);
    let span = r.ceil() as i64;
    let cx = center.x.round() as i64;
    let cy = center.y.round() as i64;
    for dy in -span..=span {
        for dx in -span..=span {
            if (dx * dx + dy * dy) as f64 <= r * r {
                blend_pixel(bitmap, cx + dx, cy + dy, color);
            }
        }
    }
}

fn stroke_segment(bitmap: &mut PageBitmap, a: Point, b: Point, width: f64, color: [u8; 4]) {
    let radius = (width / 2.0).max(0.5);
    let length = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
    let steps = (length / 0.5).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let p = Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
        draw_disc(bitmap, p, radius, color);
    }
}

fn stroke_polyline(bitmap: &mut PageBitmap, points: &[Point], width: f64, color: [u8; 4]) {
    match points {
        [] => {}
        [single] => draw_disc(bitmap, *single, (width / 2.0).max(0.5), color),
        _ => {
            for pair in points.windows(2) {
                stroke_segment(bitmap, pair[0], pair[1], width, color);
            }
        }
    }
}

fn stroke_closed(bitmap: &mut PageBitmap, points: &[Point], width: f64, color: [u8; 4]) {
    if points.len() < 2 {
        return;
    }
    for pair in points.windows(2) {
        stroke_segment(bitmap, pair[0], pair[1], width, color);
    }
    stroke_segment(bitmap, points[points.len() - 1], points[0], width, color);
}

/// Even-odd scanline polygon fill.
fn fill_polygon(bitmap: &mut PageBitmap, points: &[Point], color: [u8; 4]) {
    if points.len() < 3 {
        return;
    }
    let min_y = points
        .iter()
        .map(|p| p.y)
        .fold(f64::INFINITY, f64::min)
        .floor()
        .max(0.0) as i64;
    let max_y = points
        .iter()
        .map(|p| p.y)
        .fold(f64::NEG_INFINITY, f64::max)
        .ceil()
        .min(bitmap.height as f64) as i64;

    let mut crossings: Vec<f64> = Vec::new();
    for y in min_y..max_y {
        let scan = y as f64 + 0.5;
        crossings.clear();
        for i in 0..points.len() {
            let p = points[i];
            let q = points[(i + 1) % points.len()];
            if (p.y <= scan) != (q.y <= scan) {
                let t = (scan - p.y) / (q.y - p.y);
                crossings.push(p.x + t * (q.x - p.x));
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));
        for span in crossings.chunks_exact(2) {
            let start = span[0].round().max(0.0) as i64;
            let end = span[1].round().min(bitmap.width as f64) as i64;
            for x in start..end {
                blend_pixel(bitmap, x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::png_io::encode_png;
    use pdfink_core::shapes::{
        Arrow, Freehand, Rectangle, SerializableColor, ShapeStyle, Text,
    };

    const RED: SerializableColor = SerializableColor {
        r: 255,
        g: 0,
        b: 0,
        a: 255,
    };

    fn surface() -> PageSurface {
        PageSurface::new(1, PageBitmap::white(60, 60))
    }

    fn red_style() -> ShapeStyle {
        ShapeStyle {
            color: RED,
            border_color: RED,
            border_width: 2.0,
        }
    }

    #[test]
    fn test_flatten_without_objects_is_the_background() {
        let surface = surface();
        let out = RasterFlattener::new().flatten(&surface).unwrap();
        assert_eq!(&out, surface.background());
    }

    #[test]
    fn test_flatten_fills_rectangle() {
        let mut surface = surface();
        let mut rect = Rectangle::new(Point::new(10.0, 10.0), 20.0, 20.0);
        rect.style = red_style();
        surface.add_object(Shape::Rectangle(rect)).unwrap();

        let out = RasterFlattener::new().flatten(&surface).unwrap();
        assert_eq!(out.pixel(20, 20), [255, 0, 0, 255]);
        assert_eq!(out.pixel(5, 5), [255, 255, 255, 255]);
        // The source surface keeps its clean background.
        assert_eq!(surface.background().pixel(20, 20), [255, 255, 255, 255]);
    }

    #[test]
    fn test_flatten_strokes_freehand_path() {
        let mut surface = surface();
        let mut stroke = Freehand::from_points(vec![Point::new(5.0, 30.0), Point::new(55.0, 30.0)]);
        stroke.style = red_style();
        surface.add_object(Shape::Freehand(stroke)).unwrap();

        let out = RasterFlattener::new().flatten(&surface).unwrap();
        assert_eq!(out.pixel(30, 30), [255, 0, 0, 255]);
        assert_eq!(out.pixel(30, 50), [255, 255, 255, 255]);
    }

    #[test]
    fn test_flatten_fills_arrow_heads() {
        let mut surface = surface();
        let mut arrow = Arrow::new(Point::new(10.0, 30.0), Point::new(50.0, 30.0));
        arrow.style = red_style();
        surface.add_object(Shape::Arrow(arrow)).unwrap();

        let out = RasterFlattener::new().flatten(&surface).unwrap();
        // Shaft midpoint and both head tips.
        assert_eq!(out.pixel(30, 30), [255, 0, 0, 255]);
        assert_eq!(out.pixel(11, 30), [255, 0, 0, 255]);
        assert_eq!(out.pixel(49, 30), [255, 0, 0, 255]);
    }

    #[test]
    fn test_flatten_marks_text_extent() {
        let mut surface = surface();
        let mut text = Text::new(Point::new(10.0, 10.0), "hi");
        text.style = red_style();
        surface.add_object(Shape::Text(text)).unwrap();

        let out = RasterFlattener::new().flatten(&surface).unwrap();
        // Top-left corner of the outline.
        assert_eq!(out.pixel(10, 10), [255, 0, 0, 255]);
    }

    #[test]
    fn test_flatten_blits_png_image() {
        let mut surface = surface();
        let stamp_pixels = PageBitmap::solid(2, 2, [0, 0, 255, 255]);
        let encoded = encode_png(&stamp_pixels).unwrap();
        let image = Image::new(Point::new(40.0, 40.0), &encoded, 2, 2, ImageFormat::Png);
        surface.add_object(Shape::Image(image)).unwrap();

        let out = RasterFlattener::new().flatten(&surface).unwrap();
        assert_eq!(out.pixel(40, 40), [0, 0, 255, 255]);
        assert_eq!(out.pixel(41, 41), [0, 0, 255, 255]);
        assert_eq!(out.pixel(43, 43), [255, 255, 255, 255]);
    }

    #[test]
    fn test_flatten_scales_image_to_display_size() {
        let mut surface = surface();
        let stamp_pixels = PageBitmap::solid(2, 2, [0, 0, 255, 255]);
        let encoded = encode_png(&stamp_pixels).unwrap();
        let image =
            Image::new(Point::new(10.0, 10.0), &encoded, 2, 2, ImageFormat::Png).scaled(4.0);
        surface.add_object(Shape::Image(image)).unwrap();

        let out = RasterFlattener::new().flatten(&surface).unwrap();
        // 2x2 source displayed as 8x8.
        assert_eq!(out.pixel(17, 17), [0, 0, 255, 255]);
        assert_eq!(out.pixel(18, 18), [255, 255, 255, 255]);
    }
}
