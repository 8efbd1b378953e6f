//! Image annotation shape (signature stamps and direct placements).

use super::{ShapeId, ShapeStyle, ShapeTrait};
use crate::assets::FetchedImage;
use kurbo::{BezPath, Point, Rect, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Image format of the embedded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        None
    }
}

/// A placed raster image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub(crate) id: ShapeId,
    /// Top-left corner position.
    pub position: Point,
    /// Display width.
    pub width: f64,
    /// Display height.
    pub height: f64,
    /// Source image width in pixels.
    pub source_width: u32,
    /// Source image height in pixels.
    pub source_height: u32,
    /// Image format.
    pub format: ImageFormat,
    /// Encoded image bytes, base64 so the shape serializes as plain JSON.
    pub data_base64: String,
    /// Style properties (border drawn when `border_width` > 0).
    pub style: ShapeStyle,
}

impl Image {
    /// Create an image shape from raw encoded bytes, displayed at source size.
    pub fn new(
        position: Point,
        data: &[u8],
        source_width: u32,
        source_height: u32,
        format: ImageFormat,
    ) -> Self {
        use base64::Engine;
        use base64::engine::general_purpose::STANDARD;

        Self {
            id: Uuid::new_v4(),
            position,
            width: source_width as f64,
            height: source_height as f64,
            source_width,
            source_height,
            format,
            data_base64: STANDARD.encode(data),
            style: ShapeStyle {
                border_width: 0.0,
                ..ShapeStyle::default()
            },
        }
    }

    /// Create from a fetched asset, defaulting to PNG when the bytes are not
    /// recognizable.
    pub fn from_fetched(position: Point, fetched: &FetchedImage) -> Self {
        let format = ImageFormat::from_magic_bytes(&fetched.bytes).unwrap_or(ImageFormat::Png);
        Self::new(
            position,
            &fetched.bytes,
            fetched.width,
            fetched.height,
            format,
        )
    }

    /// Scale the display size by a factor, keeping the position.
    pub fn scaled(mut self, factor: f64) -> Self {
        self.width *= factor;
        self.height *= factor;
        self
    }

    /// Decode the embedded bytes.
    pub fn data(&self) -> Option<Vec<u8>> {
        use base64::Engine;
        use base64::engine::general_purpose::STANDARD;
        STANDARD.decode(&self.data_base64).ok()
    }

    /// Get the bounding rectangle.
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            self.position.x,
            self.position.y,
            self.position.x + self.width,
            self.position.y + self.height,
        )
    }
}

impl ShapeTrait for Image {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.as_rect()
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.as_rect().inflate(tolerance, tolerance).contains(point)
    }

    fn to_path(&self) -> BezPath {
        self.as_rect().to_path(0.1)
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D]),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::from_magic_bytes(&[0x00, 0x01]), None);
    }

    #[test]
    fn test_scaled() {
        let img = Image::new(Point::ZERO, &[1, 2, 3], 100, 40, ImageFormat::Png).scaled(0.75);
        assert!((img.width - 75.0).abs() < 1e-9);
        assert!((img.height - 30.0).abs() < 1e-9);
        assert_eq!(img.source_width, 100);
    }

    #[test]
    fn test_data_roundtrip() {
        let bytes = vec![9u8, 8, 7, 6];
        let img = Image::new(Point::ZERO, &bytes, 2, 2, ImageFormat::Png);
        assert_eq!(img.data(), Some(bytes));
    }
}
