//! PNG encode/decode for page bitmaps.

use pdfink_core::export::ExportError;
use pdfink_core::raster::PageBitmap;

/// Encode a bitmap as PNG bytes.
pub fn encode_png(bitmap: &PageBitmap) -> Result<Vec<u8>, ExportError> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, bitmap.width, bitmap.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| ExportError::Encode(e.to_string()))?;
        writer
            .write_image_data(&bitmap.pixels)
            .map_err(|e| ExportError::Encode(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| ExportError::Encode(e.to_string()))?;
    }
    Ok(out)
}

/// Decode PNG bytes into an RGBA bitmap.
pub fn decode_png(bytes: &[u8]) -> Result<PageBitmap, ExportError> {
    let decoder = png::Decoder::new(bytes);
    let mut reader = decoder
        .read_info()
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| ExportError::Encode(e.to_string()))?;
    buf.truncate(info.buffer_size());

    let pixels = match info.color_type {
        png::ColorType::Rgba => buf,
        png::ColorType::Rgb => buf
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        png::ColorType::Grayscale => buf.iter().flat_map(|&g| [g, g, g, 255]).collect(),
        png::ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        other => {
            return Err(ExportError::Encode(format!(
                "unsupported PNG color type {other:?}"
            )));
        }
    };

    Ok(PageBitmap {
        width: info.width,
        height: info.height,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_roundtrip() {
        let mut bitmap = PageBitmap::solid(4, 3, [10, 20, 30, 255]);
        bitmap.set_pixel(1, 1, [200, 100, 50, 128]);

        let encoded = encode_png(&bitmap).unwrap();
        let decoded = decode_png(&encoded).unwrap();

        assert_eq!(decoded, bitmap);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_png(&[1, 2, 3, 4]).is_err());
    }
}
