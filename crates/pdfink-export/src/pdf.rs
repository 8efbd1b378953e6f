//! PDF document assembly from flattened page images.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use pdfink_core::export::{DocumentExporter, ExportError};
use pdfink_core::raster::PageBitmap;
use std::path::PathBuf;

/// MediaBox used for pages that never received an image.
const FALLBACK_PAGE_SIZE: (u32, u32) = (612, 792);

/// A page image, alpha-flattened to opaque RGB for embedding.
struct PageImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

/// Collects one full-page image per output page and writes the document with
/// `lopdf`.
///
/// A fresh exporter already holds its default first page; `add_page` appends
/// the second and later pages.
pub struct PdfExporter {
    output_dir: PathBuf,
    pages: Vec<Option<PageImage>>,
    current: usize,
}

impl PdfExporter {
    /// Create an exporter that saves into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            pages: vec![None],
            current: 0,
        }
    }

    /// Number of output pages collected so far.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn build_document(&self) -> Result<Document, ExportError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let (width, height) = page
                .as_ref()
                .map(|image| (image.width, image.height))
                .unwrap_or(FALLBACK_PAGE_SIZE);

            let mut page_dict = dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width as i64),
                    Object::Integer(height as i64),
                ],
            };

            if let Some(image) = page {
                let stream = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => Object::Integer(image.width as i64),
                        "Height" => Object::Integer(image.height as i64),
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                    },
                    image.rgb.clone(),
                );
                let image_id = doc.add_object(Object::Stream(stream));

                // Scale the unit image square to the full page.
                let content = Content {
                    operations: vec![
                        Operation::new("q", vec![]),
                        Operation::new(
                            "cm",
                            vec![
                                Object::Integer(image.width as i64),
                                Object::Integer(0),
                                Object::Integer(0),
                                Object::Integer(image.height as i64),
                                Object::Integer(0),
                                Object::Integer(0),
                            ],
                        ),
                        Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                        Operation::new("Q", vec![]),
                    ],
                };
                let encoded = content
                    .encode()
                    .map_err(|e| ExportError::Document(e.to_string()))?;
                let content_id = doc.add_object(Object::Stream(Stream::new(dictionary! {}, encoded)));

                page_dict.set("Contents", Object::Reference(content_id));
                page_dict.set(
                    "Resources",
                    dictionary! {
                        "XObject" => dictionary! { "Im0" => Object::Reference(image_id) },
                    },
                );
            }

            let page_id = doc.add_object(page_dict);
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", catalog_id);

        Ok(doc)
    }
}

impl DocumentExporter for PdfExporter {
    fn add_page(&mut self) -> Result<(), ExportError> {
        self.pages.push(None);
        self.current = self.pages.len() - 1;
        Ok(())
    }

    fn add_image(&mut self, bitmap: &PageBitmap) -> Result<(), ExportError> {
        if bitmap.pixels.len() != bitmap.width as usize * bitmap.height as usize * 4 {
            return Err(ExportError::Encode(format!(
                "bitmap payload does not match {}x{}",
                bitmap.width, bitmap.height
            )));
        }
        self.pages[self.current] = Some(PageImage {
            width: bitmap.width,
            height: bitmap.height,
            rgb: rgb_over_white(&bitmap.pixels),
        });
        Ok(())
    }

    fn save(&mut self, file_name: &str) -> Result<(), ExportError> {
        let mut doc = self.build_document()?;
        doc.compress();
        let path = self.output_dir.join(file_name);
        doc.save(&path)
            .map_err(|e| ExportError::Document(e.to_string()))?;
        log::debug!("wrote {} pages to {}", self.pages.len(), path.display());
        Ok(())
    }
}

/// Flatten RGBA pixels over a white page; PDF image XObjects carry no alpha.
fn rgb_over_white(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for pixel in rgba.chunks_exact(4) {
        let alpha = pixel[3] as u32;
        let inv = 255 - alpha;
        rgb.push(((pixel[0] as u32 * alpha + 255 * inv) / 255) as u8);
        rgb.push(((pixel[1] as u32 * alpha + 255 * inv) / 255) as u8);
        rgb.push(((pixel[2] as u32 * alpha + 255 * inv) / 255) as u8);
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_default_first_page() {
        let exporter = PdfExporter::new("/tmp");
        assert_eq!(exporter.page_count(), 1);
    }

    #[test]
    fn test_save_roundtrips_page_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = PdfExporter::new(dir.path());

        exporter.add_image(&PageBitmap::white(40, 60)).unwrap();
        exporter.add_page().unwrap();
        exporter.add_image(&PageBitmap::white(40, 60)).unwrap();
        exporter.add_page().unwrap();
        exporter.add_image(&PageBitmap::white(40, 60)).unwrap();
        exporter.save("annotated.pdf").unwrap();

        let doc = Document::load(dir.path().join("annotated.pdf")).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn test_pages_without_images_still_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut exporter = PdfExporter::new(dir.path());
        exporter.add_page().unwrap();
        exporter.save("blank.pdf").unwrap();

        let doc = Document::load(dir.path().join("blank.pdf")).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_rejects_mismatched_payload() {
        let mut exporter = PdfExporter::new("/tmp");
        let broken = PageBitmap {
            width: 10,
            height: 10,
            pixels: vec![0; 8],
        };
        assert!(matches!(
            exporter.add_image(&broken),
            Err(ExportError::Encode(_))
        ));
    }

    #[test]
    fn test_alpha_flattens_over_white() {
        // 50%-alpha red over white.
        let rgb = rgb_over_white(&[255, 0, 0, 128]);
        assert_eq!(rgb[0], 255);
        assert!(rgb[1] > 120 && rgb[1] < 132);
        assert_eq!(rgb[1], rgb[2]);
    }

    /// Minimal polling executor; the capability futures never truly suspend.
    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(raw_waker()) };
        let mut cx = Context::from_waker(&waker);
        let mut future = std::pin::pin!(future);

        loop {
            if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                return output;
            }
        }
    }

    #[test]
    fn test_session_to_pdf_end_to_end() {
        use pdfink_core::raster::{BlankRenderer, DocumentSource};
        use pdfink_core::session::{AnnotationSession, SessionOptions};
        use pdfink_render::RasterFlattener;

        let renderer = BlankRenderer::new(vec![(50.0, 80.0), (50.0, 80.0)]);
        let mut session = block_on(AnnotationSession::open(
            "pdf-container",
            DocumentSource::Url("doc.pdf".into()),
            &renderer,
            SessionOptions::default(),
        ))
        .unwrap();
        session.enable_rectangle().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let mut exporter = PdfExporter::new(dir.path());
        session
            .save_pdf(&RasterFlattener::new(), &mut exporter)
            .unwrap();

        let doc = Document::load(dir.path().join("annotated.pdf")).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }
}
