//! Document rasterization seam.
//!
//! Decoding a document and rasterizing its pages are external capabilities;
//! the session only consumes them through [`DocumentRenderer`] and
//! [`RenderedDocument`]. Per-page rasters run as independent futures and are
//! joined by [`join_pages`], the counting barrier that gates surface
//! initialization.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::task::Poll;
use thiserror::Error;

/// Rasterization errors.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Document load failed: {0}")]
    Load(String),
    #[error("Raster failed for page {page}: {reason}")]
    Page { page: usize, reason: String },
}

/// Result type for raster operations.
pub type RasterResult<T> = Result<T, RasterError>;

/// Boxed future for async capability calls (single-threaded, cooperative).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Where the document bytes come from. Owned externally; the session only
/// references it during initialization.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Url(String),
    Bytes(Vec<u8>),
}

/// A fixed-size RGBA8 raster, row-major, 4 bytes per pixel.
///
/// Backgrounds are serialized base64-encoded so a full surface dump stays
/// valid JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageBitmap {
    pub width: u32,
    pub height: u32,
    #[serde(with = "pixels_base64")]
    pub pixels: Vec<u8>,
}

impl PageBitmap {
    /// Create a bitmap filled with a single RGBA color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a white bitmap.
    pub fn white(width: u32, height: u32) -> Self {
        Self::solid(width, height, [255, 255, 255, 255])
    }

    /// Read one pixel. Out-of-bounds reads return transparent black.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0, 0];
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Write one pixel. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }
}

mod pixels_base64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(pixels: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(pixels))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(&encoded).map_err(serde::de::Error::custom)
    }
}

/// Capability: decode a document source into a page-addressable form.
pub trait DocumentRenderer {
    /// Decode the document. Fails without side effects if the source cannot
    /// be fetched or parsed.
    fn open(&self, source: DocumentSource) -> BoxFuture<'_, RasterResult<Box<dyn RenderedDocument>>>;
}

/// Capability: a decoded document whose pages can be rasterized.
pub trait RenderedDocument {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Rasterize one page (1-based) into a bitmap at the given scale factor
    /// of its native viewport. Pages may be rasterized concurrently and in
    /// any order.
    fn render_page(&self, page: usize, scale: f64) -> BoxFuture<'_, RasterResult<PageBitmap>>;
}

/// Drive every page raster to completion, in whatever order the tasks finish,
/// and release the bitmaps in page order only once the completed count equals
/// the page count.
///
/// Surface initialization must run as a single pass over all completed
/// targets, never incrementally per completion, so page identifiers stay
/// consistent with document order.
pub fn join_pages<'a>(
    tasks: Vec<BoxFuture<'a, RasterResult<PageBitmap>>>,
) -> BoxFuture<'a, RasterResult<Vec<PageBitmap>>> {
    Box::pin(async move {
        let total = tasks.len();
        let mut pending: Vec<Option<BoxFuture<'a, RasterResult<PageBitmap>>>> =
            tasks.into_iter().map(Some).collect();
        let mut finished: Vec<Option<PageBitmap>> = Vec::new();
        finished.resize_with(total, || None);
        let mut completed = 0usize;

        let slots = std::future::poll_fn(move |cx| {
            for (index, slot) in pending.iter_mut().enumerate() {
                let Some(task) = slot else { continue };
                match task.as_mut().poll(cx) {
                    Poll::Ready(Ok(bitmap)) => {
                        finished[index] = Some(bitmap);
                        *slot = None;
                        completed += 1;
                    }
                    Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                    Poll::Pending => {}
                }
            }
            if completed == total {
                Poll::Ready(Ok(std::mem::take(&mut finished)))
            } else {
                Poll::Pending
            }
        })
        .await?;

        let bitmaps: Vec<PageBitmap> = slots.into_iter().flatten().collect();
        debug_assert_eq!(bitmaps.len(), total);
        Ok(bitmaps)
    })
}

/// Renders every page as a blank white bitmap.
///
/// For tests and headless embedding; real backends wrap a PDF rasterizer
/// behind the same traits.
#[derive(Debug, Clone)]
pub struct BlankRenderer {
    pages: Vec<(f64, f64)>,
}

impl BlankRenderer {
    /// One entry per page: native viewport size in points.
    pub fn new(pages: Vec<(f64, f64)>) -> Self {
        Self { pages }
    }

    /// `count` US-letter pages.
    pub fn letter(count: usize) -> Self {
        Self::new(vec![(612.0, 792.0); count])
    }
}

struct BlankDocument {
    pages: Vec<(f64, f64)>,
}

impl DocumentRenderer for BlankRenderer {
    fn open(&self, source: DocumentSource) -> BoxFuture<'_, RasterResult<Box<dyn RenderedDocument>>> {
        Box::pin(async move {
            if self.pages.is_empty() {
                let name = match source {
                    DocumentSource::Url(url) => url,
                    DocumentSource::Bytes(_) => "<bytes>".to_string(),
                };
                return Err(RasterError::Load(format!("{name}: document has no pages")));
            }
            Ok(Box::new(BlankDocument {
                pages: self.pages.clone(),
            }) as Box<dyn RenderedDocument>)
        })
    }
}

impl RenderedDocument for BlankDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render_page(&self, page: usize, scale: f64) -> BoxFuture<'_, RasterResult<PageBitmap>> {
        Box::pin(async move {
            let (w, h) = *self
                .pages
                .get(page.wrapping_sub(1))
                .ok_or(RasterError::Page {
                    page,
                    reason: "no such page".to_string(),
                })?;
            Ok(PageBitmap::white(
                (w * scale).round() as u32,
                (h * scale).round() as u32,
            ))
        })
    }
}

/// Minimal polling executor for tests. The runtime model is single-threaded
/// and cooperative, so a spin loop is enough to drive capability futures.
#[cfg(test)]
pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    use std::task::{Context, RawWaker, RawWakerVTable, Waker};

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

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_blank_renderer_dimensions() {
        let renderer = BlankRenderer::new(vec![(100.0, 200.0)]);
        let doc = block_on(renderer.open(DocumentSource::Url("a.pdf".into()))).unwrap();
        let bitmap = block_on(doc.render_page(1, 1.8)).unwrap();
        assert_eq!(bitmap.width, 180);
        assert_eq!(bitmap.height, 360);
        assert_eq!(bitmap.pixel(0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_blank_renderer_empty_document() {
        let renderer = BlankRenderer::new(Vec::new());
        let result = block_on(renderer.open(DocumentSource::Url("empty.pdf".into())));
        assert!(matches!(result, Err(RasterError::Load(_))));
    }

    #[test]
    fn test_bitmap_serde_roundtrip() {
        let bitmap = PageBitmap::solid(2, 2, [1, 2, 3, 4]);
        let json = serde_json::to_string(&bitmap).unwrap();
        let back: PageBitmap = serde_json::from_str(&json).unwrap();
        assert_eq!(bitmap, back);
    }

    /// A raster task that stays pending for a fixed number of polls, then
    /// records its completion order.
    fn staggered_task(
        page: usize,
        polls_until_ready: usize,
        order: Rc<RefCell<Vec<usize>>>,
    ) -> BoxFuture<'static, RasterResult<PageBitmap>> {
        let mut remaining = polls_until_ready;
        Box::pin(std::future::poll_fn(move |_cx| {
            if remaining > 0 {
                remaining -= 1;
                return Poll::Pending;
            }
            order.borrow_mut().push(page);
            Poll::Ready(Ok(PageBitmap::solid(page as u32, 1, [0, 0, 0, 255])))
        }))
    }

    #[test]
    fn test_join_pages_out_of_order_completion() {
        let order = Rc::new(RefCell::new(Vec::new()));
        // Page 1 finishes last, page 3 first.
        let tasks = vec![
            staggered_task(1, 5, order.clone()),
            staggered_task(2, 2, order.clone()),
            staggered_task(3, 0, order.clone()),
        ];

        let bitmaps = block_on(join_pages(tasks)).unwrap();

        assert_eq!(*order.borrow(), vec![3, 2, 1]);
        // Results come back in page order regardless of completion order.
        let widths: Vec<u32> = bitmaps.iter().map(|b| b.width).collect();
        assert_eq!(widths, vec![1, 2, 3]);
    }

    #[test]
    fn test_join_pages_propagates_failure() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let failing: BoxFuture<'static, RasterResult<PageBitmap>> = Box::pin(async {
            Err(RasterError::Page {
                page: 2,
                reason: "decode error".to_string(),
            })
        });
        let tasks = vec![staggered_task(1, 0, order.clone()), failing];

        let result = block_on(join_pages(tasks));
        assert!(matches!(result, Err(RasterError::Page { page: 2, .. })));
    }
}
