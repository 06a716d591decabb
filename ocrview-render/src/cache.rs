use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Error, Result};
use ocrview_core::{DocumentBackend, RenderImage, RenderRequest};
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::instrument;

const CACHE_CAPACITY: usize = 12;

/// Memoising front for a backend. Bitmaps are keyed by page and quantised
/// scale; when full, entries furthest from the page being read go first.
pub struct PageRenderer {
    backend: Arc<dyn DocumentBackend>,
    cache: Mutex<HashMap<CacheKey, Arc<RenderImage>>>,
}

impl PageRenderer {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn DocumentBackend> {
        &self.backend
    }

    #[instrument(skip(self))]
    pub fn render(
        &self,
        page_number: usize,
        scale: f32,
        reference_page: usize,
    ) -> Result<Arc<RenderImage>> {
        if page_number == 0 || page_number > self.backend.info().page_count() {
            return Err(anyhow!("page {} out of range", page_number));
        }

        let key = CacheKey::new(page_number, scale);
        if let Some(image) = self.cache.lock().get(&key).cloned() {
            return Ok(image);
        }

        let image = Arc::new(self.backend.render_page(RenderRequest { page_number, scale })?);
        self.store(key, Arc::clone(&image), reference_page);
        Ok(image)
    }

    /// Renders up to `range` pages either side of `reference_page` in parallel.
    pub fn prefetch_neighbors(&self, reference_page: usize, range: usize, scale: f32) -> Result<()> {
        let page_count = self.backend.info().page_count();
        let pages: Vec<usize> = (1..=range)
            .flat_map(|offset| [reference_page.checked_sub(offset), Some(reference_page + offset)])
            .flatten()
            .filter(|page| (1..=page_count).contains(page))
            .collect();

        let errors: Vec<Error> = pages
            .par_iter()
            .filter_map(|&page| self.render(page, scale, reference_page).err())
            .collect();
        match errors.into_iter().last() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    fn store(&self, key: CacheKey, image: Arc<RenderImage>, reference_page: usize) {
        let mut cache = self.cache.lock();
        cache.insert(key, image);

        if cache.len() > CACHE_CAPACITY {
            let mut keys: Vec<_> = cache.keys().copied().collect();
            keys.sort_by_key(|k| k.distance(reference_page));
            for stale in keys.into_iter().skip(CACHE_CAPACITY) {
                cache.remove(&stale);
            }
        }
    }

    #[cfg(test)]
    fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
struct CacheKey {
    page_number: usize,
    scale_milli: u32,
}

impl CacheKey {
    fn new(page_number: usize, scale: f32) -> Self {
        Self {
            page_number,
            scale_milli: quantize_scale(scale),
        }
    }

    fn distance(&self, reference_page: usize) -> usize {
        self.page_number.abs_diff(reference_page)
    }
}

fn quantize_scale(scale: f32) -> u32 {
    let scaled = (scale * 1000.0).round();
    if !scaled.is_finite() || scaled <= 0.0 {
        1
    } else if scaled > u32::MAX as f32 {
        u32::MAX
    } else {
        scaled as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ocrview_core::{DocumentFormat, DocumentInfo, DocumentSource, Size};

    struct CountingBackend {
        info: DocumentInfo,
        renders: AtomicUsize,
    }

    impl CountingBackend {
        fn new(pages: usize) -> Self {
            let source = DocumentSource::Path("counting.pdf".into());
            Self {
                info: DocumentInfo {
                    id: ocrview_core::document_id_for_source(&source),
                    source,
                    format: DocumentFormat::Pdf,
                    page_sizes: vec![Size::new(10.0, 10.0); pages],
                },
                renders: AtomicUsize::new(0),
            }
        }
    }

    impl DocumentBackend for CountingBackend {
        fn info(&self) -> &DocumentInfo {
            &self.info
        }

        fn render_page(&self, request: RenderRequest) -> Result<RenderImage> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            let side = (10.0 * request.scale) as u32;
            Ok(RenderImage {
                width: side,
                height: side,
                pixels: vec![0; (side * side * 4) as usize],
            })
        }
    }

    #[test]
    fn repeated_renders_hit_cache() {
        let backend = Arc::new(CountingBackend::new(3));
        let renderer = PageRenderer::new(backend.clone());
        renderer.render(2, 1.0, 2).unwrap();
        renderer.render(2, 1.0004, 2).unwrap();
        assert_eq!(backend.renders.load(Ordering::SeqCst), 1);

        renderer.render(2, 1.5, 2).unwrap();
        assert_eq!(backend.renders.load(Ordering::SeqCst), 2);
        assert!(renderer.render(4, 1.0, 2).is_err());
        assert!(renderer.render(0, 1.0, 2).is_err());
    }

    #[test]
    fn eviction_keeps_pages_near_reference() {
        let backend = Arc::new(CountingBackend::new(40));
        let renderer = PageRenderer::new(backend.clone());
        for page in 1..=40 {
            renderer.render(page, 1.0, 20).unwrap();
        }
        assert_eq!(renderer.cached(), CACHE_CAPACITY);

        let before = backend.renders.load(Ordering::SeqCst);
        renderer.render(20, 1.0, 20).unwrap();
        assert_eq!(backend.renders.load(Ordering::SeqCst), before);
        renderer.render(1, 1.0, 20).unwrap();
        assert_eq!(backend.renders.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn prefetch_stays_in_range() {
        let backend = Arc::new(CountingBackend::new(3));
        let renderer = PageRenderer::new(backend.clone());
        renderer.prefetch_neighbors(1, 3, 1.0).unwrap();
        assert_eq!(backend.renders.load(Ordering::SeqCst), 2);
    }
}
