//! Bitmap resources shared between image nodes.
//!
//! The scene never decodes images itself. It asks a [`ResourceLoader`] for a
//! source path and gets back `Pending`, `Ready` or `Unavailable`. The default
//! [`ImageCache`] decodes on worker threads and hands results back over a
//! channel, which the frame loop drains through [`ResourceLoader::poll`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use resvg::tiny_skia::{ColorU8, IntSize, Pixmap, Transform};

use crate::error::ResourceError;

#[derive(Debug, Clone)]
pub enum Resource {
    Pending,
    Ready(Arc<Pixmap>),
    Unavailable,
}

impl Resource {
    pub fn is_ready(&self) -> bool {
        matches!(self, Resource::Ready(_))
    }
}

pub trait ResourceLoader {
    /// Take a reference to `src` and start loading it if needed.
    fn load(&mut self, src: &str);

    /// Drop a reference taken by [`load`](ResourceLoader::load).
    fn release(&mut self, src: &str);

    fn get(&self, src: &str) -> Resource;

    /// Collect finished loads. Returns true if anything changed state.
    fn poll(&mut self) -> bool {
        false
    }
}

/// A loader with nothing in it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResources;

impl ResourceLoader for NoResources {
    fn load(&mut self, _src: &str) {}

    fn release(&mut self, _src: &str) {}

    fn get(&self, _src: &str) -> Resource {
        Resource::Unavailable
    }
}

struct Entry {
    state: Resource,
    refs: usize,
    last_used: u64,
}

type Decoded = (String, Result<Pixmap, ResourceError>);

/// Reference-counted, thread-decoded image store.
///
/// Unreferenced entries are kept around until the store grows past
/// `max_entries`, then evicted oldest first.
pub struct ImageCache {
    entries: HashMap<String, Entry>,
    max_entries: usize,
    clock: u64,
    sender: Sender<Decoded>,
    receiver: Receiver<Decoded>,
}

impl ImageCache {
    pub fn new(max_entries: usize) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            entries: HashMap::new(),
            max_entries,
            clock: 0,
            sender,
            receiver,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ref_count(&self, src: &str) -> usize {
        self.entries.get(src).map_or(0, |e| e.refs)
    }

    pub fn is_loading(&self) -> bool {
        self.entries
            .values()
            .any(|e| matches!(e.state, Resource::Pending))
    }

    /// Block until every in-flight decode has finished or `timeout` passes.
    /// Returns false on timeout.
    pub fn pump_blocking(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_loading() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(decoded) => self.finish(decoded),
                Err(_) => return false,
            }
        }
        self.evict();
        true
    }

    fn finish(&mut self, (src, result): Decoded) {
        let Some(entry) = self.entries.get_mut(&src) else {
            return;
        };
        entry.state = match result {
            Ok(pixmap) => {
                log::debug!("decoded {src} ({}x{})", pixmap.width(), pixmap.height());
                Resource::Ready(Arc::new(pixmap))
            }
            Err(err) => {
                log::warn!("failed to load {src}: {err}");
                Resource::Unavailable
            }
        };
    }

    fn evict(&mut self) {
        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .filter(|(_, e)| e.refs == 0 && !matches!(e.state, Resource::Pending))
                .min_by_key(|(_, e)| e.last_used)
                .map(|(src, _)| src.clone());

            match oldest {
                Some(src) => {
                    log::debug!("evicting {src}");
                    self.entries.remove(&src);
                }
                None => break,
            }
        }
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ResourceLoader for ImageCache {
    fn load(&mut self, src: &str) {
        self.clock += 1;
        if let Some(entry) = self.entries.get_mut(src) {
            entry.refs += 1;
            entry.last_used = self.clock;
            return;
        }

        self.entries.insert(
            src.to_string(),
            Entry {
                state: Resource::Pending,
                refs: 1,
                last_used: self.clock,
            },
        );

        let sender = self.sender.clone();
        let src = src.to_string();
        thread::spawn(move || {
            let result = decode_file(Path::new(&src));
            // The cache may have been dropped meanwhile
            let _ = sender.send((src, result));
        });
    }

    fn release(&mut self, src: &str) {
        if let Some(entry) = self.entries.get_mut(src) {
            entry.refs = entry.refs.saturating_sub(1);
        }
        self.evict();
    }

    fn get(&self, src: &str) -> Resource {
        self.entries
            .get(src)
            .map_or(Resource::Unavailable, |e| e.state.clone())
    }

    fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(decoded) = self.receiver.try_recv() {
            self.finish(decoded);
            changed = true;
        }
        if changed {
            self.evict();
        }
        changed
    }
}

/// Decode an image file into a premultiplied pixmap. SVG is rasterized at
/// its intrinsic size.
pub fn decode_file(path: &Path) -> Result<Pixmap, ResourceError> {
    let bytes = std::fs::read(path)?;
    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

    if is_svg {
        decode_svg(&bytes)
    } else {
        decode_raster(&bytes)
    }
}

pub fn decode_raster(bytes: &[u8]) -> Result<Pixmap, ResourceError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut data = rgba.into_raw();
    for pixel in data.chunks_exact_mut(4) {
        let c = ColorU8::from_rgba(pixel[0], pixel[1], pixel[2], pixel[3]).premultiply();
        pixel.copy_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }

    IntSize::from_wh(width, height)
        .and_then(|size| Pixmap::from_vec(data, size))
        .ok_or(ResourceError::Allocation { width, height })
}

pub fn decode_svg(bytes: &[u8]) -> Result<Pixmap, ResourceError> {
    let tree = resvg::usvg::Tree::from_data(bytes, &resvg::usvg::Options::default())?;
    let size = tree.size().to_int_size();
    let (width, height) = (size.width(), size.height());

    let mut pixmap =
        Pixmap::new(width, height).ok_or(ResourceError::Allocation { width, height })?;
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
    Ok(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 128]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_raster_premultiplies() {
        let pixmap = decode_raster(&png_bytes()).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (3, 2));

        let pixel = pixmap.pixel(0, 0).unwrap();
        assert_eq!(pixel.alpha(), 128);
        assert_eq!(pixel.red(), 128);
        assert_eq!(pixel.green(), 0);
    }

    #[test]
    fn test_decode_svg() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="4">
            <rect width="8" height="4" fill="blue"/>
        </svg>"#;
        let pixmap = decode_svg(svg).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (8, 4));
        assert_eq!(pixmap.pixel(4, 2).unwrap().blue(), 255);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_raster(b"not an image").is_err());
    }

    #[test]
    fn test_missing_file_becomes_unavailable() {
        let mut cache = ImageCache::new(4);
        cache.load("/definitely/not/here.png");
        assert!(matches!(cache.get("/definitely/not/here.png"), Resource::Pending));

        assert!(cache.pump_blocking(Duration::from_secs(5)));
        assert!(matches!(
            cache.get("/definitely/not/here.png"),
            Resource::Unavailable
        ));
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("canvas2d-cache-{}.png", std::process::id()));
        std::fs::write(&path, png_bytes()).unwrap();
        let src = path.to_string_lossy().to_string();

        let mut cache = ImageCache::new(4);
        cache.load(&src);
        assert!(cache.pump_blocking(Duration::from_secs(5)));
        assert!(cache.get(&src).is_ready());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_ref_counting_and_eviction() {
        let mut cache = ImageCache::new(1);
        cache.load("/missing/a.png");
        cache.load("/missing/a.png");
        cache.load("/missing/b.png");
        assert_eq!(cache.ref_count("/missing/a.png"), 2);

        assert!(cache.pump_blocking(Duration::from_secs(5)));

        cache.release("/missing/a.png");
        assert_eq!(cache.len(), 2);

        // Last reference gone and over the limit
        cache.release("/missing/a.png");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.ref_count("/missing/b.png"), 1);
    }
}
