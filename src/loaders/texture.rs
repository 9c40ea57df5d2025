use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result};

/// Decoded RGBA8 image, ready for GPU upload.
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Observable lifecycle of an asynchronous texture load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureState {
    Pending,
    Ready,
    Failed,
}

enum Slot {
    Pending,
    Ready(Arc<TextureData>),
    Failed,
}

/// Handle to a texture decoded on a background thread.
///
/// The renderer polls the handle once per frame and keeps drawing a neutral
/// placeholder until the decode resolves. A failed load stays on the
/// placeholder forever; the failure is logged once by the decode thread and
/// never surfaced further.
#[derive(Clone)]
pub struct TextureHandle {
    path: Arc<PathBuf>,
    slot: Arc<Mutex<Slot>>,
}

impl TextureHandle {
    /// Start decoding `path` on a detached thread and return immediately.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = Arc::new(path.into());
        let slot = Arc::new(Mutex::new(Slot::Pending));

        let thread_path = Arc::clone(&path);
        let thread_slot = Arc::clone(&slot);
        let spawned = thread::Builder::new()
            .name("texture-decode".to_string())
            .spawn(move || {
                let resolved = match decode(&thread_path) {
                    Ok(data) => Slot::Ready(Arc::new(data)),
                    Err(err) => {
                        eprintln!("Texture load failed: {err:#}");
                        Slot::Failed
                    }
                };
                if let Ok(mut slot) = thread_slot.lock() {
                    *slot = resolved;
                }
            });

        if let Err(err) = spawned {
            eprintln!(
                "Could not spawn texture decode thread for {}: {err}",
                path.display()
            );
            if let Ok(mut slot) = slot.lock() {
                *slot = Slot::Failed;
            }
        }

        Self { path, slot }
    }

    /// Wrap an already-decoded image; the handle is Ready from the start.
    pub fn from_data(data: TextureData) -> Self {
        Self {
            path: Arc::new(PathBuf::new()),
            slot: Arc::new(Mutex::new(Slot::Ready(Arc::new(data)))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> TextureState {
        match self.slot.lock() {
            Ok(slot) => match &*slot {
                Slot::Pending => TextureState::Pending,
                Slot::Ready(_) => TextureState::Ready,
                Slot::Failed => TextureState::Failed,
            },
            Err(_) => TextureState::Failed,
        }
    }

    /// The decoded image, if the load has resolved successfully.
    pub fn get(&self) -> Option<Arc<TextureData>> {
        match self.slot.lock() {
            Ok(slot) => match &*slot {
                Slot::Ready(data) => Some(Arc::clone(data)),
                _ => None,
            },
            Err(_) => None,
        }
    }
}

impl fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureHandle")
            .field("path", &self.path)
            .field("state", &self.state())
            .finish()
    }
}

fn decode(path: &Path) -> Result<TextureData> {
    let image = image::open(path)
        .with_context(|| format!("failed to open texture {}", path.display()))?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(TextureData {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_for_resolution(handle: &TextureHandle) -> TextureState {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let state = handle.state();
            if state != TextureState::Pending {
                return state;
            }
            if Instant::now() > deadline {
                return TextureState::Pending;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn missing_file_resolves_to_failed() {
        let handle = TextureHandle::load("/nonexistent/space.jpg");
        assert_eq!(wait_for_resolution(&handle), TextureState::Failed);
        assert!(handle.get().is_none());
    }

    #[test]
    fn valid_png_resolves_to_ready() {
        let path = std::env::temp_dir().join("space_scene_texture_test.png");
        let image = image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]));
        image.save(&path).expect("write test png");

        let handle = TextureHandle::load(&path);
        assert_eq!(wait_for_resolution(&handle), TextureState::Ready);

        let data = handle.get().expect("decoded data");
        assert_eq!((data.width, data.height), (4, 2));
        assert_eq!(data.pixels.len(), 4 * 2 * 4);
        assert_eq!(&data.pixels[..4], &[10, 20, 30, 255]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn from_data_is_ready_immediately() {
        let handle = TextureHandle::from_data(TextureData {
            width: 1,
            height: 1,
            pixels: vec![255, 255, 255, 255],
        });
        assert_eq!(handle.state(), TextureState::Ready);
        assert!(handle.get().is_some());
    }
}
