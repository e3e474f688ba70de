//! Per-tile texture handles
//!
//! A [`TextureHandle`] is created in the `Pending` state the moment a tile is
//! built. The loader keeps only a [`TextureCompleter`], which holds a weak
//! reference to the handle's state: once the owning tile is dropped, a late
//! completion finds nothing to write into and is discarded.

use std::sync::{Arc, Mutex, Weak};

use crate::{runtime::AsyncHandle, Result};

/// Decoded RGBA8 tile image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pixels: Arc<[u8]>,
}

impl Texture {
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// Decodes a PNG/JPEG tile payload.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = image.dimensions();
        Ok(Self::from_rgba(width, height, image.into_raw()))
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Load state of one tile's texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureState {
    Pending,
    Ready(Texture),
    Failed(String),
}

type TextureCell = Mutex<TextureState>;

/// Future-like texture slot owned by a tile's material.
pub struct TextureHandle {
    cell: Arc<TextureCell>,
    task: Option<Box<dyn AsyncHandle>>,
}

impl TextureHandle {
    pub fn pending() -> Self {
        Self {
            cell: Arc::new(Mutex::new(TextureState::Pending)),
            task: None,
        }
    }

    pub fn ready(texture: Texture) -> Self {
        Self {
            cell: Arc::new(Mutex::new(TextureState::Ready(texture))),
            task: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            cell: Arc::new(Mutex::new(TextureState::Failed(reason.into()))),
            task: None,
        }
    }

    /// Write side of this handle, for whoever performs the load.
    pub fn completer(&self) -> TextureCompleter {
        TextureCompleter {
            cell: Arc::downgrade(&self.cell),
        }
    }

    /// Ties the background load task to this handle's lifetime.
    pub fn attach_task(&mut self, task: Box<dyn AsyncHandle>) {
        self.task = Some(task);
    }

    pub fn state(&self) -> TextureState {
        self.cell
            .lock()
            .map(|state| state.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn texture(&self) -> Option<Texture> {
        match self.state() {
            TextureState::Ready(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state(), TextureState::Pending)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state(), TextureState::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state(), TextureState::Failed(_))
    }
}

impl Drop for TextureHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                task.cancel();
            }
        }
    }
}

impl std::fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureHandle")
            .field("state", &self.state())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

/// Weak write side of a [`TextureHandle`].
#[derive(Debug, Clone)]
pub struct TextureCompleter {
    cell: Weak<TextureCell>,
}

impl TextureCompleter {
    /// True once the owning handle has been dropped.
    pub fn is_released(&self) -> bool {
        self.cell.strong_count() == 0
    }

    /// Stores the load outcome. Returns `false` if the handle is gone or was
    /// already resolved; only the first completion is kept.
    pub fn complete(&self, result: Result<Texture>) -> bool {
        let Some(cell) = self.cell.upgrade() else {
            return false;
        };
        let mut state = match cell.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *state != TextureState::Pending {
            return false;
        }
        *state = match result {
            Ok(texture) => TextureState::Ready(texture),
            Err(e) => TextureState::Failed(e.to_string()),
        };
        true
    }
}
