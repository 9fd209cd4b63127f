//! Decoded textures shared between models.
//!
//! A [`Texture`] owns a decoded pixel buffer plus the tags the rendering
//! backend needs to upload it. Textures are handed out as `Arc<Texture>`, so
//! every material that references the same source shares one buffer.
//! Disposal releases the buffer in place; holders of the `Arc` keep a valid
//! but empty texture afterwards.

use std::sync::{
    PoisonError, RwLock, RwLockReadGuard,
    atomic::{AtomicBool, Ordering},
};

use anyhow::*;
use image::{GenericImageView, ImageFormat, load_from_memory_with_format};

use crate::data_structures::guid::Guid;

/// Channel semantics of a decoded buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgba,
    Rgb,
    Bgra,
    Luminance,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgba | PixelFormat::Bgra => 4,
            PixelFormat::Rgb => 3,
            PixelFormat::Luminance => 1,
        }
    }
}

/// Storage width of a decoded pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelType {
    UnsignedByte,
    UnsignedShort565,
}

/// Where a texture came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureInfo {
    pub guid: Guid,
    pub name: String,
}

#[derive(Debug)]
pub struct Texture {
    pub info: TextureInfo,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixel_type: PixelType,
    data: RwLock<Vec<u8>>,
    disposed: AtomicBool,
}

impl Texture {
    /// An 8-bit RGBA texture, the layout every conventional mip decodes to.
    pub fn new(data: Vec<u8>, width: u32, height: u32, info: TextureInfo) -> Self {
        Self::with_layout(data, width, height, info, PixelFormat::Rgba, PixelType::UnsignedByte)
    }

    pub fn with_layout(
        data: Vec<u8>,
        width: u32,
        height: u32,
        info: TextureInfo,
        format: PixelFormat,
        pixel_type: PixelType,
    ) -> Self {
        Self {
            info,
            width,
            height,
            format,
            pixel_type,
            data: RwLock::new(data),
            disposed: AtomicBool::new(false),
        }
    }

    /// A 1x1 opaque magenta texture, used wherever real pixels are missing.
    pub fn placeholder(name: &str) -> Self {
        Self::new(
            vec![255, 0, 255, 255],
            1,
            1,
            TextureInfo {
                guid: Guid::EMPTY,
                name: name.to_string(),
            },
        )
    }

    /// Decode an encoded image file (PNG, JPEG, ...) into an RGBA texture.
    ///
    /// # Arguments
    ///
    /// * `bytes` represent raw image file data
    /// * `name` is used as a debug name for the resource
    /// * `format` is an optional file format hint (e.g., "png"). If None, auto-detect.
    pub fn from_bytes(bytes: &[u8], name: &str, format: Option<&str>) -> Result<Self> {
        let img = match format.and_then(ImageFormat::from_extension) {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => load_from_memory_with_format(bytes, fmt)?,
        };
        let (width, height) = img.dimensions();
        Ok(Self::new(
            img.to_rgba8().into_raw(),
            width,
            height,
            TextureInfo {
                guid: Guid::EMPTY,
                name: name.to_string(),
            },
        ))
    }

    /// Read access to the pixel buffer. Empty once disposed.
    pub fn pixels(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access while the texture is not shared yet (channel fixes).
    pub fn pixels_mut(&mut self) -> &mut Vec<u8> {
        self.data.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn byte_len(&self) -> usize {
        self.pixels().len()
    }

    /// Bytes per pixel implied by format and pixel type.
    pub fn stride(&self) -> usize {
        match self.pixel_type {
            PixelType::UnsignedShort565 => 2,
            PixelType::UnsignedByte => self.format.channels(),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Releases the pixel buffer. Calling it twice is a no-op.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *data = Vec::new();
    }
}
