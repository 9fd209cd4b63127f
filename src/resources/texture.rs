//! Contracts for the texture collaborators the core calls into: the asset
//! source that hands out raw mips, the pixel decoder and the per-game
//! channel fix.

use serde::{Deserialize, Serialize};

use crate::data_structures::{guid::Guid, texture::Texture};

/// Platform the cooked texture data was built for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TexturePlatform {
    #[default]
    DesktopMobile,
    Playstation,
    XboxOneAndSeries,
    NintendoSwitch,
}

/// Pixel format of the raw (not yet decoded) mip data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourcePixelFormat {
    R8G8B8A8,
    B8G8R8A8,
    G8,
    /// Two-channel data, usually a normal map with the blue channel dropped.
    R8G8,
    /// A complete image file (PNG, JPEG, TGA, BMP) stored as the mip payload.
    Encoded,
    Dxt1,
    Dxt5,
    Bc5,
    Bc7,
}

/// One raw mip level as stored in the asset.
#[derive(Clone, Debug)]
pub struct RawMip {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Color layout of a bitmap produced by the virtual-texture decode path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorLayout {
    Rgba8888,
    Rgb888x,
    Rgb565,
    Bgra8888,
    Gray8,
    Alpha8,
    Argb4444,
    RgbaF16,
}

impl ColorLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ColorLayout::Gray8 | ColorLayout::Alpha8 => 1,
            ColorLayout::Rgb565 | ColorLayout::Argb4444 => 2,
            ColorLayout::Rgba8888 | ColorLayout::Rgb888x | ColorLayout::Bgra8888 => 4,
            ColorLayout::RgbaF16 => 8,
        }
    }
}

/// A tile of a virtual texture, addressed in tile units.
#[derive(Clone, Debug)]
pub struct VirtualTile {
    pub x: u32,
    pub y: u32,
    pub data: Vec<u8>,
}

/// Built data of a tiled (virtual) texture.
#[derive(Clone, Debug)]
pub struct VirtualTextureData {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    pub layout: ColorLayout,
    pub tiles: Vec<VirtualTile>,
}

/// Intermediate bitmap produced by the virtual decode path.
#[derive(Clone, Debug)]
pub struct DecodedBitmap {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub color_layout: ColorLayout,
}

/// A texture export as the asset provider exposes it.
pub trait TextureSource: Send + Sync {
    /// Stable id the cache is keyed by.
    fn lighting_guid(&self) -> Guid;

    fn name(&self) -> &str;

    /// Largest mip not exceeding `max_size` in either dimension, if any mip
    /// data is resident.
    fn mip_by_max_size(&self, max_size: u32) -> Option<&RawMip>;

    fn is_virtual(&self) -> bool;

    fn virtual_texture_data(&self) -> Option<&VirtualTextureData>;

    fn pixel_format(&self) -> SourcePixelFormat;

    fn is_normal_map(&self) -> bool {
        false
    }
}

/// Turns raw texture data into pixels.
pub trait TextureDecoder: Send + Sync {
    /// Decodes a conventional mip into 8-bit RGBA.
    fn decode(
        &self,
        mip: &RawMip,
        format: SourcePixelFormat,
        is_normal_map: bool,
        platform: TexturePlatform,
    ) -> anyhow::Result<Vec<u8>>;

    /// Decodes a virtual texture into a bitmap that keeps its color layout.
    fn decode_virtual(
        &self,
        source: &dyn TextureSource,
        data: &VirtualTextureData,
        platform: TexturePlatform,
    ) -> anyhow::Result<DecodedBitmap>;
}

/// Game-specific channel remapping applied in place after decode.
pub trait ChannelFixer: Send + Sync {
    fn fix_channels(&self, game: &str, texture: &mut Texture);
}
