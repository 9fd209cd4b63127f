//! Default texture collaborators.
//!
//! [`ImageTextureDecoder`] covers uncompressed mips, encoded image payloads
//! and tiled virtual textures. Block-compressed data needs a dedicated
//! decoder plugged in through [`TextureDecoder`].

use anyhow::*;

use crate::{
    data_structures::texture::{PixelFormat, PixelType, Texture},
    resources::texture::{
        ChannelFixer, DecodedBitmap, RawMip, SourcePixelFormat, TextureDecoder, TexturePlatform,
        TextureSource, VirtualTextureData,
    },
};

#[derive(Clone, Copy, Debug, Default)]
pub struct ImageTextureDecoder;

fn ensure_len(mip: &RawMip, bytes_per_pixel: usize) -> Result<usize> {
    let expected = mip.width as usize * mip.height as usize * bytes_per_pixel;
    ensure!(
        mip.data.len() >= expected,
        "mip holds {} bytes but {}x{} needs {}",
        mip.data.len(),
        mip.width,
        mip.height,
        expected
    );
    Ok(expected)
}

/// Rebuilds the z component of a unit normal stored as two channels.
fn reconstruct_blue(r: u8, g: u8) -> u8 {
    let x = r as f32 / 255.0 * 2.0 - 1.0;
    let y = g as f32 / 255.0 * 2.0 - 1.0;
    let z = (1.0 - x * x - y * y).max(0.0).sqrt();
    ((z + 1.0) / 2.0 * 255.0).round() as u8
}

impl TextureDecoder for ImageTextureDecoder {
    // Raw layouts are identical across platforms, only block-compressed data is tiled per console.
    fn decode(
        &self,
        mip: &RawMip,
        format: SourcePixelFormat,
        is_normal_map: bool,
        _platform: TexturePlatform,
    ) -> Result<Vec<u8>> {
        match format {
            SourcePixelFormat::R8G8B8A8 => {
                let len = ensure_len(mip, 4)?;
                Ok(mip.data[..len].to_vec())
            }
            SourcePixelFormat::B8G8R8A8 => {
                let len = ensure_len(mip, 4)?;
                Ok(mip.data[..len]
                    .chunks_exact(4)
                    .flat_map(|p| [p[2], p[1], p[0], p[3]])
                    .collect())
            }
            SourcePixelFormat::G8 => {
                let len = ensure_len(mip, 1)?;
                Ok(mip.data[..len].iter().flat_map(|&g| [g, g, g, 255]).collect())
            }
            SourcePixelFormat::R8G8 => {
                let len = ensure_len(mip, 2)?;
                Ok(mip.data[..len]
                    .chunks_exact(2)
                    .flat_map(|p| {
                        let b = if is_normal_map { reconstruct_blue(p[0], p[1]) } else { 0 };
                        [p[0], p[1], b, 255]
                    })
                    .collect())
            }
            SourcePixelFormat::Encoded => {
                let img = image::load_from_memory(&mip.data)?;
                Ok(img.to_rgba8().into_raw())
            }
            SourcePixelFormat::Dxt1
            | SourcePixelFormat::Dxt5
            | SourcePixelFormat::Bc5
            | SourcePixelFormat::Bc7 => {
                bail!("block compressed format {:?} is not supported by the image decoder", format)
            }
        }
    }

    fn decode_virtual(
        &self,
        source: &dyn TextureSource,
        data: &VirtualTextureData,
        _platform: TexturePlatform,
    ) -> Result<DecodedBitmap> {
        ensure!(data.tile_size > 0, "virtual texture {} has a zero tile size", source.name());
        ensure!(!data.tiles.is_empty(), "virtual texture {} has no resident tiles", source.name());

        let bpp = data.layout.bytes_per_pixel();
        let width = data.width as usize;
        let height = data.height as usize;
        let tile = data.tile_size as usize;
        let mut pixels = vec![0u8; width * height * bpp];

        for t in &data.tiles {
            let x0 = t.x as usize * tile;
            let y0 = t.y as usize * tile;
            if x0 >= width || y0 >= height {
                log::warn!(
                    "Tile ({}, {}) lies outside of virtual texture {} ({}x{})",
                    t.x,
                    t.y,
                    source.name(),
                    width,
                    height
                );
                continue;
            }
            ensure!(
                t.data.len() >= tile * tile * bpp,
                "tile ({}, {}) of {} is truncated",
                t.x,
                t.y,
                source.name()
            );
            let cols = tile.min(width - x0);
            let rows = tile.min(height - y0);
            for row in 0..rows {
                let src = row * tile * bpp;
                let dst = ((y0 + row) * width + x0) * bpp;
                pixels[dst..dst + cols * bpp].copy_from_slice(&t.data[src..src + cols * bpp]);
            }
        }

        Ok(DecodedBitmap {
            data: pixels,
            width: data.width,
            height: data.height,
            color_layout: data.layout,
        })
    }
}

/// Packed mask layouts that differ from (specular, metallic, roughness),
/// as `new[i] = old[order[i]]`.
const CHANNEL_ORDERS: [(&str, [usize; 4]); 6] = [
    // R: Metallic, G: Roughness, B: Specular
    ("HK_PROJECT", [2, 0, 1, 3]),
    ("COSMICSHAKE", [2, 0, 1, 3]),
    ("PHOENIX", [2, 0, 1, 3]),
    ("ATOMICHEART", [2, 0, 1, 3]),
    // R: Roughness, G: Metallic, B: Specular
    ("CCFF7R", [2, 1, 0, 3]),
    ("PJ033", [2, 1, 0, 3]),
];

pub fn channel_order(game: &str) -> Option<[usize; 4]> {
    CHANNEL_ORDERS
        .iter()
        .find(|(name, _)| *name == game)
        .map(|(_, order)| *order)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SwizzleChannelFixer;

impl ChannelFixer for SwizzleChannelFixer {
    fn fix_channels(&self, game: &str, texture: &mut Texture) {
        let Some(order) = channel_order(game) else {
            return;
        };
        if texture.format != PixelFormat::Rgba || texture.pixel_type != PixelType::UnsignedByte {
            log::debug!(
                "Skipping channel fix for {}: {:?}/{:?} is not RGBA8",
                texture.info.name,
                texture.format,
                texture.pixel_type
            );
            return;
        }
        for pixel in texture.pixels_mut().chunks_exact_mut(4) {
            let old = [pixel[0], pixel[1], pixel[2], pixel[3]];
            for (channel, &from) in pixel.iter_mut().zip(order.iter()) {
                *channel = old[from];
            }
        }
    }
}
