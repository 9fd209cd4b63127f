//! Decoded-texture cache.
//!
//! Textures are keyed by the lighting guid of their source and decoded at
//! most once for the lifetime of the cache. Every material that references
//! the same source shares the cached `Arc<Texture>`.
//!
//! A source is decoded through the first path that has data:
//! 1. a conventional mip no larger than `max_texture_size`, decoded to RGBA8
//! 2. virtual texture data, decoded to a bitmap whose color layout picks the
//!    pixel format through [`pixel_layout`]
//!
//! A source with neither, or a decoder error, yields `None`. Callers treat a
//! missing texture as a normal outcome.
//!
//! Decodes started in the background are tracked here as well, so an id has
//! at most one decode in flight whichever path asked for it. While it is
//! pending, [`TextureCache::get_or_decode`] reports the texture as absent.

use std::{collections::HashMap, sync::Arc};

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};

use crate::{
    config::Settings,
    data_structures::{
        guid::Guid,
        texture::{PixelFormat, PixelType, Texture, TextureInfo},
    },
    resources::{
        decode::SwizzleChannelFixer,
        texture::{
            ChannelFixer, ColorLayout, DecodedBitmap, TextureDecoder, TexturePlatform,
            TextureSource,
        },
    },
};

/// Pixel format and storage type the renderer uploads a texture with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelLayout {
    pub format: PixelFormat,
    pub pixel_type: PixelType,
}

impl PixelLayout {
    pub const RGBA8: PixelLayout = PixelLayout {
        format: PixelFormat::Rgba,
        pixel_type: PixelType::UnsignedByte,
    };
}

/// Color layouts with a dedicated upload layout. Everything else is RGBA8.
const LAYOUTS: [(ColorLayout, PixelLayout); 4] = [
    (
        ColorLayout::Rgb888x,
        PixelLayout {
            format: PixelFormat::Rgb,
            pixel_type: PixelType::UnsignedByte,
        },
    ),
    (
        ColorLayout::Rgb565,
        PixelLayout {
            format: PixelFormat::Rgb,
            pixel_type: PixelType::UnsignedShort565,
        },
    ),
    (
        ColorLayout::Bgra8888,
        PixelLayout {
            format: PixelFormat::Bgra,
            pixel_type: PixelType::UnsignedByte,
        },
    ),
    (
        ColorLayout::Gray8,
        PixelLayout {
            format: PixelFormat::Luminance,
            pixel_type: PixelType::UnsignedByte,
        },
    ),
];

pub fn pixel_layout(layout: ColorLayout) -> PixelLayout {
    LAYOUTS
        .iter()
        .find(|(color_layout, _)| *color_layout == layout)
        .map(|(_, pixel_layout)| *pixel_layout)
        .unwrap_or(PixelLayout::RGBA8)
}

/// Everything the decode step needs besides the source itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    pub platform: TexturePlatform,
    /// Upper-cased game name handed to the channel fix.
    pub game: String,
    pub max_texture_size: u32,
}

impl DecodeOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            platform: settings.platform,
            game: settings.game_name.to_uppercase(),
            max_texture_size: settings.preview_max_texture_size,
        }
    }
}

/// Converts the intermediate bitmap and drops it. Padded RGB is repacked so
/// the buffer matches its RGB tag.
fn bitmap_to_texture(bitmap: DecodedBitmap, info: TextureInfo) -> Texture {
    let layout = pixel_layout(bitmap.color_layout);
    let data = match bitmap.color_layout {
        ColorLayout::Rgb888x => bitmap
            .data
            .chunks_exact(4)
            .flat_map(|p| [p[0], p[1], p[2]])
            .collect(),
        _ => bitmap.data,
    };
    Texture::with_layout(
        data,
        bitmap.width,
        bitmap.height,
        info,
        layout.format,
        layout.pixel_type,
    )
}

/// Runs the decode paths for `source` without touching any cache.
pub(crate) fn decode_texture(
    decoder: &dyn TextureDecoder,
    fixer: &dyn ChannelFixer,
    options: &DecodeOptions,
    source: &dyn TextureSource,
    fix_channels: bool,
) -> Option<Texture> {
    let info = TextureInfo {
        guid: source.lighting_guid(),
        name: source.name().to_string(),
    };
    let mut texture = if let Some(mip) = source.mip_by_max_size(options.max_texture_size) {
        match decoder.decode(mip, source.pixel_format(), source.is_normal_map(), options.platform) {
            Ok(data) if !data.is_empty() => Texture::new(data, mip.width, mip.height, info),
            Ok(_) => {
                log::warn!("Decoding {} produced no pixels", source.name());
                return None;
            }
            Err(e) => {
                log::warn!("Failed to decode {}: {:#}", source.name(), e);
                return None;
            }
        }
    } else if source.is_virtual() {
        let Some(data) = source.virtual_texture_data() else {
            log::debug!("Virtual texture {} has no built data", source.name());
            return None;
        };
        match decoder.decode_virtual(source, data, options.platform) {
            Ok(bitmap) if !bitmap.data.is_empty() => bitmap_to_texture(bitmap, info),
            Ok(_) => {
                log::warn!("Decoding virtual texture {} produced no pixels", source.name());
                return None;
            }
            Err(e) => {
                log::warn!("Failed to decode virtual texture {}: {:#}", source.name(), e);
                return None;
            }
        }
    } else {
        log::debug!("{} has no mip data to decode", source.name());
        return None;
    };

    if fix_channels {
        fixer.fix_channels(&options.game, &mut texture);
    }
    Some(texture)
}

/// Resolves to the decoded texture, or `None` if the source had no usable data.
pub type PendingTexture = Shared<BoxFuture<'static, Option<Arc<Texture>>>>;

pub struct TextureCache {
    textures: HashMap<Guid, Arc<Texture>>,
    pending: HashMap<Guid, PendingTexture>,
    decoder: Arc<dyn TextureDecoder>,
    fixer: Arc<dyn ChannelFixer>,
    options: DecodeOptions,
}

impl TextureCache {
    pub fn new(
        decoder: Arc<dyn TextureDecoder>,
        fixer: Arc<dyn ChannelFixer>,
        options: DecodeOptions,
    ) -> Self {
        Self {
            textures: HashMap::new(),
            pending: HashMap::new(),
            decoder,
            fixer,
            options,
        }
    }

    /// A cache using the default channel fix for the configured game.
    pub fn from_settings(settings: &Settings, decoder: Arc<dyn TextureDecoder>) -> Self {
        Self::new(
            decoder,
            Arc::new(SwizzleChannelFixer),
            DecodeOptions::from_settings(settings),
        )
    }

    pub fn with_channel_fixer(mut self, fixer: Arc<dyn ChannelFixer>) -> Self {
        self.fixer = fixer;
        self
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub(crate) fn decoder(&self) -> Arc<dyn TextureDecoder> {
        self.decoder.clone()
    }

    pub(crate) fn fixer(&self) -> Arc<dyn ChannelFixer> {
        self.fixer.clone()
    }

    /// Returns the cached texture for `source`, decoding it on first request.
    /// An id still decoding in the background is absent until it lands.
    pub fn get_or_decode(
        &mut self,
        source: &dyn TextureSource,
        fix_channels: bool,
    ) -> Option<Arc<Texture>> {
        let guid = source.lighting_guid();
        if let Some(texture) = self.textures.get(&guid) {
            return Some(texture.clone());
        }
        if let Some(pending) = self.pending.get(&guid).cloned() {
            let Some(result) = pending.now_or_never() else {
                log::debug!("{} is still decoding in the background", source.name());
                return None;
            };
            self.pending.remove(&guid);
            return result.map(|texture| self.adopt(texture));
        }
        let texture = decode_texture(
            self.decoder.as_ref(),
            self.fixer.as_ref(),
            &self.options,
            source,
            fix_channels,
        )?;
        log::debug!(
            "Decoded {} ({}x{}, {:?})",
            texture.info.name,
            texture.width,
            texture.height,
            texture.format
        );
        Some(self.adopt(Arc::new(texture)))
    }

    pub fn try_get(&self, guid: Guid) -> Option<Arc<Texture>> {
        self.textures.get(&guid).cloned()
    }

    pub fn contains(&self, guid: Guid) -> bool {
        self.textures.contains_key(&guid)
    }

    /// Inserts a texture decoded elsewhere. An existing entry wins and is
    /// returned instead, so an id never maps to two textures.
    pub fn adopt(&mut self, texture: Arc<Texture>) -> Arc<Texture> {
        self.textures
            .entry(texture.info.guid)
            .or_insert(texture)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn is_pending(&self, guid: Guid) -> bool {
        self.pending.contains_key(&guid)
    }

    /// Number of background decodes not yet collected.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn pending(&self, guid: Guid) -> Option<PendingTexture> {
        self.pending.get(&guid).cloned()
    }

    pub(crate) fn track_pending(&mut self, guid: Guid, pending: PendingTexture) {
        self.pending.insert(guid, pending);
    }

    /// Adopts every finished background decode without blocking. Returns how
    /// many textures were handed over.
    pub fn collect_finished(&mut self) -> usize {
        let finished: Vec<(Guid, Option<Arc<Texture>>)> = self
            .pending
            .iter()
            .filter_map(|(guid, pending)| {
                pending.clone().now_or_never().map(|result| (*guid, result))
            })
            .collect();

        let mut adopted = 0;
        for (guid, result) in finished {
            self.pending.remove(&guid);
            match result {
                Some(texture) => {
                    self.adopt(texture);
                    adopted += 1;
                }
                None => log::debug!("Background decode of {} yielded no texture", guid),
            }
        }
        adopted
    }

    /// Releases every cached buffer and empties the cache. Pending decodes
    /// are forgotten.
    pub fn dispose_all(&mut self) {
        self.pending.clear();
        if self.textures.is_empty() {
            return;
        }
        log::info!("Disposing {} cached textures", self.textures.len());
        for texture in self.textures.values() {
            texture.dispose();
        }
        self.textures.clear();
    }
}
