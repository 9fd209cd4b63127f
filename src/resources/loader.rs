//! Background texture decoding.
//!
//! Decodes run on tokio's blocking pool. The [`TextureCache`] tracks every
//! decode in flight, so an id is decoded at most once whether it was asked
//! for here or synchronously: a second request while the first is pending
//! gets a clone of the same [`PendingTexture`]. Results only reach the cache
//! through [`TextureLoader::complete`], which the owner thread calls once
//! per frame.

use std::sync::Arc;

use futures::{FutureExt, future};

use crate::{
    resources::texture::{ChannelFixer, TextureDecoder, TextureSource},
    texture_cache::{DecodeOptions, TextureCache, decode_texture},
};

pub use crate::texture_cache::PendingTexture;

pub struct TextureLoader {
    decoder: Arc<dyn TextureDecoder>,
    fixer: Arc<dyn ChannelFixer>,
    options: DecodeOptions,
    runtime: tokio::runtime::Handle,
}

impl TextureLoader {
    /// A loader decoding with the same collaborators and options as `cache`.
    pub fn new(cache: &TextureCache, runtime: tokio::runtime::Handle) -> Self {
        Self {
            decoder: cache.decoder(),
            fixer: cache.fixer(),
            options: cache.options().clone(),
            runtime,
        }
    }

    pub fn request(
        &self,
        cache: &mut TextureCache,
        source: Arc<dyn TextureSource>,
        fix_channels: bool,
    ) -> PendingTexture {
        let guid = source.lighting_guid();
        if let Some(texture) = cache.try_get(guid) {
            return future::ready(Some(texture)).boxed().shared();
        }
        if let Some(pending) = cache.pending(guid) {
            return pending;
        }

        let decoder = self.decoder.clone();
        let fixer = self.fixer.clone();
        let options = self.options.clone();
        let task = self.runtime.spawn_blocking(move || {
            decode_texture(
                decoder.as_ref(),
                fixer.as_ref(),
                &options,
                source.as_ref(),
                fix_channels,
            )
            .map(Arc::new)
        });
        let pending = async move {
            match task.await {
                Ok(texture) => texture,
                Err(e) => {
                    log::error!("Texture decode task failed: {}", e);
                    None
                }
            }
        }
        .boxed()
        .shared();

        cache.track_pending(guid, pending.clone());
        pending
    }

    /// Moves finished decodes into `cache` without blocking. Returns how many
    /// textures were handed over.
    pub fn complete(&self, cache: &mut TextureCache) -> usize {
        cache.collect_finished()
    }
}
