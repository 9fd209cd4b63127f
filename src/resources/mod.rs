/**
 * This module contains the contracts of everything the preview consumes from outside:
 * texture sources, pixel decoding, channel fixes and exporting, plus the default
 * implementations shipped with the crate.
 */
pub mod decode;
pub mod export;
#[cfg(not(target_arch = "wasm32"))]
pub mod loader;
pub mod texture;
