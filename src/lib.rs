//! flow-preview
//!
//! Scene state for an interactive 3D asset preview. The crate keeps the
//! loaded models, their socket attachments, the playing animations and a
//! cache of decoded textures consistent while the UI adds, selects and
//! removes things. Rendering, asset access, pixel decoding and exporting are
//! collaborators reached through the traits in [`resources`].
//!
//! High-level modules
//! - `scene`: the per-session coordinator the UI and renderer talk to
//! - `attachments`: model registry plus cascading detach/remove over sockets
//! - `animations`: active animations and the shared playback clock
//! - `texture_cache`: lazily decoded textures keyed by source id
//! - `data_structures`: models, sockets, skeletons, lights, textures, icons
//! - `resources`: collaborator contracts, default decoder, background loader
//! - `config`: session settings loaded from JSON
//!

pub mod animations;
pub mod attachments;
pub mod config;
pub mod data_structures;
pub mod resources;
pub mod scene;
pub mod texture_cache;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use data_structures::guid::Guid;
pub use scene::SceneState;

/// Installs the platform logger. Safe to call more than once.
pub fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            log::warn!("Could not initialize logger: {}", e);
        }
    }
}
