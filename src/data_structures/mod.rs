//! Preview data structures: models, sockets, skeletons, lights and textures.
//!
//! - `guid` is the identifier every registry is keyed by
//! - `transform` holds position/rotation/scale and their composition
//! - `model` contains models, sections and materials
//! - `socket` holds attachment points and their back-references
//! - `skeleton` has bones and the animated pose
//! - `animation` contains clips, playing animations and the playback clock
//! - `light` has point and spot lights
//! - `texture` is the decoded pixel buffer shared through the cache
//! - `icons` is the fixed set of UI icon textures

pub mod animation;
pub mod guid;
pub mod icons;
pub mod light;
pub mod model;
pub mod skeleton;
pub mod socket;
pub mod texture;
pub mod transform;
