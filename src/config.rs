use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::resources::{
    export::{
        ExporterOptions, LodExportFormat, MaterialExportFormat, MeshExportFormat,
        SocketExportFormat, TextureExportFormat,
    },
    texture::TexturePlatform,
};

/// Preview session settings.
///
/// Every field has a default so partial JSON files load fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Largest mip edge requested from texture sources.
    pub preview_max_texture_size: u32,
    pub platform: TexturePlatform,
    /// Name of the game the assets belong to; selects the channel fix.
    pub game_name: String,
    /// Directory exports are written to.
    pub model_directory: PathBuf,
    pub lod_format: LodExportFormat,
    pub mesh_format: MeshExportFormat,
    pub material_format: MaterialExportFormat,
    pub texture_format: TextureExportFormat,
    pub socket_format: SocketExportFormat,
    pub export_morph_targets: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preview_max_texture_size: 2048,
            platform: TexturePlatform::default(),
            game_name: String::new(),
            model_directory: PathBuf::from("./Output/Exports"),
            lod_format: LodExportFormat::default(),
            mesh_format: MeshExportFormat::default(),
            material_format: MaterialExportFormat::default(),
            texture_format: TextureExportFormat::default(),
            socket_format: SocketExportFormat::default(),
            export_morph_targets: true,
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        Ok(settings)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write settings file {}", path.display()))
    }

    pub fn exporter_options(&self) -> ExporterOptions {
        ExporterOptions {
            lod_format: self.lod_format,
            mesh_format: self.mesh_format,
            material_format: self.material_format,
            texture_format: self.texture_format,
            socket_format: self.socket_format,
            platform: self.platform,
            export_morph_targets: self.export_morph_targets,
        }
    }
}
