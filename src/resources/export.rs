//! Export contract: the core hands a selected object and the configured
//! options to an [`Exporter`] and reports back what it wrote.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::resources::texture::TexturePlatform;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LodExportFormat {
    #[default]
    FirstLod,
    AllLods,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshExportFormat {
    ActorX,
    #[default]
    Gltf2,
    Obj,
    UEFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialExportFormat {
    #[default]
    FirstLayer,
    AllLayersNoRef,
    AllLayers,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureExportFormat {
    #[default]
    Png,
    Tga,
    Dds,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketExportFormat {
    #[default]
    Bone,
    Socket,
    None,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExporterOptions {
    pub lod_format: LodExportFormat,
    pub mesh_format: MeshExportFormat,
    pub material_format: MaterialExportFormat,
    pub texture_format: TextureExportFormat,
    pub socket_format: SocketExportFormat,
    pub platform: TexturePlatform,
    pub export_morph_targets: bool,
}

/// The object a preview model was loaded from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportObject {
    pub name: String,
    /// Package path inside the asset source.
    pub path: String,
    pub class: String,
}

/// What an exporter reports after a successful write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedExport {
    pub label: String,
    pub path: PathBuf,
}

pub trait Exporter {
    fn write(
        &self,
        export: &ExportObject,
        options: &ExporterOptions,
        directory: &Path,
    ) -> anyhow::Result<SavedExport>;
}

/// Result of a save request as surfaced to the UI: failures are reported,
/// never raised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveOutcome {
    pub success: bool,
    pub label: String,
    pub saved_path: PathBuf,
}

impl SaveOutcome {
    pub(crate) fn from_result(export: &ExportObject, result: anyhow::Result<SavedExport>) -> Self {
        match result {
            Ok(saved) => {
                log::info!("Saved {} to {}", saved.label, saved.path.display());
                Self {
                    success: true,
                    label: saved.label,
                    saved_path: saved.path,
                }
            }
            Err(e) => {
                log::warn!("Could not save {}: {:#}", export.path, e);
                Self {
                    success: false,
                    label: format!("{}: {:#}", export.name, e),
                    saved_path: PathBuf::new(),
                }
            }
        }
    }
}
