use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, Once,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::bail;
use flow_preview::cgmath::Vector3;
use flow_preview::{
    attachments::AttachmentGraph,
    config::Settings,
    data_structures::{
        animation::{AnimationClip, Keyframes, Track},
        guid::Guid,
        model::{Material, Model, Section},
        skeleton::{Bone, Skeleton},
        socket::Socket,
        transform::Transform,
    },
    resources::{
        decode::ImageTextureDecoder,
        export::{ExportObject, Exporter, ExporterOptions, SavedExport},
        texture::{
            ColorLayout, DecodedBitmap, RawMip, SourcePixelFormat, TextureDecoder,
            TexturePlatform, TextureSource, VirtualTextureData, VirtualTile,
        },
    },
    scene::SceneState,
};

/// In-memory texture source.
pub(crate) struct FakeSource {
    guid: Guid,
    name: String,
    mip: Option<RawMip>,
    virtual_data: Option<VirtualTextureData>,
    format: SourcePixelFormat,
    normal_map: bool,
}

impl FakeSource {
    /// A `width` x `height` RGBA8 mip where every pixel is `pixel`.
    pub fn rgba(guid: Guid, width: u32, height: u32, pixel: [u8; 4]) -> Self {
        let data = pixel.repeat((width * height) as usize);
        Self::with_mip(guid, SourcePixelFormat::R8G8B8A8, RawMip { width, height, data })
    }

    pub fn with_mip(guid: Guid, format: SourcePixelFormat, mip: RawMip) -> Self {
        Self {
            guid,
            name: format!("T_{}", guid),
            mip: Some(mip),
            virtual_data: None,
            format,
            normal_map: false,
        }
    }

    /// Neither a mip nor virtual data.
    pub fn empty(guid: Guid) -> Self {
        Self {
            guid,
            name: format!("T_Empty_{}", guid),
            mip: None,
            virtual_data: None,
            format: SourcePixelFormat::R8G8B8A8,
            normal_map: false,
        }
    }

    /// A 2x2 virtual texture made of a single tile filled with `fill`.
    pub fn virtual_texture(guid: Guid, layout: ColorLayout, fill: u8) -> Self {
        let tile = VirtualTile {
            x: 0,
            y: 0,
            data: vec![fill; 2 * 2 * layout.bytes_per_pixel()],
        };
        Self {
            guid,
            name: format!("T_Virtual_{}", guid),
            mip: None,
            virtual_data: Some(VirtualTextureData {
                width: 2,
                height: 2,
                tile_size: 2,
                layout,
                tiles: vec![tile],
            }),
            format: SourcePixelFormat::R8G8B8A8,
            normal_map: false,
        }
    }

    pub fn normal_map(mut self) -> Self {
        self.normal_map = true;
        self
    }
}

impl TextureSource for FakeSource {
    fn lighting_guid(&self) -> Guid {
        self.guid
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn mip_by_max_size(&self, max_size: u32) -> Option<&RawMip> {
        self.mip
            .as_ref()
            .filter(|mip| mip.width <= max_size && mip.height <= max_size)
    }

    fn is_virtual(&self) -> bool {
        self.virtual_data.is_some()
    }

    fn virtual_texture_data(&self) -> Option<&VirtualTextureData> {
        self.virtual_data.as_ref()
    }

    fn pixel_format(&self) -> SourcePixelFormat {
        self.format
    }

    fn is_normal_map(&self) -> bool {
        self.normal_map
    }
}

/// Counts decode calls and forwards them to the image decoder.
#[derive(Default)]
pub(crate) struct CountingDecoder {
    inner: ImageTextureDecoder,
    decodes: AtomicUsize,
    virtual_decodes: AtomicUsize,
    fail: bool,
}

impl CountingDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    pub fn virtual_decodes(&self) -> usize {
        self.virtual_decodes.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.decodes() + self.virtual_decodes()
    }
}

impl TextureDecoder for CountingDecoder {
    fn decode(
        &self,
        mip: &RawMip,
        format: SourcePixelFormat,
        is_normal_map: bool,
        platform: TexturePlatform,
    ) -> anyhow::Result<Vec<u8>> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("corrupt mip");
        }
        self.inner.decode(mip, format, is_normal_map, platform)
    }

    fn decode_virtual(
        &self,
        source: &dyn TextureSource,
        data: &VirtualTextureData,
        platform: TexturePlatform,
    ) -> anyhow::Result<DecodedBitmap> {
        self.virtual_decodes.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("corrupt tiles");
        }
        self.inner.decode_virtual(source, data, platform)
    }
}

/// Remembers every write and drops a marker file into the target directory.
#[derive(Default)]
pub(crate) struct RecordingExporter {
    pub calls: Mutex<Vec<(ExportObject, ExporterOptions, PathBuf)>>,
    fail: bool,
}

impl RecordingExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }
}

impl Exporter for RecordingExporter {
    fn write(
        &self,
        export: &ExportObject,
        options: &ExporterOptions,
        directory: &Path,
    ) -> anyhow::Result<SavedExport> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((export.clone(), options.clone(), directory.to_path_buf()));
        }
        if self.fail {
            bail!("disk full");
        }
        fs::create_dir_all(directory)?;
        let path = directory.join(format!("{}.gltf", export.name));
        fs::write(&path, export.path.as_bytes())?;
        Ok(SavedExport {
            label: export.name.clone(),
            path,
        })
    }
}

static LOGGING: Once = Once::new();

/// Installs the logger once per test binary.
pub(crate) fn init_logging() {
    LOGGING.call_once(flow_preview::init_logging);
}

pub(crate) fn scene_with(settings: Settings) -> (SceneState, Arc<CountingDecoder>) {
    init_logging();
    let decoder = Arc::new(CountingDecoder::new());
    let scene = SceneState::new(settings, decoder.clone());
    (scene, decoder)
}

pub(crate) fn scene() -> (SceneState, Arc<CountingDecoder>) {
    scene_with(Settings::default())
}

/// A two-bone model with a `weapon` socket on `hand_r` and two sections.
pub(crate) fn skinned_model(name: &str) -> Model {
    let skeleton = Skeleton::new(vec![
        Bone {
            name: "root".to_string(),
            parent: None,
            rest: Transform::new(),
        },
        Bone {
            name: "hand_r".to_string(),
            parent: Some(0),
            rest: Transform::from_position(0.0, 1.0, 0.0),
        },
    ]);
    Model::new(Guid::new(), name)
        .with_skeleton(skeleton)
        .with_socket(Socket::new("weapon", "hand_r", Transform::new()))
        .with_section(Section::new(0, 0, 36))
        .with_section(Section::new(0, 36, 12))
        .with_material(Material::new(&format!("M_{}", name)))
}

pub(crate) fn plain_model(name: &str) -> Model {
    Model::new(Guid::new(), name).with_socket(Socket::new("socket", "", Transform::new()))
}

pub(crate) fn prop(name: &str) -> Model {
    plain_model(name).animated_prop()
}

/// Moves `root` from the origin to z = `distance` over `duration` seconds.
pub(crate) fn root_motion(name: &str, duration: f32, distance: f32) -> Arc<AnimationClip> {
    Arc::new(AnimationClip::new(
        name,
        vec![Track {
            bone: "root".to_string(),
            keyframes: Keyframes::Translation(vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, distance),
            ]),
            timestamps: vec![0.0, duration],
        }],
    ))
}

/// Every socket entry and every parent link points at a registered model.
pub(crate) fn assert_no_dangling(graph: &AttachmentGraph) {
    for model in graph.iter() {
        for socket in &model.sockets {
            for info in &socket.attached_models {
                assert!(
                    graph.contains(info.guid),
                    "{}.{} still references removed model {}",
                    model.name,
                    socket.name,
                    info.guid
                );
            }
            assert!(
                !socket.is_garbage(),
                "{} kept an empty virtual socket {}",
                model.name,
                socket.name
            );
        }
        if let Some(link) = model.attached_to() {
            assert!(
                graph.contains(link.parent),
                "{} is still linked to removed model {}",
                model.name,
                link.parent
            );
            let listed = graph
                .get(link.parent)
                .and_then(|parent| parent.find_socket(&link.socket, link.is_virtual))
                .is_some_and(|socket| socket.is_attached(model.guid));
            assert!(listed, "{} is linked to {} but not listed there", model.name, link.socket);
        }
    }
}
