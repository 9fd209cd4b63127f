//! Renderable models as the preview holds them.
//!
//! A [`Model`] is owned by the model registry and refers to other models only
//! by [`Guid`]: sockets list the models attached to them and a model records
//! which parent socket it hangs off. Texture data is resolved lazily during
//! [`Model::setup`] through the shared [`TextureCache`].

use std::{fmt, sync::Arc};

use crate::{
    data_structures::{
        guid::Guid, skeleton::Skeleton, socket::Socket, texture::Texture, transform::Transform,
    },
    resources::{export::ExportObject, texture::TextureSource},
    texture_cache::TextureCache,
};

/// A draw range of the model using one material.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub material_index: usize,
    pub first_index: u32,
    pub index_count: u32,
    pub show: bool,
}

impl Section {
    pub fn new(material_index: usize, first_index: u32, index_count: u32) -> Self {
        Self {
            material_index,
            first_index,
            index_count,
            show: true,
        }
    }
}

/// A named texture slot of a material (diffuse, normals, packed masks, ...).
#[derive(Clone)]
pub struct TextureParameter {
    pub name: String,
    pub source: Arc<dyn TextureSource>,
    /// Packed mask textures need the per-game channel fix.
    pub fix_channels: bool,
}

impl fmt::Debug for TextureParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureParameter")
            .field("name", &self.name)
            .field("source", &self.source.name())
            .field("fix_channels", &self.fix_channels)
            .finish()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Material {
    pub name: String,
    pub parameters: Vec<TextureParameter>,
    resolved: Vec<Option<Arc<Texture>>>,
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_texture(mut self, name: &str, source: Arc<dyn TextureSource>, fix_channels: bool) -> Self {
        self.parameters.push(TextureParameter {
            name: name.to_string(),
            source,
            fix_channels,
        });
        self
    }

    /// Resolves every texture parameter through the cache. Parameters whose
    /// texture can't be decoded get `placeholder` instead.
    pub fn setup(&mut self, cache: &mut TextureCache, placeholder: Option<&Arc<Texture>>) {
        self.resolved = self
            .parameters
            .iter()
            .map(|parameter| {
                cache
                    .get_or_decode(parameter.source.as_ref(), parameter.fix_channels)
                    .or_else(|| {
                        log::debug!(
                            "{}.{} has no texture data, using placeholder",
                            self.name,
                            parameter.name
                        );
                        placeholder.cloned()
                    })
            })
            .collect();
    }

    /// Texture bound to the parameter `name` after setup.
    pub fn texture(&self, name: &str) -> Option<&Arc<Texture>> {
        self.parameters
            .iter()
            .position(|parameter| parameter.name == name)
            .and_then(|idx| self.resolved.get(idx))
            .and_then(Option::as_ref)
    }

    pub fn dispose(&mut self) {
        self.resolved.clear();
    }
}

/// Which socket of which parent a model hangs off.
#[derive(Clone, Debug, PartialEq)]
pub struct AttachmentLink {
    pub parent: Guid,
    pub socket: String,
    /// Bone attachments live in a virtual socket that may share its name
    /// with a mesh socket.
    pub is_virtual: bool,
    /// The child's own transform at attach time, restored on detach.
    pub saved_transform: Transform,
}

#[derive(Clone, Debug)]
pub struct Model {
    pub guid: Guid,
    pub name: String,
    pub export: ExportObject,
    pub transform: Transform,
    pub sections: Vec<Section>,
    pub materials: Vec<Material>,
    pub sockets: Vec<Socket>,
    pub skeleton: Option<Skeleton>,
    /// Spawned to be driven by an animation; has no lifetime of its own.
    pub is_animated_prop: bool,
    pub is_visible: bool,
    pub is_selected: bool,
    morph_target_count: usize,
    active_morph: Option<usize>,
    is_setup: bool,
    attached_to: Option<AttachmentLink>,
}

impl Model {
    pub fn new(guid: Guid, name: &str) -> Self {
        Self {
            guid,
            name: name.to_string(),
            export: ExportObject {
                name: name.to_string(),
                ..Default::default()
            },
            transform: Transform::default(),
            sections: Vec::new(),
            materials: Vec::new(),
            sockets: Vec::new(),
            skeleton: None,
            is_animated_prop: false,
            is_visible: true,
            is_selected: false,
            morph_target_count: 0,
            active_morph: None,
            is_setup: false,
            attached_to: None,
        }
    }

    pub fn with_export(mut self, export: ExportObject) -> Self {
        self.export = export;
        self
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.materials.push(material);
        self
    }

    pub fn with_socket(mut self, socket: Socket) -> Self {
        self.sockets.push(socket);
        self
    }

    pub fn with_skeleton(mut self, skeleton: Skeleton) -> Self {
        self.skeleton = Some(skeleton);
        self
    }

    pub fn with_morph_targets(mut self, count: usize) -> Self {
        self.morph_target_count = count;
        self
    }

    pub fn animated_prop(mut self) -> Self {
        self.is_animated_prop = true;
        self
    }

    pub fn is_setup(&self) -> bool {
        self.is_setup
    }

    /// One-time resource initialisation. Calling it on a set up model does nothing.
    pub fn setup(&mut self, cache: &mut TextureCache, placeholder: Option<&Arc<Texture>>) {
        if self.is_setup {
            return;
        }
        for material in self.materials.iter_mut() {
            material.setup(cache, placeholder);
        }
        self.is_setup = true;
        log::debug!("Model {} ({}) set up", self.name, self.guid);
    }

    /// Releases everything the model resolved or allocated. Sockets are
    /// emptied; the registry is responsible for the models they pointed at.
    pub fn dispose(&mut self) {
        for material in self.materials.iter_mut() {
            material.dispose();
        }
        for socket in self.sockets.iter_mut() {
            socket.dispose();
        }
        self.sockets.retain(|socket| !socket.is_virtual);
        if let Some(skeleton) = self.skeleton.as_mut() {
            skeleton.reset_animated_data(true);
        }
        self.attached_to = None;
        self.is_setup = false;
        self.is_selected = false;
    }

    pub fn morph_target_count(&self) -> usize {
        self.morph_target_count
    }

    pub fn active_morph(&self) -> Option<usize> {
        self.active_morph
    }

    /// Activates morph target `index`, clamped to the available targets.
    pub fn update_morph(&mut self, index: usize) {
        self.active_morph = match self.morph_target_count {
            0 => None,
            count => Some(index.min(count - 1)),
        };
    }

    pub fn socket(&self, name: &str) -> Option<&Socket> {
        self.sockets.iter().find(|socket| socket.name == name)
    }

    pub fn socket_mut(&mut self, name: &str) -> Option<&mut Socket> {
        self.sockets.iter_mut().find(|socket| socket.name == name)
    }

    /// Like [`Model::socket`], restricted to mesh or virtual sockets.
    pub fn find_socket(&self, name: &str, is_virtual: bool) -> Option<&Socket> {
        self.sockets
            .iter()
            .find(|socket| socket.name == name && socket.is_virtual == is_virtual)
    }

    pub(crate) fn find_socket_mut(&mut self, name: &str, is_virtual: bool) -> Option<&mut Socket> {
        self.sockets
            .iter_mut()
            .find(|socket| socket.name == name && socket.is_virtual == is_virtual)
    }

    pub fn attached_to(&self) -> Option<&AttachmentLink> {
        self.attached_to.as_ref()
    }

    pub(crate) fn set_attached_to(&mut self, link: Option<AttachmentLink>) {
        self.attached_to = link;
    }

    /// Drops empty virtual sockets.
    pub(crate) fn collect_garbage_sockets(&mut self) {
        self.sockets.retain(|socket| !socket.is_garbage());
    }
}
