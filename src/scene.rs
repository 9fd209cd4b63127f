//! The preview session's scene state.
//!
//! [`SceneState`] owns every model, light, animation and cached texture of
//! one preview session and is the only surface the UI and renderer talk to.
//! It is built when the session opens and torn down with
//! [`SceneState::dispose`]; there is no process-wide instance.

use std::sync::Arc;

use instant::Duration;

use crate::{
    animations::AnimationRegistry,
    attachments::AttachmentGraph,
    config::Settings,
    data_structures::{
        animation::Animation,
        guid::Guid,
        icons::IconSet,
        light::Light,
        model::{Model, Section},
        texture::Texture,
        transform::Transform,
    },
    resources::{
        export::{ExportObject, Exporter, SaveOutcome},
        texture::{ChannelFixer, TextureDecoder, TextureSource},
    },
    texture_cache::TextureCache,
};

pub struct SceneState {
    settings: Settings,
    models: AttachmentGraph,
    textures: TextureCache,
    lights: Vec<Light>,
    animations: AnimationRegistry,
    icons: IconSet,
    selected_model: Guid,
    selected_section: usize,
    selected_morph: usize,
    overwrite_material: bool,
    waiting_animation: bool,
    is_disposed: bool,
}

impl SceneState {
    pub fn new(settings: Settings, decoder: Arc<dyn TextureDecoder>) -> Self {
        let textures = TextureCache::from_settings(&settings, decoder);
        let mut scene = Self {
            settings,
            models: AttachmentGraph::new(),
            textures,
            lights: Vec::new(),
            animations: AnimationRegistry::new(),
            icons: IconSet::new(),
            selected_model: Guid::EMPTY,
            selected_section: 0,
            selected_morph: 0,
            overwrite_material: false,
            waiting_animation: false,
            is_disposed: false,
        };
        scene.select_model(Guid::EMPTY);
        log::info!(
            "Scene created for {} on {:?}",
            scene.textures.options().game,
            scene.settings.platform
        );
        scene
    }

    pub fn with_icons(mut self, icons: IconSet) -> Self {
        self.icons = icons;
        self
    }

    pub fn with_channel_fixer(mut self, fixer: Arc<dyn ChannelFixer>) -> Self {
        self.textures = self.textures.with_channel_fixer(fixer);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Registers `model`. Re-adding a registered id replaces the old model
    /// the way [`SceneState::remove_model`] would remove it.
    pub fn add_model(&mut self, model: Model) -> Guid {
        let guid = model.guid;
        let replaced = self.models.insert(model);
        self.forget_selection_of(&replaced);
        guid
    }

    pub fn models(&self) -> &AttachmentGraph {
        &self.models
    }

    pub fn try_get_model(&self, guid: Guid) -> Option<&Model> {
        self.models.get(guid)
    }

    pub fn try_get_model_mut(&mut self, guid: Guid) -> Option<&mut Model> {
        self.models.get_mut(guid)
    }

    pub fn try_get_selected_model(&self) -> Option<&Model> {
        self.models.get(self.selected_model)
    }

    /// Removes `guid` and every animated prop hanging off it. Other attached
    /// models are detached and kept.
    pub fn remove_model(&mut self, guid: Guid) -> bool {
        let removed = self.models.remove_model(guid, true);
        self.forget_selection_of(&removed);
        !removed.is_empty()
    }

    pub fn attach_model(&mut self, child: Guid, parent: Guid, socket: &str, offset: Transform) -> bool {
        self.models.attach_model(child, parent, socket, offset)
    }

    pub fn attach_model_to_bone(&mut self, child: Guid, parent: Guid, bone: &str, offset: Transform) -> bool {
        self.models.attach_model_to_bone(child, parent, bone, offset)
    }

    pub fn detach_model(&mut self, child: Guid, parent: Guid) -> bool {
        self.models.detach_model(child, parent)
    }

    fn forget_selection_of(&mut self, removed: &[Guid]) {
        if removed.contains(&self.selected_model) {
            self.selected_model = Guid::EMPTY;
            self.selected_section = 0;
            self.selected_morph = 0;
        }
    }

    /// Selects `guid`, or nothing if it isn't registered. Section and morph
    /// selection start over either way.
    pub fn select_model(&mut self, guid: Guid) {
        if let Some(model) = self.models.get_mut(self.selected_model) {
            model.is_selected = false;
        }

        match self.models.get_mut(guid) {
            Some(model) => {
                model.is_selected = true;
                self.selected_model = guid;
            }
            None => {
                if !guid.is_empty() {
                    log::debug!("Can't select unknown model {}", guid);
                }
                self.selected_model = Guid::EMPTY;
            }
        }

        self.selected_section = 0;
        self.selected_morph = 0;
    }

    pub fn select_section(&mut self, index: usize) {
        self.selected_section = index;
    }

    /// Records `index` and lets `model` recompute its morph state. The model
    /// clamps out of range indices.
    pub fn select_morph(&mut self, index: usize, model: Guid) {
        self.selected_morph = index;
        match self.models.get_mut(model) {
            Some(model) => model.update_morph(index),
            None => log::debug!("Can't apply morph {} to unknown model {}", index, model),
        }
    }

    pub fn select_animation(&mut self, index: usize) {
        self.animations.select(index);
    }

    pub fn selected_model(&self) -> Guid {
        self.selected_model
    }

    pub fn selected_section(&self) -> usize {
        self.selected_section
    }

    pub fn selected_morph(&self) -> usize {
        self.selected_morph
    }

    pub fn selected_animation(&self) -> usize {
        self.animations.selected()
    }

    /// The selected section of the selected model.
    pub fn try_get_section(&self) -> Option<&Section> {
        self.try_get_section_of(self.selected_model)
    }

    /// The selected section index looked up on `guid`.
    pub fn try_get_section_of(&self, guid: Guid) -> Option<&Section> {
        self.models
            .get(guid)
            .and_then(|model| model.sections.get(self.selected_section))
    }

    pub fn add_light(&mut self, light: Light) -> Guid {
        let guid = light.guid;
        self.lights.push(light);
        guid
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn add_animation(&mut self, animation: Animation) {
        self.animations.add(animation);
    }

    /// Stops every animation and removes the animated props they spawned.
    pub fn remove_animations(&mut self) {
        let removed = self.animations.remove_all(&mut self.models);
        self.forget_selection_of(&removed);
    }

    pub fn animations(&self) -> &AnimationRegistry {
        &self.animations
    }

    pub fn animations_mut(&mut self) -> &mut AnimationRegistry {
        &mut self.animations
    }

    /// Advances playback by `dt`.
    pub fn update(&mut self, dt: Duration) {
        self.animations.update(dt, &mut self.models);
    }

    /// Runs the one-time setup of every model and light that still needs it.
    /// Cheap to call every frame.
    pub fn setup_pending(&mut self) {
        let placeholder = self.icons.get("noimage").cloned();
        for model in self.models.iter_mut() {
            if model.is_setup() {
                continue;
            }
            model.setup(&mut self.textures, placeholder.as_ref());
        }

        for light in self.lights.iter_mut() {
            if light.is_setup() {
                continue;
            }
            light.setup();
        }
    }

    pub fn try_get_texture(&mut self, source: &dyn TextureSource, fix_channels: bool) -> Option<Arc<Texture>> {
        self.textures.get_or_decode(source, fix_channels)
    }

    pub fn texture_cache(&self) -> &TextureCache {
        &self.textures
    }

    pub fn texture_cache_mut(&mut self) -> &mut TextureCache {
        &mut self.textures
    }

    pub fn icons(&self) -> &IconSet {
        &self.icons
    }

    /// The next loaded mesh replaces the material of the selected one.
    pub fn swap_material(&mut self, value: bool) {
        self.overwrite_material = value;
    }

    /// The next loaded animation plays on the selected mesh.
    pub fn animate_mesh(&mut self, value: bool) {
        self.waiting_animation = value;
    }

    pub fn is_overwriting_material(&self) -> bool {
        self.overwrite_material
    }

    pub fn is_waiting_animation(&self) -> bool {
        self.waiting_animation
    }

    /// Writes `export` into the configured model directory.
    pub fn try_save(&self, export: &ExportObject, exporter: &dyn Exporter) -> SaveOutcome {
        let options = self.settings.exporter_options();
        let result = exporter.write(export, &options, &self.settings.model_directory);
        SaveOutcome::from_result(export, result)
    }

    pub fn try_save_selected(&self, exporter: &dyn Exporter) -> SaveOutcome {
        match self.try_get_selected_model() {
            Some(model) => self.try_save(&model.export, exporter),
            None => SaveOutcome {
                success: false,
                label: "No model selected".to_string(),
                saved_path: Default::default(),
            },
        }
    }

    /// Drops every model, light and animation. Cached textures and icons
    /// survive, so the next subject can reuse them.
    pub fn reset_all(&mut self) {
        log::info!(
            "Resetting scene: {} model(s), {} light(s), {} animation(s)",
            self.models.len(),
            self.lights.len(),
            self.animations.len()
        );
        self.models.clear();
        self.lights.clear();
        self.animations.dispose_all();
        self.selected_model = Guid::EMPTY;
        self.selected_section = 0;
        self.selected_morph = 0;
    }

    /// Ends the session: resets everything and releases every texture.
    pub fn dispose(&mut self) {
        if self.is_disposed {
            log::warn!("Scene disposed twice");
            return;
        }
        self.reset_all();
        self.textures.dispose_all();
        self.icons.dispose();
        self.is_disposed = true;
        log::info!("Scene disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.is_disposed
    }
}
