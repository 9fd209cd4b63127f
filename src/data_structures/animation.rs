//! Animation clips, playing animations and the shared playback clock.

use std::{collections::HashMap, fmt, sync::Arc};

use instant::{Duration, Instant};

use crate::data_structures::{guid::Guid, skeleton::Skeleton, transform::Transform};

#[derive(Clone, Debug)]
pub enum Keyframes {
    Translation(Vec<cgmath::Vector3<f32>>),
    Rotation(Vec<cgmath::Quaternion<f32>>),
    Scale(Vec<cgmath::Vector3<f32>>),
}

/// Keyframes of one transform component of one bone.
#[derive(Clone, Debug)]
pub struct Track {
    pub bone: String,
    pub keyframes: Keyframes,
    pub timestamps: Vec<f32>,
}

/// An animation clip: a named set of bone tracks.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Track>,
}

/// Keyframe pair around `time` and the blend factor between them.
fn keyframe_span(timestamps: &[f32], time: f32) -> Option<(usize, usize, f32)> {
    let last = timestamps.len().checked_sub(1)?;
    if time <= timestamps[0] {
        return Some((0, 0, 0.0));
    }
    if time >= timestamps[last] {
        return Some((last, last, 0.0));
    }
    let i = timestamps.partition_point(|&stamp| stamp <= time) - 1;
    let span = timestamps[i + 1] - timestamps[i];
    let alpha = if span > 0.0 { (time - timestamps[i]) / span } else { 0.0 };
    Some((i, i + 1, alpha))
}

fn lerp(a: cgmath::Vector3<f32>, b: cgmath::Vector3<f32>, alpha: f32) -> cgmath::Vector3<f32> {
    a + (b - a) * alpha
}

impl AnimationClip {
    pub fn new(name: &str, tracks: Vec<Track>) -> Self {
        let duration = tracks
            .iter()
            .filter_map(|track| track.timestamps.last())
            .fold(0.0f32, |max, &stamp| max.max(stamp));
        Self {
            name: name.to_string(),
            duration,
            tracks,
        }
    }

    /// Samples every track at `time` on top of the skeleton's rest pose.
    /// Tracks for bones the skeleton doesn't have are skipped.
    pub fn sample(&self, skeleton: &Skeleton, time: f32) -> Vec<(usize, Transform)> {
        let mut pose: HashMap<usize, Transform> = HashMap::new();
        for track in &self.tracks {
            let Some(idx) = skeleton.bone_index(&track.bone) else {
                continue;
            };
            let Some((i0, i1, alpha)) = keyframe_span(&track.timestamps, time) else {
                continue;
            };
            let transform = pose.entry(idx).or_insert(skeleton.bones[idx].rest);
            match &track.keyframes {
                Keyframes::Translation(values) => {
                    if let (Some(&a), Some(&b)) = (values.get(i0), values.get(i1)) {
                        transform.position = lerp(a, b, alpha);
                    }
                }
                Keyframes::Rotation(values) => {
                    if let (Some(&a), Some(&b)) = (values.get(i0), values.get(i1)) {
                        transform.rotation = a.slerp(b, alpha);
                    }
                }
                Keyframes::Scale(values) => {
                    if let (Some(&a), Some(&b)) = (values.get(i0), values.get(i1)) {
                        transform.scale = lerp(a, b, alpha);
                    }
                }
            }
        }
        let mut pose: Vec<_> = pose.into_iter().collect();
        pose.sort_by_key(|(idx, _)| *idx);
        pose
    }
}

type DisposeHook = Box<dyn FnOnce(&AnimationClip) + Send>;

/// A clip playing on a set of models.
pub struct Animation {
    pub clip: Arc<AnimationClip>,
    attached_models: Vec<Guid>,
    time: f32,
    on_dispose: Option<DisposeHook>,
    is_disposed: bool,
}

impl Animation {
    pub fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip,
            attached_models: Vec::new(),
            time: 0.0,
            on_dispose: None,
            is_disposed: false,
        }
    }

    pub fn with_model(mut self, guid: Guid) -> Self {
        self.attach_model(guid);
        self
    }

    /// Hook run exactly once when the animation is disposed.
    pub fn on_dispose(mut self, hook: impl FnOnce(&AnimationClip) + Send + 'static) -> Self {
        self.on_dispose = Some(Box::new(hook));
        self
    }

    pub fn attach_model(&mut self, guid: Guid) {
        if !self.attached_models.contains(&guid) {
            self.attached_models.push(guid);
        }
    }

    pub fn attached_models(&self) -> &[Guid] {
        &self.attached_models
    }

    pub fn drives(&self, guid: Guid) -> bool {
        self.attached_models.contains(&guid)
    }

    pub fn duration(&self) -> f32 {
        self.clip.duration
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Moves the local time to `elapsed`, looping over the clip duration.
    pub fn set_time(&mut self, elapsed: f32) {
        let duration = self.clip.duration;
        self.time = if duration > 0.0 { elapsed.rem_euclid(duration) } else { 0.0 };
    }

    pub fn is_disposed(&self) -> bool {
        self.is_disposed
    }

    pub fn dispose(&mut self) {
        if self.is_disposed {
            return;
        }
        self.is_disposed = true;
        if let Some(hook) = self.on_dispose.take() {
            hook(self.clip.as_ref());
        }
        self.attached_models.clear();
        log::debug!("Animation {} disposed", self.clip.name);
    }
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("clip", &self.clip.name)
            .field("attached_models", &self.attached_models)
            .field("time", &self.time)
            .field("is_disposed", &self.is_disposed)
            .finish()
    }
}

/// Shared playback clock driving every active animation.
#[derive(Clone, Debug)]
pub struct TimeTracker {
    pub is_paused: bool,
    pub multiplier: f32,
    elapsed: f32,
    max_elapsed: f32,
    last_tick: Option<Instant>,
}

impl TimeTracker {
    const INITIAL_MAX_ELAPSED: f32 = 0.01;

    pub fn new() -> Self {
        Self {
            is_paused: false,
            multiplier: 1.0,
            elapsed: 0.0,
            max_elapsed: Self::INITIAL_MAX_ELAPSED,
            last_tick: None,
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn max_elapsed(&self) -> f32 {
        self.max_elapsed
    }

    /// Advances by `dt` scaled with the multiplier, wrapping at the longest clip.
    pub fn update(&mut self, dt: Duration) {
        if self.is_paused {
            return;
        }
        self.elapsed += dt.as_secs_f32() * self.multiplier;
        if self.elapsed >= self.max_elapsed {
            self.elapsed = self.elapsed.rem_euclid(self.max_elapsed);
        }
    }

    /// Advances by the wall-clock time since the previous tick.
    pub fn tick(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_tick {
            self.update(now - last);
        }
        self.last_tick = Some(now);
    }

    pub fn toggle_pause(&mut self) {
        self.is_paused = !self.is_paused;
        self.last_tick = None;
    }

    pub fn seek(&mut self, elapsed: f32) {
        self.elapsed = elapsed.clamp(0.0, self.max_elapsed);
    }

    /// Makes sure a clip of `duration` seconds fits on the timeline.
    pub fn extend_to(&mut self, duration: f32) {
        self.max_elapsed = self.max_elapsed.max(duration);
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for TimeTracker {
    fn default() -> Self {
        Self::new()
    }
}
