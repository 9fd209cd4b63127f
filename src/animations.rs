//! Active animations and the playback clock they share.

use instant::Duration;

use crate::{
    attachments::AttachmentGraph,
    data_structures::{
        animation::{Animation, TimeTracker},
        guid::Guid,
    },
};

#[derive(Debug, Default)]
pub struct AnimationRegistry {
    animations: Vec<Animation>,
    selected: usize,
    tracker: TimeTracker,
}

impl AnimationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts playing `animation`; the timeline grows to fit its clip.
    pub fn add(&mut self, animation: Animation) {
        self.tracker.extend_to(animation.duration());
        log::debug!(
            "Playing {} on {} model(s)",
            animation.clip.name,
            animation.attached_models().len()
        );
        self.animations.push(animation);
    }

    /// Stops every animation and tears down what only existed because of
    /// them. Driven models get their animated pose dropped and lose their
    /// animated props; any animated prop left in `graph` afterwards is
    /// removed as well. Returns the ids of removed models.
    pub fn remove_all(&mut self, graph: &mut AttachmentGraph) -> Vec<Guid> {
        self.tracker.reset();
        self.selected = 0;

        let mut removed = Vec::new();
        for animation in self.animations.iter_mut() {
            for &guid in animation.attached_models() {
                let Some(model) = graph.get_mut(guid) else {
                    continue;
                };
                if let Some(skeleton) = model.skeleton.as_mut() {
                    skeleton.reset_animated_data(true);
                }
                removed.extend(graph.detach_and_collect(guid, false));
            }
            animation.dispose();
        }

        let props: Vec<Guid> = graph
            .iter()
            .filter(|model| model.is_animated_prop)
            .map(|model| model.guid)
            .collect();
        for guid in props {
            removed.extend(graph.remove_model(guid, true));
        }

        log::info!(
            "Removed {} animation(s) and {} dependent model(s)",
            self.animations.len(),
            removed.len()
        );
        self.animations.clear();
        removed
    }

    /// Disposes every animation without touching the models they drove.
    pub fn dispose_all(&mut self) {
        for animation in self.animations.iter_mut() {
            animation.dispose();
        }
        self.animations.clear();
        self.tracker.reset();
        self.selected = 0;
    }

    /// Advances the clock by `dt` and writes the sampled poses into the
    /// skeletons of every driven model.
    pub fn update(&mut self, dt: Duration, graph: &mut AttachmentGraph) {
        self.tracker.update(dt);
        let elapsed = self.tracker.elapsed();
        for animation in self.animations.iter_mut() {
            animation.set_time(elapsed);
            for &guid in animation.attached_models() {
                let Some(skeleton) = graph
                    .get_mut(guid)
                    .and_then(|model| model.skeleton.as_mut())
                else {
                    continue;
                };
                let pose = animation.clip.sample(skeleton, animation.time());
                for (idx, transform) in pose {
                    skeleton.set_bone_pose(idx, transform);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Animation> {
        self.animations.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Animation> {
        self.animations.get(index)
    }

    pub fn select(&mut self, index: usize) {
        self.selected = index;
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn tracker(&self) -> &TimeTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut TimeTracker {
        &mut self.tracker
    }
}
