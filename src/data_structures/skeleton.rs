use crate::data_structures::transform::Transform;

#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,
    /// Parents always precede their children.
    pub parent: Option<usize>,
    pub rest: Transform,
}

/// Bone hierarchy plus the pose written by playing animations.
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    pub bones: Vec<Bone>,
    animated_pose: Vec<Transform>,
    is_animated: bool,
}

impl Skeleton {
    pub fn new(bones: Vec<Bone>) -> Self {
        Self {
            bones,
            animated_pose: Vec::new(),
            is_animated: false,
        }
    }

    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|bone| bone.name == name)
    }

    pub fn is_animated(&self) -> bool {
        self.is_animated
    }

    /// Local pose of bone `idx`: animated if an animation wrote one, rest otherwise.
    pub fn local_pose(&self, idx: usize) -> Option<Transform> {
        self.animated_pose
            .get(idx)
            .copied()
            .or_else(|| self.bones.get(idx).map(|bone| bone.rest))
    }

    pub fn set_bone_pose(&mut self, idx: usize, transform: Transform) {
        if idx >= self.bones.len() {
            log::warn!(
                "Bone index {} is out of bounds for a skeleton of {} bones",
                idx,
                self.bones.len()
            );
            return;
        }
        if self.animated_pose.len() != self.bones.len() {
            self.animated_pose = self.bones.iter().map(|bone| bone.rest).collect();
        }
        self.animated_pose[idx] = transform;
        self.is_animated = true;
    }

    /// Model-space transform of a bone, walking up its parents.
    pub fn bone_transform(&self, name: &str) -> Option<Transform> {
        let mut idx = self.bone_index(name)?;
        let mut result = self.local_pose(idx)?;
        // parents precede children, so the walk is bounded by the bone count
        for _ in 0..self.bones.len() {
            let Some(parent) = self.bones[idx].parent else {
                return Some(result);
            };
            if parent >= idx {
                log::warn!("Bone {} has a parent that does not precede it", self.bones[idx].name);
                return Some(result);
            }
            result = &self.local_pose(parent)? * &result;
            idx = parent;
        }
        Some(result)
    }

    /// Drops animated pose data. A full reset also forgets that the skeleton
    /// was ever animated; a partial one snaps back to the rest pose.
    pub fn reset_animated_data(&mut self, full: bool) {
        if full {
            self.animated_pose.clear();
            self.is_animated = false;
        } else {
            self.animated_pose = self.bones.iter().map(|bone| bone.rest).collect();
        }
    }
}
