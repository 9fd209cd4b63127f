//! Model registry and the socket attachment graph between its models.
//!
//! Models refer to each other only by [`Guid`], so attachments may form
//! cycles (A hangs off B while B hangs off A) without any model owning
//! another. Structural changes go through [`AttachmentGraph`], which keeps
//! both sides of every attachment consistent:
//!
//! - the parent's [`Socket`] lists an [`AttachedModelInfo`] for the child
//! - the child records an [`AttachmentLink`] back to the parent socket
//!
//! Removal cascades through animated props (models that only exist to be
//! driven by an animation) and leaves no reference to a removed id behind.

use std::collections::{HashMap, HashSet};

use crate::data_structures::{
    guid::Guid,
    model::{AttachmentLink, Model},
    socket::{AttachedModelInfo, Socket},
    transform::Transform,
};

#[derive(Debug, Default)]
pub struct AttachmentGraph {
    models: HashMap<Guid, Model>,
    /// Ids whose removal is currently running; re-entrant removal is a no-op.
    removing: HashSet<Guid>,
}

impl AttachmentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `model`. A model already registered under the same id is
    /// removed first, cascade included, so nothing keeps pointing at the old
    /// instance. Returns the ids that removal evicted.
    pub fn insert(&mut self, model: Model) -> Vec<Guid> {
        let replaced = match self.models.get(&model.guid) {
            Some(old) => {
                log::warn!("Model {} ({}) was replaced in the registry", old.name, old.guid);
                self.remove_model(model.guid, true)
            }
            None => Vec::new(),
        };
        self.models.insert(model.guid, model);
        replaced
    }

    pub fn get(&self, guid: Guid) -> Option<&Model> {
        self.models.get(&guid)
    }

    pub fn get_mut(&mut self, guid: Guid) -> Option<&mut Model> {
        self.models.get_mut(&guid)
    }

    pub fn contains(&self, guid: Guid) -> bool {
        self.models.contains_key(&guid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Model> {
        self.models.values_mut()
    }

    pub fn guids(&self) -> Vec<Guid> {
        self.models.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Hangs `child` off the socket `socket_name` of `parent`. A child that is
    /// already attached somewhere is detached from there first.
    pub fn attach_model(
        &mut self,
        child: Guid,
        parent: Guid,
        socket_name: &str,
        offset: Transform,
    ) -> bool {
        if !self.can_attach(child, parent) {
            return false;
        }
        let has_socket = self
            .models
            .get(&parent)
            .is_some_and(|model| model.find_socket(socket_name, false).is_some());
        if !has_socket {
            log::debug!("Model {} has no socket named {}", parent, socket_name);
            return false;
        }
        self.detach_from_parent(child);
        self.link(child, parent, socket_name, false, offset)
    }

    /// Hangs `child` off `bone` of `parent` through a virtual socket that
    /// lives only as long as something is attached to it.
    pub fn attach_model_to_bone(
        &mut self,
        child: Guid,
        parent: Guid,
        bone: &str,
        offset: Transform,
    ) -> bool {
        if !self.can_attach(child, parent) {
            return false;
        }
        let has_bone = self
            .models
            .get(&parent)
            .and_then(|model| model.skeleton.as_ref())
            .is_some_and(|skeleton| skeleton.bone_index(bone).is_some());
        if !has_bone {
            log::debug!("Model {} has no bone named {}", parent, bone);
            return false;
        }
        // an empty virtual socket on the old parent is dropped here
        self.detach_from_parent(child);

        let Some(parent_model) = self.models.get_mut(&parent) else {
            return false;
        };
        if parent_model.find_socket(bone, true).is_none() {
            parent_model.sockets.push(Socket::new_virtual(bone));
        }
        self.link(child, parent, bone, true, offset)
    }

    fn can_attach(&self, child: Guid, parent: Guid) -> bool {
        if child == parent {
            log::warn!("Model {} can't be attached to itself", child);
            return false;
        }
        if !self.contains(child) || !self.contains(parent) {
            log::debug!("Can't attach {} to {}: unknown model", child, parent);
            return false;
        }
        true
    }

    fn detach_from_parent(&mut self, child: Guid) {
        let previous = self
            .models
            .get(&child)
            .and_then(|model| model.attached_to())
            .map(|link| link.parent);
        if let Some(previous) = previous {
            self.detach_model(child, previous);
        }
    }

    fn link(
        &mut self,
        child: Guid,
        parent: Guid,
        socket_name: &str,
        is_virtual: bool,
        offset: Transform,
    ) -> bool {
        let Some(socket) = self
            .models
            .get_mut(&parent)
            .and_then(|model| model.find_socket_mut(socket_name, is_virtual))
        else {
            return false;
        };
        socket.attach(AttachedModelInfo { guid: child, offset });

        let Some(child_model) = self.models.get_mut(&child) else {
            return false;
        };
        let saved_transform = child_model.transform;
        child_model.set_attached_to(Some(AttachmentLink {
            parent,
            socket: socket_name.to_string(),
            is_virtual,
            saved_transform,
        }));
        log::debug!("Attached {} to {}.{}", child, parent, socket_name);
        true
    }

    /// Removes every reference to `child` from the sockets of `parent`, and
    /// the child's link back if it points at `parent`. Virtual sockets left
    /// empty are dropped.
    pub fn detach_model(&mut self, child: Guid, parent: Guid) -> bool {
        let mut detached = false;
        if let Some(parent_model) = self.models.get_mut(&parent) {
            for socket in parent_model.sockets.iter_mut() {
                detached |= socket.detach(child);
            }
            parent_model.collect_garbage_sockets();
        }
        if let Some(child_model) = self.models.get_mut(&child) {
            let restore = match child_model.attached_to() {
                Some(link) if link.parent == parent => Some(link.saved_transform),
                _ => None,
            };
            if let Some(transform) = restore {
                child_model.transform = transform;
                child_model.set_attached_to(None);
                detached = true;
            }
        }
        detached
    }

    /// Disposes `guid` and evicts it, cascading into the animated props
    /// attached beneath it. Returns every removed id, `guid` last; unknown
    /// ids and ids already being removed yield nothing.
    pub fn remove_model(&mut self, guid: Guid, detach_siblings: bool) -> Vec<Guid> {
        if !self.models.contains_key(&guid) || !self.removing.insert(guid) {
            return Vec::new();
        }

        let mut removed = self.detach_and_collect(guid, detach_siblings);

        let parent = self
            .models
            .get(&guid)
            .and_then(|model| model.attached_to())
            .map(|link| link.parent);
        if let Some(parent) = parent {
            self.detach_model(guid, parent);
        }

        if let Some(mut model) = self.models.remove(&guid) {
            model.dispose();
            log::debug!("Removed model {} ({})", model.name, guid);
        }
        self.purge_references(guid);
        self.removing.remove(&guid);

        removed.push(guid);
        removed
    }

    /// Walks the sockets of `guid`: animated props are detached and removed,
    /// other attachments are only detached when `detach_siblings` is set.
    /// Virtual sockets are dropped afterwards. Returns the removed ids.
    pub fn detach_and_collect(&mut self, guid: Guid, detach_siblings: bool) -> Vec<Guid> {
        let Some(model) = self.models.get(&guid) else {
            return Vec::new();
        };
        // detaching mutates the sockets, so work from a copy
        let snapshot: Vec<(String, bool, Vec<Guid>)> = model
            .sockets
            .iter()
            .map(|socket| {
                (
                    socket.name.clone(),
                    socket.is_virtual,
                    socket.attached_models.iter().map(|info| info.guid).collect(),
                )
            })
            .collect();

        let mut removed = Vec::new();
        for (socket_name, is_virtual, children) in snapshot {
            for child in children {
                match self.models.get(&child).map(|model| model.is_animated_prop) {
                    Some(true) => {
                        self.detach_model(child, guid);
                        removed.extend(self.remove_model(child, true));
                    }
                    Some(false) if detach_siblings => {
                        self.detach_model(child, guid);
                    }
                    Some(false) => {}
                    // dangling reference
                    None => {
                        self.detach_model(child, guid);
                    }
                }
            }
            if is_virtual {
                self.drop_virtual_socket(guid, &socket_name);
            }
        }
        removed
    }

    fn drop_virtual_socket(&mut self, guid: Guid, socket_name: &str) {
        let Some(model) = self.models.get_mut(&guid) else {
            return;
        };
        let Some(idx) = model
            .sockets
            .iter()
            .position(|socket| socket.is_virtual && socket.name == socket_name)
        else {
            return;
        };
        let leftovers = model.sockets.remove(idx).dispose();
        for info in leftovers {
            if let Some(child) = self.models.get_mut(&info.guid) {
                let restore = match child.attached_to() {
                    Some(link)
                        if link.parent == guid && link.is_virtual && link.socket == socket_name =>
                    {
                        Some(link.saved_transform)
                    }
                    _ => None,
                };
                if let Some(transform) = restore {
                    child.transform = transform;
                    child.set_attached_to(None);
                }
            }
        }
    }

    /// Forgets `guid` everywhere it may still be mentioned.
    fn purge_references(&mut self, guid: Guid) {
        for model in self.models.values_mut() {
            for socket in model.sockets.iter_mut() {
                socket.detach(guid);
            }
            model.collect_garbage_sockets();
            let restore = match model.attached_to() {
                Some(link) if link.parent == guid => Some(link.saved_transform),
                _ => None,
            };
            if let Some(transform) = restore {
                model.transform = transform;
                model.set_attached_to(None);
            }
        }
    }

    /// World transform of `guid`, following its chain of parent sockets.
    /// A cyclic chain stops at the first repeated model.
    pub fn world_transform(&self, guid: Guid) -> Option<Transform> {
        let mut model = self.models.get(&guid)?;
        let mut result = model.transform;
        let mut visited = HashSet::from([guid]);
        while let Some(link) = model.attached_to() {
            let Some(parent) = self.models.get(&link.parent) else {
                break;
            };
            if !visited.insert(parent.guid) {
                log::warn!("Attachment cycle through {} while resolving {}", parent.guid, guid);
                break;
            }
            let Some(socket) = parent.find_socket(&link.socket, link.is_virtual) else {
                break;
            };
            let offset = socket
                .attached_models
                .iter()
                .find(|info| info.guid == model.guid)
                .map(|info| info.offset)
                .unwrap_or_default();
            let bone = parent
                .skeleton
                .as_ref()
                .and_then(|skeleton| skeleton.bone_transform(&socket.bone_name))
                .unwrap_or_default();
            result = parent.transform * bone * socket.transform * offset * result;
            model = parent;
        }
        Some(result)
    }

    /// Disposes every model and empties the registry.
    pub fn clear(&mut self) {
        for model in self.models.values_mut() {
            model.dispose();
        }
        self.models.clear();
        self.removing.clear();
    }
}
