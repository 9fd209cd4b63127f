use crate::data_structures::{guid::Guid, transform::Transform};

/// Back-reference from a socket to a model hanging off it.
#[derive(Clone, Debug, PartialEq)]
pub struct AttachedModelInfo {
    pub guid: Guid,
    /// Offset of the attached model relative to the socket.
    pub offset: Transform,
}

impl AttachedModelInfo {
    pub fn new(guid: Guid) -> Self {
        Self {
            guid,
            offset: Transform::default(),
        }
    }
}

/// A named attachment point on a model.
///
/// Sockets defined by the mesh persist even when empty. Virtual sockets are
/// created on the fly to hold a single dynamic attachment and go away with
/// it.
#[derive(Clone, Debug)]
pub struct Socket {
    pub name: String,
    pub bone_name: String,
    pub transform: Transform,
    pub is_virtual: bool,
    pub attached_models: Vec<AttachedModelInfo>,
}

impl Socket {
    pub fn new(name: &str, bone_name: &str, transform: Transform) -> Self {
        Self {
            name: name.to_string(),
            bone_name: bone_name.to_string(),
            transform,
            is_virtual: false,
            attached_models: Vec::new(),
        }
    }

    pub fn new_virtual(bone_name: &str) -> Self {
        Self {
            is_virtual: true,
            ..Self::new(bone_name, bone_name, Transform::default())
        }
    }

    /// Adds `info`, replacing an older entry for the same model.
    pub fn attach(&mut self, info: AttachedModelInfo) {
        self.attached_models.retain(|existing| existing.guid != info.guid);
        self.attached_models.push(info);
    }

    pub fn detach(&mut self, guid: Guid) -> bool {
        let before = self.attached_models.len();
        self.attached_models.retain(|info| info.guid != guid);
        before != self.attached_models.len()
    }

    pub fn is_attached(&self, guid: Guid) -> bool {
        self.attached_models.iter().any(|info| info.guid == guid)
    }

    pub fn is_empty(&self) -> bool {
        self.attached_models.is_empty()
    }

    /// A virtual socket with nothing attached has no reason to exist.
    pub fn is_garbage(&self) -> bool {
        self.is_virtual && self.is_empty()
    }

    /// Empties the socket and hands back whatever was still attached.
    pub fn dispose(&mut self) -> Vec<AttachedModelInfo> {
        std::mem::take(&mut self.attached_models)
    }
}
