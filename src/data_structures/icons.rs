//! The fixed icon textures the preview UI draws (timeline buttons, light
//! gizmos, link states, ...).

use std::{collections::HashMap, path::Path, sync::Arc};

use crate::data_structures::texture::Texture;

/// Icon key -> bundled resource name.
pub const ICONS: [(&str, &str); 13] = [
    ("material", "materialicon"),
    ("noimage", "T_Placeholder_Item_Image"),
    ("pointlight", "pointlight"),
    ("spotlight", "spotlight"),
    ("link_on", "link_on"),
    ("link_off", "link_off"),
    ("link_has", "link_has"),
    ("tl_play", "tl_play"),
    ("tl_pause", "tl_pause"),
    ("tl_rewind", "tl_rewind"),
    ("tl_forward", "tl_forward"),
    ("tl_previous", "tl_previous"),
    ("tl_next", "tl_next"),
];

#[derive(Debug, Default)]
pub struct IconSet {
    icons: HashMap<&'static str, Arc<Texture>>,
}

impl IconSet {
    /// Every icon as a placeholder named after its resource.
    pub fn new() -> Self {
        let icons = ICONS
            .iter()
            .map(|(key, resource)| (*key, Arc::new(Texture::placeholder(resource))))
            .collect();
        Self { icons }
    }

    /// Loads `<dir>/<resource>.png` for every icon. Missing or broken files
    /// fall back to a placeholder.
    pub fn from_dir(dir: &Path) -> Self {
        let icons = ICONS
            .iter()
            .map(|(key, resource)| {
                let path = dir.join(format!("{resource}.png"));
                let texture = std::fs::read(&path)
                    .map_err(anyhow::Error::from)
                    .and_then(|bytes| Texture::from_bytes(&bytes, resource, Some("png")));
                let texture = match texture {
                    Ok(texture) => texture,
                    Err(e) => {
                        log::warn!("Icon {} could not be loaded from {}: {}", key, path.display(), e);
                        Texture::placeholder(resource)
                    }
                };
                (*key, Arc::new(texture))
            })
            .collect();
        Self { icons }
    }

    pub fn get(&self, key: &str) -> Option<&Arc<Texture>> {
        self.icons.get(key)
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    pub fn dispose(&mut self) {
        for texture in self.icons.values() {
            texture.dispose();
        }
        self.icons.clear();
    }
}
