use crate::data_structures::{guid::Guid, transform::Transform};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LightKind {
    Point,
    Spot {
        inner_cone_angle: f32,
        outer_cone_angle: f32,
    },
}

#[derive(Clone, Debug)]
pub struct Light {
    pub guid: Guid,
    pub name: String,
    pub kind: LightKind,
    pub transform: Transform,
    pub color: cgmath::Vector3<f32>,
    pub intensity: f32,
    is_setup: bool,
}

impl Light {
    pub fn new(name: &str, kind: LightKind, transform: Transform) -> Self {
        Self {
            guid: Guid::new(),
            name: name.to_string(),
            kind,
            transform,
            color: cgmath::Vector3::new(1.0, 1.0, 1.0),
            intensity: 1.0,
            is_setup: false,
        }
    }

    pub fn point(name: &str, transform: Transform) -> Self {
        Self::new(name, LightKind::Point, transform)
    }

    pub fn is_setup(&self) -> bool {
        self.is_setup
    }

    pub fn setup(&mut self) {
        if self.is_setup {
            return;
        }
        if let LightKind::Spot {
            inner_cone_angle,
            outer_cone_angle,
        } = &mut self.kind
        {
            // the outer cone can never be narrower than the inner one
            *outer_cone_angle = outer_cone_angle.max(*inner_cone_angle);
        }
        self.is_setup = true;
    }

    /// Key of the gizmo icon drawn for this light.
    pub fn icon_key(&self) -> &'static str {
        match self.kind {
            LightKind::Point => "pointlight",
            LightKind::Spot { .. } => "spotlight",
        }
    }

    pub fn uniform(&self) -> LightUniform {
        LightUniform {
            position: self.transform.position.into(),
            _padding: 0,
            color: self.color.into(),
            intensity: self.intensity,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub position: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    _padding: u32,
    pub color: [f32; 3],
    pub intensity: f32,
}
