use bitflags::bitflags;
use std::fmt;

/// The kind tag carried by every component.
///
/// Discriminants are single bits so kinds combine into a [`ComponentMask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum ComponentKind {
    None = 0,
    Transform = 1 << 0,
    Geometry = 1 << 1,
    Texture = 1 << 2,
    Render = 1 << 3,
    Terrain = 1 << 4,
    Shader = 1 << 5,
    Collider = 1 << 6,
    Camera = 1 << 7,
    Light = 1 << 8,
    Emitter = 1 << 9,
}

impl ComponentKind {
    /// Every real kind, excluding the empty sentinel.
    pub const ALL: [ComponentKind; 10] = [
        Self::Transform,
        Self::Geometry,
        Self::Texture,
        Self::Render,
        Self::Terrain,
        Self::Shader,
        Self::Collider,
        Self::Camera,
        Self::Light,
        Self::Emitter,
    ];

    pub fn bit(self) -> u16 {
        self as u16
    }

    pub fn mask(self) -> ComponentMask {
        ComponentMask::from_bits_truncate(self.bit())
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Transform => "transform",
            Self::Geometry => "geometry",
            Self::Texture => "texture",
            Self::Render => "render",
            Self::Terrain => "terrain",
            Self::Shader => "shader",
            Self::Collider => "collider",
            Self::Camera => "camera",
            Self::Light => "light",
            Self::Emitter => "emitter",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Set of component kinds present on an entity, or required by a query.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ComponentMask: u16 {
        const TRANSFORM = ComponentKind::Transform as u16;
        const GEOMETRY = ComponentKind::Geometry as u16;
        const TEXTURE = ComponentKind::Texture as u16;
        const RENDER = ComponentKind::Render as u16;
        const TERRAIN = ComponentKind::Terrain as u16;
        const SHADER = ComponentKind::Shader as u16;
        const COLLIDER = ComponentKind::Collider as u16;
        const CAMERA = ComponentKind::Camera as u16;
        const LIGHT = ComponentKind::Light as u16;
        const EMITTER = ComponentKind::Emitter as u16;

        /// Entities drawn by the geometry and shadow passes.
        const RENDERABLE = Self::TRANSFORM.bits()
            | Self::GEOMETRY.bits()
            | Self::RENDER.bits()
            | Self::SHADER.bits();
        /// Full-screen post-process quads: geometry and a shader, nothing else required.
        const PASS_QUAD = Self::GEOMETRY.bits() | Self::SHADER.bits();
    }
}

impl From<ComponentKind> for ComponentMask {
    fn from(kind: ComponentKind) -> Self {
        kind.mask()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct_bits() {
        let mut seen = 0u16;
        for kind in ComponentKind::ALL {
            assert_eq!(kind.bit().count_ones(), 1, "{kind} is not a single bit");
            assert_eq!(seen & kind.bit(), 0);
            seen |= kind.bit();
        }
        assert_eq!(ComponentMask::all().bits(), seen);
    }

    #[test]
    fn masks_combine_by_or() {
        let mask = ComponentKind::Geometry.mask() | ComponentKind::Shader.mask();
        assert_eq!(mask, ComponentMask::PASS_QUAD);
        assert!(ComponentMask::RENDERABLE.contains(ComponentMask::PASS_QUAD));
        assert!(!ComponentMask::PASS_QUAD.contains(ComponentMask::TRANSFORM));
    }

    #[test]
    fn sentinel_has_empty_mask() {
        assert!(ComponentKind::None.mask().is_empty());
    }
}
