use glam::Vec4;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How scene geometry is shaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    Wireframe,
    DiffuseUntextured,
    DiffuseTextured,
    DiffuseTexturedDisplacement,
}

impl RenderMode {
    pub const ALL: [RenderMode; 4] = [
        Self::Wireframe,
        Self::DiffuseUntextured,
        Self::DiffuseTextured,
        Self::DiffuseTexturedDisplacement,
    ];

    /// The following mode, wrapping back to wireframe.
    pub fn next(self) -> Self {
        match self {
            Self::Wireframe => Self::DiffuseUntextured,
            Self::DiffuseUntextured => Self::DiffuseTextured,
            Self::DiffuseTextured => Self::DiffuseTexturedDisplacement,
            Self::DiffuseTexturedDisplacement => Self::Wireframe,
        }
    }

    /// Render-state flags read by the scene shaders: x = sample albedo,
    /// y = apply displacement.
    pub fn state_flags(self) -> Vec4 {
        match self {
            Self::Wireframe => Vec4::new(1.0, 0.0, 0.0, 0.0),
            Self::DiffuseUntextured => Vec4::new(0.0, 0.0, 0.0, 0.0),
            Self::DiffuseTextured => Vec4::new(1.0, 0.0, 0.0, 0.0),
            Self::DiffuseTexturedDisplacement => Vec4::new(1.0, 1.0, 0.0, 0.0),
        }
    }

    pub fn is_wireframe(self) -> bool {
        self == Self::Wireframe
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wireframe => "wireframe",
            Self::DiffuseUntextured => "diffuse (untextured)",
            Self::DiffuseTextured => "diffuse (textured)",
            Self::DiffuseTexturedDisplacement => "diffuse (textured, displaced)",
        };
        f.write_str(name)
    }
}

/// Debug selector for which intermediate buffer reaches the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MrtMode {
    #[default]
    Default,
    Diffuse,
    Normal,
    SunDepth,
    Luminance,
    Blur,
    Light,
    MoonDepth,
}

impl MrtMode {
    pub const ALL: [MrtMode; 8] = [
        Self::Default,
        Self::Diffuse,
        Self::Normal,
        Self::SunDepth,
        Self::Luminance,
        Self::Blur,
        Self::Light,
        Self::MoonDepth,
    ];

    pub fn next(self) -> Self {
        let index = (self.index() + 1) % Self::ALL.len();
        Self::ALL[index]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Raw views draw the light pass straight to the back buffer and skip
    /// bloom and composite.
    pub fn routes_to_back_buffer(self) -> bool {
        matches!(
            self,
            Self::Diffuse | Self::Normal | Self::SunDepth | Self::Light | Self::MoonDepth
        )
    }
}

impl fmt::Display for MrtMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Default => "default",
            Self::Diffuse => "diffuse",
            Self::Normal => "normal",
            Self::SunDepth => "sun depth",
            Self::Luminance => "luminance",
            Self::Blur => "blur",
            Self::Light => "light",
            Self::MoonDepth => "moon depth",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_mode_ring_closes_after_four() {
        let mut mode = RenderMode::default();
        for expected in RenderMode::ALL.iter().skip(1) {
            mode = mode.next();
            assert_eq!(mode, *expected);
        }
        assert_eq!(mode.next(), RenderMode::Wireframe);
    }

    #[test]
    fn mrt_ring_closes_after_eight() {
        let mut mode = MrtMode::default();
        for _ in 0..8 {
            mode = mode.next();
        }
        assert_eq!(mode, MrtMode::Default);
        assert_eq!(MrtMode::MoonDepth.next(), MrtMode::Default);
    }

    #[test]
    fn raw_views() {
        let raw: Vec<_> = MrtMode::ALL
            .iter()
            .filter(|m| m.routes_to_back_buffer())
            .collect();
        assert_eq!(raw.len(), 5);
        assert!(!MrtMode::Luminance.routes_to_back_buffer());
        assert!(!MrtMode::Blur.routes_to_back_buffer());
    }

    #[test]
    fn flags_track_texture_and_displacement() {
        assert_eq!(RenderMode::DiffuseUntextured.state_flags().x, 0.0);
        assert_eq!(RenderMode::DiffuseTextured.state_flags().y, 0.0);
        assert_eq!(RenderMode::DiffuseTexturedDisplacement.state_flags().y, 1.0);
    }
}
