use serde::{Deserialize, Serialize};

/// Cornflower blue, the clear colour of every colour target.
pub const CORNFLOWER_BLUE: [f32; 4] = [0.392_157, 0.584_314, 0.929_412, 1.0];

/// Renderer settings. Every field has a default so partial JSON is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    /// Half extent of the orthographic shadow volume around the light-space origin.
    pub shadow_radius: f32,
    pub shadow_map_size: u32,
    pub clear_colour: [f32; 4],
    pub exposure: f32,
    /// Run the particle pass after the geometry pass.
    pub particles: bool,
    /// Upper bound on draw-buffer updates per frame (one per renderable and emitter).
    pub max_draws_per_frame: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            shadow_radius: 35.0,
            shadow_map_size: 2048,
            clear_colour: CORNFLOWER_BLUE,
            exposure: 1.0,
            particles: false,
            max_draws_per_frame: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: RendererConfig = serde_json::from_str(r#"{ "width": 800, "particles": true }"#).unwrap();
        assert_eq!(config.width, 800);
        assert!(config.particles);
        assert_eq!(config.height, 720);
        assert_eq!(config.shadow_radius, 35.0);
        assert_eq!(config.clear_colour, CORNFLOWER_BLUE);
    }
}
