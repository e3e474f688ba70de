use crate::tiles::texture::{Texture, TextureHandle, TextureState};

/// Flat colour drawn while a tile has no imagery (RGBA8).
pub const PLACEHOLDER_COLOR: [u8; 4] = [0, 0, 0, 0];

/// Colour drawn for tiles whose imagery failed to load.
pub const FALLBACK_COLOR: [u8; 4] = [204, 204, 204, 255];

/// What the host renderer should draw for a tile right now.
#[derive(Debug, Clone, PartialEq)]
pub enum Appearance {
    /// Still loading: fully transparent.
    Placeholder { color: [u8; 4] },
    Textured { texture: Texture, opacity: f32 },
    /// Load failed: untextured default material.
    Fallback { color: [u8; 4], reason: String },
}

/// Unlit material bound to a single tile texture.
#[derive(Debug)]
pub struct Material {
    texture: TextureHandle,
    opacity: f32,
}

impl Material {
    pub fn new(texture: TextureHandle) -> Self {
        Self {
            texture,
            opacity: 1.0,
        }
    }

    pub fn texture(&self) -> &TextureHandle {
        &self.texture
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn appearance(&self) -> Appearance {
        match self.texture.state() {
            TextureState::Pending => Appearance::Placeholder {
                color: PLACEHOLDER_COLOR,
            },
            TextureState::Ready(texture) => Appearance::Textured {
                texture,
                opacity: self.opacity,
            },
            TextureState::Failed(reason) => Appearance::Fallback {
                color: FALLBACK_COLOR,
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appearance_follows_texture_state() {
        let material = Material::new(TextureHandle::pending());
        assert!(matches!(material.appearance(), Appearance::Placeholder { .. }));

        let texture = Texture::from_rgba(1, 1, vec![9, 9, 9, 255]);
        let mut material = Material::new(TextureHandle::ready(texture.clone()));
        material.set_opacity(2.0);
        assert_eq!(
            material.appearance(),
            Appearance::Textured { texture, opacity: 1.0 }
        );

        let material = Material::new(TextureHandle::failed("HTTP 404"));
        assert_eq!(
            material.appearance(),
            Appearance::Fallback {
                color: FALLBACK_COLOR,
                reason: "HTTP 404".to_string()
            }
        );
    }
}
