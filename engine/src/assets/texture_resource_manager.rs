// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use image::GenericImageView;
use log::{debug, warn};
use slotmap::SlotMap;
use std::collections::HashMap;
use std::path::Path;

use crate::assets::{handles::TextureHandle, texture::Texture};
use crate::error::{EngineError, Result};

/// Owns every texture in the engine. Script wrappers and other consumers only
/// ever hold [`TextureHandle`]s into this store.
#[derive(Default)]
pub struct TextureResource {
    textures: SlotMap<TextureHandle, Texture>,
    by_name: HashMap<String, TextureHandle>,
    pub default_normal_map: TextureHandle,
}

impl TextureResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureHandle {
        let name = texture.name.clone();
        let id = self.textures.insert(texture);
        if let Some(name) = name {
            self.by_name.insert(name, id);
        }
        id
    }

    /// Decodes an image file into RGBA8. Loading the same path twice returns
    /// the handle of the first load.
    pub fn load_from_file(&mut self, path: &Path) -> Result<TextureHandle> {
        let name = path.to_string_lossy().into_owned();
        if let Some(&id) = self.by_name.get(&name) {
            if self.textures.contains_key(id) {
                debug!("Texture {} already loaded as {:?}", name, id);
                return Ok(id);
            }
        }

        let img = image::open(path)?;
        let (width, height) = img.dimensions();
        let rgba = img.to_rgba8();

        let mut tex = Texture::from_rgba(width, height, rgba.into_raw())?;
        tex.name = Some(name);
        let id = self.add_texture(tex);
        debug!("Loaded texture {:?} ({}x{}) from {:?}", id, width, height, path);
        Ok(id)
    }

    pub fn create_solid_rgba(&mut self, rgba: [u8; 4]) -> TextureHandle {
        self.add_texture(Texture::solid(rgba))
    }

    pub fn create_from_rgba(&mut self, width: u32, height: u32, rgba: &[u8]) -> Result<TextureHandle> {
        let tex = Texture::from_rgba(width, height, rgba.to_vec())?;
        Ok(self.add_texture(tex))
    }

    pub fn create_default_normal_map(&mut self) -> TextureHandle {
        // 1x1 RGBA8 (128, 128, 255, 255)
        let id = self.create_solid_rgba([128, 128, 255, 255]);
        self.default_normal_map = id;
        id
    }

    pub fn get_texture(&self, id: TextureHandle) -> Option<&Texture> {
        self.textures.get(id)
    }

    pub fn contains(&self, id: TextureHandle) -> bool {
        self.textures.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn remove_texture(&mut self, id: TextureHandle) -> Option<Texture> {
        match self.textures.remove(id) {
            Some(texture) => {
                if let Some(name) = &texture.name {
                    self.by_name.remove(name);
                }
                debug!("Removed texture with ID: {:?}", id);
                Some(texture)
            }
            None => {
                warn!("Texture with ID {:?} not found for removal", id);
                None
            }
        }
    }

    /// Encodes the texture to disk; the image format follows the extension.
    pub fn save_to_file(&self, id: TextureHandle, path: &Path) -> Result<()> {
        let tex = self
            .get_texture(id)
            .ok_or(EngineError::TextureNotFound(id))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        image::save_buffer(
            path,
            &tex.pixels,
            tex.width,
            tex.height,
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(())
    }
}
