// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    #[default]
    Rgba8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8 => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TextureFormat::Rgba8 => "RGBA8",
        }
    }
}

use crate::error::{EngineError, Result};

/// CPU-side image owned by the texture resource manager.
#[derive(Debug, Clone)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub pixels: Vec<u8>,
    /// Source path for textures loaded from disk.
    pub name: Option<String>,
}

impl Texture {
    /// Wraps RGBA8 pixel data, checking it covers exactly `width * height`
    /// texels.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let format = TextureFormat::Rgba8;
        let expected = Self::expected_len(width, height, format)
            .ok_or(EngineError::TextureTooLarge { width, height })?;
        if pixels.len() != expected {
            return Err(EngineError::InvalidTextureData {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            pixels,
            name: None,
        })
    }

    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
            pixels: rgba.to_vec(),
            name: None,
        }
    }

    /// Byte length of a `width * height` image, or `None` if it does not fit
    /// in `usize`.
    pub fn expected_len(width: u32, height: u32, format: TextureFormat) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(format.bytes_per_pixel())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let offset = (y as usize * self.width as usize + x as usize) * bpp;
        let texel = self.pixels.get(offset..offset + bpp)?;
        Some([texel[0], texel[1], texel[2], texel[3]])
    }
}
