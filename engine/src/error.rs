// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use thiserror::Error;

use crate::assets::handles::TextureHandle;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image Error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Script Error: {0}")]
    Script(#[from] mlua::Error),

    #[error("Texture data has {actual} bytes, expected {expected}")]
    InvalidTextureData { expected: usize, actual: usize },

    #[error("Texture of {width}x{height} texels is too large")]
    TextureTooLarge { width: u32, height: u32 },

    #[error("Texture not found: {0:?}")]
    TextureNotFound(TextureHandle),
}

pub type Result<T> = std::result::Result<T, EngineError>;
