// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

mod assets;
mod error;
pub mod scripting;

pub use assets::handles::TextureHandle;
pub use assets::texture::{Texture, TextureFormat};
pub use assets::texture_resource_manager::TextureResource;
pub use error::{EngineError, Result};
pub use scripting::binder::{
    BindingRegistry, Callback, ClassInfo, Method, Property, ScriptClass, bind,
};
pub use scripting::texture_binding::{BindingError, TextureBinding};
pub use scripting::{ScriptEnvironment, ScriptSettings, SharedTextures};
