// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

pub mod binder;
pub mod texture_binding;

use log::{debug, info};
use mlua::{AnyUserData, Lua, Value};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::assets::{handles::TextureHandle, texture_resource_manager::TextureResource};
use crate::error::Result;
use binder::{BindingRegistry, ScriptClass};
use texture_binding::TextureBinding;

/// Texture store shared between the host and the scripts it runs.
pub type SharedTextures = Rc<RefCell<TextureResource>>;

/// App data handing bound classes access to the texture store.
pub(crate) struct TextureStore(pub(crate) SharedTextures);

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScriptSettings {
    /// Directory that relative texture paths in scripts are resolved against.
    pub asset_root: PathBuf,
}

/// Owns a Lua state with the engine's classes bound into it.
pub struct ScriptEnvironment {
    lua: Lua,
    textures: SharedTextures,
}

impl ScriptEnvironment {
    pub fn new(textures: SharedTextures, settings: ScriptSettings) -> Result<Self> {
        let lua = Lua::new();
        lua.set_app_data(TextureStore(textures.clone()));
        lua.set_app_data(settings);

        let env = Self { lua, textures };
        env.bind::<TextureBinding>()?;
        info!("Script environment ready");
        Ok(env)
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    pub fn textures(&self) -> &SharedTextures {
        &self.textures
    }

    /// Binds `T` into this state. Binding an already bound class is a no-op
    /// and returns `false`.
    pub fn bind<T: ScriptClass>(&self) -> Result<bool> {
        Ok(binder::bind::<T>(&self.lua)?)
    }

    pub fn is_bound(&self, class_name: &str) -> bool {
        self.lua
            .app_data_ref::<BindingRegistry>()
            .is_some_and(|registry| registry.is_bound(class_name))
    }

    /// Wraps a native texture for handing to a script.
    pub fn push_texture(&self, texture: Option<TextureHandle>) -> Result<AnyUserData> {
        Ok(self.lua.create_userdata(TextureBinding::new(texture))?)
    }

    pub fn set_global_texture(&self, name: &str, texture: Option<TextureHandle>) -> Result<()> {
        let userdata = self.push_texture(texture)?;
        self.lua.globals().set(name, userdata)?;
        debug!("Exposed texture {:?} to scripts as '{}'", texture, name);
        Ok(())
    }

    /// Reads back the texture referenced by a global. Globals that are not
    /// textures (or are unset) yield `None`.
    pub fn global_texture(&self, name: &str) -> Result<Option<TextureHandle>> {
        let value: Value = self.lua.globals().get(name)?;
        match value {
            Value::UserData(userdata) => Ok(userdata
                .borrow::<TextureBinding>()
                .ok()
                .and_then(|binding| binding.texture())),
            _ => Ok(None),
        }
    }

    pub fn run(&self, name: &str, source: &str) -> Result<()> {
        self.lua.load(source).set_name(name).exec()?;
        Ok(())
    }

    pub fn run_file(&self, path: &Path) -> Result<()> {
        let source = std::fs::read_to_string(path)?;
        info!("Running script {:?}", path);
        self.run(&format!("@{}", path.display()), &source)
    }

    /// Runs a full garbage collection cycle, finalizing unreachable wrappers.
    pub fn collect_garbage(&self) -> Result<()> {
        self.lua.gc_collect()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn environment() -> ScriptEnvironment {
        let textures = Rc::new(RefCell::new(TextureResource::new()));
        ScriptEnvironment::new(textures, ScriptSettings::default()).unwrap()
    }

    #[test]
    fn test_new_binds_texture_class() {
        let env = environment();
        assert!(env.is_bound("Texture"));
        assert!(!env.is_bound("Mesh"));

        let registry = env.lua().app_data_ref::<BindingRegistry>().unwrap();
        let info = registry.class_info("Texture").unwrap();
        assert!(info.methods.contains(&"GetWidth"));
        assert!(info.properties.contains(&"Width"));
    }

    #[test]
    fn test_rebinding_keeps_existing_wrappers_working() {
        let env = environment();
        let handle = env.textures().borrow_mut().create_solid_rgba([0; 4]);
        env.set_global_texture("tex", Some(handle)).unwrap();

        assert!(!env.bind::<TextureBinding>().unwrap());
        assert!(!env.bind::<TextureBinding>().unwrap());

        let width: u32 = env.lua().load("return Texture(tex):GetWidth()").eval().unwrap();
        assert_eq!(width, 1);
        assert_eq!(
            env.lua().app_data_ref::<BindingRegistry>().unwrap().len(),
            1
        );
    }

    #[test]
    fn test_global_texture_ignores_other_values() {
        let env = environment();
        env.run("globals", "number = 3; null = Texture()").unwrap();

        assert_eq!(env.global_texture("number").unwrap(), None);
        assert_eq!(env.global_texture("missing").unwrap(), None);
        assert_eq!(env.global_texture("null").unwrap(), None);
    }

    #[test]
    fn test_collected_wrappers_leave_textures_alive() {
        let env = environment();
        let handle = env.textures().borrow_mut().create_solid_rgba([7; 4]);

        env.set_global_texture("tex", Some(handle)).unwrap();
        env.run(
            "churn",
            "for i = 1, 100 do local t = Texture(tex) end; tex = nil",
        )
        .unwrap();
        env.collect_garbage().unwrap();

        assert!(env.textures().borrow().contains(handle));
        assert_eq!(env.textures().borrow().len(), 1);
    }

    #[test]
    fn test_run_file_reports_script_errors() {
        let env = environment();
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "result = Texture():IsValid()").unwrap();
        env.run_file(file.path()).unwrap();
        let valid: bool = env.lua().globals().get("result").unwrap();
        assert!(!valid);

        let mut broken = NamedTempFile::new().unwrap();
        writeln!(broken, "Texture():GetHeight()").unwrap();
        assert!(env.run_file(broken.path()).is_err());
    }

    #[test]
    fn test_host_borrow_conflict_is_a_script_error() {
        let env = environment();
        let handle = env.textures().borrow_mut().create_solid_rgba([0; 4]);
        env.set_global_texture("tex", Some(handle)).unwrap();

        let _guard = env.textures().borrow_mut();
        let err = env.run("conflict", "return tex:GetWidth()").unwrap_err();
        assert!(err.to_string().contains("texture store is unavailable"), "{err}");
    }
}
