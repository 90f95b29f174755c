// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

use log::debug;
use mlua::{
    AnyUserData, FromLuaMulti, IntoLuaMulti, Lua, MetaMethod, MultiValue, UserData,
    UserDataFields, UserDataMethods, Value,
};
use std::path::PathBuf;
use thiserror::Error;

use crate::assets::{handles::TextureHandle, texture::Texture};
use crate::scripting::binder::{
    Callback, Method, Property, ScriptClass, add_method_table, add_property_table,
};
use crate::scripting::{ScriptSettings, TextureStore};

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("attempt to use a null texture")]
    NullTexture,

    #[error("texture {0:?} is no longer loaded")]
    StaleTexture(TextureHandle),

    #[error("texture store is unavailable")]
    StoreUnavailable,

    #[error("bad argument #{position} to '{function}' ({message})")]
    InvalidArgument {
        function: &'static str,
        position: usize,
        message: String,
    },

    #[error("pixel ({x}, {y}) is outside a {width}x{height} texture")]
    PixelOutOfBounds { x: u32, y: u32, width: u32, height: u32 },
}

impl From<BindingError> for mlua::Error {
    fn from(err: BindingError) -> Self {
        mlua::Error::external(err)
    }
}

/// Script-side view of a texture.
///
/// Holds a handle into the engine's texture store, never the texture itself:
/// dropping a binding (or the Lua GC collecting it) leaves the texture alone.
/// The handle may be null.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    pub texture: Option<TextureHandle>,
}

impl TextureBinding {
    pub fn new(texture: Option<TextureHandle>) -> Self {
        Self { texture }
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn is_null(&self) -> bool {
        self.texture.is_none()
    }

    /// Runs `f` against the referenced texture, or fails with a
    /// script-visible error if the reference is null or stale.
    fn with_texture<R>(&self, lua: &Lua, f: impl FnOnce(&Texture) -> R) -> mlua::Result<R> {
        let handle = self.texture.ok_or(BindingError::NullTexture)?;
        let store = lua
            .app_data_ref::<TextureStore>()
            .ok_or(BindingError::StoreUnavailable)?;
        let textures = store
            .0
            .try_borrow()
            .map_err(|_| BindingError::StoreUnavailable)?;
        let texture = textures
            .get_texture(handle)
            .ok_or(BindingError::StaleTexture(handle))?;
        Ok(f(texture))
    }

    fn is_valid(lua: &Lua, this: &Self, _: MultiValue) -> mlua::Result<MultiValue> {
        this.with_texture(lua, |_| ()).is_ok().into_lua_multi(lua)
    }

    fn get_width(lua: &Lua, this: &Self, _: MultiValue) -> mlua::Result<MultiValue> {
        this.with_texture(lua, |tex| tex.width)?.into_lua_multi(lua)
    }

    fn get_height(lua: &Lua, this: &Self, _: MultiValue) -> mlua::Result<MultiValue> {
        this.with_texture(lua, |tex| tex.height)?.into_lua_multi(lua)
    }

    fn get_format(lua: &Lua, this: &Self, _: MultiValue) -> mlua::Result<MultiValue> {
        this.with_texture(lua, |tex| tex.format.as_str())?
            .into_lua_multi(lua)
    }

    fn get_pixel(lua: &Lua, this: &Self, args: MultiValue) -> mlua::Result<MultiValue> {
        if this.is_null() {
            return Err(BindingError::NullTexture.into());
        }
        let (x, y) = <(u32, u32)>::from_lua_multi(args, lua)?;
        let texel = this.with_texture(lua, |tex| {
            tex.pixel(x, y).ok_or(BindingError::PixelOutOfBounds {
                x,
                y,
                width: tex.width,
                height: tex.height,
            })
        })??;
        let [r, g, b, a] = texel;
        (r, g, b, a).into_lua_multi(lua)
    }

    fn save(lua: &Lua, this: &Self, args: MultiValue) -> mlua::Result<MultiValue> {
        let handle = this.texture.ok_or(BindingError::NullTexture)?;
        let filename = match args.into_iter().next() {
            Some(Value::String(s)) => s.to_str()?.to_string(),
            other => {
                return Err(BindingError::InvalidArgument {
                    function: "Save",
                    position: 1,
                    message: format!(
                        "string expected, got {}",
                        other.as_ref().map_or("no value", Value::type_name)
                    ),
                }
                .into());
            }
        };
        let path = resolve_asset_path(lua, &filename);

        let store = lua
            .app_data_ref::<TextureStore>()
            .ok_or(BindingError::StoreUnavailable)?;
        let textures = store
            .0
            .try_borrow()
            .map_err(|_| BindingError::StoreUnavailable)?;
        if !textures.contains(handle) {
            return Err(BindingError::StaleTexture(handle).into());
        }
        textures
            .save_to_file(handle, &path)
            .map_err(mlua::Error::external)?;
        debug!("Script saved texture {:?} to {:?}", handle, path);
        true.into_lua_multi(lua)
    }

    fn release(lua: &Lua, this: &mut Self, _: MultiValue) -> mlua::Result<MultiValue> {
        this.texture = None;
        ().into_lua_multi(lua)
    }

    fn width(lua: &Lua, this: &Self) -> mlua::Result<Value> {
        Ok(Value::Integer(this.with_texture(lua, |tex| tex.width)?.into()))
    }

    fn height(lua: &Lua, this: &Self) -> mlua::Result<Value> {
        Ok(Value::Integer(this.with_texture(lua, |tex| tex.height)?.into()))
    }

    fn format(lua: &Lua, this: &Self) -> mlua::Result<Value> {
        let format = this.with_texture(lua, |tex| tex.format.as_str())?;
        Ok(Value::String(lua.create_string(format)?))
    }

    fn name(lua: &Lua, this: &Self) -> mlua::Result<Value> {
        match this.with_texture(lua, |tex| tex.name.clone())? {
            Some(name) => Ok(Value::String(lua.create_string(&name)?)),
            None => Ok(Value::Nil),
        }
    }
}

/// Relative paths are resolved against the configured asset root.
fn resolve_asset_path(lua: &Lua, filename: &str) -> PathBuf {
    let path = PathBuf::from(filename);
    if path.is_absolute() {
        return path;
    }
    match lua.app_data_ref::<ScriptSettings>() {
        Some(settings) => settings.asset_root.join(path),
        None => path,
    }
}

impl UserData for TextureBinding {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        add_property_table(fields, Self::PROPERTIES);
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_method_table(methods, Self::METHODS);

        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(match this.texture {
                Some(handle) => format!("{}({:?})", Self::CLASS_NAME, handle),
                None => format!("{}(null)", Self::CLASS_NAME),
            })
        });
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other
                .borrow::<Self>()
                .is_ok_and(|other| other.texture == this.texture))
        });
    }
}

impl ScriptClass for TextureBinding {
    const CLASS_NAME: &'static str = "Texture";

    const METHODS: &'static [Method<Self>] = &[
        Method {
            name: "IsValid",
            callback: Callback::Ref(Self::is_valid),
        },
        Method {
            name: "GetWidth",
            callback: Callback::Ref(Self::get_width),
        },
        Method {
            name: "GetHeight",
            callback: Callback::Ref(Self::get_height),
        },
        Method {
            name: "GetFormat",
            callback: Callback::Ref(Self::get_format),
        },
        Method {
            name: "GetPixel",
            callback: Callback::Ref(Self::get_pixel),
        },
        Method {
            name: "Save",
            callback: Callback::Ref(Self::save),
        },
        Method {
            name: "Release",
            callback: Callback::Mut(Self::release),
        },
    ];

    const PROPERTIES: &'static [Property<Self>] = &[
        Property {
            name: "Width",
            getter: Self::width,
            setter: None,
        },
        Property {
            name: "Height",
            getter: Self::height,
            setter: None,
        },
        Property {
            name: "Format",
            getter: Self::format,
            setter: None,
        },
        Property {
            name: "Name",
            getter: Self::name,
            setter: None,
        },
    ];

    /// `Texture()` is null, `Texture(filename)` loads through the store,
    /// `Texture(other)` references the same texture as `other`.
    fn construct(lua: &Lua, args: MultiValue) -> mlua::Result<Self> {
        match args.into_iter().next() {
            None | Some(Value::Nil) => Ok(Self::default()),
            Some(Value::String(filename)) => {
                let path = resolve_asset_path(lua, &filename.to_str()?);
                let store = lua
                    .app_data_ref::<TextureStore>()
                    .ok_or(BindingError::StoreUnavailable)?;
                let mut textures = store
                    .0
                    .try_borrow_mut()
                    .map_err(|_| BindingError::StoreUnavailable)?;
                let handle = textures
                    .load_from_file(&path)
                    .map_err(mlua::Error::external)?;
                Ok(Self::new(Some(handle)))
            }
            Some(Value::UserData(other)) => match other.borrow::<Self>() {
                Ok(other) => Ok(Self::new(other.texture)),
                Err(_) => Err(BindingError::InvalidArgument {
                    function: Self::CLASS_NAME,
                    position: 1,
                    message: "Texture expected, got userdata".to_string(),
                }
                .into()),
            },
            Some(other) => Err(BindingError::InvalidArgument {
                function: Self::CLASS_NAME,
                position: 1,
                message: format!("string or Texture expected, got {}", other.type_name()),
            }
            .into()),
        }
    }
}
