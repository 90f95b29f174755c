// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.

//! Registration of native classes with a Lua state.
//!
//! A class describes its script surface with two static tables, one of
//! methods and one of properties. [`bind`] turns them into a global
//! constructor plus userdata metadata, once per Lua state.

use log::debug;
use mlua::{Lua, MultiValue, UserData, UserDataFields, UserDataMethods, Value};
use std::collections::HashMap;

pub type MethodFn<T> = fn(&Lua, &T, MultiValue) -> mlua::Result<MultiValue>;
pub type MethodMutFn<T> = fn(&Lua, &mut T, MultiValue) -> mlua::Result<MultiValue>;
pub type GetterFn<T> = fn(&Lua, &T) -> mlua::Result<Value>;
pub type SetterFn<T> = fn(&Lua, &mut T, Value) -> mlua::Result<()>;

pub enum Callback<T: 'static> {
    Ref(MethodFn<T>),
    Mut(MethodMutFn<T>),
}

pub struct Method<T: 'static> {
    pub name: &'static str,
    pub callback: Callback<T>,
}

/// A script-visible field. Properties without a setter are read-only.
pub struct Property<T: 'static> {
    pub name: &'static str,
    pub getter: GetterFn<T>,
    pub setter: Option<SetterFn<T>>,
}

pub trait ScriptClass: UserData + Sized + 'static {
    /// Name of the global constructor and of the class in the registry.
    const CLASS_NAME: &'static str;
    const METHODS: &'static [Method<Self>];
    const PROPERTIES: &'static [Property<Self>];

    /// Builds an instance from the arguments of a script constructor call.
    fn construct(lua: &Lua, args: MultiValue) -> mlua::Result<Self>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub methods: Vec<&'static str>,
    pub properties: Vec<&'static str>,
}

/// Per-state record of bound classes, stored as Lua app data.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    classes: HashMap<&'static str, ClassInfo>,
}

impl BindingRegistry {
    pub fn is_bound(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    pub fn class_info(&self, class_name: &str) -> Option<&ClassInfo> {
        self.classes.get(class_name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

pub fn add_method_table<T, M>(methods: &mut M, table: &'static [Method<T>])
where
    T: 'static,
    M: UserDataMethods<T>,
{
    for method in table {
        match method.callback {
            Callback::Ref(func) => {
                methods.add_method(method.name, move |lua, this, args: MultiValue| {
                    func(lua, this, args)
                });
            }
            Callback::Mut(func) => {
                methods.add_method_mut(method.name, move |lua, this, args: MultiValue| {
                    func(lua, this, args)
                });
            }
        }
    }
}

pub fn add_property_table<T, F>(fields: &mut F, table: &'static [Property<T>])
where
    T: 'static,
    F: UserDataFields<T>,
{
    for property in table {
        let getter = property.getter;
        fields.add_field_method_get(property.name, move |lua, this| getter(lua, this));
        if let Some(setter) = property.setter {
            fields.add_field_method_set(property.name, move |lua, this, value: Value| {
                setter(lua, this, value)
            });
        }
    }
}

/// Registers `T` with the Lua state: a global constructor named
/// `T::CLASS_NAME` and an entry in the [`BindingRegistry`].
///
/// Returns `false` without touching the state if `T` is already bound.
pub fn bind<T: ScriptClass>(lua: &Lua) -> mlua::Result<bool> {
    if lua.app_data_ref::<BindingRegistry>().is_none() {
        lua.set_app_data(BindingRegistry::default());
    }
    let already_bound = lua
        .app_data_ref::<BindingRegistry>()
        .is_some_and(|registry| registry.is_bound(T::CLASS_NAME));
    if already_bound {
        debug!("Class {} already bound, skipping", T::CLASS_NAME);
        return Ok(false);
    }

    let constructor = lua.create_function(|lua, args: MultiValue| T::construct(lua, args))?;
    lua.globals().set(T::CLASS_NAME, constructor)?;

    let info = ClassInfo {
        methods: T::METHODS.iter().map(|m| m.name).collect(),
        properties: T::PROPERTIES.iter().map(|p| p.name).collect(),
    };
    if let Some(mut registry) = lua.app_data_mut::<BindingRegistry>() {
        registry.classes.insert(T::CLASS_NAME, info);
    }
    debug!(
        "Bound class {} ({} methods, {} properties)",
        T::CLASS_NAME,
        T::METHODS.len(),
        T::PROPERTIES.len()
    );
    Ok(true)
}
