//! Sandboxing of the Lua state documents run in.
//!
//! Removed: the `io`, `debug` and `package` libraries, `require`, and every
//! way to load code at run time (`load`, `loadstring`, `loadfile`,
//! `dofile`). `os` keeps only `clock`, `date`, `difftime` and `time`.

use mlua::{Lua, Table, Value};

const REMOVED_GLOBALS: [&str; 8] = [
    "io",
    "debug",
    "package",
    "require",
    "load",
    "loadstring",
    "loadfile",
    "dofile",
];

const SAFE_OS_FUNCTIONS: [&str; 4] = ["clock", "date", "difftime", "time"];

/// Strip unsafe libraries and functions from `lua`'s globals.
pub fn sandbox(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();

    let safe_os = lua.create_table()?;
    if let Value::Table(os) = globals.get::<Value>("os")? {
        copy_fields(&os, &safe_os, &SAFE_OS_FUNCTIONS)?;
    }
    globals.set("os", safe_os)?;

    for name in REMOVED_GLOBALS {
        globals.set(name, Value::Nil)?;
    }
    Ok(())
}

fn copy_fields(from: &Table, to: &Table, names: &[&str]) -> mlua::Result<()> {
    for &name in names {
        to.set(name, from.get::<Value>(name)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsafe_globals_removed() {
        let lua = Lua::new();
        sandbox(&lua).unwrap();
        for name in REMOVED_GLOBALS {
            let value: Value = lua.globals().get(name).unwrap();
            assert!(value.is_nil(), "{name} still reachable");
        }
    }

    #[test]
    fn test_os_reduced() {
        let lua = Lua::new();
        sandbox(&lua).unwrap();
        let kept: bool = lua
            .load("return type(os.time) == 'function' and os.execute == nil and os.exit == nil")
            .eval()
            .unwrap();
        assert!(kept);
    }

    #[test]
    fn test_string_library_kept() {
        let lua = Lua::new();
        sandbox(&lua).unwrap();
        let upper: String = lua.load("return string.upper('ok')").eval().unwrap();
        assert_eq!(upper, "OK");
    }
}
