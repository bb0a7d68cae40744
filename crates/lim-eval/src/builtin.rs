//! Output, include and log primitives.

use lim_transpiler::{escape, TEXT_PRIMITIVE};
use lim_types::LimError;
use mlua::{Function, Lua, Value, Variadic};
use std::rc::Rc;

use crate::context::Context;
use crate::format::{self, FormatArg};
use crate::logging::LogLevel;

pub(crate) fn install(ctx: &Rc<Context>, lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();
    let tostring: Function = globals.get("tostring")?;

    let (c, ts) = (Rc::clone(ctx), tostring.clone());
    let write = lua.create_function(move |_, args: Variadic<Value>| {
        c.append_output(&join_args(&ts, &args)?);
        Ok(())
    })?;
    globals.set("write", write)?;

    let (c, ts) = (Rc::clone(ctx), tostring.clone());
    let print = lua.create_function(move |_, args: Variadic<Value>| {
        let mut line = join_args(&ts, &args)?;
        line.push(b'\n');
        c.append_output(&line);
        Ok(())
    })?;
    globals.set("print", print)?;

    let c = Rc::clone(ctx);
    let text = lua.create_function(move |_, text: mlua::String| {
        let mut decoded = Vec::new();
        escape::decode_into(&text.as_bytes(), &mut decoded);
        c.append_output(&decoded);
        Ok(())
    })?;
    globals.set(TEXT_PRIMITIVE, text)?;

    let (c, ts) = (Rc::clone(ctx), tostring.clone());
    let include = lua.create_function(move |lua, path: Value| {
        let path = lossy(&ts.call::<mlua::String>(path)?);
        c.include(lua, &path).map_err(mlua::Error::external)
    })?;
    globals.set("include", include)?;

    let log = lua.create_table()?;
    for level in [LogLevel::Info, LogLevel::Warn, LogLevel::Error, LogLevel::Debug] {
        let (c, ts) = (Rc::clone(ctx), tostring.clone());
        let function = lua.create_function(move |_, args: Variadic<Value>| {
            log_message(&c, &ts, level, &args)
        })?;
        log.set(level.name(), function)?;
    }
    globals.set("log", log)
}

fn lossy(s: &mlua::String) -> String {
    String::from_utf8_lossy(&s.as_bytes()).into_owned()
}

/// Arguments converted with `tostring` and joined by single spaces.
fn join_args(tostring: &Function, args: &[Value]) -> mlua::Result<Vec<u8>> {
    let mut out = Vec::new();
    for (i, value) in args.iter().enumerate() {
        if i > 0 {
            out.push(b' ');
        }
        let text = tostring.call::<mlua::String>(value.clone())?;
        out.extend_from_slice(&text.as_bytes());
    }
    Ok(out)
}

fn log_message(
    ctx: &Context,
    tostring: &Function,
    level: LogLevel,
    args: &[Value],
) -> mlua::Result<()> {
    let template = match args.first() {
        Some(Value::String(s)) => lossy(s),
        Some(Value::Integer(i)) => i.to_string(),
        Some(Value::Number(n)) => format::lua_float(*n),
        other => {
            let got = other.map_or("no value", Value::type_name);
            return Err(mlua::Error::RuntimeError(format!(
                "bad argument #1 to 'log.{}' (string expected, got {got})",
                level.name()
            )));
        }
    };

    let sink = ctx.log_sink();
    if args.len() == 1 {
        sink.log(level, &template);
        return Ok(());
    }

    let format_args = args[1..]
        .iter()
        .map(|value| format_arg(tostring, value))
        .collect::<mlua::Result<Vec<_>>>()?;
    let formatted = format::sprintf(&template, &format_args);
    sink.log(level, &formatted.text);
    for problem in formatted.problems {
        let err = LimError::Formatting {
            template: template.clone(),
            message: problem,
        };
        log::warn!("{err}");
        sink.log(LogLevel::Warn, &err.to_string());
    }
    Ok(())
}

fn format_arg(tostring: &Function, value: &Value) -> mlua::Result<FormatArg> {
    Ok(match value {
        Value::Nil => FormatArg::Nil,
        Value::Boolean(b) => FormatArg::Bool(*b),
        Value::Integer(i) => FormatArg::Int(*i),
        Value::Number(n) => FormatArg::Float(*n),
        Value::String(s) => FormatArg::Str(lossy(s)),
        other => FormatArg::Other {
            type_name: other.type_name(),
            text: lossy(&tostring.call::<mlua::String>(other.clone())?),
        },
    })
}
