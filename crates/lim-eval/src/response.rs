//! The `response` table.
//!
//! Response effects are queued on the context and only reach the host
//! sink once the whole document has run successfully.

use mlua::{Lua, Value, Variadic};
use std::rc::Rc;

use crate::context::Context;
use crate::host::{ResponseError, ResponseSink};

pub(crate) fn install(ctx: &Rc<Context>, lua: &Lua) -> mlua::Result<()> {
    let response = lua.create_table()?;

    let c = Rc::clone(ctx);
    let status = lua.create_function(move |_, args: Variadic<Value>| {
        if let Some(code) = status_code(args.last()) {
            c.defer(move |sink| set_status(sink, code));
        }
        Ok(())
    })?;
    response.set("status", status)?;

    lua.globals().set("response", response)
}

/// Integers and integral floats; anything else is ignored.
fn status_code(arg: Option<&Value>) -> Option<i64> {
    match arg? {
        Value::Integer(i) => Some(*i),
        Value::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
        other => {
            log::debug!("response.status: ignoring {} argument", other.type_name());
            None
        }
    }
}

fn set_status(sink: &mut dyn ResponseSink, code: i64) -> Result<(), ResponseError> {
    let valid = u16::try_from(code)
        .ok()
        .filter(|c| (100..=999).contains(c))
        .ok_or(ResponseError::InvalidStatus(code))?;
    sink.set_status(valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::BufferedResponse;

    #[test]
    fn test_status_code_accepts_integral_numbers() {
        assert_eq!(status_code(Some(&Value::Integer(404))), Some(404));
        assert_eq!(status_code(Some(&Value::Number(201.0))), Some(201));
        assert_eq!(status_code(Some(&Value::Number(201.5))), None);
        assert_eq!(status_code(Some(&Value::Boolean(true))), None);
        assert_eq!(status_code(None), None);
    }

    #[test]
    fn test_set_status_range() {
        let mut response = BufferedResponse::new();
        assert_eq!(
            set_status(&mut response, 42),
            Err(ResponseError::InvalidStatus(42))
        );
        assert_eq!(
            set_status(&mut response, 70_000),
            Err(ResponseError::InvalidStatus(70_000))
        );
        set_status(&mut response, 418).unwrap();
        assert_eq!(response.status, Some(418));
    }
}
