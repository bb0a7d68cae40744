//! Instruction budget.
//!
//! A VM hook fires every [`INSTRUCTIONS_PER_TICK`] instructions and adds
//! them to a counter shared by the whole run, includes included. When the
//! counter passes the limit the hook raises [`BudgetExhausted`], which
//! unwinds the running chunk like any Lua error.
//!
//! Exhaustion is sticky: the hook is then re-armed on every instruction,
//! so a script that catches the error with `pcall` fails again at its
//! next instruction and the error reaches the host.

use mlua::{HookTriggers, Lua, VmState};
use std::cell::Cell;
use thiserror::Error;

/// Hook granularity.
pub const INSTRUCTIONS_PER_TICK: u32 = 1000;

/// Raised from the VM hook once the budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("instruction budget of {limit} exhausted")]
pub struct BudgetExhausted {
    pub limit: u64,
}

/// Limit `lua` to roughly `limit` VM instructions.
pub fn install(lua: &Lua, limit: u64) {
    let used = Cell::new(0u64);
    lua.set_hook(
        HookTriggers::new().every_nth_instruction(INSTRUCTIONS_PER_TICK),
        move |lua, _| {
            let total = used.get().saturating_add(u64::from(INSTRUCTIONS_PER_TICK));
            used.set(total);
            if total <= limit {
                return Ok(VmState::Continue);
            }
            log::debug!("instruction budget of {limit} exhausted");
            lua.set_hook(
                HookTriggers::new().every_nth_instruction(1),
                move |_, _| Err(exhausted(limit)),
            );
            Err(exhausted(limit))
        },
    );
}

fn exhausted(limit: u64) -> mlua::Error {
    mlua::Error::external(BudgetExhausted { limit })
}
