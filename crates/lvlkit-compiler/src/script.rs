//! Condition and action scripts → bytecode.

use std::str::FromStr;

use lvlkit_types::{ActOp, CondOp};

use crate::error::Diagnostics;
use crate::layout::{ScriptStream, SymbolTable};
use crate::level_parser::{InstrLine, ScriptDecl};
use crate::source;

/// Built-in condition name that resolves to the always-true sentinel.
pub const ALWAYS: &str = "ALWAYS";
/// Built-in action name that resolves to the no-op sentinel.
pub const NOOP: &str = "NOOP";

/// Every namespace a script operand can name.
pub struct ScriptNames<'a> {
    pub flags: &'a SymbolTable,
    pub vars: &'a SymbolTable,
    pub items: &'a SymbolTable,
    pub messages: &'a SymbolTable,
    pub rooms: &'a SymbolTable,
    /// Spawn names per room, indexed by room id.
    pub spawns: &'a [SymbolTable],
}

impl ScriptNames<'_> {
    fn resolve(
        &self,
        table: &SymbolTable,
        name: &str,
        instr: &InstrLine,
        diags: &mut Diagnostics,
    ) -> u8 {
        table.id(name).unwrap_or_else(|| {
            diags.referential(
                instr.line,
                format!("{}: unknown {} `{name}`", instr.op, table.kind()),
            );
            0
        })
    }

    fn literal(&self, text: &str, instr: &InstrLine, diags: &mut Diagnostics) -> u8 {
        source::parse_u8(text).unwrap_or_else(|e| {
            diags.limit(instr.line, format!("{}: {e}", instr.op));
            0
        })
    }

    fn spawn(&self, room: &str, spawn: &str, instr: &InstrLine, diags: &mut Diagnostics) -> (u8, u8) {
        let Some(room_id) = self.rooms.id(room) else {
            diags.referential(instr.line, format!("{}: unknown room `{room}`", instr.op));
            return (0, 0);
        };
        match self.spawns.get(room_id as usize).and_then(|t| t.id(spawn)) {
            Some(spawn_id) => (room_id, spawn_id),
            None => {
                diags.referential(
                    instr.line,
                    format!("{}: unknown spawn `{spawn}` in room `{room}`", instr.op),
                );
                (room_id, 0)
            }
        }
    }
}

fn arity_ok(instr: &InstrLine, arity: usize, diags: &mut Diagnostics) -> bool {
    if instr.args.len() == arity {
        return true;
    }
    diags.structural(
        instr.line,
        format!(
            "{} takes {arity} operand(s), got {}",
            instr.op,
            instr.args.len()
        ),
    );
    false
}

/// Lay out one condition script at the end of `stream`.
pub fn compile_condition(
    decl: &ScriptDecl,
    names: &ScriptNames<'_>,
    stream: &mut ScriptStream,
    diags: &mut Diagnostics,
) {
    if let Err(e) = stream.begin(&decl.name) {
        diags.structural(decl.line, e.to_string());
        return;
    }
    for instr in &decl.body {
        let Ok(op) = CondOp::from_str(&instr.op.to_ascii_uppercase()) else {
            diags.structural(instr.line, format!("unknown condition op `{}`", instr.op));
            continue;
        };
        if op == CondOp::End {
            diags.structural(instr.line, "END may not appear inside a script body");
            continue;
        }
        if !arity_ok(instr, op.arity(), diags) {
            continue;
        }
        let args = &instr.args;
        let (a, b) = match op {
            CondOp::End | CondOp::True => (0, 0),
            CondOp::FlagSet | CondOp::FlagClr => (names.resolve(names.flags, &args[0], instr, diags), 0),
            CondOp::HasItem => (names.resolve(names.items, &args[0], instr, diags), 0),
            CondOp::VarEq => (
                names.resolve(names.vars, &args[0], instr, diags),
                names.literal(&args[1], instr, diags),
            ),
        };
        stream.emit(op as u8, a, b);
    }
    stream.end();
    log::debug!("cond {} at {:?}", decl.name, stream.offset(&decl.name));
}

/// Lay out one action script at the end of `stream`.
pub fn compile_action(
    decl: &ScriptDecl,
    names: &ScriptNames<'_>,
    stream: &mut ScriptStream,
    diags: &mut Diagnostics,
) {
    if let Err(e) = stream.begin(&decl.name) {
        diags.structural(decl.line, e.to_string());
        return;
    }
    for instr in &decl.body {
        let Ok(op) = ActOp::from_str(&instr.op.to_ascii_uppercase()) else {
            diags.structural(instr.line, format!("unknown action op `{}`", instr.op));
            continue;
        };
        if op == ActOp::End {
            diags.structural(instr.line, "END may not appear inside a script body");
            continue;
        }
        if !arity_ok(instr, op.arity(), diags) {
            continue;
        }
        let args = &instr.args;
        let (a, b) = match op {
            ActOp::End => (0, 0),
            ActOp::ShowMsg => (names.resolve(names.messages, &args[0], instr, diags), 0),
            ActOp::SetFlag | ActOp::ClrFlag => (names.resolve(names.flags, &args[0], instr, diags), 0),
            ActOp::GiveItem | ActOp::TakeItem => (names.resolve(names.items, &args[0], instr, diags), 0),
            ActOp::SetVar => (
                names.resolve(names.vars, &args[0], instr, diags),
                names.literal(&args[1], instr, diags),
            ),
            ActOp::Sfx => (names.literal(&args[0], instr, diags), 0),
            ActOp::Transition => names.spawn(&args[0], &args[1], instr, diags),
        };
        stream.emit(op as u8, a, b);
    }
    stream.end();
    log::debug!("act {} at {:?}", decl.name, stream.offset(&decl.name));
}
