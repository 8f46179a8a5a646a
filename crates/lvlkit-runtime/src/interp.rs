//! Condition and action bytecode interpreter.
//!
//! Scripts are runs of `(op, a, b)` triples ending at `END`. A condition is
//! an AND-chain: the first failing predicate makes the whole script false.
//! An action script runs every instruction in order. Offset 0 is the "no
//! script" sentinel in both streams. An unknown opcode, or an instruction
//! that runs past the blob, stops the script where it is.

use lvlkit_types::format::INSTRUCTION_SIZE;
use lvlkit_types::{ActOp, CondOp, StreamOffset};

use crate::level::LevelReader;
use crate::state::GameState;

/// Side effects a script can ask for that the interpreter does not own.
pub trait ScriptHost {
    fn show_message(&mut self, id: u8, text: &str) {
        let _ = (id, text);
    }

    fn play_sfx(&mut self, id: u8) {
        let _ = id;
    }
}

impl ScriptHost for () {}

/// Destination of a room change requested by `TRANSITION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub room: u8,
    pub spawn: u8,
}

/// Why an action script stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stop {
    /// Reached `END`, or the script was the empty sentinel.
    #[default]
    End,
    /// Hit an opcode the interpreter does not know.
    Unknown(u8),
    /// The next instruction would read past the blob.
    Truncated,
}

/// What one action script did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionReport {
    /// Instructions executed, not counting `END`.
    pub executed: usize,
    /// Last transition requested; applied by the caller after the script.
    pub transition: Option<Transition>,
    pub stop: Stop,
}

/// Evaluate the condition script at `offset`.
pub fn conditions_pass(level: &LevelReader<'_>, state: &GameState, offset: StreamOffset) -> bool {
    if offset.is_none() {
        return true;
    }
    let mut at = offset.resolve(level.cond_base());
    loop {
        let Some([op, a, b]) = level.instruction(at) else {
            log::warn!("condition {offset} runs past the blob");
            return false;
        };
        let pass = match CondOp::from_repr(op) {
            Some(CondOp::End) => return true,
            Some(CondOp::True) => true,
            Some(CondOp::FlagSet) => state.flags.get(a),
            Some(CondOp::FlagClr) => !state.flags.get(a),
            Some(CondOp::HasItem) => state.has_item(a),
            Some(CondOp::VarEq) => state.vars.get(a) == b,
            None => {
                log::warn!("unknown condition opcode {op} at {at}");
                return false;
            }
        };
        if !pass {
            return false;
        }
        at += INSTRUCTION_SIZE;
    }
}

/// Run the action script at `offset` against `state`.
///
/// A `TRANSITION` is only recorded; the room does not change until the
/// caller applies [`ActionReport::transition`] after the script ends.
pub fn run_actions(
    level: &LevelReader<'_>,
    state: &mut GameState,
    offset: StreamOffset,
    host: &mut dyn ScriptHost,
) -> ActionReport {
    let mut report = ActionReport::default();
    if offset.is_none() {
        return report;
    }
    let mut at = offset.resolve(level.act_base());
    loop {
        let Some([op, a, b]) = level.instruction(at) else {
            log::warn!("action {offset} runs past the blob");
            report.stop = Stop::Truncated;
            return report;
        };
        match ActOp::from_repr(op) {
            Some(ActOp::End) => return report,
            Some(ActOp::ShowMsg) => host.show_message(a, level.message(a)),
            Some(ActOp::SetFlag) => state.flags.set(a, true),
            Some(ActOp::ClrFlag) => state.flags.set(a, false),
            Some(ActOp::GiveItem) => {
                state.give(a);
            }
            Some(ActOp::TakeItem) => {
                state.take(a);
            }
            Some(ActOp::SetVar) => state.vars.set(a, b),
            Some(ActOp::Sfx) => host.play_sfx(a),
            Some(ActOp::Transition) => report.transition = Some(Transition { room: a, spawn: b }),
            None => {
                log::warn!("unknown action opcode {op} at {at}");
                report.stop = Stop::Unknown(op);
                return report;
            }
        }
        report.executed += 1;
        at += INSTRUCTION_SIZE;
    }
}
