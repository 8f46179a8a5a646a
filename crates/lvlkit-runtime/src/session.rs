//! The engine-facing session: one installed level, its state and the
//! current room, plus object interaction routing.

use lvlkit_types::{ExitEdge, ObjectKind, ScriptSlot, StreamOffset, Verbs, keypad_code};

use crate::error::BlobError;
use crate::interp::{self, ActionReport, ScriptHost, Transition};
use crate::level::{Exit, LevelReader, ObjectRecord, Spawn};
use crate::room::RoomState;
use crate::state::GameState;

/// What the player does to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Look,
    Take,
    Use,
    Talk,
    Operate,
    /// Submit a keypad code.
    EnterCode(u16),
    /// Flip switch `0..=2` of a breaker panel.
    ToggleSwitch(u8),
    /// Use an inventory item on the object.
    UseItem(u8),
}

impl Interaction {
    /// Verb the object must accept for this interaction.
    pub fn verb(self) -> Verbs {
        match self {
            Self::Look => Verbs::LOOK,
            Self::Take => Verbs::TAKE,
            Self::Use | Self::EnterCode(_) | Self::UseItem(_) => Verbs::USE,
            Self::Talk => Verbs::TALK,
            Self::Operate | Self::ToggleSwitch(_) => Verbs::OPERATE,
        }
    }
}

/// A script that ran because of an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub slot: ScriptSlot,
    pub offset: StreamOffset,
    pub executed: usize,
    /// Room change that was applied after the script.
    pub transition: Option<Transition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NoObject,
    VerbRejected,
    /// The object's condition script failed.
    Blocked,
    Ran(Dispatch),
}

/// Number of switches on a breaker panel.
pub const BREAKER_SWITCHES: u8 = 3;

#[derive(Debug, Clone)]
pub struct Runtime<'a> {
    level: LevelReader<'a>,
    state: GameState,
    room: RoomState,
}

impl Default for Runtime<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Runtime<'a> {
    /// A session on the built-in default level.
    pub fn new() -> Self {
        let level = LevelReader::default();
        let room = RoomState::load(&level, 0, 0).unwrap_or_default();
        Self {
            level,
            state: GameState::new(0, 0, 0),
            room,
        }
    }

    /// Install a level blob. A blob that fails validation is refused and the
    /// current level, state and room stay as they were. On success flags and
    /// vars reset, the inventory is kept, and the start room is loaded.
    pub fn install(&mut self, blob: &'a [u8]) -> Result<(), BlobError> {
        let level = LevelReader::new(blob)
            .and_then(|r| r.check_integrity().map(|()| r))
            .inspect_err(|e| log::warn!("level install refused: {e}"))?;
        let start = level.start_room();
        let room = RoomState::load(&level, start, level.start_spawn())
            .ok_or(BlobError::NoStartRoom { room: start })?;
        self.state
            .reset_for_level(level.flag_count(), level.var_count(), level.item_count());
        self.level = level;
        self.room = room;
        Ok(())
    }

    pub fn level(&self) -> &LevelReader<'a> {
        &self.level
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn room(&self) -> &RoomState {
        &self.room
    }

    /// Switch to `room`, entering at `spawn`. Unknown rooms are ignored.
    pub fn load_room(&mut self, room: u8, spawn: u8) -> bool {
        match RoomState::load(&self.level, room, spawn) {
            Some(r) => {
                self.room = r;
                true
            }
            None => {
                log::warn!("transition to missing room {room} ignored");
                false
            }
        }
    }

    pub fn spawn_point(&self) -> Spawn {
        self.room.spawn_point(&self.level)
    }

    pub fn message(&self, id: u8) -> &'a str {
        self.level.message(id)
    }

    pub fn object(&self, idx: u8) -> Option<ObjectRecord> {
        self.room.object(&self.level, idx)
    }

    pub fn check_condition(&self, offset: StreamOffset) -> bool {
        interp::conditions_pass(&self.level, &self.state, offset)
    }

    /// Run an action script, then apply any transition it requested.
    pub fn run_action(&mut self, offset: StreamOffset, host: &mut dyn ScriptHost) -> ActionReport {
        let mut report = interp::run_actions(&self.level, &mut self.state, offset, host);
        if let Some(t) = report.transition {
            if !self.load_room(t.room, t.spawn) {
                report.transition = None;
            }
        }
        report
    }

    /// Route `interaction` on object `idx` of the current room to a script.
    pub fn interact(
        &mut self,
        idx: u8,
        interaction: Interaction,
        host: &mut dyn ScriptHost,
    ) -> Outcome {
        let Some(obj) = self.object(idx) else {
            return Outcome::NoObject;
        };
        if !obj.verbs.contains(interaction.verb()) {
            return Outcome::VerbRejected;
        }
        if !self.check_condition(obj.condition()) {
            return Outcome::Blocked;
        }

        let slot = self.route(&obj, interaction);
        let offset = obj.slot(slot);
        log::debug!("object {idx} {interaction:?} -> {slot:?} {offset}");
        let report = self.run_action(offset, host);
        Outcome::Ran(Dispatch {
            slot,
            offset,
            executed: report.executed,
            transition: report.transition,
        })
    }

    /// Pick the slot to run, applying any built-in effect of the object kind.
    fn route(&mut self, obj: &ObjectRecord, interaction: Interaction) -> ScriptSlot {
        let plain = ScriptSlot::for_verb(interaction.verb()).unwrap_or(ScriptSlot::Use);
        match (obj.kind(), interaction) {
            (Some(ObjectKind::LockerKeypad), Interaction::EnterCode(code)) => {
                if code == keypad_code(obj.p0, obj.p1) {
                    ScriptSlot::Alt0
                } else {
                    ScriptSlot::Alt1
                }
            }
            (Some(ObjectKind::BreakerPanel), Interaction::ToggleSwitch(bit)) => {
                if bit < BREAKER_SWITCHES {
                    let v = self.state.vars.get(obj.p0) ^ (1u8 << bit);
                    self.state.vars.set(obj.p0, v);
                } else {
                    log::warn!("breaker switch {bit} does not exist");
                }
                ScriptSlot::Operate
            }
            (Some(ObjectKind::BreakerPanel), Interaction::Operate) => {
                if self.state.vars.get(obj.p0) == obj.p1 {
                    ScriptSlot::Alt0
                } else {
                    ScriptSlot::Alt1
                }
            }
            (Some(ObjectKind::HatchPanel), Interaction::UseItem(item)) => {
                let held = self.state.has_item(item);
                if held && item == obj.p0 {
                    ScriptSlot::Alt0
                } else if held && item == obj.p1 {
                    ScriptSlot::Alt1
                } else {
                    ScriptSlot::Use
                }
            }
            (Some(ObjectKind::Pickup), Interaction::Take) => {
                self.state.give(obj.p0);
                ScriptSlot::Take
            }
            _ => plain,
        }
    }

    /// Tile id at `x,y` of the current room, 0 outside the map.
    pub fn tile_at(&self, x: u8, y: u8) -> u8 {
        self.room.tile(&self.level, x, y)
    }

    pub fn exit_for(&self, edge: ExitEdge) -> Option<Exit> {
        self.room.exit_for(&self.level, edge)
    }

    /// Leave through the first exit on `edge`, if there is one.
    pub fn take_exit(&mut self, edge: ExitEdge) -> bool {
        match self.exit_for(edge) {
            Some(exit) => self.load_room(exit.room, exit.spawn),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::DEFAULT_LEVEL;

    #[test]
    fn starts_on_default_level() {
        let rt = Runtime::new();
        assert!(rt.level().is_default());
        assert_eq!(rt.room().id, 0);
        assert_eq!(rt.tile_at(0, 0), 0);
        assert_eq!(rt.tile_at(3, 3), 0);
        assert_eq!(rt.exit_for(ExitEdge::Up), None);
    }

    #[test]
    fn invalid_install_keeps_everything() {
        let mut rt = Runtime::new();
        let before = *rt.room();
        assert!(rt.install(b"not a level").is_err());
        assert!(rt.level().is_default());
        assert_eq!(rt.room(), &before);

        let mut bad_start = DEFAULT_LEVEL;
        bad_start[12] = 4;
        assert_eq!(
            rt.install(&bad_start).unwrap_err(),
            BlobError::NoStartRoom { room: 4 }
        );
    }

    #[test]
    fn interact_with_missing_object() {
        let mut rt = Runtime::new();
        assert_eq!(rt.interact(0, Interaction::Look, &mut ()), Outcome::NoObject);
    }

    #[test]
    fn interaction_verbs() {
        assert_eq!(Interaction::EnterCode(1).verb(), Verbs::USE);
        assert_eq!(Interaction::ToggleSwitch(0).verb(), Verbs::OPERATE);
        assert_eq!(Interaction::UseItem(0).verb(), Verbs::USE);
        assert_eq!(Interaction::Talk.verb(), Verbs::TALK);
    }
}
