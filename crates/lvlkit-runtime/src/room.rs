//! The currently loaded room: its id, entry spawn and cached section offsets.

use lvlkit_types::ExitEdge;

use crate::level::{Exit, LevelReader, ObjectRecord, RoomEntry, Spawn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoomState {
    pub id: u8,
    /// Spawn the player entered through; reused on re-entry.
    pub spawn: u8,
    pub entry: RoomEntry,
}

impl RoomState {
    /// Look up `room` in `level`. `None` when the room does not exist.
    pub fn load(level: &LevelReader<'_>, room: u8, spawn: u8) -> Option<Self> {
        let entry = level.room(room)?;
        log::debug!("room {room} loaded at spawn {spawn}: {entry:?}");
        Some(Self {
            id: room,
            spawn,
            entry,
        })
    }

    /// Position of the entry spawn, or the first spawn, or the origin.
    pub fn spawn_point(&self, level: &LevelReader<'_>) -> Spawn {
        level
            .spawn(&self.entry, self.spawn)
            .or_else(|| level.spawn(&self.entry, 0))
            .unwrap_or(Spawn { x: 0, y: 0 })
    }

    pub fn tile(&self, level: &LevelReader<'_>, x: u8, y: u8) -> u8 {
        level.tile(&self.entry, x, y)
    }

    pub fn spawns<'a>(&self, level: &LevelReader<'a>) -> impl Iterator<Item = Spawn> + use<'a> {
        let (level, entry) = (*level, self.entry);
        (0..level.spawn_count(&entry)).filter_map(move |i| level.spawn(&entry, i))
    }

    pub fn exits<'a>(&self, level: &LevelReader<'a>) -> impl Iterator<Item = Exit> + use<'a> {
        let (level, entry) = (*level, self.entry);
        (0..level.exit_count(&entry)).filter_map(move |i| level.exit(&entry, i))
    }

    pub fn objects<'a>(&self, level: &LevelReader<'a>) -> impl Iterator<Item = ObjectRecord> + use<'a> {
        let (level, entry) = (*level, self.entry);
        (0..level.object_count(&entry)).filter_map(move |i| level.object(&entry, i))
    }

    pub fn object(&self, level: &LevelReader<'_>, idx: u8) -> Option<ObjectRecord> {
        level.object(&self.entry, idx)
    }

    /// First exit on `edge`.
    pub fn exit_for(&self, level: &LevelReader<'_>, edge: ExitEdge) -> Option<Exit> {
        self.exits(level).find(|e| e.edge == edge)
    }

    /// Index of the object standing at `x,y`.
    pub fn object_at(&self, level: &LevelReader<'_>, x: u8, y: u8) -> Option<u8> {
        self.objects(level)
            .position(|o| o.x == x && o.y == y)
            .map(|i| i as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_room() {
        let level = LevelReader::default();
        let room = RoomState::load(&level, 0, 0).unwrap();
        assert_eq!(room.spawn_point(&level), Spawn { x: 0, y: 0 });
        assert_eq!(room.spawns(&level).count(), 1);
        assert_eq!(room.exits(&level).count(), 0);
        assert_eq!(room.objects(&level).count(), 0);
        assert_eq!(room.exit_for(&level, ExitEdge::Left), None);
        assert_eq!(room.object_at(&level, 0, 0), None);
        assert!(RoomState::load(&level, 1, 0).is_none());
    }

    #[test]
    fn missing_spawn_falls_back_to_first() {
        let level = LevelReader::default();
        let room = RoomState::load(&level, 0, 7).unwrap();
        assert_eq!(room.spawn_point(&level), Spawn { x: 0, y: 0 });
    }
}
