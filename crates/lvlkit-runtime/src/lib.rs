pub mod error;
pub mod interp;
pub mod level;
pub mod room;
pub mod session;
pub mod state;
pub mod tileset;

pub use error::BlobError;
pub use interp::{ActionReport, ScriptHost, Stop, Transition, conditions_pass, run_actions};
pub use level::{DEFAULT_LEVEL, Exit, LevelReader, ObjectRecord, RoomEntry, Spawn};
pub use room::RoomState;
pub use session::{Dispatch, Interaction, Outcome, Runtime};
pub use state::{AddOutcome, FlagBits, GameState, Inventory, VarTable};
pub use tileset::{Charset, TileRecord, TilesetReader};
