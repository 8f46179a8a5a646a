pub mod color;
pub mod exit_edge;
pub mod format;
pub mod name_error;
pub mod object;
pub mod offset;
pub mod opcode;
pub mod tile_flags;
pub mod verbs;

pub use color::Color;
pub use exit_edge::ExitEdge;
pub use name_error::UnknownName;
pub use object::{
    ObjectKind, ObjectSchema, ParamBinding, ParamEncoding, ParamSlot, ScriptBinding, ScriptSlot,
    keypad_code, schema_markdown, split_keypad_code,
};
pub use offset::{BlobOffset, StreamOffset};
pub use opcode::{ActOp, CondOp};
pub use tile_flags::TileFlags;
pub use verbs::Verbs;
