pub mod artifacts;
pub mod driver;
pub mod error;
pub mod layout;
pub mod level;
pub mod level_parser;
pub mod script;
pub mod source;
pub mod stamp;
pub mod tileset;

pub use artifacts::{Artifact, level_artifacts, level_ids, level_sym, tileset_artifacts, tileset_sym, write_all};
pub use driver::{BuildOptions, artifact_stem, build, compile_level_file, compile_tileset_file};
pub use error::{CompileError, Diagnostic, Diagnostics, ErrorKind};
pub use level::{CompiledLevel, LevelDebug, compile_level};
pub use stamp::Stamp;
pub use tileset::{CompiledTileset, TileDef, TilesetHeader, compile_tileset};
