//! CLI settings: built-in defaults, then `lvlkit.toml`, then `LVLKIT_*`
//! environment variables. Command-line flags are applied on top by the caller.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

pub const DEFAULT_FILE: &str = "lvlkit.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Directory artifacts are written to.
    pub out_dir: PathBuf,
    /// Emit `.sym` and `.json` next to each blob.
    pub debug_artifacts: bool,
    /// Shared tileset for `build` when `--tset` is not given.
    pub tileset: Option<PathBuf>,
}

impl Settings {
    /// Load settings. An explicit `file` must exist; the default
    /// `lvlkit.toml` is optional.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match file {
            Some(p) => (p.to_string_lossy().into_owned(), true),
            None => (DEFAULT_FILE.to_string(), false),
        };
        Config::builder()
            .set_default("out_dir", "build")?
            .set_default("debug_artifacts", true)?
            .add_source(File::new(&path, FileFormat::Toml).required(required))
            .add_source(Environment::with_prefix("LVLKIT").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(file, "out_dir = \"dist\"\ntileset = \"assets/boot.tset\"").expect("write");

        let settings = Settings::load(Some(file.path())).expect("settings");
        assert_eq!(settings.out_dir, PathBuf::from("dist"));
        assert!(settings.debug_artifacts);
        assert_eq!(settings.tileset, Some(PathBuf::from("assets/boot.tset")));
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(Settings::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn bad_value_is_an_error() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(file, "debug_artifacts = \"sometimes\"").expect("write");
        assert!(Settings::load(Some(file.path())).is_err());
    }
}
