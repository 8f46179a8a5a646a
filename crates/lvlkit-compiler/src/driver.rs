//! File-level entry points: read sources from disk, resolve companion paths
//! relative to the source file, and turn a set of inputs into artifacts.

use std::path::{Path, PathBuf};

use lvlkit_types::format::tset;

use crate::artifacts::{self, Artifact};
use crate::error::{CompileError, Diagnostics};
use crate::level::{CompiledLevel, compile_level};
use crate::level_parser::declared_tileset;
use crate::tileset::{CompiledTileset, compile_tileset};

fn read_source(path: &Path) -> Result<String, CompileError> {
    std::fs::read_to_string(path).map_err(|source| CompileError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn sibling(of: &Path, rel: &str) -> PathBuf {
    of.parent().unwrap_or_else(|| Path::new("")).join(rel)
}

/// File name stem used for every artifact of a source file.
pub fn artifact_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string())
}

/// Compile a `.tset` file. A `charset=` companion is loaded from the
/// tileset's directory and must be whole 8-byte glyphs, at most 256 of them.
pub fn compile_tileset_file(path: &Path) -> Result<CompiledTileset, CompileError> {
    let file = path.display().to_string();
    let mut ts = compile_tileset(&file, &read_source(path)?)?;
    if let Some(rel) = ts.charset_path.clone() {
        let charset_path = sibling(path, &rel);
        let bytes = std::fs::read(&charset_path).map_err(|source| CompileError::Read {
            path: charset_path.clone(),
            source,
        })?;
        if !tset::charset_len_ok(bytes.len()) {
            let mut diags = Diagnostics::new(file);
            diags.limit(
                0,
                format!(
                    "charset {} is {} bytes; expected a non-zero multiple of {} up to {}",
                    charset_path.display(),
                    bytes.len(),
                    tset::GLYPH_SIZE,
                    tset::MAX_CHARSET_SIZE
                ),
            );
            return Err(CompileError::Invalid(diags));
        }
        log::debug!("charset {} ({} bytes)", charset_path.display(), bytes.len());
        ts.charset = Some(bytes);
    }
    Ok(ts)
}

/// Compile a `.lvl` file against `tileset`, or against the tileset its
/// header names (relative to the level file) when none is given.
pub fn compile_level_file(
    path: &Path,
    tileset: Option<&CompiledTileset>,
) -> Result<CompiledLevel, CompileError> {
    let text = read_source(path)?;
    let file = path.display().to_string();
    if tileset.is_some() {
        return compile_level(&file, &text, tileset);
    }
    match declared_tileset(&text) {
        Some(rel) => {
            let ts = compile_tileset_file(&sibling(path, &rel))?;
            compile_level(&file, &text, Some(&ts))
        }
        None => compile_level(&file, &text, None),
    }
}

/// What a build writes and where.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub out_dir: PathBuf,
    pub debug_artifacts: bool,
}

/// Compile an optional shared tileset and every level, then render all
/// output. Nothing is returned unless every unit compiled.
pub fn build(
    tileset: Option<&Path>,
    levels: &[PathBuf],
    opts: &BuildOptions,
) -> Result<Vec<Artifact>, CompileError> {
    let mut out = Vec::new();
    let mut errors = Vec::new();

    let shared = match tileset.map(compile_tileset_file).transpose() {
        Ok(ts) => ts,
        Err(e) => return Err(CompileError::Build(vec![e])),
    };
    if let (Some(ts), Some(path)) = (&shared, tileset) {
        out.extend(artifacts::tileset_artifacts(
            ts,
            &opts.out_dir,
            &artifact_stem(path),
            opts.debug_artifacts,
        )?);
    }

    for path in levels {
        match compile_level_file(path, shared.as_ref()) {
            Ok(level) => out.extend(artifacts::level_artifacts(
                &level,
                &opts.out_dir,
                &artifact_stem(path),
                opts.debug_artifacts,
            )?),
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(CompileError::Build(errors))
    }
}
