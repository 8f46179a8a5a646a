mod config;
mod dump;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use lvlkit_compiler::{
    BuildOptions, artifact_stem, build, compile_level_file, compile_tileset_file, level_artifacts,
    tileset_artifacts, write_all,
};

use crate::config::Settings;

#[derive(Parser, Debug)]
#[command(name = "lvlkit", version, about = "Compile level and tileset sources to binary blobs")]
struct Cli {
    /// Settings file (default: ./lvlkit.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a tileset source
    Tileset {
        input: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Compile one level source
    Level {
        input: PathBuf,
        /// Tileset to compile against instead of the one the level names
        #[arg(long, value_name = "PATH")]
        tset: Option<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Compile a shared tileset and every level; nothing is written unless all succeed
    Build {
        #[arg(long, value_name = "PATH")]
        tset: Option<PathBuf>,
        #[arg(required = true)]
        levels: Vec<PathBuf>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the header, rooms and integrity of a compiled blob
    Dump {
        blob: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the object kind routing table as Markdown
    Schema,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Write only the blobs, without .sym and .json
    #[arg(long)]
    no_debug: bool,
}

impl OutputArgs {
    fn options(&self, settings: &Settings) -> BuildOptions {
        BuildOptions {
            out_dir: self.out_dir.clone().unwrap_or_else(|| settings.out_dir.clone()),
            debug_artifacts: settings.debug_artifacts && !self.no_debug,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).wrap_err("loading settings")?;
    log::debug!("{settings:?}");

    match cli.command {
        Command::Tileset { input, output } => {
            let opts = output.options(&settings);
            let ts = compile_tileset_file(&input)?;
            write_all(&tileset_artifacts(
                &ts,
                &opts.out_dir,
                &artifact_stem(&input),
                opts.debug_artifacts,
            )?)?;
        }
        Command::Level {
            input,
            tset,
            output,
        } => {
            let opts = output.options(&settings);
            let ts = tset.as_deref().map(compile_tileset_file).transpose()?;
            let level = compile_level_file(&input, ts.as_ref())?;
            write_all(&level_artifacts(
                &level,
                &opts.out_dir,
                &artifact_stem(&input),
                opts.debug_artifacts,
            )?)?;
        }
        Command::Build {
            tset,
            levels,
            output,
        } => {
            let opts = output.options(&settings);
            let tset = tset.or(settings.tileset);
            let artifacts = build(tset.as_deref(), &levels, &opts)?;
            write_all(&artifacts)?;
            log::info!("{} artifact(s) in {}", artifacts.len(), opts.out_dir.display());
        }
        Command::Dump { blob, json } => print!("{}", dump_file(&blob, json)?),
        Command::Schema => print!("{}", lvlkit_types::schema_markdown()),
    }
    Ok(())
}

fn dump_file(path: &Path, json: bool) -> Result<String> {
    let blob = std::fs::read(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    dump::dump(&blob, json).wrap_err_with(|| format!("decoding {}", path.display()))
}
