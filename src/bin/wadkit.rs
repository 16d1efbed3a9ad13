//! wadkit - inspect and extract Doom 64 data files.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::error;

use wadkit::assets::{self, NoPicker};
use wadkit::config::AssetConfig;
use wadkit::container::LoaderRegistry;
use wadkit::formats::n64rom::Window;
use wadkit::image::{CodecRegistry, ImageFormat};
use wadkit::namespace::{Namespace, NamespaceBuilder};
use wadkit::{Error, Result};

#[derive(Parser)]
#[command(name = "wadkit")]
#[command(about = "Doom 64 data file tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List merged resources; later files override earlier ones
    Ls {
        /// WAD, PK3 or ROM files, in priority order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Write one resource to a file
    Extract {
        /// WAD, PK3 or ROM files, in priority order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Resource name
        #[arg(short, long)]
        name: String,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,

        /// Decode the resource as an image and write a PNG
        #[arg(long)]
        png: bool,

        /// Palette number for indexed images
        #[arg(long, requires = "png")]
        palette: Option<usize>,
    },

    /// Dump one data window of a cartridge image
    Rom {
        /// Cartridge image
        file: PathBuf,

        #[arg(short, long, value_enum)]
        window: WindowArg,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Run startup discovery and report what was loaded
    Load {
        /// Config file
        #[arg(short, long, default_value = "wadkit.toml")]
        config: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum WindowArg {
    Iwad,
    Driver,
    Sequences,
    Pcm,
}

impl From<WindowArg> for Window {
    fn from(w: WindowArg) -> Self {
        match w {
            WindowArg::Iwad => Window::PrimaryData,
            WindowArg::Driver => Window::SoundDriver,
            WindowArg::Sequences => Window::SequenceData,
            WindowArg::Pcm => Window::PcmAudio,
        }
    }
}

fn merge(files: &[PathBuf]) -> Result<Namespace> {
    let mut builder = NamespaceBuilder::new();
    for container in LoaderRegistry::default().open_all(files) {
        builder.add(container?);
    }
    Ok(builder.build())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ls { files } => {
            let ns = merge(&files)?;
            for (name, lump) in ns.resolved() {
                let Some(entry) = ns.entry(lump) else { continue };
                let origin = ns
                    .container(lump.container)
                    .map(|c| c.path().display().to_string())
                    .unwrap_or_default();
                let size = entry.size().map_or_else(|| "map".to_string(), |s| s.to_string());
                println!("{name:<8} {:<9} {size:>9}  {origin}", format!("{:?}", entry.section));
            }
        }
        Commands::Extract {
            files,
            name,
            out,
            png,
            palette,
        } => {
            let ns = merge(&files)?;
            if png {
                let codecs = CodecRegistry::default();
                let (image, resolution) = codecs.decode_lump(&ns, &name, palette)?;
                let mut file = fs::File::create(&out)?;
                codecs.encode(ImageFormat::Png, &mut file, &image)?;
                println!("{name}: {}x{} ({resolution:?})", image.width(), image.height());
            } else {
                fs::write(&out, ns.read_bytes(&name)?)?;
            }
        }
        Commands::Rom { file, window, out } => {
            let container = LoaderRegistry::default().open(&file)?;
            let rom = container.as_rom().ok_or(Error::RomHeaderUnrecognized)?;
            println!("{} (byte swap: {})", rom.label(), rom.byte_swap());
            fs::write(&out, rom.extract(window.into())?.into_inner())?;
        }
        Commands::Load { config } => {
            let config = AssetConfig::load(&config)?;
            let ns = assets::load(&config, &config.search_paths(), &NoPicker)?;
            for c in ns.containers() {
                println!("{:<5} {}", c.format().name(), c.path().display());
            }
            println!("{} resources, {} textures", ns.len(), ns.known_textures().len());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
