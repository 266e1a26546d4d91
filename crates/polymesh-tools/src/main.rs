//! `meshconv`: convert meshes between OBJ, OFF, PLY and STL, and report
//! what a file contains.
//!
//! ```text
//! meshconv convert bunny.obj bunny.ply --ascii
//! meshconv info -v part.stl
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use polymesh_core::{DataType, Element, Mesh};
use polymesh_io::{
    load_mesh, save_mesh, supported_extensions, LoadSettings, LogProgress, MeshFormat, Result, SaveSettings,
    StlMode,
};

#[derive(Parser)]
#[command(name = "meshconv")]
#[command(about = "Convert polygonal meshes between OBJ, OFF, PLY and STL", long_about = None)]
#[command(version)]
struct Cli {
    /// More output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a mesh and save it in the format of the output extension
    Convert {
        input: PathBuf,
        output: PathBuf,

        #[command(flatten)]
        load: LoadArgs,

        /// Write ASCII PLY or STL instead of binary
        #[arg(long)]
        ascii: bool,

        /// Pack STL colors the Materialise Magics way
        #[arg(long)]
        magics: bool,

        /// Store PLY reals as 32-bit floats
        #[arg(long)]
        float32: bool,

        /// Split polygons into triangles while loading
        #[arg(long)]
        triangulate: bool,
    },

    /// Print the elements and components found in a mesh file
    Info {
        input: PathBuf,

        #[command(flatten)]
        load: LoadArgs,
    },

    /// List the supported file extensions
    Formats,
}

#[derive(clap::Args)]
struct LoadArgs {
    /// Do not enable optional components the file provides
    #[arg(long)]
    no_optional: bool,

    /// Force the STL encoding instead of sniffing it
    #[arg(long, value_enum)]
    stl_mode: Option<StlModeArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StlModeArg {
    Ascii,
    Binary,
}

impl LoadArgs {
    fn settings(&self) -> LoadSettings {
        let mut settings = LoadSettings::default().with_optional_components(!self.no_optional);
        if let Some(mode) = self.stl_mode {
            settings = settings.with_stl_mode(match mode {
                StlModeArg::Ascii => StlMode::Ascii,
                StlModeArg::Binary => StlMode::Binary,
            });
        }
        settings
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            load,
            ascii,
            magics,
            float32,
            triangulate,
        } => {
            let save = SaveSettings::default()
                .with_binary(!ascii)
                .with_magics_mode(magics)
                .with_real_type(if float32 { DataType::Float32 } else { DataType::Float64 });
            convert(&input, &output, &load.settings(), &save, triangulate)
        }
        Commands::Info { input, load } => info(&input, &load.settings()),
        Commands::Formats => {
            println!("{}", supported_extensions().join(" "));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("meshconv: {err}");
            ExitCode::FAILURE
        }
    }
}

fn convert(
    input: &Path,
    output: &Path,
    load: &LoadSettings,
    save: &SaveSettings,
    triangulate: bool,
) -> Result<()> {
    // Fail on the output extension before doing any work.
    MeshFormat::from_path(output)?;

    let mut mesh = if triangulate {
        Mesh::triangle_mesh()
    } else {
        Mesh::polygon_mesh()
    };
    let loaded = load_mesh(input, &mut mesh, load, &mut LogProgress::default())?;
    log::info!("loaded {}", loaded);

    let saved = save_mesh(output, &mesh, &save.clone().with_info(loaded), &mut LogProgress::default())?;
    println!(
        "{} -> {}: {} vertices, {} faces, {} edges",
        input.display(),
        output.display(),
        mesh.live_count(Element::Vertex),
        mesh.live_count(Element::Face),
        mesh.live_count(Element::Edge)
    );
    println!("saved {saved}");
    Ok(())
}

fn info(input: &Path, load: &LoadSettings) -> Result<()> {
    let mut mesh = Mesh::polygon_mesh();
    let loaded = load_mesh(input, &mut mesh, load, &mut LogProgress::default())?;
    println!("{}", input.display());
    for element in Element::ALL {
        if !loaded.has_element(element) {
            continue;
        }
        let components: Vec<&str> = loaded.components(element).map(|c| c.name()).collect();
        let customs: Vec<String> = loaded
            .custom_components(element)
            .iter()
            .map(|c| format!("{}:{:?}", c.name, c.data_type))
            .collect();
        println!(
            "  {:<7}{:>10}  {}{}{}",
            element.name(),
            mesh.live_count(element),
            components.join(" "),
            if customs.is_empty() { "" } else { " " },
            customs.join(" ")
        );
    }
    if !mesh.texture_paths().is_empty() {
        println!("  textures: {}", mesh.texture_paths().join(" "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_convert_arguments() {
        let cli = Cli::try_parse_from([
            "meshconv", "-vv", "convert", "in.obj", "out.stl", "--ascii", "--stl-mode", "binary",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Convert { output, ascii, load, .. } => {
                assert_eq!(output, PathBuf::from("out.stl"));
                assert!(ascii);
                assert_eq!(load.settings().stl_mode, Some(StlMode::Binary));
            }
            _ => panic!("expected convert"),
        }
    }
}
