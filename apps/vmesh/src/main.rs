//! vmesh — mesh to voxel grid to sparse voxel octree/SVDAG CLI.
//!
//! ## Usage
//!
//! ```text
//! vmesh [OPTIONS] INPUT OUTPUT
//! ```
//!
//! ## Options
//!
//! - `-h, --help`: print this message and exit 0
//! - `-v, --verbose`: raise the log level to `debug`
//! - `-C, --compressed`: write a run-compressed voxel grid instead of byte-packed
//! - `-S, --svdag`: produce a sparse octree file instead of a voxel grid
//! - `-R, --resolution N`: grid side length (default 128); must be a power of
//!   two when `-S` is set
//! - `-L, --subdivision-level K`: tile level, `0 <= K <= log2(R)`; only valid
//!   with `-S` or `--voxel-to-svdag`
//! - `--scale-mode {proportional,stretch,none}`: mesh-fit mode (default
//!   `proportional`)
//! - `--voxel-to-svdag`: treat INPUT as a byte-packed voxel grid file instead
//!   of a mesh, and always emit an octree file
//! - `--DDA`: use the DDA voxelizer instead of the default SAT rasterizer
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: overrides the log level `-v` would otherwise set.

mod mesh_loader;
mod progress;

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use tracing::info;
use vmesh_core::{Error, MeshSource, Result, ScaleMode};
use vmesh_voxel::{
    build_tiled_octree, build_tiled_octree_from_grid, emit_indices, write_octree_file, VoxelGrid, VoxelizeAlgorithm,
};

use mesh_loader::ObjMesh;
use progress::{println_locked, shared_stdout, ProgressReporter};

struct Cli {
    input: PathBuf,
    output: PathBuf,
    verbose: bool,
    compressed: bool,
    svdag: bool,
    resolution: u32,
    subdivision_level: u32,
    scale_mode: ScaleMode,
    voxel_to_svdag: bool,
    dda: bool,
}

impl Cli {
    fn parse(args: &[String]) -> Result<Self> {
        let mut verbose = false;
        let mut compressed = false;
        let mut svdag = false;
        let mut resolution: u32 = 128;
        let mut subdivision_level: u32 = 0;
        let mut scale_mode = ScaleMode::default();
        let mut voxel_to_svdag = false;
        let mut dda = false;
        let mut positional = Vec::new();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "-h" | "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "-v" | "--verbose" => verbose = true,
                "-C" | "--compressed" => compressed = true,
                "-S" | "--svdag" => svdag = true,
                "--voxel-to-svdag" => voxel_to_svdag = true,
                "--DDA" => dda = true,
                "-R" | "--resolution" => {
                    i += 1;
                    let raw = args.get(i).ok_or_else(|| Error::ArgInvalid(format!("{} requires a value", args[i - 1])))?;
                    resolution = raw
                        .parse()
                        .map_err(|_| Error::ArgInvalid(format!("invalid resolution '{raw}'")))?;
                }
                "-L" | "--subdivision-level" => {
                    i += 1;
                    let raw = args.get(i).ok_or_else(|| Error::ArgInvalid(format!("{} requires a value", args[i - 1])))?;
                    subdivision_level = raw
                        .parse()
                        .map_err(|_| Error::ArgInvalid(format!("invalid subdivision level '{raw}'")))?;
                }
                "--scale-mode" => {
                    i += 1;
                    let raw = args.get(i).ok_or_else(|| Error::ArgInvalid("--scale-mode requires a value".into()))?;
                    scale_mode = ScaleMode::parse(raw)?;
                }
                other if other.starts_with('-') => {
                    return Err(Error::ArgInvalid(format!("unknown flag '{other}'")));
                }
                other => positional.push(other.to_string()),
            }
            i += 1;
        }

        if positional.len() != 2 {
            return Err(Error::ArgInvalid(format!(
                "expected INPUT and OUTPUT, got {} positional argument(s)",
                positional.len()
            )));
        }

        if subdivision_level > 0 && !svdag && !voxel_to_svdag {
            return Err(Error::ArgInvalid("-L is only valid with -S or --voxel-to-svdag".into()));
        }

        // `--voxel-to-svdag` reads its resolution from the input file's
        // header, not from `-R`, so the `R`-dependent checks below only
        // apply to the mesh-voxelization path; `run_voxel_to_svdag` repeats
        // them against the loaded grid's actual resolution once known.
        if svdag {
            if !resolution.is_power_of_two() {
                return Err(Error::ArgInvalid(format!("resolution {resolution} is not a power of two, required with -S")));
            }
            let max_level = resolution.trailing_zeros();
            if subdivision_level > max_level {
                return Err(Error::ArgInvalid(format!(
                    "subdivision level {subdivision_level} exceeds log2(resolution) = {max_level}"
                )));
            }
        }

        Ok(Self {
            input: PathBuf::from(&positional[0]),
            output: PathBuf::from(&positional[1]),
            verbose,
            compressed,
            svdag,
            resolution,
            subdivision_level,
            scale_mode,
            voxel_to_svdag,
            dda,
        })
    }
}

fn print_help() {
    println!(
        "vmesh - mesh to voxel grid to sparse voxel octree/SVDAG

USAGE:
    vmesh [OPTIONS] INPUT OUTPUT

OPTIONS:
    -h, --help                         Print this message and exit
    -v, --verbose                      Verbose log output
    -C, --compressed                   Write run-compressed voxel grid instead of byte-packed
    -S, --svdag                        Produce a sparse octree file instead of a voxel grid
    -R, --resolution N                 Grid side length (default 128); must be a power of two with -S
    -L, --subdivision-level K          Tile level, 0 <= K <= log2(R); requires -S or --voxel-to-svdag
    --scale-mode <MODE>                proportional (default), stretch, or none
    --voxel-to-svdag                   Read INPUT as a voxel grid file, write an octree file
    --DDA                              Use the DDA voxelizer instead of SAT

ENVIRONMENT VARIABLES:
    RUST_LOG                           Overrides the log level -v would otherwise set"
    );
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let cli = match Cli::parse(&args) {
        Ok(cli) => cli,
        Err(e) => {
            println!("{e}");
            std::process::exit(1);
        }
    };

    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        println!("{e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let stdout = shared_stdout();

    if cli.voxel_to_svdag {
        return run_voxel_to_svdag(&cli, &stdout);
    }

    let algorithm = if cli.dda { VoxelizeAlgorithm::Dda } else { VoxelizeAlgorithm::Sat };

    println_locked(&stdout, &format!("Loading mesh {}", cli.input.display()));
    let mesh = ObjMesh::load(&cli.input)?;

    let transform = vmesh_core::fit_transform(mesh.vertices(), mesh.indices(), cli.resolution, cli.scale_mode)
        .ok_or_else(|| Error::InputParse("mesh has no triangles to fit".into()))?;
    let transformed_vertices: Vec<_> = mesh.vertices().iter().map(|&v| transform.apply(v)).collect();
    let transformed = TransformedMesh {
        vertices: transformed_vertices,
        indices: mesh.indices().to_vec(),
    };

    let tri_count = transformed.indices().len() as u64 / 3;
    let (progress, _reporter) = ProgressReporter::start("Voxelizing", tri_count.max(1), stdout.clone());

    if cli.svdag {
        let tree = build_tiled_octree(&transformed, cli.resolution, cli.subdivision_level, algorithm, &progress);
        progress.store(tri_count, Ordering::Relaxed);
        drop(_reporter);

        println_locked(&stdout, "Emitting index array");
        let indices = emit_indices(&tree);

        println_locked(&stdout, &format!("Writing {}", cli.output.display()));
        write_octree_output(&cli.output, cli.resolution, &indices)?;
    } else {
        let mut grid = VoxelGrid::new(cli.resolution);
        grid.voxelize_mesh(&transformed, algorithm, &progress);
        progress.store(tri_count, Ordering::Relaxed);
        drop(_reporter);

        println_locked(&stdout, &format!("Writing {}", cli.output.display()));
        write_grid_output(&cli.output, &grid, cli.compressed)?;
    }

    println_locked(&stdout, "Done");
    Ok(())
}

fn run_voxel_to_svdag(cli: &Cli, stdout: &progress::Stdout) -> Result<()> {
    println_locked(stdout, &format!("Loading voxel grid {}", cli.input.display()));
    let file = std::fs::File::open(&cli.input).map_err(|source| Error::IoOpen {
        path: cli.input.display().to_string(),
        source,
    })?;
    let grid = VoxelGrid::load_from_file(std::io::BufReader::new(file))?;

    let resolution = grid.resolution();
    if !resolution.is_power_of_two() {
        return Err(Error::ArgInvalid(format!(
            "voxel file resolution {resolution} is not a power of two, required to build an octree"
        )));
    }
    let max_level = resolution.trailing_zeros();
    if cli.subdivision_level > max_level {
        return Err(Error::ArgInvalid(format!(
            "subdivision level {} exceeds log2(resolution) = {max_level}",
            cli.subdivision_level
        )));
    }

    let total = (grid.resolution() as u64).pow(3).max(1);
    let (progress, reporter) = ProgressReporter::start("Building octree", total, stdout.clone());
    let tree = build_tiled_octree_from_grid(&grid, cli.subdivision_level, &progress);
    progress.store(total, Ordering::Relaxed);
    drop(reporter);

    println_locked(stdout, "Emitting index array");
    let indices = emit_indices(&tree);

    println_locked(stdout, &format!("Writing {}", cli.output.display()));
    write_octree_output(&cli.output, grid.resolution(), &indices)?;

    println_locked(stdout, "Done");
    info!(records = indices.len(), "octree written");
    Ok(())
}

fn write_grid_output(path: &std::path::Path, grid: &VoxelGrid, compressed: bool) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|source| Error::IoOpen {
        path: path.display().to_string(),
        source,
    })?;
    let mut writer = std::io::BufWriter::new(file);
    if compressed {
        grid.write_to_file_compressed(&mut writer)?;
    } else {
        grid.write_to_file(&mut writer)?;
    }
    Ok(())
}

fn write_octree_output(path: &std::path::Path, resolution: u32, indices: &[[u32; 8]]) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|source| Error::IoOpen {
        path: path.display().to_string(),
        source,
    })?;
    let mut writer = std::io::BufWriter::new(file);
    write_octree_file(&mut writer, resolution, indices)?;
    Ok(())
}

/// A mesh whose vertices have already been fit into `[0, R-1]`.
struct TransformedMesh {
    vertices: Vec<glam::Vec3>,
    indices: Vec<u32>,
}

impl MeshSource for TransformedMesh {
    fn vertices(&self) -> &[glam::Vec3] {
        &self.vertices
    }

    fn indices(&self) -> &[u32] {
        &self.indices
    }
}
