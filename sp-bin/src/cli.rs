use clap::Parser;
use std::path::PathBuf;

/// 3D floorplanner: packs rectangular blocks onto a stack of dies with a
/// fixed outline, minimizing wirelength, vertical interconnects and thermal
/// hotspots.
#[derive(Parser, Debug)]
#[clap(author, about)]
pub struct Cli {
    /// Benchmark name; the results and plot file names derive from it.
    pub benchmark: String,

    /// Run configuration (TOML).
    pub config: PathBuf,

    /// Blocks file, one `<id> <w> <h>` per line.
    pub blocks: PathBuf,

    /// Nets file, one `<id> <intra|inter> <block_id>...` per line.
    pub nets: PathBuf,

    /// When given, the final CBLs are serialized to this file.
    pub solution: Option<PathBuf>,

    /// Alignment-requirements file, one
    /// `<id_i> <id_j> <kind_x> <val_x> <kind_y> <val_y>` per line with kinds
    /// in {offset, range, undef}.
    #[clap(long)]
    pub alignments: Option<PathBuf>,
}
