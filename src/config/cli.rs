use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::domain::model::MapProjection;

#[derive(Debug, Clone, Parser)]
#[command(name = "earthdata-search")]
#[command(about = "Granule search and link resolution against NASA's CMR")]
pub struct CliConfig {
    /// Path to an earthdata.toml file with per-environment overrides
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Environment to target (prod, uat, sit or one defined in the config file)
    #[arg(long, global = true)]
    pub environment: Option<String>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Search granules for the focused collection
    Granules(StateArgs),
    /// Search granules for every collection in the project
    Project(StateArgs),
    /// Resolve download or OPeNDAP links for a retrieval collection
    Links(LinksArgs),
    /// Build the OpenAltimetry handoff link for the focused collection
    Handoff(HandoffArgs),
    /// Print the minimum bounding rectangle of a spatial constraint
    Mbr(MbrArgs),
}

#[derive(Debug, Clone, Args)]
pub struct StateArgs {
    /// JSON snapshot of the search state
    #[arg(long)]
    pub state: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct LinksArgs {
    /// JSON retrieval collection
    #[arg(long)]
    pub retrieval: PathBuf,

    /// Earthdata login token; without it CMR is queried anonymously
    #[arg(long, env = "EDSC_AUTH_TOKEN", default_value = "")]
    pub token: String,
}

#[derive(Debug, Clone, Args)]
pub struct HandoffArgs {
    #[arg(long)]
    pub state: PathBuf,

    #[arg(long, value_enum, default_value_t = ProjectionArg::Geographic)]
    pub projection: ProjectionArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProjectionArg {
    Geographic,
    Arctic,
    Antarctic,
}

impl From<ProjectionArg> for MapProjection {
    fn from(value: ProjectionArg) -> Self {
        match value {
            ProjectionArg::Geographic => MapProjection::Geographic,
            ProjectionArg::Arctic => MapProjection::Arctic,
            ProjectionArg::Antarctic => MapProjection::Antarctic,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct MbrArgs {
    #[arg(long, conflicts_with_all = ["bounding_box", "point", "circle"])]
    pub polygon: Option<String>,

    #[arg(long)]
    pub bounding_box: Option<String>,

    #[arg(long)]
    pub point: Option<String>,

    #[arg(long)]
    pub circle: Option<String>,
}
