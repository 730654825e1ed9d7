use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "clab")]
#[command(author, version, about = "Provision containerlab nodes", long_about = None)]
pub struct Cli {
    /// Also write debug logs to `clab-debug.log` in the working directory.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Directory holding the per-kind config templates. Overrides
    /// `CLAB_TEMPLATES_DIR`.
    #[arg(long, global = true)]
    pub templates_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create lab directories, stage node files and record launch specs.
    Provision {
        #[arg(short, long)]
        topo: PathBuf,
    },
    /// Run a command in every running container of a lab.
    Exec(ExecArgs),
    /// Publish node ports through mysocket.io tunnels.
    Publish {
        #[arg(short, long)]
        topo: PathBuf,
        /// Short name of the node running mysocketctl.
        #[arg(long, default_value = "mysocketio")]
        via: String,
    },
}

#[derive(Debug, Args)]
pub struct ExecArgs {
    #[arg(short, long, conflicts_with = "name", required_unless_present = "name")]
    pub topo: Option<PathBuf>,

    /// Lab name, when no topology file is at hand.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Label filters: `key=value`, `key!=value` or `key`.
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Command to run, e.g. `ip addr`.
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub cmd: Vec<String>,
}
