mod commands;
mod input;
mod presenter;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::target::TargetArgs;

#[derive(Parser)]
#[command(name = "scenelens")]
#[command(about = "Live scene reconstruction from a running process")]
#[command(version)]
struct Args {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run acquisition and the text presenter until Ctrl+C, Esc or q
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Acquisition rate cap
        #[arg(long, default_value_t = scenelens_core::layout::timing::DEFAULT_TARGET_FPS)]
        fps: u32,

        /// Run acquisition as fast as the target answers
        #[arg(long)]
        no_limit: bool,

        /// Keep only classes whose name contains one of these
        #[arg(long)]
        include: Vec<String>,

        /// Drop classes whose name contains one of these
        #[arg(long)]
        exclude: Vec<String>,

        /// Screen size used for projections, WIDTHxHEIGHT
        #[arg(long, default_value = "1920x1080", value_parser = presenter::parse_screen)]
        screen: (f32, f32),
    },

    /// Build one snapshot and print it as JSON
    Snapshot {
        #[command(flatten)]
        target: TargetArgs,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve one class id through the name table
    Name {
        #[command(flatten)]
        target: TargetArgs,

        /// Class id to resolve
        id: i32,
    },

    /// Dump raw bytes at a remote address
    Hexdump {
        /// Process id of the target
        #[arg(long)]
        pid: i32,

        /// Address in hex (e.g., 0x7f30a1c000)
        #[arg(value_parser = commands::hex_utils::parse_hex_arg)]
        address: u64,

        /// Bytes to dump
        #[arg(short, long, default_value = "256")]
        size: usize,

        /// Show ASCII column
        #[arg(short, long)]
        ascii: bool,
    },

    /// Show how far each pointer chain of a layout resolves
    Status {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Write a default layout file to fill in
    LayoutTemplate {
        /// Output file (.toml or .json)
        #[arg(default_value = "layout.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let directive = if args.verbose {
        "scenelens=debug"
    } else {
        "scenelens=info"
    };
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    match args.command {
        Command::Run {
            target,
            fps,
            no_limit,
            include,
            exclude,
            screen,
        } => commands::run::run(commands::run::RunOptions {
            target,
            fps,
            rate_limited: !no_limit,
            include,
            exclude,
            screen,
        }),
        Command::Snapshot { target, output } => commands::snapshot::run(&target, output.as_deref()),
        Command::Name { target, id } => commands::name::run(&target, id),
        Command::Hexdump {
            pid,
            address,
            size,
            ascii,
        } => commands::hexdump::run(pid, address, size, ascii),
        Command::Status { target } => commands::status::run(&target),
        Command::LayoutTemplate { output } => commands::layout_template::run(&output),
    }
}
