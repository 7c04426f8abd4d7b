use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use topo_core::{
    ChangeConfigError, ChangeOutcome, PipelineConfig, ReconciliationPipeline, TerminalConfirm,
};
use topo_model::TopologyCodec;
use topo_store::{ClusterMetadata, FileMetadataStore, MetadataStore, StoreConfig, StoreError};
use tracing_subscriber::EnvFilter;

const EXIT_CANCELLED: u8 = 2;

fn cli() -> Command {
    Command::new("topoctl")
        .version(topo_core::VERSION)
        .about("Validated, confirmed edits of stored cluster topology")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("storage-dir")
                .long("storage-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Metadata root (default: $TOPOCTL_HOME or ~/.topoctl)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Raise log level (-v debug, -vv trace)"),
        )
        .subcommand(
            Command::new("change-config")
                .about("Replace a cluster's topology with the contents of a file")
                .arg(Arg::new("cluster").required(true).help("Cluster name"))
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Replacement topology (YAML)"),
                )
                .arg(
                    Arg::new("yes")
                        .short('y')
                        .long("yes")
                        .action(ArgAction::SetTrue)
                        .help("Apply without asking for confirmation"),
                ),
        )
        .subcommand(
            Command::new("show-config")
                .about("Print a cluster's stored topology")
                .arg(Arg::new("cluster").required(true).help("Cluster name")),
        )
        .subcommand(
            Command::new("import")
                .about("Create the metadata record of a new cluster")
                .arg(Arg::new("cluster").required(true).help("Cluster name"))
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Initial topology (YAML)"),
                )
                .arg(
                    Arg::new("user")
                        .long("user")
                        .default_value("tidb")
                        .help("Deploy user"),
                )
                .arg(
                    Arg::new("version")
                        .long("version")
                        .default_value("unknown")
                        .help("Cluster version"),
                ),
        )
        .subcommand(Command::new("list").about("List known clusters"))
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"));

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err
                .downcast_ref::<ChangeConfigError>()
                .is_some_and(ChangeConfigError::is_cancellation)
            {
                eprintln!("Operation aborted by user.");
                return ExitCode::from(EXIT_CANCELLED);
            }
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(matches: &ArgMatches) -> Result<()> {
    let storage_dir = matches.get_one::<PathBuf>("storage-dir").map(PathBuf::as_path);
    let store_config =
        StoreConfig::resolve(storage_dir).context("failed to resolve metadata directory")?;
    tracing::debug!(root = %store_config.root.display(), "using metadata store");
    let store = FileMetadataStore::new(store_config);

    match matches.subcommand() {
        Some(("change-config", args)) => change_config(store, args),
        Some(("show-config", args)) => show_config(&store, required(args, "cluster")?),
        Some(("import", args)) => import(&store, args),
        Some(("list", _)) => list(&store),
        _ => unreachable!("clap enforces a subcommand"),
    }
}

fn required<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a String> {
    args.get_one::<String>(id)
        .with_context(|| format!("missing argument <{id}>"))
}

fn required_path<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a Path> {
    args.get_one::<PathBuf>(id)
        .map(PathBuf::as_path)
        .with_context(|| format!("missing argument <{id}>"))
}

fn change_config(store: FileMetadataStore, args: &ArgMatches) -> Result<()> {
    let name = required(args, "cluster")?;
    let file = required_path(args, "file")?;

    let config = PipelineConfig::default()
        .with_color(use_color())
        .with_program_name(program_name());
    let pipeline = ReconciliationPipeline::new(store, TerminalConfirm::new(), config);

    let mut out = io::stdout().lock();
    match pipeline.change_config(name, file, args.get_flag("yes"), &mut out)? {
        ChangeOutcome::NoChange => tracing::debug!(cluster = %name, "no change applied"),
        ChangeOutcome::Applied { revision } => {
            tracing::debug!(cluster = %name, revision, "change applied");
        }
    }
    Ok(())
}

fn show_config(store: &FileMetadataStore, name: &str) -> Result<()> {
    let metadata = match store.load(name) {
        Ok(metadata) => metadata,
        Err(err) => match err.into_recovered() {
            Ok((metadata, reason)) => {
                eprintln!("Warning: stored metadata failed validation: {reason}");
                metadata
            }
            Err(err) => return Err(err).context(format!("failed to load cluster '{name}'")),
        },
    };
    let text = TopologyCodec::new().encode(metadata.topology())?;
    io::stdout().lock().write_all(text.as_bytes())?;
    Ok(())
}

fn import(store: &FileMetadataStore, args: &ArgMatches) -> Result<()> {
    let name = required(args, "cluster")?;
    let file = required_path(args, "file")?;
    let user = required(args, "user")?;
    let version = required(args, "version")?;

    let bytes =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let topology = TopologyCodec::new()
        .decode(&bytes)
        .with_context(|| format!("failed to parse {}", file.display()))?;

    let metadata = ClusterMetadata::new(name.as_str(), user.as_str(), version.as_str(), topology);
    let revision = match store.create(name, &metadata) {
        Ok(revision) => revision,
        Err(StoreError::AlreadyExists(_)) => {
            anyhow::bail!("cluster '{name}' already exists, use change-config to edit it")
        }
        Err(err) => return Err(err.into()),
    };
    tracing::info!(cluster = %name, revision, "imported cluster");
    println!("Imported cluster '{name}' with {} nodes.", metadata.topology().node_count());
    Ok(())
}

fn list(store: &FileMetadataStore) -> Result<()> {
    let mut out = io::stdout().lock();
    for name in store.list()? {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

fn use_color() -> bool {
    io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "topoctl".to_string())
}
