use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

use emmctool::common::config::{self, DocumentedConfig, EmmcConfig};
use emmctool::common::journal::{TransferJournal, TransferRecord};
use emmctool::common::progress::{TransferProgress, create_spinner};
use emmctool::device::{ImageProbe, ImageSession};
use emmctool::emmc::{
    EmmcSession, Operator, Outcome, PartitionTable, Selection, SessionOrchestrator,
};
use emmctool::operator::TerminalOperator;
use emmctool::ui::{self, prelude::*};

/// Extract and provision eMMC partitions over a recovery session
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Config file (defaults to <config dir>/emmctool/emmctool.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding boot0.bin and user.img of the device
    #[arg(long, global = true)]
    device_dir: Option<PathBuf>,

    /// Payload to upload after the handshake
    #[arg(long, global = true)]
    payload: Option<PathBuf>,

    /// Directory extracted images are written to
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect, pick a partition from the menu and dump it
    Run,

    /// Dump one partition without the menu
    Dump {
        /// `system`, `userdata` or a partition name; a partition literally named
        /// `system` or `userdata` needs the `custom:` prefix, e.g. `custom:system`
        selection: String,
        /// Answer yes to every confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Write an image over a partition
    Flash {
        /// Partition name
        partition: String,
        /// Image to write; zero padded to a whole block
        file: PathBuf,
        /// Answer yes to every confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// List the partition table
    Partitions,

    /// Dump the start of the boot region to boot0.bin
    Boot0 {
        /// Number of blocks to read (defaults to boot0_blocks from the config)
        #[arg(long)]
        blocks: Option<u64>,
    },

    /// Config file management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a documented config file with the default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

fn main() {
    let cli = Cli::parse();
    ui::init(cli.output, !cli.no_color);
    ui::set_debug_mode(cli.debug);

    match dispatch(&cli) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            emit(
                Level::Error,
                "error",
                &format!("{} {:#}", char::from(NerdFont::Cross), e),
                None,
            );
            std::process::exit(1);
        }
    }
}

fn dispatch(cli: &Cli) -> Result<i32> {
    match &cli.command {
        Commands::Run => {
            let mut operator = TerminalOperator::new();
            extract(cli, &mut operator).map(|_| 0)
        }
        Commands::Dump { selection, yes } => {
            let selection: Selection = selection.parse()?;
            let mut operator = TerminalOperator::new()
                .with_selection(selection)
                .assume_yes(*yes);
            match extract(cli, &mut operator)? {
                Outcome::PartitionNotFound { .. } => Ok(1),
                _ => Ok(0),
            }
        }
        Commands::Flash {
            partition,
            file,
            yes,
        } => flash(cli, partition, file, *yes).map(|_| 0),
        Commands::Partitions => partitions(cli).map(|_| 0),
        Commands::Boot0 { blocks } => boot0(cli, *blocks).map(|_| 0),
        Commands::Config { command } => config_command(cli, command).map(|_| 0),
    }
}

fn load_settings(cli: &Cli) -> Result<EmmcConfig> {
    let (mut config, path) = config::load_config(cli.config.as_deref())?;
    emit(
        Level::Debug,
        "config.loaded",
        &format!("Using config {}", path.display()),
        None,
    );
    if let Some(payload) = &cli.payload {
        config.payload_path = payload.clone();
    }
    if let Some(dir) = &cli.out_dir {
        config.output_dir = dir.clone();
    }
    Ok(config)
}

fn open_probe(cli: &Cli) -> Result<ImageProbe> {
    let dir = cli
        .device_dir
        .as_ref()
        .context("no device given: pass --device-dir <DIR> containing boot0.bin and user.img")?;
    Ok(ImageProbe::new(dir))
}

fn ensure_output_dir(config: &EmmcConfig) -> Result<()> {
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "creating output directory {}",
            config.output_dir.display()
        )
    })
}

/// Handshake with a spinner running while the device is awaited.
fn connect<O: Operator>(
    orchestrator: &mut SessionOrchestrator<'_, O>,
    probe: &mut ImageProbe,
) -> Result<EmmcSession<ImageSession>> {
    emit(
        Level::Info,
        "connect.prepare",
        &format!(
            "{} Power off the device and plug it in while holding the boot key",
            char::from(NerdFont::Info)
        ),
        None,
    );
    let spinner = matches!(get_output_format(), OutputFormat::Text)
        .then(|| create_spinner("Waiting for device...".to_string()));
    let result = orchestrator.connect(probe);
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    Ok(result.context("establishing device session")?)
}

fn journal(record: TransferRecord) -> Result<()> {
    if !ui::is_debug_enabled() {
        return Ok(());
    }
    TransferJournal::new()?.record(&record)
}

fn extract(cli: &Cli, operator: &mut TerminalOperator) -> Result<Outcome> {
    let config = load_settings(cli)?;
    let mut probe = open_probe(cli)?;
    ensure_output_dir(&config)?;

    let payload = config.read_payload()?;
    let mut orchestrator = SessionOrchestrator::new(config.orchestrator_config(payload), operator);
    let mut session = connect(&mut orchestrator, &mut probe)?;

    let mut progress = TransferProgress::new();
    let outcome = orchestrator.run_session(&mut session, &mut progress)?;
    progress.finish();

    if let Outcome::Dumped { partition, report } = &outcome {
        journal(TransferRecord::dump(partition, report))?;
    }
    Ok(outcome)
}

/// Connect and decode; `None` when the operator stops at the partition table warning.
fn open_table<O: Operator>(
    orchestrator: &mut SessionOrchestrator<'_, O>,
    probe: &mut ImageProbe,
) -> Result<Option<(EmmcSession<ImageSession>, PartitionTable)>> {
    let mut session = connect(orchestrator, probe)?;
    let table = orchestrator.read_partition_table(&mut session)?;
    Ok(table.map(|table| (session, table)))
}

fn flash(cli: &Cli, partition: &str, file: &Path, yes: bool) -> Result<()> {
    let config = load_settings(cli)?;
    let mut probe = open_probe(cli)?;
    if !file.is_file() {
        anyhow::bail!("image {} does not exist", file.display());
    }

    let payload = config.read_payload()?;
    let mut operator = TerminalOperator::new().assume_yes(yes);
    let mut orchestrator =
        SessionOrchestrator::new(config.orchestrator_config(payload), &mut operator);
    let Some((mut session, table)) = open_table(&mut orchestrator, &mut probe)? else {
        return Ok(());
    };

    let mut progress = TransferProgress::new();
    let blocks = orchestrator.provision(&mut session, &table, partition, file, &mut progress)?;
    progress.finish();

    if let Some(entry) = table.get(partition) {
        journal(TransferRecord::flash(
            partition,
            file.to_path_buf(),
            entry.start_block,
            blocks,
        ))?;
    }
    Ok(())
}

fn partitions(cli: &Cli) -> Result<()> {
    let config = load_settings(cli)?;
    let mut probe = open_probe(cli)?;

    let payload = config.read_payload()?;
    // listing never stops at the missing-partition warning
    let mut operator = TerminalOperator::new().assume_yes(true);
    let mut orchestrator =
        SessionOrchestrator::new(config.orchestrator_config(payload), &mut operator);
    let Some((_, table)) = open_table(&mut orchestrator, &mut probe)? else {
        return Ok(());
    };

    if matches!(get_output_format(), OutputFormat::Json) {
        emit(
            Level::Info,
            "partitions.list",
            &format!("{} partitions", table.len()),
            Some(json!({ "partitions": table.entries() })),
        );
        return Ok(());
    }

    separator();
    println!("{:<16} {:>12} {:>12} {:>14}", "NAME", "START", "BLOCKS", "BYTES");
    for entry in table.entries() {
        println!(
            "{:<16} {:>12} {:>12} {:>14}",
            entry.name,
            format!("{:#x}", entry.start_block),
            format!("{:#x}", entry.block_count),
            entry.byte_len()
        );
    }
    separator();
    Ok(())
}

fn boot0(cli: &Cli, blocks: Option<u64>) -> Result<()> {
    let config = load_settings(cli)?;
    let mut probe = open_probe(cli)?;
    ensure_output_dir(&config)?;
    let blocks = blocks.unwrap_or(config.boot0_blocks);

    let payload = config.read_payload()?;
    let mut operator = TerminalOperator::new();
    let mut orchestrator =
        SessionOrchestrator::new(config.orchestrator_config(payload), &mut operator);
    let mut session = connect(&mut orchestrator, &mut probe)?;

    let mut progress = TransferProgress::new();
    let report = orchestrator.extract_boot0(&mut session, blocks, &mut progress)?;
    progress.finish();

    journal(TransferRecord::dump("boot0", &report))
}

fn config_command(cli: &Cli, command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Init { force } => {
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => EmmcConfig::config_path()?,
            };
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists, pass --force to overwrite it",
                    path.display()
                );
            }
            EmmcConfig::default().save_with_documentation(&path)?;
            emit(
                Level::Success,
                "config.init",
                &format!(
                    "{} Wrote default config to {}",
                    char::from(NerdFont::Check),
                    path.display()
                ),
                Some(json!({ "path": path })),
            );
        }
        ConfigCommands::Show => {
            let (config, path) = config::load_config(cli.config.as_deref())?;
            if matches!(get_output_format(), OutputFormat::Json) {
                emit(
                    Level::Info,
                    "config.show",
                    &path.display().to_string(),
                    Some(json!({ "path": path, "config": config })),
                );
            } else {
                println!("# {}", path.display());
                print!("{}", config.to_documented_string());
            }
        }
    }
    Ok(())
}
