
use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use scope_recorder::capture::set_points_mode;
use scope_recorder::clock::SystemClock;
use scope_recorder::config::RecorderConfig;
use scope_recorder::devices::ds1000e::{self, Identity};
use scope_recorder::instrument::discovery::{list_resources, select_single};
use scope_recorder::instrument::vxi11::Vxi11Instrument;
use scope_recorder::instrument::Instrument;
use scope_recorder::persistence::DirectoryStore;
use scope_recorder::scheduler::AcquisitionScheduler;
use scope_recorder::shutdown::interrupt_flag;
use scope_recorder::{RecorderError, RecorderResult};

#[derive(Parser)]
#[command(name = "scope_recorder")]
#[command(about = "Record oscilloscope waveforms and settings once per second", long_about = None)]
struct Cli {
	/// TOML config file (defaults to ./scope_recorder.toml when present)
	#[arg(long, short)]
	config: Option<PathBuf>,

	/// Directory for waveform and metadata files
	#[arg(long)]
	output_dir: Option<PathBuf>,

	/// Instrument resource string; repeat to list several candidates
	#[arg(long)]
	resource: Vec<String>,

	/// Log at debug level unless RUST_LOG says otherwise
	#[arg(long, short)]
	verbose: bool,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
	/// Capture every configured channel once per second until interrupted (default)
	Record,

	/// Capture one channel once and exit
	Preview {
		#[arg(long, default_value_t = 1)]
		channel: u8,
	},

	/// Show the candidate instruments and whether they pass the filter
	List,
}

fn init_tracing(verbose:bool) {
	let default = if verbose { "debug" } else { "info" };
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
		.with_writer(std::io::stderr)
		.init();
}

fn load_config(cli:&Cli) -> RecorderResult<RecorderConfig> {
	let mut config = RecorderConfig::load(cli.config.as_deref())?;
	if let Some(dir) = &cli.output_dir { config.storage.output_dir = dir.clone(); }
	if !cli.resource.is_empty() { config.instrument.resources = cli.resource.clone(); }
	config.validate()?;
	Ok(config)
}

fn candidates(config:&RecorderConfig) -> RecorderResult<Vec<String>> {
	list_resources(&config.instrument.resources, config.instrument.discovery_window())
		.map_err(|e| RecorderError::Enumeration{ filter: format!("{} (discovery failed: {})", config.instrument.resource_filter, e), matched: 0, candidates: vec![] })
}

fn open_instrument(config:&RecorderConfig) -> RecorderResult<Vxi11Instrument> {
	let found:Vec<String> = candidates(config)?;
	let resource = match select_single(&found, &config.instrument.filter()?) {
		Ok(r) => r,
		Err(e) => {
			println!("Bad instrument list {:?}", found);
			return Err(e);
		}
	};

	let mut instrument = Vxi11Instrument::open(&resource, config.instrument.timeout(), config.instrument.chunk_size)
		.map_err(|e| RecorderError::communication(format!("opening {}", resource), e))?;

	let idn:String = instrument.query(ds1000e::IDN).map_err(|e| RecorderError::communication("identifying the instrument", e))?;
	println!("Device in use:");
	println!("{}", idn);
	if let Ok(id) = Identity::parse(&idn) {
		info!(manufacturer = %id.manufacturer, model = %id.model, serial = %id.serial_num, firmware = %id.fw_version, "instrument identified");
	}

	if let Some(mode) = config.acquisition.points_mode.as_deref().filter(|m| !m.is_empty()) {
		set_points_mode(&mut instrument, mode).map_err(|e| RecorderError::communication("setting the waveform points mode", e))?;
	}

	Ok(instrument)
}

fn record(config:&RecorderConfig) -> RecorderResult<()> {
	// Installed first so an interrupt during discovery or link setup still ends in an orderly close
	let shutdown = interrupt_flag().map_err(|e| RecorderError::Config(format!("unable to install interrupt handler: {}", e)))?;
	let instrument = open_instrument(config)?;
	let store = DirectoryStore::open(&config.storage.output_dir)?;

	let mut scheduler = AcquisitionScheduler::new(instrument, store, SystemClock, &config.acquisition, shutdown);
	let summary = scheduler.run()?;
	info!(cycles = summary.cycles, last = %summary.last_second_recorded, "recording finished");
	Ok(())
}

fn preview(config:&RecorderConfig, channel:u8) -> RecorderResult<()> {
	ds1000e::chan_ok(channel).map_err(|e| RecorderError::Config(e.to_string()))?;

	let mut acquisition = config.acquisition.clone();
	acquisition.channels = vec![channel];

	let instrument = open_instrument(config)?;
	let store = DirectoryStore::open(&config.storage.output_dir)?;
	let mut scheduler = AcquisitionScheduler::new(instrument, store, SystemClock, &acquisition, Arc::new(AtomicBool::new(false)));

	let report = scheduler.capture_once();
	scheduler.close();
	let report = report?;

	for (ch, bytes) in &report.bytes_per_channel {
		println!("Channel {} data size: {} Sample rate: {}", ch, bytes, report.metadata.samplerate);
	}
	Ok(())
}

fn list(config:&RecorderConfig) -> RecorderResult<()> {
	let filter = config.instrument.filter()?;
	for candidate in candidates(config)? {
		let verdict = if filter.is_match(&candidate) { "match" } else { "filtered out" };
		println!("{}\t{}", candidate, verdict);
	}
	Ok(())
}

fn main() {
	let cli = Cli::parse();
	init_tracing(cli.verbose);

	let result = load_config(&cli).and_then(|config| match cli.command {
		None | Some(Command::Record)    => record(&config),
		Some(Command::Preview{ channel }) => preview(&config, channel),
		Some(Command::List)             => list(&config),
	});

	if let Err(e) = result {
		error!(error = %e, "fatal");
		eprintln!("{}", e);
		process::exit(e.exit_code());
	}
}
