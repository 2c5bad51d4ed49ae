// Recorder configuration: defaults, then an optional TOML file, then environment variables prefixed
// `SCOPE_RECORDER_` with `__` separating sections (`SCOPE_RECORDER_ACQUISITION__TRIGGER_OFFSET_MS=400`).
// Command-line flags are applied on top by the binary. See scope_recorder.example.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::devices::ds1000e;
use crate::error::{RecorderError, RecorderResult};

pub const DEFAULT_CONFIG_FILE:&str = "scope_recorder.toml";
pub const ENV_PREFIX:&str = "SCOPE_RECORDER_";

// Polling coarser than this can miss the window between the trigger offset and the next second
pub const MAX_POLL_INTERVAL_MS:u64 = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
	pub instrument: InstrumentConfig,
	pub acquisition: AcquisitionConfig,
	pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
	// Explicit candidates; broadcast discovery is used when empty
	pub resources: Vec<String>,
	// Regex a candidate must match to be considered
	pub resource_filter: String,
	// Per-call I/O timeout. Long-memory waveform transfers need tens of seconds
	pub timeout_ms: u64,
	// Upper bound on bytes requested per device read
	pub chunk_size: u32,
	pub discovery_window_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
	// Captured in ascending order every second
	pub channels: Vec<u8>,
	// How far into a second a capture may start
	pub trigger_offset_ms: u64,
	pub poll_interval_ms: u64,
	// Waveform points mode written once before the first capture; empty leaves the scope as it is
	pub points_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
	pub output_dir: PathBuf,
}

impl Default for InstrumentConfig {
	fn default() -> Self {
		Self {
			resources: vec![],
			resource_filter: "TCPIP".to_owned(),
			timeout_ms: 20_000,
			chunk_size: 1_024_000,
			discovery_window_ms: 2_000,
		}
	}
}

impl Default for AcquisitionConfig {
	fn default() -> Self {
		Self {
			channels: vec![1, 2],
			trigger_offset_ms: 500,
			poll_interval_ms: 50,
			points_mode: Some("RAW".to_owned()),
		}
	}
}

impl Default for StorageConfig {
	fn default() -> Self { Self{ output_dir: PathBuf::from("data") } }
}

impl InstrumentConfig {
	pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }
	pub fn discovery_window(&self) -> Duration { Duration::from_millis(self.discovery_window_ms) }

	pub fn filter(&self) -> RecorderResult<Regex> {
		Regex::new(&self.resource_filter)
			.map_err(|e| RecorderError::Config(format!("resource_filter {:?} is not a valid regex: {}", self.resource_filter, e)))
	}
}

impl AcquisitionConfig {
	pub fn trigger_offset(&self) -> Duration { Duration::from_millis(self.trigger_offset_ms) }
	pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }
}

impl RecorderConfig {

	// Loads `path` if given, otherwise the default file when it exists, then the environment
	pub fn load(path:Option<&Path>) -> RecorderResult<Self> {
		let file:&Path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
		if path.is_some() && !file.exists() {
			return Err(RecorderError::Config(format!("config file {} does not exist", file.display())));
		}

		let config:RecorderConfig = Figment::from(Serialized::defaults(RecorderConfig::default()))
			.merge(Toml::file(file))
			.merge(Env::prefixed(ENV_PREFIX).split("__"))
			.extract()?;
		Ok(config)
	}

	pub fn validate(&self) -> RecorderResult<()> {
		let bad = |msg:String| Err(RecorderError::Config(msg));

		let acq = &self.acquisition;
		if acq.trigger_offset_ms >= 1000 {
			return bad(format!("trigger_offset_ms must be below 1000, got {}", acq.trigger_offset_ms));
		}
		if acq.poll_interval_ms == 0 || acq.poll_interval_ms > MAX_POLL_INTERVAL_MS {
			return bad(format!("poll_interval_ms must be within 1..={}, got {}", MAX_POLL_INTERVAL_MS, acq.poll_interval_ms));
		}
		if acq.channels.is_empty() {
			return bad("at least one channel must be captured".to_owned());
		}
		if acq.channels.windows(2).any(|w| w[0] >= w[1]) {
			return bad(format!("channels must be strictly ascending without repeats, got {:?}", acq.channels));
		}
		if let Some(ch) = acq.channels.iter().find(|ch| ds1000e::chan_ok(**ch).is_err()) {
			return bad(format!("channel {} is outside 1..={}", ch, ds1000e::CHANNELS));
		}

		let inst = &self.instrument;
		if inst.timeout_ms == 0 {
			return bad("timeout_ms must be positive".to_owned());
		}
		if inst.chunk_size == 0 {
			return bad("chunk_size must be positive".to_owned());
		}
		inst.filter()?;

		Ok(())
	}

}
