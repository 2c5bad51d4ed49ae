
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Deserialize};

use crate::instrument::{InstrumentError, InstrumentResult};

lazy_static! {
	static ref IDN_RE: Regex = Regex::new("([^,]+),([^,]+),([^,]+),([^,\\s]+)").unwrap();
}

pub const CHANNELS:u8 = 2;

pub const IDN:&str = "*IDN?";
pub const STOP:&str = ":STOP";
pub const RUN:&str = ":RUN";

pub const TIMEBASE_SCALE:&str = ":TIM:SCAL?";
pub const TIMEBASE_OFFSET:&str = ":TIM:OFFS?";
pub const SAMPLE_RATE:&str = ":ACQ:SAMP?";

pub fn chan_ok(n:u8) -> InstrumentResult<()> {
	if n == 0 || n > CHANNELS { Err(InstrumentError::InvalidChannel(n)) }
	else { Ok(()) }
}

// One-liners
pub fn waveform_data(chan_num:u8) -> String { format!(":WAV:DATA? CHAN{}", chan_num) }
pub fn voltage_scale(chan_num:u8) -> String { format!(":CHAN{}:SCAL?", chan_num) }
pub fn voltage_offset(chan_num:u8) -> String { format!(":CHAN{}:OFFS?", chan_num) }
pub fn points_mode(mode:&str) -> String { format!(":WAV:POIN:MODE {}", mode) }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
	pub manufacturer: String,
	pub model: String,
	pub serial_num: String,
	pub fw_version: String,
}

impl Identity {

	pub fn parse(idn:&str) -> InstrumentResult<Self> {
		let caps = IDN_RE.captures(idn.trim()).ok_or_else(|| InstrumentError::MalformedReply {
			command: IDN.to_owned(),
			reason: format!("expected four comma-separated fields, got {:?}", idn),
		})?;

		let field = |i:usize| caps.get(i).map(|m| m.as_str().trim().to_owned()).unwrap_or_default();
		Ok(Self{ manufacturer: field(1), model: field(2), serial_num: field(3), fw_version: field(4) })
	}

}
