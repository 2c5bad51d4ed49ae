
use tracing::{debug, warn};

use crate::clock::CaptureSecond;
use crate::devices::ds1000e;
use crate::instrument::{Instrument, InstrumentResult};

#[derive(Debug, Clone, PartialEq)]
pub struct WaveformRecord {
	pub channel: u8,
	pub second: CaptureSecond,
	pub raw: Vec<u8>,
}

// The waveform buffer is only stable while acquisition is stopped, so the transfer is bracketed by STOP and RUN.
// The bytes are kept as received, block header and all.
pub fn capture_waveform<I: Instrument + ?Sized>(instrument:&mut I, channel:u8, second:CaptureSecond) -> InstrumentResult<WaveformRecord> {
	ds1000e::chan_ok(channel)?;

	instrument.write_command(ds1000e::STOP)?;

	let raw:Vec<u8> = match instrument.query_binary(&ds1000e::waveform_data(channel)) {
		Ok(raw) => raw,
		Err(e) => {
			// Leave the scope acquiring even though this run is over
			if let Err(run_err) = instrument.write_command(ds1000e::RUN) {
				warn!(error = %run_err, "could not resume acquisition after a failed transfer");
			}
			return Err(e);
		}
	};

	instrument.write_command(ds1000e::RUN)?;

	debug!(channel, %second, bytes = raw.len(), "waveform captured");
	Ok(WaveformRecord{ channel, second, raw })
}

pub fn set_points_mode<I: Instrument + ?Sized>(instrument:&mut I, mode:&str) -> InstrumentResult<()> {
	instrument.write_command(&ds1000e::points_mode(mode))
}
