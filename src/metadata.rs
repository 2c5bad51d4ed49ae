
use serde::{Serialize, Deserialize};

use crate::devices::ds1000e;
use crate::instrument::{query_value, Instrument, InstrumentResult};

// The scope configuration read once per capture second. Reading happens after the waveforms, so turning knobs
// mid-run can make a snapshot disagree with the waveforms of its second; operators must leave the controls alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
	pub timescale: f64,
	pub timeoffset: f64,
	pub voltscale: Vec<f64>,
	pub voltoffset: Vec<f64>,
	pub samplerate: f64,
}

impl MetadataSnapshot {

	// Read-only queries, so acquisition keeps running
	pub fn read<I: Instrument + ?Sized>(instrument:&mut I, channels:&[u8]) -> InstrumentResult<Self> {
		for ch in channels { ds1000e::chan_ok(*ch)?; }

		let timescale:f64  = query_value(instrument, ds1000e::TIMEBASE_SCALE)?;
		let timeoffset:f64 = query_value(instrument, ds1000e::TIMEBASE_OFFSET)?;

		let voltscale = channels.iter()
			.map(|ch| query_value(&mut *instrument, &ds1000e::voltage_scale(*ch)))
			.collect::<InstrumentResult<Vec<f64>>>()?;
		let voltoffset = channels.iter()
			.map(|ch| query_value(&mut *instrument, &ds1000e::voltage_offset(*ch)))
			.collect::<InstrumentResult<Vec<f64>>>()?;

		let samplerate:f64 = query_value(instrument, ds1000e::SAMPLE_RATE)?;

		Ok(Self{ timescale, timeoffset, voltscale, voltoffset, samplerate })
	}

	// Indented and newline-terminated
	pub fn to_json(&self) -> serde_json::Result<String> {
		let mut s = serde_json::to_string_pretty(self)?;
		s.push('\n');
		Ok(s)
	}

}
