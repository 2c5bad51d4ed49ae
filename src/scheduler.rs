// The once-per-second acquisition loop.
//
// Each poll tick asks one question, answered by `due_second`: has the current second not been claimed
// yet, and is it far enough along to start? When it is, the second is claimed *before* any I/O so a
// slow cycle can never be entered twice. The cycle then captures every channel in ascending order,
// persisting each as soon as it arrives, checks that the clock is still inside the claimed second, and
// only then reads and persists the metadata snapshot. A snapshot on disk therefore means every
// waveform of its second is on disk too.
//
// Every failure inside a cycle is fatal. The only way out that is not an error is an interrupt, seen
// at the top of the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use tracing::{error, info, warn};

use crate::capture::capture_waveform;
use crate::clock::{CaptureSecond, Clock};
use crate::config::AcquisitionConfig;
use crate::error::{RecorderError, RecorderResult};
use crate::instrument::Instrument;
use crate::metadata::MetadataSnapshot;
use crate::persistence::Persistence;

// Leap-second nanos can exceed one second; clamp so they still count as late in the second
fn into_second(now:DateTime<Utc>) -> Duration {
	Duration::from_nanos(u64::from(now.nanosecond().min(999_999_999)))
}

// The second to capture at `now`, if any
pub fn due_second(now:DateTime<Utc>, last_recorded:CaptureSecond, trigger_offset:Duration) -> Option<CaptureSecond> {
	let current = CaptureSecond::containing(now);
	if current > last_recorded && into_second(now) >= trigger_offset { Some(current) } else { None }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
	pub second: CaptureSecond,
	pub bytes_per_channel: Vec<(u8, usize)>,
	pub metadata: MetadataSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
	pub cycles: u64,
	pub last_second_recorded: CaptureSecond,
}

pub struct AcquisitionScheduler<I: Instrument, P: Persistence, C: Clock> {
	instrument: I,
	store: P,
	clock: C,
	channels: Vec<u8>,
	trigger_offset: Duration,
	poll_interval: Duration,
	last_second_recorded: CaptureSecond,
	shutdown: Arc<AtomicBool>,
}

impl<I: Instrument, P: Persistence, C: Clock> AcquisitionScheduler<I, P, C> {

	// The second we start in counts as already recorded, so a partial first second is skipped
	pub fn new(instrument:I, store:P, clock:C, acquisition:&AcquisitionConfig, shutdown:Arc<AtomicBool>) -> Self {
		let last_second_recorded = CaptureSecond::containing(clock.now());
		Self {
			instrument,
			store,
			clock,
			channels: acquisition.channels.clone(),
			trigger_offset: acquisition.trigger_offset(),
			poll_interval: acquisition.poll_interval(),
			last_second_recorded,
			shutdown,
		}
	}

	pub fn last_second_recorded(&self) -> CaptureSecond { self.last_second_recorded }

	// Polls until interrupted. Returns an error, after closing the instrument, on the first failed cycle.
	pub fn run(&mut self) -> RecorderResult<RunSummary> {
		let mut cycles:u64 = 0;
		info!(channels = ?self.channels, trigger_offset_ms = self.trigger_offset.as_millis() as u64, "acquisition started");

		loop {
			if self.shutdown.load(Ordering::SeqCst) {
				self.close();
				println!("Interrupted after {} seconds recorded, instrument closed", cycles);
				return Ok(RunSummary{ cycles, last_second_recorded: self.last_second_recorded });
			}

			let now = self.clock.now();
			match due_second(now, self.last_second_recorded, self.trigger_offset) {
				Some(second) => {
					self.last_second_recorded = second;
					if let Err(e) = self.run_cycle(second) {
						error!(%second, error = %e, "capture cycle failed, stopping");
						self.close();
						return Err(e);
					}
					cycles += 1;
				},
				None => self.clock.sleep(self.poll_interval),
			}
		}
	}

	// A single cycle for the first trigger point at or after the call. A call made past the trigger
	// offset waits for the next second rather than starting a capture with too little time left.
	pub fn capture_once(&mut self) -> RecorderResult<CycleReport> {
		let now = self.clock.now();
		let current = CaptureSecond::containing(now);
		self.last_second_recorded = if into_second(now) <= self.trigger_offset { current.previous() } else { current };

		loop {
			if let Some(second) = due_second(self.clock.now(), self.last_second_recorded, self.trigger_offset) {
				self.last_second_recorded = second;
				return self.run_cycle(second);
			}
			self.clock.sleep(self.poll_interval);
		}
	}

	pub fn run_cycle(&mut self, second:CaptureSecond) -> RecorderResult<CycleReport> {
		let mut bytes_per_channel:Vec<(u8, usize)> = Vec::with_capacity(self.channels.len());

		for &channel in &self.channels {
			let record = capture_waveform(&mut self.instrument, channel, second)
				.map_err(|e| RecorderError::communication(format!("capturing channel {} for {}", channel, second), e))?;
			bytes_per_channel.push((channel, record.raw.len()));
			self.store.write_waveform(record)?;
		}

		let observed = CaptureSecond::containing(self.clock.now());
		if observed > second {
			return Err(RecorderError::DeadlineOverrun{ claimed: second, observed });
		}

		let metadata = MetadataSnapshot::read(&mut self.instrument, &self.channels)
			.map_err(|e| RecorderError::communication(format!("reading metadata for {}", second), e))?;
		self.store.write_metadata(second, &metadata)?;

		println!("{}", second);
		info!(%second, ?bytes_per_channel, "second recorded");
		Ok(CycleReport{ second, bytes_per_channel, metadata })
	}

	pub fn close(&mut self) {
		if let Err(e) = self.instrument.close() {
			warn!(error = %e, "failed to close instrument");
		}
	}

}
