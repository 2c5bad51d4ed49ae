#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use scope_recorder::clock::Clock;
use scope_recorder::config::AcquisitionConfig;
use scope_recorder::instrument::{Instrument, InstrumentError, InstrumentResult};

pub fn at(sec:u32, ms:i64) -> DateTime<Utc> {
	Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, sec).unwrap() + chrono::Duration::milliseconds(ms)
}

// Virtual time shared between the clock and the simulated instrument. Sleeping only advances the
// counter, and the shutdown flag is raised once time reaches `stop_at`.
#[derive(Clone)]
pub struct VirtualClock {
	pub now: Rc<Cell<DateTime<Utc>>>,
	stop_at: DateTime<Utc>,
	pub shutdown: Arc<AtomicBool>,
}

impl VirtualClock {
	pub fn new(start:DateTime<Utc>, stop_at:DateTime<Utc>) -> Self {
		Self{ now: Rc::new(Cell::new(start)), stop_at, shutdown: Arc::new(AtomicBool::new(false)) }
	}

	pub fn advance(&self, d:chrono::Duration) { self.now.set(self.now.get() + d); }
}

impl Clock for VirtualClock {
	fn now(&self) -> DateTime<Utc> { self.now.get() }

	fn sleep(&self, d:Duration) {
		self.advance(chrono::Duration::from_std(d).unwrap());
		if self.now.get() >= self.stop_at { self.shutdown.store(true, Ordering::SeqCst); }
	}
}

#[derive(Default)]
pub struct InstrumentLog {
	pub commands: Vec<String>,
	pub closed: bool,
}

pub struct SimulatedInstrument {
	pub log: Rc<RefCell<InstrumentLog>>,
	replies: HashMap<String, String>,
	clock: Option<VirtualClock>,
	transfer_latency: chrono::Duration,
	fail_on: Option<String>,
}

// Block header plus four samples that identify the channel
pub fn waveform_bytes(channel:u8) -> Vec<u8> {
	let mut raw = b"#800000004".to_vec();
	raw.extend_from_slice(&[channel, 0x80, 0x7f, channel]);
	raw
}

impl SimulatedInstrument {
	// Scenario A settings: 1 ms/div, 0.5 V/div on both channels, 1 GSa/s
	pub fn new() -> Self {
		let replies = vec![
			(":TIM:SCAL?", "1.000e-03"),
			(":TIM:OFFS?", "0.000e+00"),
			(":CHAN1:SCAL?", "5.000e-01"),
			(":CHAN2:SCAL?", "5.000e-01"),
			(":CHAN1:OFFS?", "0.000e+00"),
			(":CHAN2:OFFS?", "0.000e+00"),
			(":ACQ:SAMP?", "1.000000e+09"),
			("*IDN?", "Rigol Technologies,DS1102E,DS1EB104702974,00.02.06.00.01"),
		];
		Self {
			log: Rc::new(RefCell::new(InstrumentLog::default())),
			replies: replies.into_iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect(),
			clock: None,
			transfer_latency: chrono::Duration::zero(),
			fail_on: None,
		}
	}

	pub fn with_reply(mut self, command:&str, reply:&str) -> Self {
		self.replies.insert(command.to_owned(), reply.to_owned());
		self
	}

	// Every waveform transfer takes `latency` of virtual time
	pub fn with_transfer_latency(mut self, clock:&VirtualClock, latency:chrono::Duration) -> Self {
		self.clock = Some(clock.clone());
		self.transfer_latency = latency;
		self
	}

	pub fn failing_on(mut self, command:&str) -> Self {
		self.fail_on = Some(command.to_owned());
		self
	}

	fn record(&mut self, command:&str) -> InstrumentResult<()> {
		self.log.borrow_mut().commands.push(command.to_owned());
		if self.log.borrow().closed { return Err(InstrumentError::NotConnected); }
		if self.fail_on.as_deref() == Some(command) {
			return Err(InstrumentError::Timeout(io::Error::new(io::ErrorKind::TimedOut, "simulated timeout")));
		}
		Ok(())
	}
}

impl Instrument for SimulatedInstrument {
	fn write_command(&mut self, command:&str) -> InstrumentResult<()> { self.record(command) }

	fn query(&mut self, command:&str) -> InstrumentResult<String> {
		self.record(command)?;
		self.replies.get(command).cloned().ok_or_else(|| InstrumentError::MalformedReply{ command: command.to_owned(), reason: "no reply".to_owned() })
	}

	fn query_binary(&mut self, command:&str) -> InstrumentResult<Vec<u8>> {
		self.record(command)?;
		if let Some(clock) = &self.clock { clock.advance(self.transfer_latency); }
		match command.strip_prefix(":WAV:DATA? CHAN").and_then(|n| n.parse::<u8>().ok()) {
			Some(ch) => Ok(waveform_bytes(ch)),
			None => self.replies.get(command).map(|r| r.clone().into_bytes())
				.ok_or_else(|| InstrumentError::MalformedReply{ command: command.to_owned(), reason: "no reply".to_owned() }),
		}
	}

	fn close(&mut self) -> InstrumentResult<()> {
		self.log.borrow_mut().closed = true;
		Ok(())
	}
}

pub fn acquisition(channels:&[u8]) -> AcquisitionConfig {
	AcquisitionConfig{ channels: channels.to_vec(), trigger_offset_ms: 500, poll_interval_ms: 50, points_mode: None }
}
