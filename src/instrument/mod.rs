// The instrument capability the acquisition core is written against
//
// Everything above this module sees only `Instrument`; the VXI-11 transport lives in `vxi11` and
// candidate selection in `discovery`

use std::io::{self, ErrorKind};

use thiserror::Error;

use crate::vxi11::DeviceError;

pub mod discovery;
pub mod vxi11;

pub type InstrumentResult<T> = Result<T, InstrumentError>;

#[derive(Debug, Error)]
pub enum InstrumentError {
	#[error("instrument I/O timed out: {0}")]
	Timeout(#[source] io::Error),

	#[error(transparent)]
	Device(#[from] DeviceError),

	#[error("instrument I/O failed: {0}")]
	Io(#[source] io::Error),

	#[error("malformed reply to {command}: {reason}")]
	MalformedReply { command: String, reason: String },

	#[error("channel {0} does not exist on this instrument")]
	InvalidChannel(u8),

	#[error("invalid resource string {0:?}")]
	InvalidResource(String),

	#[error("instrument connection is closed")]
	NotConnected,
}

impl From<io::Error> for InstrumentError {
	fn from(e:io::Error) -> Self {
		match e.kind() {
			ErrorKind::TimedOut | ErrorKind::WouldBlock => return InstrumentError::Timeout(e),
			ErrorKind::NotConnected => return InstrumentError::NotConnected,
			_ => { },
		}

		if e.get_ref().map_or(false, |inner| inner.is::<DeviceError>()) {
			if let Some(Ok(device)) = e.into_inner().map(|inner| inner.downcast::<DeviceError>()) {
				return InstrumentError::Device(*device);
			}
			return InstrumentError::Io(io::Error::new(ErrorKind::Other, "unreadable device error"));
		}

		InstrumentError::Io(e)
	}
}

pub trait Instrument {
	fn write_command(&mut self, command:&str) -> InstrumentResult<()>;

	// Reply text with the trailing terminator stripped
	fn query(&mut self, command:&str) -> InstrumentResult<String>;

	// Reply bytes exactly as received, block header included
	fn query_binary(&mut self, command:&str) -> InstrumentResult<Vec<u8>>;

	fn query_ascii(&mut self, command:&str) -> InstrumentResult<Vec<f64>> {
		let reply:String = self.query(command)?;
		parse_ascii_values(command, &reply)
	}

	fn close(&mut self) -> InstrumentResult<()>;
}

// Splits a reply on commas and whitespace and parses every token as a float
pub fn parse_ascii_values(command:&str, reply:&str) -> InstrumentResult<Vec<f64>> {
	let malformed = |reason:String| InstrumentError::MalformedReply{ command: command.to_owned(), reason };

	let values = reply
		.split(|c:char| c == ',' || c.is_whitespace())
		.filter(|tok| !tok.is_empty())
		.map(|tok| tok.parse::<f64>().map_err(|_| malformed(format!("{:?} is not a number", tok))))
		.collect::<InstrumentResult<Vec<f64>>>()?;

	if values.is_empty() { return Err(malformed("empty reply".to_owned())); }
	Ok(values)
}

// The first value of an ASCII reply, for queries that answer with a single number
pub fn query_value<I: Instrument + ?Sized>(instrument:&mut I, command:&str) -> InstrumentResult<f64> {
	instrument.query_ascii(command)?.first().copied().ok_or_else(|| InstrumentError::MalformedReply {
		command: command.to_owned(),
		reason: "empty reply".to_owned(),
	})
}
