// Fatal conditions of a recording run
//
// Every variant ends the run; nothing is retried. `RecorderError::exit_code` gives each kind its own
// process status

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::clock::CaptureSecond;
use crate::instrument::InstrumentError;

pub type RecorderResult<T> = Result<T, RecorderError>;

#[derive(Debug, Error)]
pub enum RecorderError {
	#[error("expected exactly one instrument matching {filter:?}, {matched} matched among {candidates:?}")]
	Enumeration { filter: String, matched: usize, candidates: Vec<String> },

	#[error("communication failed while {during}: {source}")]
	Communication { during: String, #[source] source: InstrumentError },

	#[error("deadline overrun: capture claimed for {claimed} was still running at {observed}, data no longer belongs to one second")]
	DeadlineOverrun { claimed: CaptureSecond, observed: CaptureSecond },

	#[error("failed to persist {}: {source}", .path.display())]
	Persistence { path: PathBuf, #[source] source: io::Error },

	#[error("configuration error: {0}")]
	Config(String),
}

impl RecorderError {

	pub fn communication(during:impl Into<String>, source:InstrumentError) -> Self {
		RecorderError::Communication{ during: during.into(), source }
	}

	pub fn exit_code(&self) -> i32 {
		match self {
			RecorderError::Enumeration { .. }     => 2,
			RecorderError::DeadlineOverrun { .. } => 3,
			RecorderError::Communication { .. }   => 4,
			RecorderError::Persistence { .. }     => 5,
			RecorderError::Config(_)              => 6,
		}
	}

}

impl From<figment::Error> for RecorderError {
	fn from(e:figment::Error) -> Self { RecorderError::Config(e.to_string()) }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn every_fatal_kind_has_a_distinct_nonzero_exit_code() {
		let errors = vec![
			RecorderError::Enumeration{ filter: "TCPIP".into(), matched: 2, candidates: vec![] },
			RecorderError::DeadlineOverrun{ claimed: CaptureSecond::from_unix(5), observed: CaptureSecond::from_unix(6) },
			RecorderError::communication("x", InstrumentError::NotConnected),
			RecorderError::Persistence{ path: "a".into(), source: io::Error::new(io::ErrorKind::Other, "disk") },
			RecorderError::Config("bad".into()),
		];
		let mut codes:Vec<i32> = errors.iter().map(|e| e.exit_code()).collect();
		assert!(codes.iter().all(|c| *c != 0));
		codes.sort();
		codes.dedup();
		assert_eq!(codes.len(), errors.len());
	}

	#[test]
	fn overrun_message_names_both_seconds() {
		let e = RecorderError::DeadlineOverrun{ claimed: CaptureSecond::from_unix(5), observed: CaptureSecond::from_unix(6) };
		let msg = e.to_string();
		assert!(msg.contains("1970-01-01T00:00:05Z"));
		assert!(msg.contains("1970-01-01T00:00:06Z"));
	}
}
