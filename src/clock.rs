
use std::fmt;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, SubsecRound, TimeZone, Utc};

// A wall-clock UTC second with the sub-second part truncated away. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureSecond(DateTime<Utc>);

impl CaptureSecond {

	pub fn containing(t:DateTime<Utc>) -> Self { CaptureSecond(t.trunc_subsecs(0)) }

	pub fn from_unix(secs:i64) -> Self { CaptureSecond(Utc.timestamp_opt(secs, 0).single().unwrap_or_default()) }

	pub fn start(&self) -> DateTime<Utc> { self.0 }

	pub fn previous(&self) -> Self { CaptureSecond(self.0 - chrono::Duration::seconds(1)) }

	// Filesystem-safe ISO-8601, e.g. 2024-01-01T00-00-05Z
	pub fn file_stem(&self) -> String { self.0.format("%Y-%m-%dT%H-%M-%SZ").to_string() }

}

impl fmt::Display for CaptureSecond {
	fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
	}
}

pub trait Clock {
	fn now(&self) -> DateTime<Utc>;
	fn sleep(&self, d:Duration);
}

pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> DateTime<Utc> { Utc::now() }
	fn sleep(&self, d:Duration) { thread::sleep(d) }
}
