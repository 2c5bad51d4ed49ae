
use std::fmt;
use std::io;
use std::str::FromStr;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{RecorderError, RecorderResult};
use crate::rpc::port_mapping::{self, Mapping, Protocol};
use crate::vxi11::{DEVICE_CORE_PROG, DEVICE_CORE_VERS};
use super::InstrumentError;

lazy_static! {
	static ref RESOURCE_RE: Regex = Regex::new("^TCPIP(\\d*)::([^:]+)(?:::([^:]+))?::INSTR$").unwrap();
}

pub const DEFAULT_DEVICE:&str = "inst0";

// A VISA-style resource string for a VXI-11 instrument, e.g. TCPIP0::192.168.1.20::inst0::INSTR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
	pub board: u32,
	pub host: String,
	pub device: String,
}

impl FromStr for Resource {
	type Err = InstrumentError;

	fn from_str(s:&str) -> Result<Self, Self::Err> {
		let invalid = || InstrumentError::InvalidResource(s.to_owned());
		let caps = RESOURCE_RE.captures(s.trim()).ok_or_else(invalid)?;

		let board:u32 = match caps.get(1).map(|m| m.as_str()) {
			None | Some("") => 0,
			Some(b) => b.parse().map_err(|_| invalid())?,
		};
		let host:String = caps.get(2).map(|m| m.as_str().to_owned()).ok_or_else(invalid)?;
		let device:String = caps.get(3).map_or(DEFAULT_DEVICE, |m| m.as_str()).to_owned();

		Ok(Self{ board, host, device })
	}
}

impl fmt::Display for Resource {
	fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result {
		write!(f, "TCPIP{}::{}::{}::INSTR", self.board, self.host, self.device)
	}
}

// Candidates are the configured resources, or whatever answers a broadcast for the VXI-11 core program
pub fn list_resources(configured:&[String], window:Duration) -> io::Result<Vec<String>> {
	if !configured.is_empty() {
		return Ok(configured.to_vec());
	}

	let mapping = Mapping{ program: DEVICE_CORE_PROG, version: DEVICE_CORE_VERS, protocol: Protocol::TCP, port: 0 };
	let hosts = port_mapping::broadcast_get_port(&mapping, window)?;
	debug!(?hosts, "broadcast discovery finished");

	Ok(hosts.into_iter().map(|ip| Resource{ board: 0, host: ip.to_string(), device: DEFAULT_DEVICE.to_owned() }.to_string()).collect())
}

// Picks the one candidate matching `filter`. Zero or several matches is an enumeration failure
pub fn select_single(candidates:&[String], filter:&Regex) -> RecorderResult<Resource> {
	let matching:Vec<&String> = candidates.iter().filter(|c| filter.is_match(c)).collect();

	if matching.len() != 1 {
		return Err(RecorderError::Enumeration {
			filter: filter.as_str().to_owned(),
			matched: matching.len(),
			candidates: candidates.to_vec(),
		});
	}

	let resource:Resource = matching[0].parse().map_err(|e:InstrumentError| RecorderError::Enumeration {
		filter: format!("{} ({})", filter.as_str(), e),
		matched: 1,
		candidates: candidates.to_vec(),
	})?;
	info!(%resource, "instrument selected");
	Ok(resource)
}
