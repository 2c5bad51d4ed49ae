
use std::ops::Drop;
use std::str;
use std::time::Duration;

use tracing::{debug, warn};

use crate::vxi11::CoreClient;
use super::discovery::Resource;
use super::{Instrument, InstrumentError, InstrumentResult};

// A LAN oscilloscope reached over VXI-11. The link is destroyed on close, or on drop if close was never called.
pub struct Vxi11Instrument {
	core: CoreClient,
	resource: Resource,
}

impl Vxi11Instrument {

	pub fn open(resource:&Resource, timeout:Duration, chunk_size:u32) -> InstrumentResult<Self> {
		let mut core = CoreClient::new(&resource.host, timeout, chunk_size)?;
		core.create_link(&resource.device)?;
		debug!(%resource, "instrument opened");
		Ok(Self{ core, resource: resource.clone() })
	}

}

impl Instrument for Vxi11Instrument {

	fn write_command(&mut self, command:&str) -> InstrumentResult<()> {
		debug!(command, "write");
		Ok(self.core.write(command.as_bytes())?)
	}

	fn query(&mut self, command:&str) -> InstrumentResult<String> {
		let raw:Vec<u8> = self.query_binary(command)?;
		str::from_utf8(&raw)
			.map(|s| s.trim_end_matches(|c| c == '\n' || c == '\r').to_owned())
			.map_err(|_| InstrumentError::MalformedReply{ command: command.to_owned(), reason: "reply is not UTF-8".to_owned() })
	}

	fn query_binary(&mut self, command:&str) -> InstrumentResult<Vec<u8>> {
		debug!(command, "query");
		let reply:Vec<u8> = self.core.ask(command.as_bytes())?;
		debug!(command, bytes = reply.len(), "reply");
		Ok(reply)
	}

	fn close(&mut self) -> InstrumentResult<()> {
		if !self.core.is_linked() { return Ok(()); }
		self.core.destroy_link()?;
		debug!(resource = %self.resource, "instrument closed");
		Ok(())
	}

}

impl Drop for Vxi11Instrument {

	fn drop(&mut self) {
		if let Err(e) = self.close() {
			warn!(resource = %self.resource, error = %e, "unable to destroy VXI-11 link");
		}
	}

}
