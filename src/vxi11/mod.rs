
// Device core
pub const DEVICE_CORE_PROG:u32  = 0x0607af;
pub const DEVICE_CORE_VERS:u32  = 1;
pub const CREATE_LINK:u32       = 10;
pub const DEVICE_WRITE:u32      = 11;
pub const DEVICE_READ:u32       = 12;
pub const DESTROY_LINK:u32      = 23;

pub const CLIENT_ID:i32 = 3333;

// Room for the RPC reply header and device_read result fields around a full chunk of data
pub const REPLY_SLACK:usize = 4096;

// Operation flags
pub const FLAG_END:i32 = 8;

// Read termination reasons
pub const REASON_REQCNT:i32 = 1;
pub const REASON_CHR:i32    = 2;
pub const REASON_END:i32    = 4;

use std::io::{self, ErrorKind};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};

use crate::rpc::port_mapping::{TcpPortMapperClient, Mapping, Protocol};
use crate::rpc::tcp_clients::TcpClient;

pub mod xdr_pack;

#[derive(Debug, Error)]
#[error("VXI-11 device error {code}: {}", describe(.code))]
pub struct DeviceError {
	pub code: i32,
}

pub fn describe(code:&i32) -> &'static str {
	match *code {
		1  => "syntax error",
		3  => "device not accessible",
		4  => "invalid link identifier",
		5  => "parameter error",
		6  => "channel not established",
		8  => "operation not supported",
		9  => "out of resources",
		11 => "device locked by another link",
		12 => "no lock held by this link",
		15 => "I/O timeout",
		17 => "I/O error",
		21 => "invalid address",
		23 => "abort",
		29 => "channel already established",
		_  => "unknown error",
	}
}

fn check(code:i32) -> io::Result<()> {
	match code {
		0  => Ok(()),
		15 => Err(io::Error::new(ErrorKind::TimedOut, DeviceError{ code })),
		_  => Err(io::Error::new(ErrorKind::Other, DeviceError{ code })),
	}
}

fn err(msg:&str) -> io::Error { io::Error::new(ErrorKind::Other, msg) }

fn millis(d:Duration) -> u32 { d.as_millis().min(u32::MAX as u128) as u32 }

pub struct CoreClient {
	client: TcpClient,
	opt_link: Option<Link>,
	io_timeout: Duration,
	chunk_size: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Link {
	pub link_id: i32,
	pub max_recv_size: u32,
}

impl CoreClient {

	fn get_link(&self) -> io::Result<Link> {
		self.opt_link.ok_or_else(|| io::Error::new(ErrorKind::NotConnected, "No link"))
	}

	pub fn new(host:&str, io_timeout:Duration, chunk_size:u32) -> io::Result<Self> {

		// Find the port to use for the core program
		let mut pmap_client = TcpPortMapperClient::new(host, io_timeout)?;

		let mapping = Mapping {
			program: DEVICE_CORE_PROG,
			version: DEVICE_CORE_VERS,
			protocol: Protocol::TCP,
			port: 0,
		};

		let port:u16 = pmap_client.get_port(&mapping)?;
		debug!(host, port, "VXI-11 core channel located");

		// The socket timeout has to outlast the device-side timeout or we'd give up on replies that are still coming
		let mut client = TcpClient::connect((host, port), DEVICE_CORE_PROG, DEVICE_CORE_VERS, io_timeout + Duration::from_secs(1))?;
		client.set_max_record(chunk_size as usize + REPLY_SLACK);

		Ok(CoreClient{ client, opt_link: None, io_timeout, chunk_size })
	}

	pub fn is_linked(&self) -> bool { self.opt_link.is_some() }

	pub fn create_link(&mut self, device:&str) -> io::Result<Link> {
		if self.opt_link.is_some() {
			return Err(err("Already connected to a link"));
		}

		self.client.start_call(CREATE_LINK)?;
		xdr_pack::pack_create_link_parms(&mut self.client.packer, CLIENT_ID, false, millis(self.io_timeout), device)?;
		self.client.do_call()?;

		let error:i32         = self.client.unpacker.unpack_i32()?;
		let link_id:i32       = self.client.unpacker.unpack_i32()?;
		let _abort_port:u32   = self.client.unpacker.unpack_u32()?;
		let max_recv_size:u32 = self.client.unpacker.unpack_u32()?;
		check(error)?;

		let link = Link{ link_id, max_recv_size };
		debug!(?link, device, "VXI-11 link created");
		self.opt_link = Some(link);
		Ok(link)
	}

	pub fn ask(&mut self, data:&[u8]) -> io::Result<Vec<u8>> {
		self.write(data)?;
		self.read()
	}

	pub fn write(&mut self, data:&[u8]) -> io::Result<()> {
		let link:Link = self.get_link()?;
		let timeout:u32 = millis(self.io_timeout);

		// The device may not accept more than max_recv_size bytes per call, and only the last chunk carries END
		let max:usize = if link.max_recv_size == 0 { data.len().max(1) } else { link.max_recv_size as usize };
		let mut chunks = data.chunks(max).peekable();
		while let Some(chunk) = chunks.next() {
			let flags:i32 = if chunks.peek().is_none() { FLAG_END } else { 0 };

			self.client.start_call(DEVICE_WRITE)?;
			xdr_pack::pack_device_write_parms(&mut self.client.packer, link.link_id, timeout, timeout, flags, chunk)?;
			self.client.do_call()?;

			let error:i32 = self.client.unpacker.unpack_i32()?;
			let size:u32  = self.client.unpacker.unpack_u32()?;
			check(error)?;

			if size as usize != chunk.len() {
				return Err(err("Number of bytes in confirmation doesn't match number of bytes sent"));
			}
		}

		Ok(())
	}

	// Reads until the device reports END, so a large block comes back whole
	pub fn read(&mut self) -> io::Result<Vec<u8>> {
		let link:Link = self.get_link()?;
		let timeout:u32 = millis(self.io_timeout);
		let mut ans:Vec<u8> = vec![];

		loop {
			self.client.start_call(DEVICE_READ)?;
			xdr_pack::pack_device_read_parms(&mut self.client.packer, link.link_id, self.chunk_size, timeout, timeout, 0, 0)?;
			self.client.do_call()?;

			let error:i32    = self.client.unpacker.unpack_i32()?;
			let reason:i32   = self.client.unpacker.unpack_i32()?;
			let data:Vec<u8> = self.client.unpacker.unpack_variable_len_opaque()?;
			check(error)?;

			trace!(bytes = data.len(), reason, "device_read");
			ans.extend_from_slice(&data);

			if reason & REASON_END != 0 { return Ok(ans); }
			if reason & (REASON_REQCNT | REASON_CHR) == 0 {
				return Err(io::Error::new(ErrorKind::InvalidData, "device_read returned without a termination reason"));
			}
		}
	}

	// The link is forgotten before the call, so a destroy that fails is never attempted twice
	pub fn destroy_link(&mut self) -> io::Result<()> {
		let link:Link = self.get_link()?;
		self.opt_link = None;

		self.client.start_call(DESTROY_LINK)?;
		xdr_pack::pack_device_link(&mut self.client.packer, link.link_id)?;
		self.client.do_call()?;

		let error:i32 = self.client.unpacker.unpack_i32()?;
		check(error)
	}

}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn timeout_code_maps_to_timed_out_kind() {
		let e = check(15).unwrap_err();
		assert_eq!(e.kind(), ErrorKind::TimedOut);
		let inner = e.get_ref().and_then(|i| i.downcast_ref::<DeviceError>()).unwrap();
		assert_eq!(inner.code, 15);
	}

	#[test]
	fn failed_destroy_is_not_retried() {
		use std::net::TcpListener;

		// Accepts the connection into the backlog and never answers
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		let addr = listener.local_addr().unwrap();
		let client = TcpClient::connect(addr, DEVICE_CORE_PROG, DEVICE_CORE_VERS, Duration::from_millis(200)).unwrap();
		let mut core = CoreClient{ client, opt_link: Some(Link{ link_id: 7, max_recv_size: 0 }), io_timeout: Duration::from_millis(100), chunk_size: 1024 };

		assert!(core.destroy_link().is_err());
		assert!(!core.is_linked());
		assert_eq!(core.destroy_link().unwrap_err().kind(), ErrorKind::NotConnected);
		drop(listener);
	}

	#[test]
	fn device_error_message_names_the_code() {
		let e = check(11).unwrap_err();
		assert_eq!(e.to_string(), "VXI-11 device error 11: device locked by another link");
		assert!(check(0).is_ok());
	}
}
