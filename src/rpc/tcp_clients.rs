
use std::io::{self, Read, Write, Error, ErrorKind};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use byteorder::{BigEndian, WriteBytesExt, ReadBytesExt};
use tracing::trace;

use crate::xdr;
use super::{xdr_pack, xdr_unpack};

const LAST_FRAGMENT:u32 = 0x80000000;

// Replies larger than this are refused unless the caller raises the limit
pub const DEFAULT_MAX_RECORD:usize = 1 << 20;

// An ONC RPC client over TCP using record marking. Arguments are packed into `packer` between
// `start_call` and `do_call`, and the reply body is left in `unpacker`.
pub struct TcpClient {
	stream: TcpStream,
	pub prog: u32,
	pub vers: u32,
	pub lastxid: u32,
	pub packer: xdr::Packer,
	pub unpacker: xdr::Unpacker,
	max_record: usize,
}

impl TcpClient {

	pub fn connect<A: ToSocketAddrs>(addr: A, prog: u32, vers: u32, timeout: Duration) -> io::Result<Self> {
		let mut last_err = Error::new(ErrorKind::NotFound, "Address did not resolve");
		for sock_addr in addr.to_socket_addrs()? {
			match TcpStream::connect_timeout(&sock_addr, timeout) {
				Ok(stream) => {
					stream.set_read_timeout(Some(timeout))?;
					stream.set_write_timeout(Some(timeout))?;
					stream.set_nodelay(true)?;
					return Ok(Self{ stream, prog, vers, lastxid: 0, packer: xdr::Packer::new(), unpacker: xdr::Unpacker::new(), max_record: DEFAULT_MAX_RECORD });
				},
				Err(e) => last_err = e,
			}
		}
		Err(last_err)
	}

	pub fn set_max_record(&mut self, n:usize) { self.max_record = n; }

	pub fn start_call(&mut self, prc:u32) -> io::Result<()> {
		self.lastxid = self.lastxid.wrapping_add(1);
		self.packer.reset();
		xdr_pack::pack_callheader_no_auth(&mut self.packer, self.lastxid, self.prog, self.vers, prc)
	}

	pub fn do_call(&mut self) -> io::Result<()> {
		let call:&[u8] = self.packer.get_buf();
		let mut send_bytes:Vec<u8> = Vec::with_capacity(call.len() + 4);
		send_bytes.write_u32::<BigEndian>(call.len() as u32 | LAST_FRAGMENT)?;
		send_bytes.extend_from_slice(call);
		self.stream.write_all(&send_bytes)?;
		trace!(xid = self.lastxid, bytes = call.len(), "sent RPC call");

		loop {
			let reply:Vec<u8> = self.read_record()?;

			// Load the response into the unpacker and make sure the xid matches
			self.unpacker.reset(&reply);
			let (xid, _) = xdr_unpack::unpack_replyheader(&mut self.unpacker)?;

			if xid == self.lastxid {
				return Ok(());
			} else if xid < self.lastxid {
				// Stale reply to an earlier call that timed out on our side
				trace!(xid, expected = self.lastxid, "discarding stale RPC reply");
				continue;
			} else {
				return Err(Error::new(ErrorKind::InvalidData, "Received an RPC reply with an xid that was never sent"));
			}
		}
	}

	fn read_record(&mut self) -> io::Result<Vec<u8>> {
		let mut record:Vec<u8> = vec![];
		loop {
			let header:u32 = self.stream.read_u32::<BigEndian>()?;
			let n:usize = (header & !LAST_FRAGMENT) as usize;

			// Checked before allocating, so a corrupt length is an error rather than a huge buffer
			if record.len() + n > self.max_record {
				return Err(Error::new(ErrorKind::InvalidData, format!("RPC reply of at least {} bytes exceeds the {} byte limit", record.len() + n, self.max_record)));
			}

			let start = record.len();
			record.resize(start + n, 0);
			self.stream.read_exact(&mut record[start..])?;

			if header & LAST_FRAGMENT != 0 { return Ok(record); }
		}
	}

}
