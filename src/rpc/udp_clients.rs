
use std::io::{self, Error, ErrorKind};
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::xdr;
use super::{xdr_pack, xdr_unpack};

// Sends one RPC call to every host on the local network and collects the replies that arrive
// within a fixed window
pub struct BroadcastUdpClient {
	socket: UdpSocket,
	pub prog: u32,
	pub vers: u32,
	pub port: u16,
	pub lastxid: u32,
	pub packer: xdr::Packer,
	unpacker: xdr::Unpacker,
	recv_buff: [u8; 8192],
}

impl BroadcastUdpClient {

	pub fn bind(port:u16, prog: u32, vers: u32) -> io::Result<Self> {
		let socket:UdpSocket = UdpSocket::bind("0.0.0.0:0")?;
		socket.set_broadcast(true)?;

		Ok(Self{ socket, prog, vers, port, lastxid: 0, packer: xdr::Packer::new(), unpacker: xdr::Unpacker::new(), recv_buff: [0; 8192] })
	}

	pub fn start_call(&mut self, prc:u32) -> io::Result<()> {
		self.lastxid = self.lastxid.wrapping_add(1);
		self.packer.reset();
		xdr_pack::pack_callheader_no_auth(&mut self.packer, self.lastxid, self.prog, self.vers, prc)
	}

	// Returns the sender and reply body of every reply matching the current xid
	pub fn make_call(&mut self, window:Duration) -> io::Result<Vec<(SocketAddr, Vec<u8>)>> {
		let call:&[u8] = self.packer.get_buf();
		let n:usize = self.socket.send_to(call, ("255.255.255.255", self.port))?;
		if n != call.len() {
			return Err(Error::new(ErrorKind::Other, "Sent the wrong number of bytes"));
		}

		let deadline = Instant::now() + window;
		let mut replies:Vec<(SocketAddr, Vec<u8>)> = vec![];

		loop {
			let left = deadline.saturating_duration_since(Instant::now());
			if left == Duration::from_secs(0) { break; }
			self.socket.set_read_timeout(Some(left))?;

			let (n, addr) = match self.socket.recv_from(&mut self.recv_buff) {
				Ok(x) => x,
				Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => break,
				Err(e) => return Err(e),
			};

			self.unpacker.reset(&self.recv_buff[..n]);
			match xdr_unpack::unpack_replyheader(&mut self.unpacker) {
				Ok((xid, _)) if xid == self.lastxid => {
					replies.push((addr, self.unpacker.get_remaining_bytes().to_vec()));
				},
				Ok(_) => { },
				Err(e) => debug!(%addr, error = %e, "ignoring malformed broadcast reply"),
			}
		}

		Ok(replies)
	}

}
