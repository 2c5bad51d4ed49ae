pub const PMAP_PROG:u32 = 100000;
pub const PMAP_VERS:u32 = 2;
pub const PMAP_PORT:u16 = 111;

pub const PMAPPROC_GETPORT:u32 = 3;     // (mapping) -> unsigned int

use std::io::{self, Error, ErrorKind};
use std::net::IpAddr;
use std::time::Duration;

use super::IPPROTO_TCP;
use super::xdr_pack;
use super::tcp_clients::TcpClient;
use super::udp_clients::BroadcastUdpClient;

#[derive(Debug, Clone, Copy)]
pub enum Protocol {
	TCP,
}

impl Protocol {
	pub fn to_u32(self) -> u32 { match self {
		Protocol::TCP => IPPROTO_TCP,
	}}
}

#[derive(Debug)]
pub struct Mapping {
	pub program: u32,
	pub version: u32,
	pub protocol: Protocol,
	pub port: u32,
}

pub struct TcpPortMapperClient {
	tcp_client: TcpClient,
}

impl TcpPortMapperClient {

	pub fn new(host:&str, timeout:Duration) -> io::Result<Self> {
		let tcp_client = TcpClient::connect((host, PMAP_PORT), PMAP_PROG, PMAP_VERS, timeout)?;
		Ok(Self{ tcp_client })
	}

	pub fn get_port(&mut self, m:&Mapping) -> io::Result<u16> {
		self.tcp_client.start_call(PMAPPROC_GETPORT)?;
		xdr_pack::pack_mapping(&mut self.tcp_client.packer, m.program, m.version, m.protocol.to_u32(), m.port)?;
		self.tcp_client.do_call()?;

		let ans:u32 = self.tcp_client.unpacker.unpack_u32()?;

		if !self.tcp_client.unpacker.all_data_consumed() {
			Err(Error::new(ErrorKind::InvalidData, "Data unexpectedly left over in unpacker after unpacking port"))
		} else if ans == 0 || ans > u16::MAX as u32 {
			Err(Error::new(ErrorKind::NotFound, format!("Program {} version {} is not registered with the port mapper", m.program, m.version)))
		} else {
			Ok(ans as u16)
		}
	}

}

// Asks every port mapper on the local network for the given program and returns the hosts that have it registered
pub fn broadcast_get_port(m:&Mapping, window:Duration) -> io::Result<Vec<IpAddr>> {
	let mut client = BroadcastUdpClient::bind(PMAP_PORT, PMAP_PROG, PMAP_VERS)?;
	client.start_call(PMAPPROC_GETPORT)?;
	xdr_pack::pack_mapping(&mut client.packer, m.program, m.version, m.protocol.to_u32(), m.port)?;

	let mut hosts:Vec<IpAddr> = vec![];
	for (addr, body) in client.make_call(window)? {
		let port:u32 = match body.get(..4) {
			Some(b) => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
			None => continue,
		};
		if port != 0 && !hosts.contains(&addr.ip()) { hosts.push(addr.ip()); }
	}

	Ok(hosts)
}
