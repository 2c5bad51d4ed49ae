
use std::io::{self, Error, ErrorKind};

use crate::xdr::Unpacker;
use crate::rpc::{REPLY, MSG_DENIED, RPC_MISMATCH, AUTH_ERROR, MSG_ACCEPTED, PROG_UNAVAIL, PROG_MISMATCH, PROC_UNAVAIL, GARBAGE_ARGS, SUCCESS};

fn err(msg:&str) -> io::Error { Error::new(ErrorKind::Other, msg) }

#[derive(Debug, PartialEq)]
pub struct Auth {
	pub flavor: i32,
	pub body: Vec<u8>,
}

pub fn unpack_auth(unpacker:&mut Unpacker) -> io::Result<Auth> {
	let flavor:i32 = unpacker.unpack_enum()?;
	let body:Vec<u8> = unpacker.unpack_variable_len_opaque()?;
	Ok(Auth{ flavor, body })
}

// Returns the xid and verifier of an accepted, successful reply. Everything else is an error.
pub fn unpack_replyheader(unpacker:&mut Unpacker) -> io::Result<(u32, Auth)> {
	let xid:u32 = unpacker.unpack_u32()?;

	if unpacker.unpack_enum()? != REPLY { return Err(err("Expected REPLY message type in RPC reply header")); }

	match unpacker.unpack_enum()? {
		MSG_DENIED => {
			return match unpacker.unpack_enum()? {
				RPC_MISMATCH => Err(err("RPC reply denied due to RPC_MISMATCH")),
				AUTH_ERROR   => Err(err("RPC reply denied due to AUTH_ERROR")),
				_            => Err(err("RPC reply denied for an unknown reason")),
			}
		},
		MSG_ACCEPTED => { },
		_ => return Err(err("Neither MSG_DENIED nor MSG_ACCEPTED in RPC reply header")),
	}

	let verf = unpack_auth(unpacker)?;

	match unpacker.unpack_enum()? {
		SUCCESS       => Ok((xid, verf)),
		PROG_UNAVAIL  => Err(err("RPC program unavailable")),
		PROG_MISMATCH => Err(err("RPC program version mismatch")),
		PROC_UNAVAIL  => Err(err("RPC procedure unavailable")),
		GARBAGE_ARGS  => Err(err("RPC server could not decode arguments")),
		_             => Err(err("RPC call failed for an unknown reason")),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rpc::xdr_pack::pack_replyheader;
	use crate::xdr::Packer;

	#[test]
	fn accepted_reply_yields_xid() {
		let mut packer = Packer::new();
		pack_replyheader(&mut packer, 42).unwrap();
		packer.pack_u32(7).unwrap();

		let mut unpacker = Unpacker::new();
		unpacker.reset(packer.get_buf());
		let (xid, verf) = unpack_replyheader(&mut unpacker).unwrap();
		assert_eq!(xid, 42);
		assert_eq!(verf, Auth{ flavor: 0, body: vec![] });
		assert_eq!(unpacker.unpack_u32().unwrap(), 7);
	}

	#[test]
	fn denied_reply_is_an_error() {
		let mut packer = Packer::new();
		packer.pack_u32(1).unwrap();
		packer.pack_enum(REPLY).unwrap();
		packer.pack_enum(MSG_DENIED).unwrap();
		packer.pack_enum(AUTH_ERROR).unwrap();
		packer.pack_u32(1).unwrap();

		let mut unpacker = Unpacker::new();
		unpacker.reset(packer.get_buf());
		let e = unpack_replyheader(&mut unpacker).unwrap_err();
		assert!(e.to_string().contains("AUTH_ERROR"));
	}
}
