use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use scope_recorder::rpc::tcp_clients::TcpClient;

const PROG:u32 = 0x0607af;
const VERS:u32 = 1;

fn reply(xid:u32, value:u32) -> Vec<u8> {
	let mut body = vec![];
	for word in &[xid, 1, 0, 0, 0, 0, value] { body.extend_from_slice(&word.to_be_bytes()); }
	body
}

fn read_call(stream:&mut impl Read) -> Vec<u8> {
	let mut header = [0u8; 4];
	stream.read_exact(&mut header).unwrap();
	let n = (u32::from_be_bytes(header) & 0x7fffffff) as usize;
	let mut call = vec![0u8; n];
	stream.read_exact(&mut call).unwrap();
	call
}

#[test]
fn reassembles_fragments_and_skips_stale_replies() {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let port = listener.local_addr().unwrap().port();

	let server = thread::spawn(move || {
		let (mut stream, _) = listener.accept().unwrap();
		let call = read_call(&mut stream);
		let xid = u32::from_be_bytes([call[0], call[1], call[2], call[3]]);

		// Call header: xid, CALL, rpc version, program, version, procedure
		assert_eq!(&call[4..8], &0u32.to_be_bytes());
		assert_eq!(&call[12..16], &PROG.to_be_bytes());
		assert_eq!(&call[20..24], &11u32.to_be_bytes());

		// A leftover reply to an earlier call, then the real one split over two fragments
		let stale = reply(xid - 1, 0);
		stream.write_all(&((stale.len() as u32) | 0x80000000).to_be_bytes()).unwrap();
		stream.write_all(&stale).unwrap();

		let fresh = reply(xid, 42);
		let (a, b) = fresh.split_at(10);
		stream.write_all(&(a.len() as u32).to_be_bytes()).unwrap();
		stream.write_all(a).unwrap();
		stream.write_all(&((b.len() as u32) | 0x80000000).to_be_bytes()).unwrap();
		stream.write_all(b).unwrap();
	});

	let mut client = TcpClient::connect(("127.0.0.1", port), PROG, VERS, Duration::from_secs(5)).unwrap();
	client.lastxid = 7;
	client.start_call(11).unwrap();
	client.packer.pack_u32(99).unwrap();
	client.do_call().unwrap();

	assert_eq!(client.unpacker.unpack_u32().unwrap(), 42);
	assert!(client.unpacker.all_data_consumed());
	server.join().unwrap();
}

#[test]
fn silent_server_times_out() {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let port = listener.local_addr().unwrap().port();

	let server = thread::spawn(move || {
		let (mut stream, _) = listener.accept().unwrap();
		read_call(&mut stream);
		thread::sleep(Duration::from_millis(500));
	});

	let mut client = TcpClient::connect(("127.0.0.1", port), PROG, VERS, Duration::from_millis(100)).unwrap();
	client.start_call(11).unwrap();
	let err = client.do_call().unwrap_err();
	assert!(matches!(err.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut));

	let classified = scope_recorder::instrument::InstrumentError::from(err);
	assert!(matches!(classified, scope_recorder::instrument::InstrumentError::Timeout(_)));
	server.join().unwrap();
}

#[test]
fn oversized_fragment_is_refused_before_allocating() {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let port = listener.local_addr().unwrap().port();

	let server = thread::spawn(move || {
		let (mut stream, _) = listener.accept().unwrap();
		read_call(&mut stream);
		// Claims a single fragment of almost 2 GiB
		stream.write_all(&0xffff_fff0u32.to_be_bytes()).unwrap();
		stream.write_all(&[0u8; 16]).unwrap();
	});

	let mut client = TcpClient::connect(("127.0.0.1", port), PROG, VERS, Duration::from_secs(5)).unwrap();
	client.set_max_record(1024);
	client.start_call(12).unwrap();
	let err = client.do_call().unwrap_err();
	assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);

	let classified = scope_recorder::instrument::InstrumentError::from(err);
	assert!(matches!(classified, scope_recorder::instrument::InstrumentError::Io(_)));
	server.join().unwrap();
}
