use regex::Regex;

use scope_recorder::config::RecorderConfig;
use scope_recorder::instrument::discovery::{list_resources, select_single};
use scope_recorder::RecorderError;

fn default_filter() -> Regex { RecorderConfig::default().instrument.filter().unwrap() }

#[test]
fn scenario_c_two_matching_instruments_abort_before_capture() {
	let candidates = vec![
		"TCPIP0::192.168.1.20::inst0::INSTR".to_owned(),
		"TCPIP0::192.168.1.21::inst0::INSTR".to_owned(),
	];

	let err = select_single(&candidates, &default_filter()).unwrap_err();
	match &err {
		RecorderError::Enumeration { matched, candidates: seen, .. } => {
			assert_eq!(*matched, 2);
			assert_eq!(seen, &candidates);
		},
		other => panic!("unexpected {:?}", other),
	}
	assert_eq!(err.exit_code(), 2);
	assert!(err.to_string().contains("192.168.1.21"));
}

#[test]
fn no_instruments_at_all_is_an_enumeration_error() {
	let err = select_single(&[], &default_filter()).unwrap_err();
	assert!(matches!(err, RecorderError::Enumeration { matched: 0, .. }));
}

#[test]
fn filter_narrows_several_candidates_to_one() {
	let candidates = vec![
		"TCPIP0::192.168.1.20::inst0::INSTR".to_owned(),
		"TCPIP0::192.168.1.21::inst0::INSTR".to_owned(),
	];
	let filter = Regex::new("192\\.168\\.1\\.21").unwrap();
	let resource = select_single(&candidates, &filter).unwrap();
	assert_eq!(resource.host, "192.168.1.21");
	assert_eq!(resource.device, "inst0");
}

#[test]
fn matching_but_unparsable_resource_is_rejected() {
	let candidates = vec!["TCPIP0::host::SOCKET".to_owned()];
	let err = select_single(&candidates, &default_filter()).unwrap_err();
	assert!(matches!(err, RecorderError::Enumeration { matched: 1, .. }));
}

#[test]
fn configured_list_is_used_verbatim() {
	let configured = vec!["TCPIP::10.1.1.1::INSTR".to_owned(), "TCPIP::10.1.1.2::INSTR".to_owned()];
	let listed = list_resources(&configured, std::time::Duration::from_millis(1)).unwrap();
	assert_eq!(listed, configured);
}
