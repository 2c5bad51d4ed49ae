// Durable output of a capture cycle: one raw file per (second, channel) and one JSON snapshot per second
//
// File names derive only from the second and channel, so a second captured again after a restart
// overwrites its earlier files instead of adding new ones

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::capture::WaveformRecord;
use crate::clock::CaptureSecond;
use crate::error::{RecorderError, RecorderResult};
use crate::metadata::MetadataSnapshot;

pub trait Persistence {
	fn write_waveform(&mut self, record:WaveformRecord) -> RecorderResult<PathBuf>;
	fn write_metadata(&mut self, second:CaptureSecond, snapshot:&MetadataSnapshot) -> RecorderResult<PathBuf>;
}

pub struct DirectoryStore {
	root: PathBuf,
}

pub fn waveform_file_name(second:CaptureSecond, channel:u8) -> String { format!("{}_chan{}.bin", second.file_stem(), channel) }
pub fn metadata_file_name(second:CaptureSecond) -> String { format!("{}.json", second.file_stem()) }

fn write_synced(path:&Path, bytes:&[u8]) -> RecorderResult<()> {
	let wrap = |source:io::Error| RecorderError::Persistence{ path: path.to_owned(), source };

	let mut file = File::create(path).map_err(wrap)?;
	file.write_all(bytes).map_err(wrap)?;
	file.sync_all().map_err(wrap)
}

impl DirectoryStore {

	pub fn open<P: AsRef<Path>>(root:P) -> RecorderResult<Self> {
		let root:PathBuf = root.as_ref().to_owned();
		fs::create_dir_all(&root).map_err(|source| RecorderError::Persistence{ path: root.clone(), source })?;
		Ok(Self{ root })
	}

	pub fn waveform_path(&self, second:CaptureSecond, channel:u8) -> PathBuf { self.root.join(waveform_file_name(second, channel)) }
	pub fn metadata_path(&self, second:CaptureSecond) -> PathBuf { self.root.join(metadata_file_name(second)) }

}

impl Persistence for DirectoryStore {

	fn write_waveform(&mut self, record:WaveformRecord) -> RecorderResult<PathBuf> {
		let path = self.waveform_path(record.second, record.channel);
		write_synced(&path, &record.raw)?;
		debug!(path = %path.display(), bytes = record.raw.len(), "waveform written");
		Ok(path)
	}

	fn write_metadata(&mut self, second:CaptureSecond, snapshot:&MetadataSnapshot) -> RecorderResult<PathBuf> {
		let path = self.metadata_path(second);
		let json:String = snapshot.to_json().map_err(|e| RecorderError::Persistence{ path: path.clone(), source: e.into() })?;
		write_synced(&path, json.as_bytes())?;
		debug!(path = %path.display(), "metadata written");
		Ok(path)
	}

}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn names_are_distinct_per_second_and_channel() {
		let s5 = CaptureSecond::from_unix(5);
		let s6 = CaptureSecond::from_unix(6);
		assert_eq!(waveform_file_name(s5, 1), "1970-01-01T00-00-05Z_chan1.bin");
		assert_eq!(metadata_file_name(s5), "1970-01-01T00-00-05Z.json");
		assert_ne!(waveform_file_name(s5, 1), waveform_file_name(s5, 2));
		assert_ne!(waveform_file_name(s5, 1), waveform_file_name(s6, 1));
		assert!(!waveform_file_name(s5, 1).contains(':'));
	}
}
