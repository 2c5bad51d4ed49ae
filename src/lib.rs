
// External data representation, a protocol for serializing data to be sent over the network
pub mod xdr;

// Remote procedure call, a protocol build on top of XDR to provide something like C-style function calls over the network
pub mod rpc;

// A protocol using RPC that's meant to communicate with instruments like oscilloscopes
pub mod vxi11;

// Command sets for specific oscilloscope families
pub mod devices;

// The instrument capability the recorder depends on, its VXI-11 implementation, and candidate selection
pub mod instrument;

// Once-per-second acquisition: clock, per-channel capture, metadata, persistence, and the loop tying them together
pub mod clock;
pub mod capture;
pub mod metadata;
pub mod persistence;
pub mod scheduler;

pub mod config;
pub mod error;
pub mod shutdown;

pub use error::{RecorderError, RecorderResult};
