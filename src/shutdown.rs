
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{error, info};

// Raised once when the operator interrupts the process. The scheduler polls it between captures, so an
// interrupt never cuts a capture cycle in half.
pub fn interrupt_flag() -> io::Result<Arc<AtomicBool>> {
	let flag = Arc::new(AtomicBool::new(false));
	let raised = Arc::clone(&flag);

	let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;

	thread::Builder::new()
		.name("interrupt".into())
		.spawn(move || {
			match runtime.block_on(tokio::signal::ctrl_c()) {
				Ok(()) => {
					info!("interrupt received, stopping after the current cycle");
					raised.store(true, Ordering::SeqCst);
				},
				Err(e) => error!(error = %e, "unable to listen for interrupts"),
			}
		})?;

	Ok(flag)
}
