//! Runtime for a single check run

use std::future::Future;

/// Drive `future` to completion on a current-thread runtime.
///
/// The runtime is shut down without waiting for blocking tasks, so a driver
/// call abandoned after its timeout cannot hold the process open.
pub fn run_once<F: Future>(future: F) -> std::io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}
