//! Drive an async agent call to completion from synchronous code.

use std::future::Future;
use toolloop_core::{Error, Result};

/// Run `future` on a private current-thread runtime.
///
/// Fails instead of panicking when called from inside a Tokio runtime.
pub(crate) fn block_on<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(Error::Internal(
            "blocking call made from inside an async runtime; use the async method instead".into(),
        ));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("failed to start blocking runtime: {e}")))?;

    runtime.block_on(future)
}
