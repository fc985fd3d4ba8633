use anyhow::Result;

/// Everything in day2day runs on a single thread. Timers and channels are all the concurrency it
/// needs.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
