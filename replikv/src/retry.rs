use std::future::Future;

use labrpc::{anyhow::Result, log::debug};

use crate::config::Jitter;

/// Calls `call` until it succeeds, sleeping one `jitter` sample before every
/// attempt. There is no attempt limit and the delay never grows: the network
/// is assumed to deliver eventually. `target` only labels log lines.
pub async fn retry_until_ok<T, F, Fut>(jitter: &Jitter, target: &str, mut call: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u64 = 0;
    loop {
        jitter.sleep().await;
        attempt += 1;
        match call().await {
            Ok(v) => {
                if attempt > 1 {
                    debug!("{} succeeded after {} attempts", target, attempt);
                }
                return v;
            }
            Err(e) => debug!("attempt {} on {} failed: {:#}", attempt, target, e),
        }
    }
}
