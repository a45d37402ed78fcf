//! Periodic purge of stale push tokens

use crate::registry::TokenRegistry;
use chrono::Duration;
use medpush_db::{DbError, PushTokenRepository};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

/// Deletes tokens created more than `stale_after` ago.
pub async fn run_retention_pass<P: PushTokenRepository>(
    registry: &TokenRegistry<P>,
    stale_after: Duration,
) -> Result<u64, DbError> {
    registry.purge_stale(stale_after).await
}

/// Runs [`run_retention_pass`] now and then every `every`.
///
/// Failures are logged and the sweep keeps going.
pub fn spawn_retention_sweep<P>(
    registry: Arc<TokenRegistry<P>>,
    stale_after: Duration,
    every: std::time::Duration,
) -> JoinHandle<()>
where
    P: PushTokenRepository + 'static,
{
    let every = every.max(std::time::Duration::from_secs(1));
    info!(
        "Token retention sweep every {:?}, purging tokens older than {} days",
        every,
        stale_after.num_days()
    );

    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match run_retention_pass(&registry, stale_after).await {
                Ok(_) => {}
                Err(e) if e.is_connectivity() => {
                    warn!("Token retention pass skipped, database unreachable: {}", e)
                }
                Err(e) => error!("Token retention pass failed: {}", e),
            }
        }
    })
}
