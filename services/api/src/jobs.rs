//! services/api/src/jobs.rs
//!
//! Background cleanup: expired OTP records hourly and old email-queue entries
//! daily. Both loops stop when the shared cancellation token fires.

use chrono::{DateTime, Duration, Utc};
use doctor_finder_core::ports::{DatabaseService, PortResult};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::OtpPolicy;

/// Deletes every OTP record that has expired as of `now`.
pub async fn purge_expired_otps(db: &dyn DatabaseService, now: DateTime<Utc>) -> PortResult<u64> {
    let removed = db.purge_expired_otps(now).await?;
    info!(removed, "Purged expired OTP records");
    Ok(removed)
}

/// Deletes email-queue entries created at or before `now - retention`.
pub async fn purge_email_queue(
    db: &dyn DatabaseService,
    now: DateTime<Utc>,
    retention: Duration,
) -> PortResult<u64> {
    let removed = db.purge_email_queue(now - retention).await?;
    info!(removed, "Purged old email queue entries");
    Ok(removed)
}

/// Runs `job` every `period` until `token` is cancelled. The first run happens
/// one full period after start.
async fn run_periodically<F, Fut>(
    name: &'static str,
    period: std::time::Duration,
    token: CancellationToken,
    mut job: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = PortResult<u64>>,
{
    let start = tokio::time::Instant::now() + period;
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                info!(job = name, "Cleanup job stopped.");
                return;
            }
            _ = ticker.tick() => {
                if let Err(e) = job().await {
                    error!(job = name, "Cleanup job failed: {}", e);
                }
            }
        }
    }
}

/// Spawns the OTP sweep and the email-queue sweep.
pub fn spawn_cleanup_jobs(
    db: Arc<dyn DatabaseService>,
    policy: &OtpPolicy,
    token: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let otp_db = db.clone();
    let otp_sweep = tokio::spawn(run_periodically(
        "otp_sweep",
        policy.sweep_interval,
        token.clone(),
        move || {
            let db = otp_db.clone();
            async move { purge_expired_otps(db.as_ref(), Utc::now()).await }
        },
    ));

    let retention = policy.email_queue_retention;
    let email_sweep = tokio::spawn(run_periodically(
        "email_queue_sweep",
        policy.email_queue_sweep_interval,
        token,
        move || {
            let db = db.clone();
            async move { purge_email_queue(db.as_ref(), Utc::now(), retention).await }
        },
    ));

    vec![otp_sweep, email_sweep]
}
