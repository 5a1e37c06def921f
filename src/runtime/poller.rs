//! Periodic background jobs
//!
//! The index poller re-checks remote index freshness; the serial listener
//! polls the attached ports and updates the state when they change. Both
//! run until their cancellation token fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;
use crate::infra::serial::PortLister;
use crate::runtime::services::Services;

/// Check index freshness every `period`, starting one period from now
pub fn spawn_index_poller(
    services: Services,
    period: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticks.tick() => {
                    match services.check_indexes(false).await {
                        Ok(changed) => tracing::debug!("Index check done (changed: {changed})"),
                        Err(RuntimeError::StateClosed) => break,
                        Err(e) => tracing::warn!("Index check failed: {e}"),
                    }
                }
            }
        }
        tracing::debug!("Index poller stopped");
    })
}

/// Poll `lister` every `period`, publishing changes
pub fn spawn_serial_listener(
    services: Services,
    lister: Arc<dyn PortLister>,
    period: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last: Option<Vec<String>> = None;
        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticks.tick() => {
                    match poll_ports(&services, lister.as_ref(), &mut last).await {
                        Ok(()) => {}
                        Err(RuntimeError::StateClosed) => break,
                        Err(e) => tracing::warn!("Serial poll failed: {e}"),
                    }
                }
            }
        }
        tracing::debug!("Serial listener stopped");
    })
}

async fn poll_ports(
    services: &Services,
    lister: &dyn PortLister,
    last: &mut Option<Vec<String>>,
) -> Result<(), RuntimeError> {
    let ports = lister.list_ports();
    if last.as_ref() == Some(&ports) {
        return Ok(());
    }
    if last.is_none() && services.state().serial_ports().await? == ports {
        *last = Some(ports);
        return Ok(());
    }

    tracing::debug!("Serial ports changed: {ports:?}");
    let transition = services.state().set_serial_ports(ports.clone()).await?;
    *last = Some(ports);
    services.apply_transition(transition).await
}
