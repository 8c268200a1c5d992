//! Periodic delivery of scheduled messages.

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::usecase::DeliverScheduledUseCase;

/// Run `usecase` every `period` until the returned handle is aborted.
pub fn spawn_scheduler(usecase: Arc<DeliverScheduledUseCase>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("Scheduler started (every {:?})", period);

        loop {
            ticker.tick().await;
            let delivered = usecase.execute().await;
            if delivered > 0 {
                tracing::info!("Delivered {} scheduled message(s)", delivered);
            }
        }
    })
}
