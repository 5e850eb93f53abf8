use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

/// Ejecuta una tarea periódica. La primera ejecución es inmediata.
pub struct Timer {
    interval: Duration,
}

impl Timer {
    pub fn new(seconds: u64) -> Self {
        Self {
            interval: Duration::from_secs(seconds.max(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn start<F, Fut>(&self, mut task: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let mut interval = time::interval(self.interval);
        // Un tick lento retrasa el siguiente en vez de encadenar ticks atrasados
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            debug!("Tick del temporizador ({}s)", self.interval.as_secs());
            task().await;
        }
    }
}
