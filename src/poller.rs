use crate::api::ApiClient;
use crate::config::DeskConfig;
use crate::event::AppEvent;
use std::future::Future;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, info};

/// Two independent refresh cycles: leaderboard/status and recommendations.
///
/// A tick never waits for the previous tick's request; each request runs in
/// its own task and reports back tagged with its tick number.
pub struct PollingScheduler {
    shutdown: watch::Sender<bool>,
    cycles: Vec<JoinHandle<()>>,
}

impl PollingScheduler {
    pub fn start(api: ApiClient, config: &DeskConfig, tx: mpsc::UnboundedSender<AppEvent>) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        info!(
            "Polling {} every {:?} (status) / {:?} (recommendations)",
            config.api_url, config.status_interval, config.recommendations_interval
        );

        let status_api = api.clone();
        let status = spawn_cycle(
            "status",
            config.status_interval,
            shutdown_rx.clone(),
            tx.clone(),
            move |seq| {
                let api = status_api.clone();
                async move {
                    AppEvent::StatusPolled {
                        seq,
                        result: api.status().await,
                    }
                }
            },
        );

        let recs = spawn_cycle(
            "recommendations",
            config.recommendations_interval,
            shutdown_rx,
            tx,
            move |seq| {
                let api = api.clone();
                async move {
                    AppEvent::RecommendationsPolled {
                        seq,
                        result: api.recommendations().await,
                    }
                }
            },
        );

        Self {
            shutdown,
            cycles: vec![status, recs],
        }
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for cycle in self.cycles {
            let _ = cycle.await;
        }
    }
}

fn spawn_cycle<F, Fut>(
    label: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    tx: mpsc::UnboundedSender<AppEvent>,
    request: F,
) -> JoinHandle<()>
where
    F: Fn(u64) -> Fut + Send + 'static,
    Fut: Future<Output = AppEvent> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut seq = 0u64;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => break,
            }
            if tx.is_closed() {
                break;
            }

            seq += 1;
            let pending = request(seq);
            let tx = tx.clone();
            tokio::spawn(async move {
                let _ = tx.send(pending.await);
            });
        }
        debug!("{} poller stopped after {} ticks", label, seq);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatusResponse;

    fn status_event(seq: u64) -> AppEvent {
        AppEvent::StatusPolled {
            seq,
            result: Ok(StatusResponse::default()),
        }
    }

    #[tokio::test]
    async fn test_ticks_do_not_wait_for_slow_requests() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let cycle = spawn_cycle("test", Duration::from_millis(20), shutdown_rx, tx, |seq| async move {
            if seq == 1 {
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
            status_event(seq)
        });

        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        let AppEvent::StatusPolled { seq, .. } = first else {
            panic!("unexpected event");
        };
        assert!(seq > 1, "tick 1 is still sleeping, a later tick must land first");

        let _ = shutdown.send(true);
        cycle.await.unwrap();
    }

    #[tokio::test]
    async fn test_sequence_numbers_increase() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let cycle = spawn_cycle("test", Duration::from_millis(10), shutdown_rx, tx, |seq| async move {
            status_event(seq)
        });

        let mut seen = Vec::new();
        while seen.len() < 3 {
            if let Some(AppEvent::StatusPolled { seq, .. }) =
                tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap()
            {
                seen.push(seq);
            }
        }
        let _ = shutdown.send(true);
        cycle.await.unwrap();

        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], 1);
    }

    #[tokio::test]
    async fn test_cycle_ends_when_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (_shutdown, shutdown_rx) = watch::channel(false);
        drop(rx);
        let cycle = spawn_cycle("test", Duration::from_millis(5), shutdown_rx, tx, |seq| async move {
            status_event(seq)
        });
        tokio::time::timeout(Duration::from_secs(2), cycle).await.unwrap().unwrap();
    }
}
