use super::export::AlertLog;
use super::traffic_source::TrafficSource;
use crate::classifier::{classify_record, ModelSlot};
use crate::models::{Counters, DashboardSnapshot, EventOrigin, MonitorEvent};
use crate::window::RollingWindow;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};

/// Issue d'un tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Enregistrement classé et publié
    Classified,
    /// Classification impossible; compteurs inchangés
    Skipped,
    /// La source n'a rien fourni
    Idle,
}

/// Boucle de surveillance: seule propriétaire de la fenêtre et des compteurs
pub struct MonitorLoop {
    model: Arc<ModelSlot>,
    window: RollingWindow,
    counters: Counters,
    alert_log: Arc<AlertLog>,
    event_tx: mpsc::Sender<MonitorEvent>,
    snapshot_tx: Arc<watch::Sender<DashboardSnapshot>>,
    tick_interval: Duration,
}

impl MonitorLoop {
    pub fn new(
        model: Arc<ModelSlot>,
        window_capacity: usize,
        alert_log: Arc<AlertLog>,
        event_tx: mpsc::Sender<MonitorEvent>,
        snapshot_tx: Arc<watch::Sender<DashboardSnapshot>>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            model,
            window: RollingWindow::new(window_capacity),
            counters: Counters::default(),
            alert_log,
            event_tx,
            snapshot_tx,
            tick_interval,
        }
    }

    /// Exécute les ticks jusqu'au signal d'arrêt, vérifié entre deux ticks
    pub async fn run(
        mut self,
        mut source: Box<dyn TrafficSource>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Counters {
        let mut interval = time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Boucle de surveillance démarrée (période {} ms)",
            self.tick_interval.as_millis()
        );
        self.publish(true);

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = interval.tick() => {}
            }

            if *shutdown.borrow() {
                break;
            }

            self.tick(source.as_mut()).await;
        }

        self.publish(false);
        info!(
            "Boucle de surveillance arrêtée: {} enregistrements, {} alertes",
            self.counters.total_traffic, self.counters.total_alerts
        );
        self.counters
    }

    /// Un tick: tirage, classification, fenêtre, compteurs, événement, publication
    pub async fn tick(&mut self, source: &mut dyn TrafficSource) -> TickOutcome {
        let Some(record) = source.next_record().await else {
            debug!("Aucun enregistrement disponible pour ce tick");
            return TickOutcome::Idle;
        };

        let handle = self.model.current();
        let result = match classify_record(&record, &handle) {
            Ok(result) => result,
            Err(e) => {
                warn!("Tick ignoré: {}", e);
                return TickOutcome::Skipped;
            }
        };

        self.window.push(record);
        self.counters.record(result.label);

        let event = MonitorEvent::new(EventOrigin::Monitor, result);
        self.alert_log.push(&event);
        self.emit(event);
        self.publish(true);

        TickOutcome::Classified
    }

    fn emit(&self, event: MonitorEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("File d'événements pleine, événement abandonné");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Aucun consommateur d'événements");
            }
        }
    }

    fn publish(&self, running: bool) {
        let counters = self.counters;
        let window = self.window.snapshot();
        let series = self.window.series();

        self.snapshot_tx.send_modify(|snapshot| {
            let handle = self.model.current();
            snapshot.counters = counters;
            snapshot.window = window;
            snapshot.series = series;
            snapshot.model_version = handle.version;
            snapshot.accuracy = handle.accuracy;
            snapshot.threshold = handle.threshold;
            snapshot.running = running;
            snapshot.last_update = SystemTime::now();
        });
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::train;
    use crate::config::TrainingConfig;
    use crate::models::TrafficRecord;
    use crate::services::traffic_source::ReplaySource;

    fn monitor(capacity: usize) -> (MonitorLoop, mpsc::Receiver<MonitorEvent>) {
        let cfg = TrainingConfig {
            n_estimators: 10,
            ..TrainingConfig::default()
        };
        let slot = Arc::new(ModelSlot::new(train(&cfg).unwrap()));
        let (event_tx, event_rx) = mpsc::channel(64);
        let (snapshot_tx, _) = watch::channel(DashboardSnapshot::default());

        let monitor = MonitorLoop::new(
            slot,
            capacity,
            Arc::new(AlertLog::new(100)),
            event_tx,
            Arc::new(snapshot_tx),
            Duration::from_millis(10),
        );
        (monitor, event_rx)
    }

    #[tokio::test]
    async fn test_tick_updates_window_and_counters() {
        let (mut monitor, mut events) = monitor(20);
        let mut source = ReplaySource::new(vec![TrafficRecord::new(5000.0, 2.0, 800.0)]);

        assert_eq!(monitor.tick(&mut source).await, TickOutcome::Classified);
        assert_eq!(monitor.counters().total_traffic, 1);
        assert_eq!(monitor.window().len(), 1);

        let event = events.recv().await.unwrap();
        assert_eq!(event.origin, EventOrigin::Monitor);
        assert_eq!(event.result.record.bytes, 5000.0);
    }

    #[tokio::test]
    async fn test_skipped_tick_leaves_state_untouched() {
        let (mut monitor, _events) = monitor(20);
        let mut source = ReplaySource::new(vec![TrafficRecord::new(f64::NAN, 1.0, 1.0)]);

        assert_eq!(monitor.tick(&mut source).await, TickOutcome::Skipped);
        assert_eq!(monitor.counters(), Counters::default());
        assert!(monitor.window().is_empty());
    }

    #[tokio::test]
    async fn test_idle_tick_when_source_is_empty() {
        let (mut monitor, _events) = monitor(20);
        let mut source = ReplaySource::new(Vec::new());

        assert_eq!(monitor.tick(&mut source).await, TickOutcome::Idle);
        assert_eq!(monitor.counters().total_traffic, 0);
    }

    #[tokio::test]
    async fn test_full_event_queue_does_not_block() {
        let (mut monitor, _events) = monitor(5);
        let records = (0..200).map(|i| TrafficRecord::new(i as f64, 1.0, 100.0));
        let mut source = ReplaySource::new(records);

        for _ in 0..200 {
            monitor.tick(&mut source).await;
        }
        assert_eq!(monitor.counters().total_traffic, 200);
        assert_eq!(monitor.window().len(), 5);
    }

    #[tokio::test]
    async fn test_snapshot_carries_window_series() {
        let (mut monitor, _events) = monitor(3);
        let mut snapshots = monitor.snapshot_tx.subscribe();
        let records = (1..=4).map(|i| TrafficRecord::new(i as f64 * 100.0, 1.0, 50.0));
        let mut source = ReplaySource::new(records);

        for _ in 0..4 {
            monitor.tick(&mut source).await;
        }

        let snapshot = snapshots.borrow_and_update().clone();
        assert_eq!(snapshot.series.bytes, vec![200.0, 300.0, 400.0]);
        assert_eq!(snapshot.series.len(), snapshot.window.len());
    }
}
