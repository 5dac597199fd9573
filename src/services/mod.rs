//! Session de surveillance
//!
//! `MonitorService` possède le modèle courant, l'historique des alertes, la
//! file d'événements, le canal des instantanés et la boucle en cours.

mod export;
pub mod monitor;
pub mod stats;
pub mod traffic_source;

pub use export::AlertLog;
pub use monitor::{MonitorLoop, TickOutcome};
pub use traffic_source::{ReplaySource, SyntheticSource, TrafficSource};

use crate::analyzer;
use crate::classifier::{self, parse_threshold, validate_threshold, ModelHandle, ModelSlot};
use crate::config::{Config, TrainingConfig};
use crate::error::{DetectionError, Result};
use crate::models::{
    ClassificationResult, Counters, DashboardSnapshot, EventOrigin, Features, MonitorEvent,
};
use log::{error, info, warn};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::{JoinError, JoinHandle};

/// Boucle active et son signal d'arrêt
struct RunningLoop {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<Counters>,
}

pub struct MonitorService {
    config: Arc<RwLock<Config>>,
    model: Arc<ModelSlot>,
    alert_log: Arc<AlertLog>,
    event_tx: mpsc::Sender<MonitorEvent>,
    event_rx: parking_lot::Mutex<Option<mpsc::Receiver<MonitorEvent>>>,
    snapshot_tx: Arc<watch::Sender<DashboardSnapshot>>,
    running: Mutex<Option<RunningLoop>>,
}

impl MonitorService {
    /// Crée la session et entraîne le modèle initial
    pub async fn new(config: Arc<RwLock<Config>>) -> Result<Self> {
        let (training, threshold, event_queue_size, alert_log_capacity) = {
            let config = config.read().await;
            (
                config.training.clone(),
                config.alert_threshold,
                config.event_queue_size,
                config.alert_log_capacity,
            )
        };

        let threshold = validate_threshold(threshold)?;
        let handle = train_blocking(training).await?.with_threshold(threshold);
        info!(
            "Modèle initial entraîné: {} arbres, exactitude {:.2}%, seuil {:.2}",
            handle.n_estimators(),
            handle.accuracy,
            handle.threshold
        );

        let (event_tx, event_rx) = mpsc::channel(event_queue_size.max(1));
        let (snapshot_tx, _) = watch::channel(DashboardSnapshot {
            model_version: handle.version,
            accuracy: handle.accuracy,
            threshold: handle.threshold,
            ..DashboardSnapshot::default()
        });

        Ok(Self {
            config,
            model: Arc::new(ModelSlot::new(handle)),
            alert_log: Arc::new(AlertLog::new(alert_log_capacity)),
            event_tx,
            event_rx: parking_lot::Mutex::new(Some(event_rx)),
            snapshot_tx: Arc::new(snapshot_tx),
            running: Mutex::new(None),
        })
    }

    /// Démarre la boucle avec des compteurs et une fenêtre vierges
    pub async fn start(&self, source: Box<dyn TrafficSource>) -> Result<()> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(DetectionError::AlreadyRunning);
        }

        let (window_capacity, tick_interval) = {
            let config = self.config.read().await;
            (config.window_capacity, config.tick_interval())
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let monitor = MonitorLoop::new(
            Arc::clone(&self.model),
            window_capacity,
            Arc::clone(&self.alert_log),
            self.event_tx.clone(),
            Arc::clone(&self.snapshot_tx),
            tick_interval,
        );
        let task = tokio::spawn(monitor.run(source, shutdown_rx));

        *running = Some(RunningLoop { shutdown_tx, task });
        info!("Session de surveillance démarrée");
        Ok(())
    }

    /// Arrêt coopératif: attend la fin du tick en cours et renvoie le dernier état
    pub async fn stop(&self) -> Result<DashboardSnapshot> {
        let running = self
            .running
            .lock()
            .await
            .take()
            .ok_or(DetectionError::NotRunning)?;

        let _ = running.shutdown_tx.send(true);
        match running.task.await {
            Ok(counters) => info!(
                "Session de surveillance arrêtée ({} enregistrements, {} alertes)",
                counters.total_traffic, counters.total_alerts
            ),
            Err(e) => {
                error!("La boucle de surveillance s'est terminée anormalement: {}", e);
                self.snapshot_tx.send_modify(|snapshot| snapshot.running = false);
            }
        }

        Ok(self.snapshot())
    }

    /// Arrête la session éventuelle et en démarre une nouvelle; seule remise à zéro des compteurs
    pub async fn restart(&self, source: Box<dyn TrafficSource>) -> Result<()> {
        match self.stop().await {
            Ok(_) | Err(DetectionError::NotRunning) => {}
            Err(e) => return Err(e),
        }
        self.start(source).await
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Dernier instantané publié
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Remet le récepteur d'événements au consommateur d'affichage (une seule fois)
    pub fn take_events(&self) -> Option<mpsc::Receiver<MonitorEvent>> {
        self.event_rx.lock().take()
    }

    pub fn current_model(&self) -> Arc<ModelHandle> {
        self.model.current()
    }

    pub fn model_slot(&self) -> Arc<ModelSlot> {
        Arc::clone(&self.model)
    }

    pub fn alert_log(&self) -> Arc<AlertLog> {
        Arc::clone(&self.alert_log)
    }

    pub fn config(&self) -> Arc<RwLock<Config>> {
        Arc::clone(&self.config)
    }

    /// Réentraîne hors du runtime async puis publie le nouveau modèle
    pub async fn retrain(&self) -> Result<Arc<ModelHandle>> {
        let training = self.config.read().await.training.clone();
        let model = Arc::clone(&self.model);

        let published = tokio::task::spawn_blocking(move || model.retrain(&training))
            .await
            .map_err(interrupted)??;

        self.refresh_model();
        Ok(published)
    }

    /// Applique un seuil saisi par l'opérateur au modèle courant
    pub async fn set_threshold(&self, input: &str) -> Result<f64> {
        let threshold = parse_threshold(input)?;
        self.model.set_threshold(threshold)?;

        self.config.write().await.alert_threshold = threshold;
        self.refresh_model();

        info!("Seuil d'alerte fixé à {:.2}", threshold);
        Ok(threshold)
    }

    /// Analyse manuelle à partir de la saisie texte
    pub fn analyze_manual(
        &self,
        bytes: &str,
        duration: &str,
        packet_size: &str,
    ) -> Result<ClassificationResult> {
        let features = analyzer::parse_features(bytes, duration, packet_size)?;
        self.classify_manual(features)
    }

    pub fn analyze_features(
        &self,
        bytes: f64,
        duration: f64,
        packet_size: f64,
    ) -> Result<ClassificationResult> {
        let features = analyzer::check_features(bytes, duration, packet_size)?;
        self.classify_manual(features)
    }

    /// Exporte l'historique des alertes; le fichier est complet ou absent
    pub fn export_alerts(&self, path: impl AsRef<Path>) -> Result<usize> {
        self.alert_log.export(path)
    }

    // Les compteurs et la fenêtre appartiennent à la boucle: une analyse
    // manuelle ne produit qu'un événement et, le cas échéant, une alerte.
    fn classify_manual(&self, features: Features) -> Result<ClassificationResult> {
        let handle = self.model.current();
        let result = analyzer::analyze(features, &handle)?;

        info!(
            "Analyse manuelle: {} (p={:.2}, modèle v{})",
            result.label, result.probability, result.model_version
        );

        let event = MonitorEvent::new(EventOrigin::Manual, result);
        self.alert_log.push(&event);
        if let Err(TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("File d'événements pleine, analyse manuelle non publiée");
        }

        Ok(result)
    }

    // Relu sous le verrou du canal: le dernier écrivain publie toujours le modèle courant
    fn refresh_model(&self) {
        self.snapshot_tx.send_modify(|snapshot| {
            let handle = self.model.current();
            snapshot.model_version = handle.version;
            snapshot.accuracy = handle.accuracy;
            snapshot.threshold = handle.threshold;
        });
    }
}

async fn train_blocking(training: TrainingConfig) -> Result<ModelHandle> {
    tokio::task::spawn_blocking(move || classifier::train(&training))
        .await
        .map_err(interrupted)?
}

fn interrupted(e: JoinError) -> DetectionError {
    DetectionError::TrainingFailure(format!("tâche d'entraînement interrompue: {}", e))
}
