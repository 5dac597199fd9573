use crate::window::TrafficSeries;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Nombre de caractéristiques par enregistrement (octets, durée, taille de paquet)
pub const FEATURE_COUNT: usize = 3;

/// Vecteur de caractéristiques présenté au classifieur
pub type Features = [f64; FEATURE_COUNT];

/// Enregistrement de trafic déjà extrait (valeur immuable)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrafficRecord {
    pub timestamp: SystemTime,
    pub bytes: f64,
    pub duration: f64,
    pub packet_size: f64,
}

impl TrafficRecord {
    pub fn new(bytes: f64, duration: f64, packet_size: f64) -> Self {
        Self::at(SystemTime::now(), bytes, duration, packet_size)
    }

    pub fn at(timestamp: SystemTime, bytes: f64, duration: f64, packet_size: f64) -> Self {
        Self {
            timestamp,
            bytes,
            duration,
            packet_size,
        }
    }

    /// Caractéristiques dans l'ordre attendu par le modèle
    pub fn features(&self) -> Features {
        [self.bytes, self.duration, self.packet_size]
    }
}

/// Verdict du classifieur
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Label {
    Benign,
    Malicious,
}

impl Label {
    pub fn is_malicious(self) -> bool {
        self == Label::Malicious
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Benign => write!(f, "BENIGN"),
            Label::Malicious => write!(f, "ALERT"),
        }
    }
}

/// Résultat d'une classification, immuable après création
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ClassificationResult {
    pub record: TrafficRecord,
    pub label: Label,
    /// Part des arbres ayant voté « malveillant » (0.0 - 1.0)
    pub probability: f64,
    pub model_version: u64,
}

/// Compteurs de session, croissants jusqu'au prochain redémarrage
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Counters {
    pub total_traffic: u64,
    pub total_alerts: u64,
}

impl Counters {
    pub fn record(&mut self, label: Label) {
        self.total_traffic += 1;
        if label.is_malicious() {
            self.total_alerts += 1;
        }
    }
}

/// Provenance d'un événement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventOrigin {
    /// Boucle de surveillance
    Monitor,
    /// Analyse manuelle demandée par l'opérateur
    Manual,
}

impl fmt::Display for EventOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventOrigin::Monitor => write!(f, "monitor"),
            EventOrigin::Manual => write!(f, "manual"),
        }
    }
}

/// Événement publié vers le consommateur d'affichage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MonitorEvent {
    pub kind: Label,
    pub origin: EventOrigin,
    pub result: ClassificationResult,
    pub timestamp: SystemTime,
}

impl MonitorEvent {
    pub fn new(origin: EventOrigin, result: ClassificationResult) -> Self {
        Self {
            kind: result.label,
            origin,
            result,
            timestamp: SystemTime::now(),
        }
    }

    pub fn is_alert(&self) -> bool {
        self.kind.is_malicious()
    }
}

/// Copie immuable de l'état publié après chaque tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub counters: Counters,
    /// Fenêtre glissante, de la plus ancienne à la plus récente
    pub window: Vec<TrafficRecord>,
    /// Séries dérivées de la fenêtre, prêtes pour le graphique
    pub series: TrafficSeries,
    pub model_version: u64,
    pub accuracy: f64,
    pub threshold: f64,
    pub running: bool,
    pub last_update: SystemTime,
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        Self {
            counters: Counters::default(),
            window: Vec::new(),
            series: TrafficSeries::default(),
            model_version: 0,
            accuracy: 0.0,
            threshold: 0.5,
            running: false,
            last_update: SystemTime::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_record() {
        let mut counters = Counters::default();
        counters.record(Label::Benign);
        counters.record(Label::Malicious);
        counters.record(Label::Malicious);

        assert_eq!(counters.total_traffic, 3);
        assert_eq!(counters.total_alerts, 2);
    }

    #[test]
    fn test_record_features_order() {
        let record = TrafficRecord::new(5000.0, 2.0, 800.0);
        assert_eq!(record.features(), [5000.0, 2.0, 800.0]);
    }
}
