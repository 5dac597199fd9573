//! Fenêtre glissante des derniers enregistrements
//!
//! Tampon FIFO à capacité fixe alimentant la visualisation. Seule la boucle de
//! surveillance l'écrit; les lecteurs reçoivent une copie via `snapshot()`.

use crate::models::TrafficRecord;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::SystemTime;

/// Nombre de points conservés par défaut pour le graphique
pub const DEFAULT_WINDOW_CAPACITY: usize = 20;

#[derive(Debug, Clone)]
pub struct RollingWindow {
    records: VecDeque<TrafficRecord>,
    capacity: usize,
}

impl RollingWindow {
    /// Une capacité nulle est ramenée à 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Ajoute un enregistrement et évince le plus ancien au-delà de la capacité
    pub fn push(&mut self, record: TrafficRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Copie ordonnée (ordre d'arrivée) indépendante de la structure vivante
    pub fn snapshot(&self) -> Vec<TrafficRecord> {
        self.records.iter().copied().collect()
    }

    pub fn series(&self) -> TrafficSeries {
        TrafficSeries::from_records(self.records.iter())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

/// Séries dérivées de la fenêtre, une par axe du graphique
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficSeries {
    pub timestamps: Vec<SystemTime>,
    pub bytes: Vec<f64>,
    pub durations: Vec<f64>,
    pub packet_sizes: Vec<f64>,
}

impl TrafficSeries {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a TrafficRecord>,
    {
        let mut series = TrafficSeries::default();
        for record in records {
            series.timestamps.push(record.timestamp);
            series.bytes.push(record.bytes);
            series.durations.push(record.duration);
            series.packet_sizes.push(record.packet_size);
        }
        series
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Moyennes (octets, durée, taille de paquet); `None` sur une fenêtre vide
    pub fn means(&self) -> Option<[f64; 3]> {
        if self.is_empty() {
            return None;
        }
        let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len() as f64;
        Some([mean(&self.bytes), mean(&self.durations), mean(&self.packet_sizes)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(i: usize) -> TrafficRecord {
        TrafficRecord::new(i as f64, 1.0, 100.0)
    }

    #[test]
    fn test_push_below_capacity() {
        let mut window = RollingWindow::new(20);
        for i in 0..5 {
            window.push(record(i));
        }
        assert_eq!(window.len(), 5);
        assert_eq!(window.snapshot()[0].bytes, 0.0);
    }

    #[test]
    fn test_eviction_keeps_most_recent_in_order() {
        let mut window = RollingWindow::new(20);
        for i in 0..57 {
            window.push(record(i));
        }

        let snapshot = window.snapshot();
        assert_eq!(snapshot.len(), 20);
        let bytes: Vec<f64> = snapshot.iter().map(|r| r.bytes).collect();
        let expected: Vec<f64> = (37..57).map(|i| i as f64).collect();
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut window = RollingWindow::new(3);
        window.push(record(1));
        let snapshot = window.snapshot();
        window.push(record(2));
        window.push(record(3));
        window.push(record(4));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].bytes, 1.0);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut window = RollingWindow::new(0);
        window.push(record(1));
        window.push(record(2));
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.snapshot()[0].bytes, 2.0);
    }

    #[test]
    fn test_series_follow_window() {
        let mut window = RollingWindow::new(2);
        window.push(TrafficRecord::new(10.0, 0.5, 60.0));
        window.push(TrafficRecord::new(20.0, 1.5, 70.0));
        window.push(TrafficRecord::new(30.0, 2.5, 80.0));

        let series = window.series();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bytes, vec![20.0, 30.0]);
        assert_eq!(series.durations, vec![1.5, 2.5]);
        assert_eq!(series.packet_sizes, vec![70.0, 80.0]);
        assert_eq!(series.means(), Some([25.0, 2.0, 75.0]));
    }

    #[test]
    fn test_empty_series_has_no_means() {
        assert_eq!(RollingWindow::new(5).series().means(), None);
    }
}
