use crate::error::{DetectionError, Result};
use crate::logger::journal_line;
use crate::models::MonitorEvent;
use log::info;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Historique borné des alertes (boucle et analyses manuelles)
#[derive(Debug)]
pub struct AlertLog {
    entries: Mutex<VecDeque<MonitorEvent>>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// N'enregistre que les alertes; les événements bénins sont ignorés
    pub fn push(&self, event: &MonitorEvent) {
        if !event.is_alert() {
            return;
        }
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(*event);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn entries(&self) -> Vec<MonitorEvent> {
        self.entries.lock().iter().copied().collect()
    }

    /// Rendu texte, une ligne par alerte
    pub fn render(&self) -> String {
        render_entries(&self.entries.lock())
    }

    /// Écrit l'historique vers `path` en une seule fois: fichier temporaire puis renommage
    pub fn export(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let (content, count) = {
            let entries = self.entries.lock();
            (render_entries(&entries), entries.len())
        };

        let failure = |source: std::io::Error| DetectionError::ExportFailure {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(failure)?;
        tmp.write_all(content.as_bytes()).map_err(failure)?;
        tmp.as_file().sync_all().map_err(failure)?;
        tmp.persist(path).map_err(|e| failure(e.error))?;

        info!("{} alerte(s) exportée(s) vers {}", count, path.display());
        Ok(count)
    }
}

fn render_entries(entries: &VecDeque<MonitorEvent>) -> String {
    entries
        .iter()
        .map(|event| format!("{}\n", journal_line(event)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassificationResult, EventOrigin, Label, TrafficRecord};
    use tempfile::tempdir;

    fn event(label: Label, bytes: f64) -> MonitorEvent {
        MonitorEvent::new(
            EventOrigin::Monitor,
            ClassificationResult {
                record: TrafficRecord::new(bytes, 1.0, 100.0),
                label,
                probability: 0.7,
                model_version: 1,
            },
        )
    }

    #[test]
    fn test_only_alerts_are_kept() {
        let log = AlertLog::new(10);
        log.push(&event(Label::Benign, 1.0));
        log.push(&event(Label::Malicious, 2.0));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let log = AlertLog::new(2);
        for i in 0..5 {
            log.push(&event(Label::Malicious, i as f64));
        }
        let bytes: Vec<f64> = log.entries().iter().map(|e| e.result.record.bytes).collect();
        assert_eq!(bytes, vec![3.0, 4.0]);
    }

    #[test]
    fn test_export_empty_log_creates_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.txt");

        let count = AlertLog::new(10).export(&path).unwrap();
        assert_eq!(count, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_export_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.txt");
        std::fs::write(&path, "ancien contenu\n").unwrap();

        let log = AlertLog::new(10);
        log.push(&event(Label::Malicious, 42.0));
        log.export(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, log.render());
        assert!(!content.contains("ancien"));
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent").join("alerts.txt");

        let err = AlertLog::new(10).export(&path).unwrap_err();
        assert!(matches!(err, DetectionError::ExportFailure { .. }));
        assert!(!path.exists());
    }
}
