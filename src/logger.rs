use crate::log_mode::LogMode;
use crate::models::{EventOrigin, Label, MonitorEvent};
use chrono::{DateTime, Local};
use log::{error, info, warn};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Formate un événement sur une ligne, identique dans le journal et l'export
pub fn journal_line(event: &MonitorEvent) -> String {
    let timestamp: DateTime<Local> = event.timestamp.into();
    let record = &event.result.record;

    let message = match (event.kind, event.origin) {
        (Label::Malicious, EventOrigin::Monitor) => "Trafic suspect détecté",
        (Label::Malicious, EventOrigin::Manual) => "Activité malveillante détectée (analyse manuelle)",
        (Label::Benign, EventOrigin::Monitor) => "Trafic normal",
        (Label::Benign, EventOrigin::Manual) => "Trafic bénin (analyse manuelle)",
    };

    format!(
        "[{}] [{}] {}: bytes={} duration={:.3} packet_size={} | p={:.2} modèle v{}",
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        event.kind,
        message,
        record.bytes,
        record.duration,
        record.packet_size,
        event.result.probability,
        event.result.model_version
    )
}

/// Journal texte du trafic observé, destiné à l'opérateur
pub struct EventJournal {
    log_file: Mutex<Option<File>>,
    log_path: String,
    log_mode: LogMode,
}

impl EventJournal {
    pub fn new(log_path: String) -> Self {
        Self::new_with_mode(log_path, LogMode::File)
    }

    pub fn new_with_mode(log_path: String, log_mode: LogMode) -> Self {
        let file = if log_mode == LogMode::File {
            Self::open(&log_path)
        } else {
            // En mode systemd-journal, pas besoin de fichier
            None
        };

        Self {
            log_file: Mutex::new(file),
            log_path,
            log_mode,
        }
    }

    fn open(log_path: &str) -> Option<File> {
        if let Some(parent) = Path::new(log_path).parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                error!("Erreur lors de la création du répertoire de logs: {}", e);
            }
        }

        match OpenOptions::new().create(true).append(true).open(log_path) {
            Ok(file) => Some(file),
            Err(e) => {
                error!("Erreur lors de l'ouverture du fichier de log {}: {}", log_path, e);
                None
            }
        }
    }

    pub fn log_event(&self, event: &MonitorEvent) {
        let entry = journal_line(event);

        match self.log_mode {
            LogMode::File => self.write_to_log(&format!("{}\n", entry)),
            LogMode::SystemdJournal => {
                if event.is_alert() {
                    warn!("{}", entry);
                } else {
                    info!("{}", entry);
                }
            }
        }
    }

    pub fn log_path(&self) -> &str {
        &self.log_path
    }

    fn write_to_log(&self, message: &str) {
        let mut log_file_guard = self.log_file.lock();

        if let Some(file) = log_file_guard.as_mut() {
            if let Err(e) = file.write_all(message.as_bytes()) {
                error!("Erreur lors de l'écriture dans le fichier de log: {}", e);

                // Essayer de réouvrir le fichier
                *log_file_guard = Self::open(&self.log_path);
            }
        }
    }
}
