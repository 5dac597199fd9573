use crate::log_mode::LogMode;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "/etc/cyberguard/config.json";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Version actuelle du logiciel
    pub version: String,

    /// Période entre deux ticks de surveillance (en millisecondes)
    pub tick_interval_ms: u64,

    /// Nombre de points conservés dans la fenêtre glissante
    pub window_capacity: usize,

    /// Seuil d'alerte (0.0 - 1.0) appliqué à la probabilité du modèle
    pub alert_threshold: f64,

    /// Taille de la file d'événements vers l'affichage
    pub event_queue_size: usize,

    /// Nombre maximal d'alertes conservées en mémoire pour l'export
    pub alert_log_capacity: usize,

    /// Chemin vers le journal du trafic
    pub log_file: String,

    /// Niveau de log
    pub log_level: String,

    /// Mode de journalisation (fichier ou systemd-journal)
    pub log_mode: LogMode,

    /// Activer les statistiques en temps réel
    pub realtime_stats: bool,

    /// Afficher les statistiques en temps réel dans le terminal
    pub display_realtime_stats: bool,

    /// Paramètres d'entraînement du modèle
    pub training: TrainingConfig,

    /// Paramètres du générateur de trafic synthétique
    pub synthetic: SyntheticConfig,
}

/// Configuration de l'entraînement (jeu synthétique + forêt aléatoire)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    pub n_samples: usize,
    pub n_features: usize,
    pub n_informative: usize,
    /// Part du jeu réservée à l'évaluation
    pub test_fraction: f64,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Part des étiquettes tirées au hasard (bruit)
    pub flip_y: f64,
    pub class_sep: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_samples: 1000,
            n_features: 3,
            n_informative: 2,
            test_fraction: 0.2,
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            flip_y: 0.01,
            class_sep: 1.0,
            seed: 42,
        }
    }
}

/// Bornes du générateur de trafic synthétique (bornes hautes exclues)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SyntheticConfig {
    pub bytes_min: u64,
    pub bytes_max: u64,
    pub duration_min: f64,
    pub duration_max: f64,
    pub packet_size_min: u64,
    pub packet_size_max: u64,
    /// Graine fixe pour rejouer une séquence; aléatoire sinon
    pub seed: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            bytes_min: 100,
            bytes_max: 10_000,
            duration_min: 0.1,
            duration_max: 5.0,
            packet_size_min: 50,
            packet_size_max: 1500,
            seed: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: env!("CARGO_PKG_VERSION").to_string(),
            tick_interval_ms: 5000,
            window_capacity: crate::window::DEFAULT_WINDOW_CAPACITY,
            alert_threshold: 0.5,
            event_queue_size: 1000,
            alert_log_capacity: 10_000,
            log_file: "/var/log/cyberguard/traffic.log".to_string(),
            log_level: "info".to_string(),
            log_mode: LogMode::File,
            realtime_stats: false,
            display_realtime_stats: false,
            training: TrainingConfig::default(),
            synthetic: SyntheticConfig::default(),
        }
    }
}

impl Config {
    /// Charge la configuration depuis le fichier par défaut
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    /// Charge la configuration, en créant le fichier par défaut s'il n'existe pas
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let default_config = Config::default();
            default_config.save_to(path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire la configuration {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Configuration invalide dans {}", path.display()))?;
        config.validate()?;

        Ok(config)
    }

    /// Sauvegarde la configuration dans le fichier par défaut
    pub fn save(&self) -> Result<()> {
        self.save_to(CONFIG_FILE)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Impossible de créer le répertoire {}", parent.display())
                })?;
            }
        }

        let config_json = serde_json::to_string_pretty(self)
            .context("Impossible de sérialiser la configuration")?;
        fs::write(path, config_json)
            .with_context(|| format!("Impossible d'écrire la configuration {}", path.display()))?;

        Ok(())
    }

    /// Vérifie la cohérence des paramètres
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            bail!("tick_interval_ms doit être strictement positif");
        }
        if self.window_capacity == 0 {
            bail!("window_capacity doit être strictement positif");
        }
        if !(0.0..=1.0).contains(&self.alert_threshold) {
            bail!("alert_threshold doit être compris entre 0 et 1");
        }
        if !(self.training.test_fraction > 0.0 && self.training.test_fraction < 1.0) {
            bail!("training.test_fraction doit être compris strictement entre 0 et 1");
        }

        let synthetic = &self.synthetic;
        if synthetic.bytes_min > synthetic.bytes_max {
            bail!("synthetic.bytes_min dépasse synthetic.bytes_max");
        }
        if synthetic.packet_size_min > synthetic.packet_size_max {
            bail!("synthetic.packet_size_min dépasse synthetic.packet_size_max");
        }
        // L'écart doit rester fini pour le tirage uniforme
        if !(synthetic.duration_max - synthetic.duration_min).is_finite() {
            bail!("synthetic.duration_min et synthetic.duration_max doivent être finis");
        }
        if synthetic.duration_min > synthetic.duration_max {
            bail!("synthetic.duration_min dépasse synthetic.duration_max");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.window_capacity, 20);
        assert_eq!(config.tick_interval_ms, 5000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.alert_threshold = 0.8;
        config.training.seed = 7;
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.alert_threshold, 0.8);
        assert_eq!(reloaded.training.seed, 7);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "tick_interval_ms": 250 }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.tick_interval_ms, 250);
        assert_eq!(config.training, TrainingConfig::default());
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let mut config = Config::default();
        config.alert_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_synthetic_bounds() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.synthetic.bytes_min = 10_000;
        config.synthetic.bytes_max = 100;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.synthetic.packet_size_min = 1500;
        config.synthetic.packet_size_max = 64;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.synthetic.duration_min = 5.0;
        config.synthetic.duration_max = 1.0;
        assert!(config.validate().is_err());

        // Bornes finies mais écart infini
        let mut config = Config::default();
        config.synthetic.duration_min = -1e308;
        config.synthetic.duration_max = 1e308;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.synthetic.duration_max = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.synthetic.duration_min = 2.0;
        config.synthetic.duration_max = 2.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_rejects_inverted_synthetic_bounds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "synthetic": { "bytes_min": 900, "bytes_max": 10 } }"#).unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
