//! Bibliothèque CyberGuard pour la détection d'anomalies dans le trafic réseau
//!
//! Un classifieur par forêt aléatoire, entraîné sur un jeu synthétique, juge
//! chaque enregistrement de trafic bénin ou malveillant. Une boucle de
//! surveillance périodique alimente une fenêtre glissante et des compteurs,
//! publiés sous forme d'instantanés pour l'affichage.

// Modules principaux
pub mod models;     // Structures de données et modèles
pub mod config;     // Configuration du système
pub mod error;      // Erreurs du noyau de détection
pub mod logger;     // Journal du trafic observé
pub mod log_mode;   // Modes de journalisation

// Détection
pub mod classifier; // Jeu synthétique, forêt aléatoire et modèle publié
pub mod analyzer;   // Analyse manuelle à la demande
pub mod window;     // Fenêtre glissante des derniers enregistrements

// Session de surveillance et services associés
pub mod services;

// Re-export des structures principales pour faciliter l'utilisation
pub use classifier::{classify, ModelHandle, ModelSlot};
pub use error::{DetectionError, Result};
pub use log_mode::LogMode;
pub use models::{ClassificationResult, Counters, DashboardSnapshot, Label, MonitorEvent, TrafficRecord};
pub use services::{MonitorService, ReplaySource, SyntheticSource, TrafficSource};
pub use window::RollingWindow;
