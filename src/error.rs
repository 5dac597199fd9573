use std::path::PathBuf;
use thiserror::Error;

/// Erreurs du noyau de détection
#[derive(Debug, Error)]
pub enum DetectionError {
    /// Saisie manuelle ou seuil mal formé; aucun état n'est modifié
    #[error("entrée invalide: {0}")]
    InvalidInput(String),

    /// L'entraînement n'a pas pu aboutir; le modèle précédent reste actif
    #[error("échec de l'entraînement: {0}")]
    TrainingFailure(String),

    /// Un enregistrement n'a pas pu être classé; le tick est ignoré
    #[error("enregistrement ignoré: {0}")]
    ClassificationSkip(String),

    #[error("échec de l'export vers {path}: {source}")]
    ExportFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("la surveillance est déjà en cours")]
    AlreadyRunning,

    #[error("aucune surveillance en cours")]
    NotRunning,
}

pub type Result<T> = std::result::Result<T, DetectionError>;
