//! Module classifieur
//!
//! Enveloppe la forêt aléatoire dans un `ModelHandle` versionné et immuable.
//! Le réentraînement et le changement de seuil publient un nouveau handle par
//! échange atomique dans un `ModelSlot`; les lecteurs en cours gardent l'ancien.

pub mod dataset;
pub mod forest;

use crate::config::TrainingConfig;
use crate::error::{DetectionError, Result};
use crate::models::{ClassificationResult, Features, Label, TrafficRecord};
use chrono::{DateTime, Utc};
use log::info;
use parking_lot::RwLock;
use std::sync::Arc;

pub use dataset::{make_classification, train_test_split, Dataset};
pub use forest::{ForestParams, RandomForest};

/// Seuil par défaut: vote majoritaire
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Modèle entraîné, publié en entier ou pas du tout
#[derive(Debug, Clone)]
pub struct ModelHandle {
    forest: Arc<RandomForest>,
    /// Exactitude mesurée sur le jeu d'évaluation (en %)
    pub accuracy: f64,
    pub version: u64,
    /// Probabilité au-delà de laquelle le trafic est jugé malveillant
    pub threshold: f64,
    pub trained_at: DateTime<Utc>,
}

impl ModelHandle {
    /// Copie partageant la même forêt avec un autre seuil
    pub fn with_threshold(&self, threshold: f64) -> Self {
        Self {
            threshold,
            ..self.clone()
        }
    }

    /// Probabilité « malveillant » pour un vecteur de caractéristiques
    pub fn probability(&self, features: &Features) -> Result<f64> {
        if let Some(value) = features.iter().find(|v| !v.is_finite()) {
            return Err(DetectionError::ClassificationSkip(format!(
                "caractéristique non finie: {}",
                value
            )));
        }
        if features.len() != self.forest.n_features() {
            return Err(DetectionError::ClassificationSkip(format!(
                "{} caractéristiques fournies, {} attendues par le modèle",
                features.len(),
                self.forest.n_features()
            )));
        }
        Ok(self.forest.predict_proba(features))
    }

    pub fn n_estimators(&self) -> usize {
        self.forest.n_estimators()
    }
}

/// Entraîne un nouveau modèle sur le jeu synthétique et mesure son exactitude
pub fn train(cfg: &TrainingConfig) -> Result<ModelHandle> {
    let data = make_classification(cfg)?;
    let (train_set, test_set) = train_test_split(&data, cfg.test_fraction, cfg.seed)?;
    train_on(&train_set, &test_set, cfg)
}

/// Entraîne sur un jeu fourni; échoue sur des données mal formées
pub fn train_on(train_set: &Dataset, test_set: &Dataset, cfg: &TrainingConfig) -> Result<ModelHandle> {
    let forest = RandomForest::fit(train_set, &ForestParams::from(cfg))?;
    let accuracy = forest.score(test_set);

    Ok(ModelHandle {
        forest: Arc::new(forest),
        accuracy,
        version: 1,
        threshold: DEFAULT_THRESHOLD,
        trained_at: Utc::now(),
    })
}

/// Équivalent à `train`; la publication est à la charge de l'appelant (voir `ModelSlot::retrain`)
pub fn retrain(cfg: &TrainingConfig) -> Result<ModelHandle> {
    train(cfg)
}

/// Classe un vecteur; déterministe pour un handle donné, qui n'est jamais modifié
pub fn classify(features: &Features, handle: &ModelHandle) -> Result<Label> {
    let probability = handle.probability(features)?;
    Ok(decide(probability, handle.threshold))
}

/// Classe un enregistrement et conserve la version du modèle utilisé
pub fn classify_record(record: &TrafficRecord, handle: &ModelHandle) -> Result<ClassificationResult> {
    let probability = handle.probability(&record.features())?;
    Ok(ClassificationResult {
        record: *record,
        label: decide(probability, handle.threshold),
        probability,
        model_version: handle.version,
    })
}

fn decide(probability: f64, threshold: f64) -> Label {
    if probability > threshold {
        Label::Malicious
    } else {
        Label::Benign
    }
}

/// Emplacement partagé du modèle courant
///
/// Les lecteurs clonent l'`Arc` sous un verrou de lecture bref et classent
/// ensuite sans verrou: une classification voit l'ancien ou le nouveau handle,
/// jamais un mélange.
#[derive(Debug)]
pub struct ModelSlot {
    current: RwLock<Arc<ModelHandle>>,
}

impl ModelSlot {
    pub fn new(handle: ModelHandle) -> Self {
        Self {
            current: RwLock::new(Arc::new(handle)),
        }
    }

    pub fn current(&self) -> Arc<ModelHandle> {
        self.current.read().clone()
    }

    /// Publie un modèle fraîchement entraîné: version suivante, seuil courant conservé
    pub fn publish(&self, mut handle: ModelHandle) -> Arc<ModelHandle> {
        let mut current = self.current.write();
        handle.version = current.version + 1;
        handle.threshold = current.threshold;
        let handle = Arc::new(handle);
        *current = Arc::clone(&handle);
        handle
    }

    /// Réentraîne puis publie; en cas d'échec le modèle précédent reste en place
    pub fn retrain(&self, cfg: &TrainingConfig) -> Result<Arc<ModelHandle>> {
        let handle = retrain(cfg)?;
        let published = self.publish(handle);
        info!(
            "Modèle réentraîné: version {}, exactitude {:.2}%",
            published.version, published.accuracy
        );
        Ok(published)
    }

    /// Publie le même modèle avec un nouveau seuil (même version)
    pub fn set_threshold(&self, threshold: f64) -> Result<Arc<ModelHandle>> {
        validate_threshold(threshold)?;
        let mut current = self.current.write();
        let handle = Arc::new(current.with_threshold(threshold));
        *current = Arc::clone(&handle);
        Ok(handle)
    }
}

pub fn validate_threshold(threshold: f64) -> Result<f64> {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(DetectionError::InvalidInput(format!(
            "le seuil doit être compris entre 0 et 1 (reçu {})",
            threshold
        )))
    }
}

/// Lit un seuil saisi par l'opérateur
pub fn parse_threshold(input: &str) -> Result<f64> {
    let value: f64 = input.trim().parse().map_err(|_| {
        DetectionError::InvalidInput(format!("seuil non numérique: {:?}", input))
    })?;
    validate_threshold(value)
}
