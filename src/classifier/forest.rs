//! Forêt aléatoire
//!
//! Ensemble d'arbres de décision `linfa_trees` (impureté de Gini), chacun
//! entraîné sur un échantillon bootstrap tiré d'un `StdRng` dérivé de la graine
//! maîtresse. La probabilité prédite est la part des arbres votant « malveillant ».

use super::dataset::Dataset;
use crate::config::TrainingConfig;
use crate::error::{DetectionError, Result};
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Hyperparamètres de la forêt
#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl From<&TrainingConfig> for ForestParams {
    fn from(cfg: &TrainingConfig) -> Self {
        Self {
            n_estimators: cfg.n_estimators,
            max_depth: cfg.max_depth,
            min_samples_split: cfg.min_samples_split.max(2),
            seed: cfg.seed,
        }
    }
}

/// Forêt aléatoire entraînée, en lecture seule après `fit`
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree<f64, usize>>,
    n_features: usize,
}

impl RandomForest {
    /// Entraîne une forêt sur un jeu étiqueté 0/1
    pub fn fit(data: &Dataset, params: &ForestParams) -> Result<Self> {
        validate(data)?;
        if params.n_estimators == 0 {
            return Err(DetectionError::TrainingFailure(
                "n_estimators doit être strictement positif".to_string(),
            ));
        }

        let n_samples = data.len();
        let n_features = data.n_features();
        let records = Array2::from_shape_fn((n_samples, n_features), |(r, c)| data.features[r][c]);
        let targets = Array1::from(data.labels.clone());

        let mut master = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            // Échantillon bootstrap de même taille que le jeu
            let mut rng = StdRng::seed_from_u64(master.random::<u64>());
            let boot: Vec<usize> = (0..n_samples).map(|_| rng.random_range(0..n_samples)).collect();

            let dataset = DatasetBase::new(
                records.select(Axis(0), &boot),
                targets.select(Axis(0), &boot),
            );

            let tree = DecisionTree::params()
                .split_quality(SplitQuality::Gini)
                .max_depth(params.max_depth)
                .min_weight_split(params.min_samples_split as f32)
                .fit(&dataset)
                .map_err(|e| {
                    DetectionError::TrainingFailure(format!("échec d'un arbre de décision: {}", e))
                })?;
            trees.push(tree);
        }

        Ok(Self { trees, n_features })
    }

    /// Part des arbres votant « malveillant »
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        let input = Array1::from(features.to_vec()).insert_axis(Axis(0));
        let votes = self
            .trees
            .iter()
            .filter(|tree| tree.predict(&input).first() == Some(&1))
            .count();
        votes as f64 / self.trees.len() as f64
    }

    /// Étiquette majoritaire (0/1)
    pub fn predict(&self, features: &[f64]) -> usize {
        usize::from(self.predict_proba(features) > 0.5)
    }

    /// Exactitude en pourcentage sur un jeu d'évaluation
    pub fn score(&self, data: &Dataset) -> f64 {
        if data.is_empty() || data.n_features() != self.n_features {
            return 0.0;
        }

        let records =
            Array2::from_shape_fn((data.len(), self.n_features), |(r, c)| data.features[r][c]);
        let mut votes = vec![0usize; data.len()];
        for tree in &self.trees {
            let predicted: Array1<usize> = tree.predict(&records);
            for (count, label) in votes.iter_mut().zip(predicted.iter()) {
                *count += *label;
            }
        }

        let correct = votes
            .iter()
            .zip(&data.labels)
            .filter(|(&count, &label)| {
                let proba = count as f64 / self.trees.len() as f64;
                usize::from(proba > 0.5) == label
            })
            .count();

        correct as f64 / data.len() as f64 * 100.0
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }
}

fn validate(data: &Dataset) -> Result<()> {
    if data.is_empty() {
        return Err(DetectionError::TrainingFailure("jeu d'entraînement vide".to_string()));
    }
    if data.features.len() != data.labels.len() {
        return Err(DetectionError::TrainingFailure(format!(
            "{} lignes pour {} étiquettes",
            data.features.len(),
            data.labels.len()
        )));
    }

    let width = data.n_features();
    if width == 0 {
        return Err(DetectionError::TrainingFailure("aucune caractéristique".to_string()));
    }
    for (i, row) in data.features.iter().enumerate() {
        if row.len() != width {
            return Err(DetectionError::TrainingFailure(format!(
                "ligne {}: {} caractéristiques au lieu de {}",
                i,
                row.len(),
                width
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(DetectionError::TrainingFailure(format!(
                "ligne {}: valeur non finie",
                i
            )));
        }
    }

    if let Some(label) = data.labels.iter().find(|&&l| l > 1) {
        return Err(DetectionError::TrainingFailure(format!("étiquette inconnue: {}", label)));
    }
    let positives = data.labels.iter().filter(|&&l| l == 1).count();
    if positives == 0 || positives == data.len() {
        return Err(DetectionError::TrainingFailure(
            "une seule classe présente dans le jeu".to_string(),
        ));
    }

    Ok(())
}
