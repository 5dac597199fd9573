//! Jeu d'entraînement synthétique
//!
//! Génère un problème de classification binaire: des nuages gaussiens placés
//! sur les sommets d'un hypercube dans les dimensions informatives, deux
//! nuages par classe, complétés par des dimensions de bruit.

use crate::config::TrainingConfig;
use crate::error::{DetectionError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Nombre de nuages gaussiens par classe
const CLUSTERS_PER_CLASS: usize = 2;
const N_CLASSES: usize = 2;

/// Jeu de données étiqueté (0 = bénin, 1 = malveillant)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
}

impl Dataset {
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<usize>) -> Self {
        Self { features, labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.features.first().map(|row| row.len()).unwrap_or(0)
    }

    fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Tirage gaussien centré réduit (Box-Muller)
pub(crate) fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Génère le jeu synthétique décrit par `cfg`, reproductible pour une graine donnée
pub fn make_classification(cfg: &TrainingConfig) -> Result<Dataset> {
    let n_clusters = N_CLASSES * CLUSTERS_PER_CLASS;

    if cfg.n_informative == 0 || cfg.n_informative > cfg.n_features {
        return Err(DetectionError::TrainingFailure(format!(
            "n_informative ({}) doit être compris entre 1 et n_features ({})",
            cfg.n_informative, cfg.n_features
        )));
    }
    // 2^n_informative sommets disponibles pour placer les nuages
    if cfg.n_informative < usize::BITS as usize && (1usize << cfg.n_informative) < n_clusters {
        return Err(DetectionError::TrainingFailure(format!(
            "n_informative ({}) trop faible pour {} nuages",
            cfg.n_informative, n_clusters
        )));
    }
    if !(cfg.class_sep.is_finite() && cfg.class_sep > 0.0) {
        return Err(DetectionError::TrainingFailure(format!(
            "class_sep doit être strictement positif (reçu {})",
            cfg.class_sep
        )));
    }
    if cfg.n_samples < n_clusters {
        return Err(DetectionError::TrainingFailure(format!(
            "au moins {} échantillons sont nécessaires (reçu {})",
            n_clusters, cfg.n_samples
        )));
    }

    let mut rng = StdRng::seed_from_u64(cfg.seed);

    // Sommets distincts de l'hypercube, tirés au hasard
    let mut vertices: Vec<Vec<f64>> = Vec::with_capacity(n_clusters);
    while vertices.len() < n_clusters {
        let vertex: Vec<f64> = (0..cfg.n_informative)
            .map(|_| if rng.random_bool(0.5) { cfg.class_sep } else { -cfg.class_sep })
            .collect();
        if !vertices.contains(&vertex) {
            vertices.push(vertex);
        }
    }

    let base = cfg.n_samples / n_clusters;
    let remainder = cfg.n_samples % n_clusters;

    let mut features = Vec::with_capacity(cfg.n_samples);
    let mut labels = Vec::with_capacity(cfg.n_samples);

    for (cluster, centroid) in vertices.iter().enumerate() {
        let count = base + usize::from(cluster < remainder);
        let class = cluster % N_CLASSES;

        // Covariance propre au nuage
        let transform: Vec<Vec<f64>> = (0..cfg.n_informative)
            .map(|_| {
                (0..cfg.n_informative)
                    .map(|_| 2.0 * rng.random::<f64>() - 1.0)
                    .collect()
            })
            .collect();

        for _ in 0..count {
            let z: Vec<f64> = (0..cfg.n_informative)
                .map(|_| standard_normal(&mut rng))
                .collect();

            let mut row = Vec::with_capacity(cfg.n_features);
            for (i, center) in centroid.iter().enumerate() {
                let mixed: f64 = transform[i].iter().zip(&z).map(|(a, b)| a * b).sum();
                row.push(mixed + center);
            }
            for _ in cfg.n_informative..cfg.n_features {
                row.push(standard_normal(&mut rng));
            }

            features.push(row);
            labels.push(class);
        }
    }

    if cfg.flip_y > 0.0 {
        let flip = cfg.flip_y.min(1.0);
        for label in labels.iter_mut() {
            if rng.random_bool(flip) {
                *label = rng.random_range(0..N_CLASSES);
            }
        }
    }

    let mut order: Vec<usize> = (0..features.len()).collect();
    order.shuffle(&mut rng);

    Ok(Dataset::new(features, labels).select(&order))
}

/// Sépare le jeu en (entraînement, évaluation); l'évaluation reçoit ceil(n * test_fraction) lignes
pub fn train_test_split(data: &Dataset, test_fraction: f64, seed: u64) -> Result<(Dataset, Dataset)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(DetectionError::TrainingFailure(format!(
            "test_fraction invalide: {}",
            test_fraction
        )));
    }

    let n = data.len();
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(DetectionError::TrainingFailure(format!(
            "découpage impossible: {} échantillons pour une part de test de {}",
            n, test_fraction
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    Ok((data.select(train_idx), data.select(test_idx)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_balance() {
        let cfg = TrainingConfig::default();
        let data = make_classification(&cfg).unwrap();

        assert_eq!(data.len(), 1000);
        assert_eq!(data.n_features(), 3);

        let positives = data.labels.iter().filter(|&&l| l == 1).count();
        assert!(positives > 400 && positives < 600, "positifs: {}", positives);
    }

    #[test]
    fn test_same_seed_same_data() {
        let cfg = TrainingConfig::default();
        assert_eq!(make_classification(&cfg).unwrap(), make_classification(&cfg).unwrap());
    }

    #[test]
    fn test_rejects_too_few_informative() {
        let cfg = TrainingConfig {
            n_informative: 1,
            ..TrainingConfig::default()
        };
        assert!(matches!(
            make_classification(&cfg),
            Err(DetectionError::TrainingFailure(_))
        ));
    }

    #[test]
    fn test_split_sizes() {
        let data = make_classification(&TrainingConfig::default()).unwrap();
        let (train, test) = train_test_split(&data, 0.2, 42).unwrap();

        assert_eq!(train.len(), 800);
        assert_eq!(test.len(), 200);
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        let data = make_classification(&TrainingConfig::default()).unwrap();
        assert!(train_test_split(&data, 1.0, 42).is_err());
        assert!(train_test_split(&data, 0.0, 42).is_err());
    }
}
