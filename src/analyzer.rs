//! Analyse manuelle à la demande
//!
//! L'opérateur fournit les trois champs sous forme de texte. Une seule valeur
//! invalide rejette toute la saisie; rien n'est classé dans ce cas.

use crate::classifier::{classify_record, ModelHandle};
use crate::error::{DetectionError, Result};
use crate::models::{ClassificationResult, Features, TrafficRecord};

/// Lit un champ numérique saisi par l'opérateur
pub fn parse_field(name: &str, input: &str) -> Result<f64> {
    let value: f64 = input.trim().parse().map_err(|_| {
        DetectionError::InvalidInput(format!("{}: valeur non numérique {:?}", name, input))
    })?;
    check_field(name, value)
}

fn check_field(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(DetectionError::InvalidInput(format!(
            "{}: valeur non finie ({})",
            name, value
        )))
    }
}

/// Convertit la saisie brute en vecteur de caractéristiques
pub fn parse_features(bytes: &str, duration: &str, packet_size: &str) -> Result<Features> {
    Ok([
        parse_field("bytes", bytes)?,
        parse_field("duration", duration)?,
        parse_field("packet_size", packet_size)?,
    ])
}

/// Variante typée: mêmes contrôles que la saisie texte
pub fn check_features(bytes: f64, duration: f64, packet_size: f64) -> Result<Features> {
    Ok([
        check_field("bytes", bytes)?,
        check_field("duration", duration)?,
        check_field("packet_size", packet_size)?,
    ])
}

/// Classe un vecteur validé contre le handle fourni
pub fn analyze(features: Features, handle: &ModelHandle) -> Result<ClassificationResult> {
    let [bytes, duration, packet_size] = features;
    classify_record(&TrafficRecord::new(bytes, duration, packet_size), handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::train;
    use crate::config::TrainingConfig;

    #[test]
    fn test_parse_features_trims_input() {
        assert_eq!(
            parse_features(" 5000 ", "2", "800.5").unwrap(),
            [5000.0, 2.0, 800.5]
        );
    }

    #[test]
    fn test_one_bad_field_rejects_everything() {
        let err = parse_features("abc", "12", "500").unwrap_err();
        match err {
            DetectionError::InvalidInput(msg) => assert!(msg.starts_with("bytes")),
            other => panic!("erreur inattendue: {:?}", other),
        }

        let err = parse_features("1", "2", "").unwrap_err();
        match err {
            DetectionError::InvalidInput(msg) => assert!(msg.starts_with("packet_size")),
            other => panic!("erreur inattendue: {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        assert!(matches!(
            parse_features("inf", "1", "1"),
            Err(DetectionError::InvalidInput(_))
        ));
        assert!(matches!(
            check_features(1.0, f64::NAN, 1.0),
            Err(DetectionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_analyze_is_deterministic() {
        let handle = train(&TrainingConfig {
            n_estimators: 10,
            ..TrainingConfig::default()
        })
        .unwrap();
        let features = parse_features("5000", "2", "800").unwrap();

        let first = analyze(features, &handle).unwrap();
        let second = analyze(features, &handle).unwrap();
        assert_eq!(first.label, second.label);
        assert_eq!(first.probability, second.probability);
        assert_eq!(first.model_version, handle.version);
    }
}
