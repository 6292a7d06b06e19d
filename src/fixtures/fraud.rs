//! Fraud-classifier fixture
//!
//! A random forest trained on a hand-written transaction set. Features are
//! `[amount, merchant_risk, account_age, txn_per_day, hour]`; the two
//! classes are separated by construction (fraudulent rows combine high
//! amounts, young accounts, and late-night hours), so the fitted forest
//! reproduces the training labels exactly.

use super::Fixture;
use crate::forest::RandomForestClassifier;
use crate::io::Model;
use crate::Result;
use ndarray::{arr2, Array2};
use serde_json::json;

const N_ESTIMATORS: usize = 10;
const MAX_DEPTH: usize = 5;
const SEED: u64 = 42;

pub(crate) const FEATURE_NAMES: [&str; 5] =
    ["amount", "merchant_risk", "account_age", "txn_per_day", "hour"];

/// The hand-written training set: 8 legitimate rows, then 8 fraudulent ones
pub fn fraud_training_data() -> (Array2<f32>, Vec<usize>) {
    let x = arr2(&[
        // Legitimate transactions
        [50.0, 0.2, 500.0, 3.0, 14.0],
        [25.0, 0.1, 800.0, 1.0, 10.0],
        [75.0, 0.3, 600.0, 5.0, 12.0],
        [100.0, 0.2, 400.0, 4.0, 15.0],
        [30.0, 0.1, 900.0, 2.0, 11.0],
        [45.0, 0.2, 700.0, 3.0, 13.0],
        [60.0, 0.3, 500.0, 4.0, 16.0],
        [80.0, 0.2, 600.0, 3.0, 14.0],
        // Fraudulent transactions
        [450.0, 0.8, 5.0, 45.0, 3.0],
        [500.0, 0.9, 10.0, 50.0, 2.0],
        [300.0, 0.7, 30.0, 25.0, 4.0],
        [400.0, 0.8, 20.0, 30.0, 1.0],
        [350.0, 0.9, 15.0, 40.0, 5.0],
        [480.0, 0.8, 8.0, 48.0, 2.0],
        [420.0, 0.7, 25.0, 35.0, 3.0],
        [380.0, 0.9, 12.0, 42.0, 4.0],
    ]);
    let y = vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1];
    (x, y)
}

/// Train the forest and flatten it into the exportable fixture
pub fn build_fraud_model() -> Result<Model> {
    let (x, y) = fraud_training_data();

    let mut forest = RandomForestClassifier::new(N_ESTIMATORS, MAX_DEPTH, SEED);
    forest.fit(&x, &y)?;

    let model = forest
        .to_model(Fixture::Fraud.base_name())?
        .with_custom("feature_names", json!(FEATURE_NAMES))
        .with_custom("class_labels", json!([0, 1]));
    Ok(model)
}
