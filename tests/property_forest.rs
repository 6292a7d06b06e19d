//! Property tests for the tree ensemble

use forjar::forest::{Criterion, DecisionTree, MaxFeatures, RandomForestClassifier, TreeParams};
use ndarray::Array2;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn dataset(rows: Vec<Vec<f32>>) -> (Array2<f32>, Vec<usize>) {
    let n = rows.len();
    let d = rows[0].len();
    let y: Vec<usize> = (0..n).map(|i| i % 2).collect();
    let x = Array2::from_shape_vec((n, d), rows.concat()).unwrap();
    (x, y)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_proba_rows_sum_to_one(
        rows in prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 3), 4..16),
        seed in any::<u64>(),
    ) {
        let (x, y) = dataset(rows);
        let mut forest = RandomForestClassifier::new(5, 4, seed);
        forest.fit(&x, &y).unwrap();

        let proba = forest.predict_proba(&x).unwrap();
        for row in proba.rows() {
            let sum: f32 = row.iter().sum();
            prop_assert!((sum - 1.0).abs() < 1e-4, "row sums to {sum}");
            for &p in row {
                prop_assert!((0.0..=1.0 + 1e-6).contains(&p));
            }
        }
    }

    #[test]
    fn prop_depth_limit_holds(
        rows in prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 2), 4..24),
        max_depth in 1usize..6,
        seed in any::<u64>(),
    ) {
        let (x, y) = dataset(rows);
        let mut forest = RandomForestClassifier::new(4, max_depth, seed);
        forest.fit(&x, &y).unwrap();
        for tree in forest.trees() {
            prop_assert!(tree.depth() <= max_depth);
        }
    }

    #[test]
    fn prop_predictions_are_valid_labels(
        rows in prop::collection::vec(prop::collection::vec(-5.0f32..5.0, 3), 4..16),
        seed in any::<u64>(),
    ) {
        let (x, y) = dataset(rows);
        let mut forest = RandomForestClassifier::new(3, 3, seed);
        forest.fit(&x, &y).unwrap();
        for label in forest.predict(&x).unwrap() {
            prop_assert!(label < forest.n_classes());
        }
    }

    #[test]
    fn prop_fit_is_deterministic_for_seed(
        rows in prop::collection::vec(prop::collection::vec(-10.0f32..10.0, 2), 4..12),
        seed in any::<u64>(),
    ) {
        let (x, y) = dataset(rows);
        let mut a = RandomForestClassifier::new(3, 4, seed);
        let mut b = RandomForestClassifier::new(3, 4, seed);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        prop_assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn prop_single_tree_with_all_features_fits_separable_data(
        gap in 1.0f32..5.0,
        seed in any::<u64>(),
    ) {
        // two clusters separated along feature 0 by at least `gap`
        let x = Array2::from_shape_vec(
            (6, 2),
            vec![
                0.0, 0.3, 0.1, 0.1, 0.2, 0.4, //
                gap + 1.0, 0.2, gap + 1.1, 0.4, gap + 1.2, 0.1,
            ],
        )
        .unwrap();
        let y = vec![0, 0, 0, 1, 1, 1];

        let mut params = TreeParams::new(4);
        params.max_features = MaxFeatures::All;
        params.criterion = Criterion::Gini;
        let mut rng = StdRng::seed_from_u64(seed);
        let tree = DecisionTree::fit(&x, &y, 2, &params, &mut rng).unwrap();

        for (i, &label) in y.iter().enumerate() {
            let proba = tree.predict_proba_row(x.row(i));
            prop_assert!(proba[label] > 0.99);
        }
    }
}
