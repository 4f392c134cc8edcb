use super::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn toy_data() -> (Vec<Vec<f32>>, Vec<f32>) {
    // y = 0.25 * x0 + 0.5 * x1, inputs drawn from {0, 1, 2}
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for a in 0..3 {
        for b in 0..3 {
            xs.push(vec![a as f32, b as f32]);
            ys.push(0.25 * a as f32 + 0.5 * b as f32);
        }
    }
    (xs, ys)
}

fn fit_config(epochs: usize) -> FitConfig {
    FitConfig::new().with_epochs(epochs).with_learning_rate(0.01)
}

#[test]
fn test_network_output_shape() {
    let device = Default::default();
    let network = RegressorNetworkConfig::new(6)
        .with_hidden_units(3)
        .init_zeros::<InferBackend>(&device);
    let input = Tensor::<InferBackend, 2>::zeros([4, 6], &device);
    assert_eq!(network.forward(input).dims(), [4, 1]);
}

#[test]
fn test_same_seed_same_model() {
    let a = MlpRegressor::new(5, 8, &mut StdRng::seed_from_u64(7));
    let b = MlpRegressor::new(5, 8, &mut StdRng::seed_from_u64(7));
    assert_eq!(a.parameters().unwrap(), b.parameters().unwrap());

    let c = MlpRegressor::new(5, 8, &mut StdRng::seed_from_u64(8));
    assert_ne!(a.parameters().unwrap(), c.parameters().unwrap());

    // 5x8 + 8 hidden, 8x1 + 1 output
    assert_eq!(a.parameters().unwrap().len(), 57);
}

#[test]
fn test_predict_width_mismatch() {
    let model = MlpRegressor::zeros(10, 4);
    assert_eq!(model.predict(&[0.0; 10]).unwrap(), 0.0);

    for width in [9, 37] {
        let err = model.predict(&vec![0.0; width]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::StructuralMismatch { expected: 10, actual } if actual == width
        ));
    }
}

#[test]
fn test_fit_reduces_loss() {
    let (xs, ys) = toy_data();
    let mut rng = StdRng::seed_from_u64(42);
    let mut model = MlpRegressor::new(2, 16, &mut rng);

    let before = model.mse(&xs, &ys).unwrap();
    let losses = model.fit(&xs, &ys, &fit_config(300), &mut rng).unwrap();
    let after = model.mse(&xs, &ys).unwrap();

    assert_eq!(losses.len(), 300);
    assert!(after < before, "mse {} -> {}", before, after);
    assert!(losses[299] < losses[0]);
}

#[test]
fn test_fit_with_small_batches() {
    let (xs, ys) = toy_data();
    let mut rng = StdRng::seed_from_u64(4);
    let mut model = MlpRegressor::new(2, 8, &mut rng);

    let before = model.mse(&xs, &ys).unwrap();
    let config = fit_config(100).with_batch_size(2);
    model.fit(&xs, &ys, &config, &mut rng).unwrap();
    assert!(model.mse(&xs, &ys).unwrap() < before);
}

#[test]
fn test_fit_is_deterministic() {
    let (xs, ys) = toy_data();
    let train = || {
        let mut rng = StdRng::seed_from_u64(3);
        let mut model = MlpRegressor::new(2, 4, &mut rng);
        let losses = model.fit(&xs, &ys, &fit_config(20), &mut rng).unwrap();
        (model.parameters().unwrap(), losses)
    };
    assert_eq!(train(), train());
}

#[test]
fn test_fit_rejects_bad_input() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut model = MlpRegressor::new(2, 4, &mut rng);

    assert!(matches!(
        model.fit(&[], &[], &fit_config(1), &mut rng),
        Err(ModelError::EmptyDataset)
    ));
    assert!(matches!(
        model.fit(&[vec![1.0, 2.0, 3.0]], &[0.5], &fit_config(1), &mut rng),
        Err(ModelError::StructuralMismatch { expected: 2, actual: 3 })
    ));
    assert!(matches!(
        model.fit(&[vec![1.0, 2.0]], &[0.5], &fit_config(1).with_batch_size(0), &mut rng),
        Err(ModelError::InvalidConfig(_))
    ));
}

#[test]
fn test_save_load_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");

    let model = MlpRegressor::new(37, 6, &mut StdRng::seed_from_u64(11));
    model.save(&path).unwrap();
    assert!(path.exists());
    assert!(dir.path().join("model.config.json").exists());

    let loaded = MlpRegressor::load(&path).unwrap();
    assert_eq!(loaded.input_width(), 37);
    assert_eq!(loaded.hidden_units(), 6);
    assert_eq!(loaded.parameters().unwrap(), model.parameters().unwrap());
    let x = vec![1.0; 37];
    assert_eq!(model.predict(&x).unwrap(), loaded.predict(&x).unwrap());
}

#[test]
fn test_load_missing_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let err = MlpRegressor::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ModelError::ResourceUnavailable { .. }));

    // Record without its shape sidecar
    let path = dir.path().join("model.json");
    MlpRegressor::zeros(4, 2).save(&path).unwrap();
    std::fs::remove_file(dir.path().join("model.config.json")).unwrap();
    assert!(matches!(
        MlpRegressor::load(&path).unwrap_err(),
        ModelError::ResourceUnavailable { .. }
    ));
}

#[test]
fn test_load_rejects_inconsistent_shapes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    MlpRegressor::zeros(4, 2).save(&path).unwrap();

    // Sidecar claims a wider input than the stored record.
    RegressorNetworkConfig::new(9)
        .with_hidden_units(2)
        .save(dir.path().join("model.config.json"))
        .unwrap();
    assert!(matches!(
        MlpRegressor::load(&path).unwrap_err(),
        ModelError::InvalidArtifact(_)
    ));
}

#[test]
fn test_load_rejects_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    MlpRegressor::zeros(4, 2).save(&path).unwrap();

    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(
        MlpRegressor::load(&path).unwrap_err(),
        ModelError::InvalidArtifact(_)
    ));

    std::fs::write(dir.path().join("model.config.json"), "{").unwrap();
    assert!(matches!(
        MlpRegressor::load(&path).unwrap_err(),
        ModelError::InvalidArtifact(_)
    ));
}
