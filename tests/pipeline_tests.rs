use chrono::{Local, NaiveDate};
use fraud_stream::config::{AppConfig, ModelFormat};
use fraud_stream::dashboard::DashboardPublisher;
use fraud_stream::generator::{ReferenceDataset, TransactionGenerator};
use fraud_stream::models::dense::{Activation, DenseLayer, DenseNetwork};
use fraud_stream::models::load_classifier;
use fraud_stream::{ScoringLoop, TransactionStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tempfile::TempDir;

/// Single sigmoid unit with a large negative bias: every score is ~0.007,
/// so only ground-truth labels flag fraud.
fn quiet_model() -> DenseNetwork {
    DenseNetwork {
        name: "quiet".to_string(),
        layers: vec![DenseLayer {
            kernel: vec![vec![0.0]; 30],
            bias: vec![-5.0],
            activation: Activation::Sigmoid,
        }],
    }
}

fn dataset_csv() -> String {
    let mut header = vec!["Time".to_string()];
    header.extend((1..=28).map(|i| format!("V{i}")));
    header.push("Amount".to_string());
    header.push("Class".to_string());

    let mut lines = vec![header.join(",")];
    for row in 0..5 {
        let mut vals = vec![row.to_string()];
        vals.extend((1..=28).map(|i| format!("{:.3}", (row * 28 + i) as f64 / 100.0)));
        vals.push(format!("{}.50", row + 1));
        vals.push("0".to_string());
        lines.push(vals.join(","));
    }
    lines.join("\n")
}

async fn setup(dir: &TempDir) -> (AppConfig, TransactionStore, TransactionGenerator) {
    let model_path = dir.path().join("model.json");
    std::fs::write(&model_path, serde_json::to_vec(&quiet_model()).unwrap()).unwrap();

    let dataset_path = dir.path().join("creditcard.csv");
    std::fs::write(&dataset_path, dataset_csv()).unwrap();

    let mut config = AppConfig::default();
    config.store.dir = dir.path().join("transactions");
    config.model.path = model_path;
    config.model.format = ModelFormat::Dense;
    config.producer.dataset_path = dataset_path;

    let store = TransactionStore::open(&config.store.dir).await.unwrap();
    let dataset = ReferenceDataset::load(&config.producer.dataset_path).unwrap();
    (config, store, TransactionGenerator::new(dataset))
}

#[tokio::test]
async fn generated_transactions_are_scored_once() {
    let dir = TempDir::new().unwrap();
    let (config, store, generator) = setup(&dir).await;
    assert_eq!(generator.dataset().len(), 5);

    let mut rng = StdRng::seed_from_u64(2024);
    let mut written = Vec::new();
    for _ in 0..25 {
        let tx = generator.generate(&mut rng, Local::now().naive_local());
        store.write(&tx).await.unwrap();
        written.push(tx);
    }
    let labelled = written.iter().filter(|t| t.ground_truth()).count() as u64;

    let classifier = load_classifier(&config.model).unwrap();
    let (publisher, snapshots) =
        DashboardPublisher::new(config.dashboard.refresh_interval(), config.dashboard.recent_rows);
    let mut scoring = ScoringLoop::new(store.clone(), classifier, publisher, &config);

    let report = scoring.poll_once().await.unwrap();
    assert_eq!(report.scored, 25);
    assert_eq!(report.failed, 0);
    assert!(store.list_pending().await.unwrap().is_empty());

    let summary = scoring.summary();
    assert_eq!(summary.total_transactions, 25);
    assert_eq!(summary.fraud_count, labelled);
    let total: f64 = written.iter().map(|t| t.amount).sum();
    assert!((summary.total_amount - total).abs() < 1e-6);

    // replaying the same files is a no-op for the aggregates
    for tx in &written {
        store.write(tx).await.unwrap();
    }
    let report = scoring.poll_once().await.unwrap();
    assert_eq!(report.scored, 0);
    assert_eq!(report.duplicates, 25);
    assert_eq!(scoring.summary().total_transactions, 25);

    scoring
        .run_until(tokio::time::sleep(Duration::from_millis(50)))
        .await;
    let snapshot = snapshots.borrow();
    assert_eq!(snapshot.summary.total_transactions, 25);
    assert_eq!(snapshot.history.len(), 25);
    assert_eq!(snapshot.recent.len(), 10);
}

#[tokio::test]
async fn history_is_bounded_and_sorted() {
    let dir = TempDir::new().unwrap();
    let (mut config, store, generator) = setup(&dir).await;
    config.dashboard.history_size = 5;

    let mut rng = StdRng::seed_from_u64(9);
    let base = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
    // later ids get earlier timestamps
    for hour in (0..8).rev() {
        let tx = generator.generate(&mut rng, base.and_hms_opt(hour, 0, 0).unwrap());
        store.write(&tx).await.unwrap();
    }

    let classifier = load_classifier(&config.model).unwrap();
    let (publisher, snapshots) = DashboardPublisher::new(Duration::ZERO, 10);
    let mut scoring = ScoringLoop::new(store, classifier, publisher, &config);
    scoring.poll_once().await.unwrap();
    scoring.run_until(async {}).await;

    let snapshot = snapshots.borrow();
    assert_eq!(snapshot.summary.total_transactions, 8);
    assert_eq!(snapshot.history.len(), 5);
    let times: Vec<_> = snapshot.history.iter().map(|p| p.timestamp).collect();
    let mut sorted = times.clone();
    sorted.sort();
    assert_eq!(times, sorted);
}

#[tokio::test]
async fn unreadable_files_are_reported_on_the_dashboard() {
    let dir = TempDir::new().unwrap();
    let (config, store, _generator) = setup(&dir).await;
    std::fs::write(store.path_for("broken"), b"{\"id\": 1}").unwrap();

    let classifier = load_classifier(&config.model).unwrap();
    let (publisher, snapshots) = DashboardPublisher::new(Duration::ZERO, 10);
    let mut scoring = ScoringLoop::new(store.clone(), classifier, publisher, &config);

    let report = scoring.poll_once().await.unwrap();
    assert_eq!(report.failed, 1);
    assert!(store.path_for("broken").exists());

    assert!(scoring.maybe_publish(std::time::Instant::now()));
    let snapshot = snapshots.borrow();
    assert_eq!(snapshot.errors.len(), 1);
    assert_eq!(snapshot.errors[0].kind, "malformed");
    assert_eq!(snapshot.summary.failed_files, 1);
}
