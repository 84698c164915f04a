use knapsack_eval::app::pipelines::{GreedyJob, GreedyPipeline, OutputFormat};
use knapsack_eval::core::Pipeline;
use knapsack_eval::utils::error::ErrorSeverity;
use knapsack_eval::{EtlEngine, EvalError, LocalStorage};
use tempfile::TempDir;

const SCENARIO: &str = "3,3,2\n2,1,6\n1,1,2\n5,5,5\n";

fn storage_in(dir: &TempDir) -> LocalStorage {
    LocalStorage::new(dir.path().to_str().unwrap().to_string())
}

fn job(paths: &[&str], report_path: Option<&str>) -> GreedyJob {
    GreedyJob {
        catalog_paths: paths.iter().map(|p| p.to_string()).collect(),
        format: OutputFormat::Text,
        report_path: report_path.map(str::to_string),
        workers: 2,
    }
}

#[tokio::test]
async fn test_greedy_end_to_end_on_reference_scenario() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("scenario.txt"), SCENARIO).unwrap();

    let pipeline = GreedyPipeline::new(
        storage_in(&temp_dir),
        job(&["scenario.txt"], Some("reports/greedy.json")),
    );
    let engine = EtlEngine::new_with_monitoring(pipeline, false);

    let output = engine.run().await.unwrap();
    assert_eq!(output, "reports/greedy.json");

    let report = std::fs::read_to_string(temp_dir.path().join("reports/greedy.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(json[0]["source"], "scenario.txt");
    assert_eq!(json[0]["item_count"], 3);
    assert_eq!(json[0]["total_cost"], 8);
    assert_eq!(json[0]["total_weight"], 3);
    assert_eq!(json[0]["total_size"], 2);
}

#[tokio::test]
async fn test_greedy_results_follow_catalog_order() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("a.txt"), SCENARIO).unwrap();
    // hard stop: the dense heavy item comes first and exceeds the weight limit
    std::fs::write(temp_dir.path().join("b.txt"), "2,4,4\n5,1,50\n1,1,3\n").unwrap();
    std::fs::write(temp_dir.path().join("c.txt"), "0,10,10\n").unwrap();

    let pipeline = GreedyPipeline::new(
        storage_in(&temp_dir),
        job(&["b.txt", "a.txt", "c.txt"], None),
    );
    let engine = EtlEngine::new(pipeline);

    let extracted = engine.pipeline().extract().await.unwrap();
    let reports = engine.pipeline().transform(extracted).await.unwrap();

    let sources: Vec<_> = reports.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(sources, vec!["b.txt", "a.txt", "c.txt"]);
    let totals: Vec<_> = reports.iter().map(|r| r.result.total_cost).collect();
    assert_eq!(totals, vec![0, 8, 0]);
    assert_eq!(
        engine.pipeline().render(&reports).unwrap(),
        "b.txt: 0\na.txt: 8\nc.txt: 0"
    );
}

#[tokio::test]
async fn test_integrity_failure_is_critical() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("bad.txt"), "4,3,2\n2,1,6\n1,1,2\n5,5,5\n").unwrap();

    let pipeline = GreedyPipeline::new(storage_in(&temp_dir), job(&["bad.txt"], None));
    let err = EtlEngine::new(pipeline).run().await.unwrap_err();

    assert!(matches!(
        err,
        EvalError::Integrity {
            declared: 4,
            actual: 3
        }
    ));
    assert_eq!(err.severity(), ErrorSeverity::Critical);
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn test_missing_catalog_is_io_error() {
    let temp_dir = TempDir::new().unwrap();

    let pipeline = GreedyPipeline::new(storage_in(&temp_dir), job(&["absent.txt"], None));
    let err = EtlEngine::new(pipeline).run().await.unwrap_err();

    assert!(matches!(err, EvalError::IoError(_)));
    assert_eq!(err.exit_code(), 2);
}
