use designspace::{
    Category, ClusterAlgorithm, ConfigLoadError, DesignSession, DesignSpaceAnalyzer,
    DesignSpaceConfig, EmbeddingProvider,
};
use std::io::Write;
use tempfile::NamedTempFile;

const STUDY_YAML: &str = r#"
version: "1.0"
name: "turbocharger study"

requirements:
  - "Minimize cost"
  - "Sustainability"

semantic:
  mode: "stub"
  stub_dim: 64

cluster:
  algorithm:
    kind: "k_means"
    k: 2
    max_iterations: 50
    seed: 3

ranking:
  max_results: 2
"#;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("tempfile");
    file.write_all(yaml.as_bytes()).expect("write config");
    file
}

#[tokio::test]
async fn yaml_file_drives_a_full_analysis() {
    let file = write_config(STUDY_YAML);
    let cfg = DesignSpaceConfig::from_file(file.path()).unwrap();
    assert_eq!(cfg.name.as_deref(), Some("turbocharger study"));
    assert!(matches!(
        cfg.cluster.algorithm,
        ClusterAlgorithm::KMeans { k: 2, seed: 3, .. }
    ));
    // Sections left out keep their defaults.
    assert_eq!(cfg.explain, Default::default());

    let analyzer = DesignSpaceAnalyzer::from_config(&cfg).unwrap();
    assert_eq!(analyzer.provider().model_name(), "stub-bow-64");

    let mut session = DesignSession::new("design a turbocharger for a small engine")
        .with_requirements(cfg.requirements.clone());
    session.add_candidates(
        [
            "compress intake air",
            "recover exhaust energy",
            "compress air quickly",
            "recover exhaust heat",
        ],
        Category::Function,
    );
    session.add_candidates(["ceramic turbine wheel"], Category::Structure);

    let report = analyzer.analyze(&session).await.unwrap();
    let functions = report.category(Category::Function).unwrap();
    assert_eq!(functions.clusters.assignments.len(), 4);
    assert_eq!(functions.problem_ranking.len(), 2);
    assert_eq!(functions.requirement_rankings.len(), 2);
    assert!(
        functions
            .requirement_rankings
            .iter()
            .all(|r| r.ranking.len() == 2)
    );

    let structures = report.category(Category::Structure).unwrap();
    assert_eq!(structures.candidates, vec!["ceramic turbine wheel"]);
}

#[test]
fn unsupported_version_is_rejected() {
    let file = write_config("version: \"2.0\"\n");
    let err = DesignSpaceConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigLoadError::UnsupportedVersion(v) if v == "2.0"));
}

#[test]
fn invalid_stage_settings_are_reported_by_stage() {
    let file = write_config(
        r#"
version: "1"
explain:
  stop_threshold: 1.5
"#,
    );
    match DesignSpaceConfig::from_file(file.path()) {
        Err(ConfigLoadError::Validation(msg)) => assert!(msg.starts_with("explain:"), "{msg}"),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_a_read_error() {
    let err = DesignSpaceConfig::from_file("/nonexistent/designspace.yaml").unwrap_err();
    assert!(matches!(err, ConfigLoadError::FileRead(_)));
}
