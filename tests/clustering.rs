mod common;

use common::LexiconProvider;
use designspace::{
    Category, ClusterAlgorithm, ClusterConfig, DesignSession, DesignSpaceAnalyzer,
    DesignSpaceConfig, NOISE, NotApplicable, QualityIndex,
};
use std::sync::Arc;

fn kmeans_config(k: usize) -> DesignSpaceConfig {
    DesignSpaceConfig {
        cluster: ClusterConfig::default().with_algorithm(ClusterAlgorithm::KMeans {
            k,
            max_iterations: 100,
            seed: 7,
        }),
        ..Default::default()
    }
}

fn analyzer(cfg: &DesignSpaceConfig) -> DesignSpaceAnalyzer {
    DesignSpaceAnalyzer::new(Arc::new(LexiconProvider::new()), cfg).expect("analyzer")
}

fn split_session() -> DesignSession {
    let mut session = DesignSession::new("minimize environmental impact")
        .with_requirements(["Minimize cost"]);
    session.add_candidates(
        [
            "reduces emissions",
            "environmental emissions",
            "zzz qqq",
            "increases cost",
            "price cost",
        ],
        Category::Function,
    );
    session
}

#[tokio::test]
async fn separated_groups_get_separate_labels() {
    let report = analyzer(&kmeans_config(2))
        .cluster_category(&split_session(), Category::Function)
        .await
        .unwrap();

    let labels: Vec<i32> = report.assignments.iter().map(|a| a.label).collect();
    assert_eq!(labels.len(), 5);
    assert_eq!(labels[0], labels[1]);
    assert_eq!(labels[3], labels[4]);
    assert_ne!(labels[0], labels[3]);
    assert_eq!(report.cluster_count, 2);

    match report.silhouette {
        QualityIndex::Defined(s) => assert!(s > 0.5 && s <= 1.0, "silhouette {s}"),
        other => panic!("expected a silhouette, got {other:?}"),
    }
    match report.calinski_harabasz {
        QualityIndex::Defined(ch) => assert!(ch > 0.0),
        other => panic!("expected a CH index, got {other:?}"),
    }
}

#[tokio::test]
async fn degenerate_candidates_are_reported_unclustered() {
    let analyzer = analyzer(&kmeans_config(2));
    let report = analyzer.analyze(&split_session()).await.unwrap();
    let functions = report.category(Category::Function).unwrap();

    assert_eq!(functions.degenerate, vec![2]);
    let zero = &functions.clusters.assignments[2];
    assert_eq!(zero.index, 2);
    assert_eq!(zero.label, NOISE);
    assert!(zero.point.is_none());
    assert_eq!(functions.clusters.noise_count, 1);
    assert!(functions
        .clusters
        .assignments
        .iter()
        .filter(|a| a.index != 2)
        .all(|a| a.point.is_some()));

    // Still ranked, with a neutral score.
    assert_eq!(functions.problem_ranking.len(), 5);
    let zero_rank = functions
        .problem_ranking
        .iter()
        .find(|r| r.index == 2)
        .unwrap();
    assert_eq!(zero_rank.score, 0.0);
}

#[tokio::test]
async fn empty_and_single_categories_are_not_applicable() {
    let mut session = split_session();
    session.add_candidates(["steel"], Category::Structure);
    let report = analyzer(&DesignSpaceConfig::default())
        .analyze(&session)
        .await
        .unwrap();

    let behaviors = report.category(Category::Behavior).unwrap();
    assert!(behaviors.candidates.is_empty());
    assert!(behaviors.clusters.assignments.is_empty());
    assert!(matches!(
        behaviors.clusters.silhouette,
        QualityIndex::NotApplicable(NotApplicable::InsufficientData { points: 0 })
    ));

    let structures = report.category(Category::Structure).unwrap();
    assert_eq!(structures.clusters.assignments.len(), 1);
    assert!(matches!(
        structures.clusters.calinski_harabasz,
        QualityIndex::NotApplicable(NotApplicable::InsufficientData { .. })
    ));
}

#[tokio::test]
async fn analysis_is_deterministic_for_a_fixed_seed() {
    let cfg = kmeans_config(2);
    let first = analyzer(&cfg).analyze(&split_session()).await.unwrap();
    let second = analyzer(&cfg).analyze(&split_session()).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn report_covers_every_category_and_requirement() {
    let report = analyzer(&DesignSpaceConfig::default())
        .analyze(&split_session())
        .await
        .unwrap();

    assert_eq!(report.problem, "minimize environmental impact");
    assert_eq!(report.categories.len(), 3);
    let functions = report.category(Category::Function).unwrap();
    assert_eq!(functions.requirement_rankings.len(), 1);
    assert_eq!(functions.requirement_rankings[0].requirement, "Minimize cost");
    assert_eq!(functions.best_requirements.len(), 5);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["categories"][0]["category"], "function");
}
