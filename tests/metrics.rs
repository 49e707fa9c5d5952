mod common;

use common::{CONVERGENT_ROLE, LexiconProvider, ScriptedOracle, fast_explain_config};
use designspace::{
    AnalysisMetrics, Category, ClusterError, DesignSession, DesignSpaceAnalyzer,
    DesignSpaceConfig, ExplainError, SemanticError, TokenImportanceEngine, explain_candidate,
    set_analysis_metrics,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingMetrics {
    events: Mutex<Vec<String>>,
}

impl RecordingMetrics {
    fn snapshot(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl AnalysisMetrics for RecordingMetrics {
    fn record_embed(&self, _latency: Duration, texts: usize, result: Result<(), SemanticError>) {
        self.push(format!("embed:{texts}:{}", result.is_ok()));
    }

    fn record_cluster(&self, _latency: Duration, points: usize, result: Result<(), ClusterError>) {
        self.push(format!("cluster:{points}:{}", result.is_ok()));
    }

    fn record_explain(&self, _latency: Duration, result: Result<(), ExplainError>) {
        let outcome = match result {
            Ok(()) => "ok".to_string(),
            Err(err) => err.to_string(),
        };
        self.push(format!("explain:{outcome}"));
    }
}

// One test per binary: the recorder is process-wide.
#[tokio::test]
async fn metrics_recorder_tracks_stage_outcomes() {
    let metrics = Arc::new(RecordingMetrics::default());
    set_analysis_metrics(Some(metrics.clone()));

    let mut session = DesignSession::new("minimize environmental impact")
        .with_requirements(["Minimize cost"]);
    session.add_candidates(["reduces emissions", "increases cost"], Category::Function);

    let analyzer =
        DesignSpaceAnalyzer::new(Arc::new(LexiconProvider::new()), &DesignSpaceConfig::default())
            .unwrap();
    analyzer.analyze(&session).await.unwrap();

    let engine = TokenImportanceEngine::new(
        Arc::new(ScriptedOracle::new(0.8, &[("Ġemissions", 0.4)])),
        fast_explain_config(),
    )
    .unwrap();
    explain_candidate(&engine, &session, 0, CONVERGENT_ROLE)
        .await
        .unwrap();

    explain_candidate(&engine, &session, 1, CONVERGENT_ROLE)
        .await
        .unwrap();

    let events = metrics.snapshot();
    // References first, then one batch per category.
    assert_eq!(
        &events[..4],
        &["embed:2:true", "embed:2:true", "embed:0:true", "embed:0:true"]
    );
    assert_eq!(
        events.iter().filter(|e| e.starts_with("cluster:")).count(),
        3
    );
    assert!(events.contains(&"cluster:2:true".to_string()));
    assert_eq!(
        events.iter().filter(|e| *e == "explain:ok").count(),
        2
    );

    set_analysis_metrics(None);
    explain_candidate(&engine, &session, 0, CONVERGENT_ROLE)
        .await
        .unwrap();
    assert_eq!(metrics.snapshot().len(), events.len());
}
