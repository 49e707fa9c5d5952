//! Workspace umbrella crate for design-space analysis.
//!
//! Wires the member crates into one pipeline over a [`DesignSession`]: the
//! generated Functions, Behaviors and Structures are embedded and normalized,
//! projected and clustered per category, ranked against the design problem and
//! its requirements, and individually explained against a masked language
//! model.

pub mod config;
mod session;

pub use cluster::{
    ClusterAlgorithm, ClusterAssignment, ClusterConfig, ClusterError, ClusterReport, NOISE,
    NotApplicable, ProjectionConfig, QualityIndex, project_and_cluster,
};
pub use config::{ConfigLoadError, DesignSpaceConfig, RoleConfig};
pub use explain::{
    AnnotatedToken, Channel, ExplainConfig, ExplainError, ImportanceCache, ImportanceEntry,
    ImportanceResult, MaskedModelOracle, OnnxMaskedOracle, OnnxOracleConfig, OracleError,
    Query, ScoreVisualizer, TokenDistribution, TokenImportanceEngine,
};
pub use matcher::{
    MatchError, RankConfig, RankedCandidate, ReferenceMatch, SimilarityRanker,
    best_reference_per_candidate, cosine_similarity, rank_by_similarity,
};
pub use semantic::{
    Candidate, Category, DegenerateVector, EmbeddingCache, EmbeddingProvider, NormalizedBatch,
    SemanticConfig, SemanticError, StubEmbeddingProvider, clean_candidates, normalize_batch,
};
pub use session::{
    CandidateExplanation, CategoryAnalysis, DesignSession, DesignSpaceAnalyzer,
    RequirementRanking, SessionReport, explain_candidate,
};

use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

/// Errors that can occur while analysing a design session.
#[derive(Debug, Clone)]
pub enum PipelineError {
    Semantic(SemanticError),
    Cluster(ClusterError),
    Match(MatchError),
    Explain(ExplainError),
    MissingProblem,
    UnknownCandidate { index: usize, len: usize },
    UnknownRequirement { index: usize, len: usize },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Semantic(err) => write!(f, "embedding failure: {err}"),
            PipelineError::Cluster(err) => write!(f, "clustering failure: {err}"),
            PipelineError::Match(err) => write!(f, "ranking failure: {err}"),
            PipelineError::Explain(err) => write!(f, "explanation failure: {err}"),
            PipelineError::MissingProblem => write!(f, "session has no design problem"),
            PipelineError::UnknownCandidate { index, len } => {
                write!(f, "candidate {index} out of range for {len} candidates")
            }
            PipelineError::UnknownRequirement { index, len } => {
                write!(f, "requirement {index} out of range for {len} requirements")
            }
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Semantic(err) => Some(err),
            PipelineError::Cluster(err) => Some(err),
            PipelineError::Match(err) => Some(err),
            PipelineError::Explain(err) => Some(err),
            PipelineError::MissingProblem
            | PipelineError::UnknownCandidate { .. }
            | PipelineError::UnknownRequirement { .. } => None,
        }
    }
}

impl From<SemanticError> for PipelineError {
    fn from(value: SemanticError) -> Self {
        PipelineError::Semantic(value)
    }
}

impl From<ClusterError> for PipelineError {
    fn from(value: ClusterError) -> Self {
        PipelineError::Cluster(value)
    }
}

impl From<MatchError> for PipelineError {
    fn from(value: MatchError) -> Self {
        PipelineError::Match(value)
    }
}

impl From<ExplainError> for PipelineError {
    fn from(value: ExplainError) -> Self {
        PipelineError::Explain(value)
    }
}

/// Metrics observer for analysis stages.
pub trait AnalysisMetrics: Send + Sync {
    fn record_embed(&self, latency: Duration, texts: usize, result: Result<(), SemanticError>);
    fn record_cluster(&self, latency: Duration, points: usize, result: Result<(), ClusterError>);
    fn record_explain(&self, latency: Duration, result: Result<(), ExplainError>);
}

/// Install or clear the global analysis metrics recorder.
pub fn set_analysis_metrics(recorder: Option<Arc<dyn AnalysisMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn AnalysisMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn AnalysisMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn AnalysisMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

pub(crate) struct MetricsSpan {
    recorder: Arc<dyn AnalysisMetrics>,
    start: Instant,
}

impl MetricsSpan {
    pub(crate) fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    pub(crate) fn record_embed(self, texts: usize, result: Result<(), SemanticError>) {
        self.recorder
            .record_embed(self.start.elapsed(), texts, result);
    }

    pub(crate) fn record_cluster(self, points: usize, result: Result<(), ClusterError>) {
        self.recorder
            .record_cluster(self.start.elapsed(), points, result);
    }

    pub(crate) fn record_explain(self, result: Result<(), ExplainError>) {
        self.recorder.record_explain(self.start.elapsed(), result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_wraps_stage_errors() {
        let err: PipelineError = ExplainError::EmptyQuery.into();
        assert!(matches!(err, PipelineError::Explain(ExplainError::EmptyQuery)));
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("explanation failure"));

        let err = PipelineError::UnknownRequirement { index: 4, len: 2 };
        assert!(err.source().is_none());
        assert_eq!(
            err.to_string(),
            "requirement 4 out of range for 2 requirements"
        );
    }

    #[test]
    fn semantic_errors_convert() {
        let err: PipelineError = SemanticError::EmptyText { index: 1 }.into();
        assert!(matches!(
            err,
            PipelineError::Semantic(SemanticError::EmptyText { index: 1 })
        ));
    }
}
