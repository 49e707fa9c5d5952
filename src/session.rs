use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

use cluster::{ClusterAssignment, ClusterConfig, ClusterReport, NOISE, project_and_cluster};
use explain::{AnnotatedToken, ImportanceResult, Query, ScoreVisualizer, TokenImportanceEngine};
use matcher::{RankedCandidate, ReferenceMatch, SimilarityRanker};
use semantic::{
    Candidate, Category, EmbeddingCache, EmbeddingProvider, NormalizedBatch, SemanticConfig,
    SemanticError, clean_candidates, embed_texts, embed_texts_cached, normalize_batch,
    provider_from_config,
};

use crate::{DesignSpaceConfig, MetricsSpan, PipelineError};

/// One design problem, the requirements chosen for it and the candidates
/// generated so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DesignSession {
    problem: String,
    requirements: Vec<String>,
    candidates: Vec<Candidate>,
}

impl DesignSession {
    pub fn new(problem: impl Into<String>) -> Self {
        Self {
            problem: problem.into().trim().to_string(),
            ..Default::default()
        }
    }

    /// Replaces the requirement list. Blank entries are dropped.
    pub fn with_requirements<I, S>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements = requirements
            .into_iter()
            .map(|r| r.into().trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        self
    }

    /// Appends a raw generated list, dropping blank entries. Returns how many
    /// candidates were kept.
    pub fn add_candidates<I, S>(&mut self, raw: I, category: Category) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cleaned = clean_candidates(raw, category);
        let added = cleaned.len();
        self.candidates.extend(cleaned);
        added
    }

    pub fn problem(&self) -> &str {
        &self.problem
    }

    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidate(&self, index: usize) -> Result<&Candidate, PipelineError> {
        self.candidates
            .get(index)
            .ok_or(PipelineError::UnknownCandidate {
                index,
                len: self.candidates.len(),
            })
    }

    /// Candidate texts of one category, in session order.
    pub fn texts_in(&self, category: Category) -> Vec<String> {
        self.candidates
            .iter()
            .filter(|c| c.category == category)
            .map(|c| c.text.clone())
            .collect()
    }

    /// The rating query for candidate `index` under `role`.
    pub fn query_for(&self, index: usize, role: &str) -> Result<Query, PipelineError> {
        let candidate = self.candidate(index)?;
        Ok(Query::for_candidate(role, candidate, &self.problem))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementRanking {
    pub requirement: String,
    pub ranking: Vec<RankedCandidate>,
}

/// Everything computed for one category. Indices point into `candidates`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAnalysis {
    pub category: Category,
    pub candidates: Vec<String>,
    pub clusters: ClusterReport,
    /// Candidates whose embedding had zero norm.
    pub degenerate: Vec<usize>,
    pub problem_ranking: Vec<RankedCandidate>,
    pub requirement_rankings: Vec<RequirementRanking>,
    pub best_requirements: Vec<ReferenceMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub problem: String,
    pub requirements: Vec<String>,
    pub categories: Vec<CategoryAnalysis>,
}

impl SessionReport {
    pub fn category(&self, category: Category) -> Option<&CategoryAnalysis> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// Embedding, clustering and ranking front-end for [`DesignSession`]s.
pub struct DesignSpaceAnalyzer {
    provider: Arc<dyn EmbeddingProvider>,
    semantic: SemanticConfig,
    cluster: ClusterConfig,
    ranker: SimilarityRanker,
    cache: Option<Arc<EmbeddingCache>>,
}

impl DesignSpaceAnalyzer {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        cfg: &DesignSpaceConfig,
    ) -> Result<Self, PipelineError> {
        cfg.semantic.validate()?;
        cfg.cluster.validate()?;
        let ranker = SimilarityRanker::new(cfg.ranking)?;
        Ok(Self {
            provider,
            semantic: cfg.semantic.clone(),
            cluster: cfg.cluster.clone(),
            ranker,
            cache: None,
        })
    }

    /// Builds the provider named by `cfg.semantic` with an embedding cache in front.
    pub fn from_config(cfg: &DesignSpaceConfig) -> Result<Self, PipelineError> {
        let provider: Arc<dyn EmbeddingProvider> = Arc::from(provider_from_config(&cfg.semantic)?);
        let cache = Arc::new(EmbeddingCache::new(cfg.semantic.cache_capacity));
        Ok(Self::new(provider, cfg)?.with_embedding_cache(cache))
    }

    pub fn with_embedding_cache(mut self, cache: Arc<EmbeddingCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Embeds and normalizes `texts`, keeping positions. Zero-norm vectors are
    /// flagged in the batch rather than failing it.
    pub async fn embed(&self, texts: &[String]) -> Result<NormalizedBatch, PipelineError> {
        let span = MetricsSpan::start();
        let result = self.embed_raw(texts).await;
        if let Some(span) = span {
            span.record_embed(texts.len(), result.as_ref().map(|_| ()).map_err(|e| e.clone()));
        }
        Ok(result?)
    }

    async fn embed_raw(&self, texts: &[String]) -> Result<NormalizedBatch, SemanticError> {
        let embeddings = match &self.cache {
            Some(cache) => {
                embed_texts_cached(self.provider.as_ref(), cache, texts, &self.semantic).await?
            }
            None => embed_texts(self.provider.as_ref(), texts, &self.semantic).await?,
        };
        normalize_batch(embeddings.into_iter().map(|e| e.vector).collect())
    }

    /// Projects and clusters a normalized batch. Degenerate entries are kept in
    /// the report as unclustered, without a point.
    pub fn cluster_batch(&self, batch: &NormalizedBatch) -> Result<ClusterReport, PipelineError> {
        let (valid, vectors): (Vec<usize>, Vec<Vec<f32>>) =
            batch.valid().map(|(i, v)| (i, v.to_vec())).unzip();

        let span = MetricsSpan::start();
        let result = project_and_cluster(&vectors, &self.cluster);
        if let Some(span) = span {
            span.record_cluster(vectors.len(), result.as_ref().map(|_| ()).map_err(|e| e.clone()));
        }
        Ok(reinstate_degenerate(result?, &valid, batch.len()))
    }

    /// Solution-space view of one category.
    pub async fn cluster_category(
        &self,
        session: &DesignSession,
        category: Category,
    ) -> Result<ClusterReport, PipelineError> {
        let batch = self.embed(&session.texts_in(category)).await?;
        self.cluster_batch(&batch)
    }

    /// Candidates of `category` ordered by similarity to the design problem.
    pub async fn rank_by_problem(
        &self,
        session: &DesignSession,
        category: Category,
    ) -> Result<Vec<RankedCandidate>, PipelineError> {
        let references = [problem_text(session)?];
        let (texts, vectors, refs) = self.embed_with(session, category, &references).await?;
        Ok(self.ranker.rank(&refs[0], &vectors, &texts)?)
    }

    /// Candidates of `category` ordered by similarity to requirement `requirement`.
    pub async fn rank_by_requirement(
        &self,
        session: &DesignSession,
        category: Category,
        requirement: usize,
    ) -> Result<Vec<RankedCandidate>, PipelineError> {
        let text = session.requirements().get(requirement).cloned().ok_or(
            PipelineError::UnknownRequirement {
                index: requirement,
                len: session.requirements().len(),
            },
        )?;
        let (texts, vectors, refs) = self.embed_with(session, category, &[text]).await?;
        Ok(self.ranker.rank(&refs[0], &vectors, &texts)?)
    }

    /// For every candidate of `category`, its closest requirement.
    pub async fn most_similar_requirements(
        &self,
        session: &DesignSession,
        category: Category,
    ) -> Result<Vec<ReferenceMatch>, PipelineError> {
        let requirements = session.requirements();
        let (texts, vectors, refs) = self.embed_with(session, category, requirements).await?;
        Ok(self
            .ranker
            .best_references(&vectors, &texts, &refs, requirements)?)
    }

    /// Runs every view for every category.
    pub async fn analyze(&self, session: &DesignSession) -> Result<SessionReport, PipelineError> {
        let start = Instant::now();
        let mut references = vec![problem_text(session)?];
        references.extend(session.requirements().iter().cloned());
        let reference_batch = self.embed(&references).await?;

        let mut embedded = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            let texts = session.texts_in(category);
            let batch = self.embed(&texts).await?;
            embedded.push((category, texts, batch));
        }

        let dim = std::iter::once(&reference_batch)
            .chain(embedded.iter().map(|(_, _, batch)| batch))
            .find_map(batch_dim)
            .unwrap_or(0);
        let reference_vectors = densify(&reference_batch, dim);
        let (problem, requirements) = reference_vectors.split_at(1);

        let mut categories = Vec::with_capacity(embedded.len());
        for (category, texts, batch) in embedded {
            let span = info_span!("analyze_category", category = %category, candidates = texts.len());
            let _enter = span.enter();
            categories.push(self.analyze_category(
                session,
                category,
                texts,
                &batch,
                &problem[0],
                requirements,
                dim,
            )?);
        }

        info!(
            candidates = session.candidates().len(),
            requirements = requirements.len(),
            elapsed_micros = start.elapsed().as_micros() as u64,
            "session_analyzed"
        );

        Ok(SessionReport {
            problem: session.problem().to_string(),
            requirements: session.requirements().to_vec(),
            categories,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn analyze_category(
        &self,
        session: &DesignSession,
        category: Category,
        texts: Vec<String>,
        batch: &NormalizedBatch,
        problem: &[f32],
        requirements: &[Vec<f32>],
        dim: usize,
    ) -> Result<CategoryAnalysis, PipelineError> {
        let clusters = self.cluster_batch(batch)?;
        let vectors = densify(batch, dim);

        let problem_ranking = self.ranker.rank(problem, &vectors, &texts)?;
        let requirement_rankings = session
            .requirements()
            .iter()
            .zip(requirements)
            .map(|(requirement, reference)| {
                Ok(RequirementRanking {
                    requirement: requirement.clone(),
                    ranking: self.ranker.rank(reference, &vectors, &texts)?,
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;
        let best_requirements = if requirements.is_empty() {
            Vec::new()
        } else {
            self.ranker
                .best_references(&vectors, &texts, requirements, session.requirements())?
        };

        debug!(
            category = %category,
            clusters = clusters.cluster_count,
            noise = clusters.noise_count,
            degenerate = batch.degenerate.len(),
            "category_analyzed"
        );

        Ok(CategoryAnalysis {
            category,
            candidates: texts,
            clusters,
            degenerate: batch.degenerate.iter().map(|d| d.index).collect(),
            problem_ranking,
            requirement_rankings,
            best_requirements,
        })
    }

    /// Embeds the category's candidates and `references` and returns dense
    /// vectors for both, zero-filled where degenerate.
    async fn embed_with(
        &self,
        session: &DesignSession,
        category: Category,
        references: &[String],
    ) -> Result<(Vec<String>, Vec<Vec<f32>>, Vec<Vec<f32>>), PipelineError> {
        let texts = session.texts_in(category);
        let batch = self.embed(&texts).await?;
        let reference_batch = self.embed(references).await?;
        let dim = batch_dim(&batch)
            .or_else(|| batch_dim(&reference_batch))
            .unwrap_or(0);
        Ok((texts, densify(&batch, dim), densify(&reference_batch, dim)))
    }
}

/// Importance explanation of one session candidate, ready for display.
#[derive(Debug, Clone)]
pub struct CandidateExplanation {
    pub candidate: Candidate,
    pub result: Arc<ImportanceResult>,
    pub annotated: Vec<AnnotatedToken>,
}

/// Explains how the masked model rates candidate `index` of `session` when
/// prompted with `role`.
pub async fn explain_candidate(
    engine: &TokenImportanceEngine,
    session: &DesignSession,
    index: usize,
    role: &str,
) -> Result<CandidateExplanation, PipelineError> {
    let candidate = session.candidate(index)?.clone();
    let query = session.query_for(index, role)?;

    let span = MetricsSpan::start();
    let result = engine
        .explain(&query)
        .instrument(info_span!("explain_candidate", index, category = %candidate.category))
        .await;
    if let Some(span) = span {
        span.record_explain(result.as_ref().map(|_| ()).map_err(|e| e.clone()));
    }
    let result = result?;
    if result.partial {
        warn!(index, candidate = %candidate.text, "explanation_partial");
    }

    let annotated = ScoreVisualizer::new().annotate(&result);
    Ok(CandidateExplanation {
        candidate,
        result,
        annotated,
    })
}

fn problem_text(session: &DesignSession) -> Result<String, PipelineError> {
    if session.problem().is_empty() {
        return Err(PipelineError::MissingProblem);
    }
    Ok(session.problem().to_string())
}

fn batch_dim(batch: &NormalizedBatch) -> Option<usize> {
    batch.valid().next().map(|(_, v)| v.len())
}

/// Degenerate slots become zero vectors, which every similarity scores as 0.
fn densify(batch: &NormalizedBatch, dim: usize) -> Vec<Vec<f32>> {
    batch
        .vectors
        .iter()
        .map(|v| v.clone().unwrap_or_else(|| vec![0.0; dim]))
        .collect()
}

/// Maps a report over the valid subset back onto the full batch.
fn reinstate_degenerate(report: ClusterReport, valid: &[usize], total: usize) -> ClusterReport {
    let ClusterReport {
        assignments: projected,
        cluster_count,
        silhouette,
        calinski_harabasz,
        ..
    } = report;

    let mut assignments: Vec<ClusterAssignment> = (0..total)
        .map(|index| ClusterAssignment {
            index,
            point: None,
            label: NOISE,
        })
        .collect();
    for assignment in projected {
        let index = valid[assignment.index];
        assignments[index] = ClusterAssignment {
            index,
            ..assignment
        };
    }
    let noise_count = assignments.iter().filter(|a| a.is_noise()).count();

    ClusterReport {
        assignments,
        cluster_count,
        noise_count,
        silhouette,
        calinski_harabasz,
    }
}
