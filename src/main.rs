use std::error::Error;
use std::sync::Arc;

use designspace::{
    Category, DesignSession, DesignSpaceAnalyzer, DesignSpaceConfig, ImportanceCache,
    OnnxMaskedOracle, TokenImportanceEngine, explain_candidate,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .json()
        .init();

    let cfg = match std::env::args().nth(1) {
        Some(path) => DesignSpaceConfig::from_file(path)?,
        None => DesignSpaceConfig::default(),
    }
    .apply_env_overrides();

    let mut session = DesignSession::new("Design a turbocharger for a passenger car engine")
        .with_requirements(cfg.requirements.clone());
    session.add_candidates(
        [
            "increase engine power output",
            "improve fuel efficiency",
            "reduces emissions",
        ],
        Category::Function,
    );
    session.add_candidates(
        [
            "rotates at high speed using exhaust gases",
            "compresses air to increase air mass flow",
        ],
        Category::Behavior,
    );
    session.add_candidates(
        ["compressor", "turbine", "steel housing", "ball bearings", ""],
        Category::Structure,
    );

    let analyzer = DesignSpaceAnalyzer::from_config(&cfg)?;
    let report = analyzer.analyze(&session).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    match OnnxMaskedOracle::load(cfg.oracle.clone()).await {
        Ok(oracle) => {
            let engine = TokenImportanceEngine::new(Arc::new(oracle), cfg.explain.clone())?
                .with_cache(Arc::new(ImportanceCache::new()));
            let explained = explain_candidate(&engine, &session, 0, &cfg.roles.convergent).await?;
            info!(
                candidate = %explained.candidate.text,
                anchor = %explained.result.anchor.token,
                "candidate_explained"
            );
            for token in &explained.annotated {
                println!("{:>24} {:?} {:?}", token.text, token.channel, token.rgba());
            }
        }
        Err(err) => warn!(error = %err, "oracle_unavailable"),
    }

    Ok(())
}
