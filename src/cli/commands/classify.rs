//! `aide classify`: show how a query would be routed without running it.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::display::{colorize_intent, dim, output, CommandOutput};
use crate::cli::service::AppServices;
use crate::domain::models::{ClassificationResult, Config};

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// The query to classify
    pub query: String,
}

#[derive(Debug, Serialize)]
struct ClassifyOutput {
    #[serde(flatten)]
    classification: ClassificationResult,
    /// Agent the router would pick
    agent: String,
    confident: bool,
}

impl CommandOutput for ClassifyOutput {
    fn to_human(&self) -> String {
        let c = &self.classification;
        let mut lines = vec![
            format!("Intent:     {}", colorize_intent(c.intent)),
            format!("Confidence: {:.2}{}", c.confidence, if self.confident { "" } else { " (below threshold)" }),
            format!("Agent:      {}", self.agent),
            format!("Reasoning:  {}", c.reasoning),
        ];
        if !c.entities.is_empty() {
            let mut keys: Vec<&String> = c.entities.keys().collect();
            keys.sort();
            lines.push("Entities:".to_string());
            for key in keys {
                lines.push(format!("  {key}: {}", c.entities[key]));
            }
        }
        if let Some(hint) = &c.suggested_context {
            lines.push(dim(&format!("Suggested context: {hint}")));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: ClassifyArgs, config: Config, json_mode: bool) -> Result<()> {
    let services = AppServices::connect(config).await?;
    let router = services.router().await?;

    let classification = router.classifier().classify(&args.query, &[]).await;
    let confident = classification.is_confident(router.confidence_threshold());
    let agent = router.select(&classification)?.name().to_string();

    output(
        &ClassifyOutput {
            classification,
            agent,
            confident,
        },
        json_mode,
    );
    Ok(())
}
