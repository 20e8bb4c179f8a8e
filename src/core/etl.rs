use std::time::Instant;

use crate::core::Stage;
use crate::utils::error::Result;

/// Runs one stage through extract, transform and load.
pub struct StageRunner<S: Stage> {
    stage: S,
}

impl<S: Stage> StageRunner<S> {
    pub fn new(stage: S) -> Self {
        Self { stage }
    }

    pub fn into_inner(self) -> S {
        self.stage
    }

    pub async fn run(&mut self) -> Result<String> {
        let started = Instant::now();
        tracing::info!("🚀 Starting stage '{}'", self.stage.name());

        tracing::debug!("Extracting input...");
        let input = self.stage.extract().await?;

        tracing::debug!("Deriving features...");
        let output = self.stage.transform(input).await?;

        tracing::debug!("Writing output...");
        let output_path = self.stage.load(output).await?;

        tracing::info!(
            "✅ Stage '{}' finished in {:.1}s",
            self.stage.name(),
            started.elapsed().as_secs_f64()
        );
        Ok(output_path)
    }
}
