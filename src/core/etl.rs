use std::time::Instant;

use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Runs extract, transform and load in order and returns the load location.
    pub async fn run(&self) -> Result<String> {
        let name = self.pipeline.name();
        let started = Instant::now();
        tracing::info!("🚀 Starting {} pipeline", name);

        tracing::debug!("[{}] extracting", name);
        let extracted = self.pipeline.extract().await?;
        self.monitor.log_stats("extract");

        tracing::debug!("[{}] transforming", name);
        let transformed = self.pipeline.transform(extracted).await?;
        self.monitor.log_stats("transform");

        tracing::debug!("[{}] loading", name);
        let output = self.pipeline.load(transformed).await?;
        self.monitor.log_stats("load");

        tracing::info!(
            "✅ {} pipeline finished in {:?}, output: {}",
            name,
            started.elapsed(),
            output
        );
        self.monitor.log_final_stats();

        Ok(output)
    }
}
