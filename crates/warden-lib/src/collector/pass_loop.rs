//! Periodic pass loop for the daemon

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use super::{collect_resources, ResourceSource};
use crate::dispatch::Dispatcher;
use crate::engine::{Engine, PassReport};
use crate::health::{components, HealthRegistry};
use crate::normalize::ResourceFilter;
use crate::remediation::RemediationDriver;

#[derive(Debug, Clone)]
pub struct PassLoopConfig {
    /// Time between pass starts (default: 1 hour)
    pub interval: Duration,
    pub filter: ResourceFilter,
}

impl Default for PassLoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            filter: ResourceFilter::default(),
        }
    }
}

/// Shared slot holding the most recent pass report
pub type LastReport = Arc<RwLock<Option<PassReport>>>;

pub struct PassLoop {
    sources: Vec<Arc<dyn ResourceSource>>,
    engine: Engine,
    dispatcher: Dispatcher,
    driver: RemediationDriver,
    health: HealthRegistry,
    config: PassLoopConfig,
    last_report: LastReport,
}

impl PassLoop {
    pub fn last_report(&self) -> LastReport {
        Arc::clone(&self.last_report)
    }

    /// Run passes until a shutdown signal arrives; the first pass starts immediately
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            sources = self.sources.len(),
            "Starting pass loop"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down pass loop");
                    break;
                }
            }
        }
    }

    /// Enumerate every source and run one pass over the result
    pub async fn run_once(&self) -> PassReport {
        let outcome = collect_resources(&self.sources, &self.config.filter).await;
        for failure in &outcome.failed_sources {
            self.engine
                .logger()
                .log_source_failure(&failure.source, &failure.error);
            self.engine.metrics().inc_source_errors();
        }
        self.health
            .record_stage(
                components::ENUMERATOR,
                outcome.failed_sources.len(),
                outcome.sources,
            )
            .await;

        let report = self
            .engine
            .run_pass(outcome.resources, Utc::now(), &self.dispatcher, &self.driver)
            .await;

        self.health
            .record_stage(
                components::DISPATCHER,
                report.failed_notifications(),
                report.notifications.len(),
            )
            .await;
        self.health
            .record_stage(
                components::REMEDIATOR,
                report.failed_remediations(),
                report.remediations.len(),
            )
            .await;
        self.health.set_ready(true).await;

        *self.last_report.write().await = Some(report.clone());
        report
    }
}

pub struct PassLoopBuilder {
    sources: Vec<Arc<dyn ResourceSource>>,
    engine: Option<Engine>,
    dispatcher: Option<Dispatcher>,
    driver: Option<RemediationDriver>,
    health: HealthRegistry,
    config: PassLoopConfig,
}

impl PassLoopBuilder {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            engine: None,
            dispatcher: None,
            driver: None,
            health: HealthRegistry::new(),
            config: PassLoopConfig::default(),
        }
    }

    pub fn source(mut self, source: Arc<dyn ResourceSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn engine(mut self, engine: Engine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn driver(mut self, driver: RemediationDriver) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn filter(mut self, filter: ResourceFilter) -> Self {
        self.config.filter = filter;
        self
    }

    pub fn build(self) -> Result<PassLoop> {
        let engine = self
            .engine
            .ok_or_else(|| anyhow::anyhow!("Engine is required"))?;
        let dispatcher = self
            .dispatcher
            .ok_or_else(|| anyhow::anyhow!("Dispatcher is required"))?;
        let driver = self
            .driver
            .ok_or_else(|| anyhow::anyhow!("Remediation driver is required"))?;
        if self.config.interval.is_zero() {
            anyhow::bail!("Pass interval must be greater than zero");
        }

        Ok(PassLoop {
            sources: self.sources,
            engine,
            dispatcher,
            driver,
            health: self.health,
            config: self.config,
            last_report: Arc::new(RwLock::new(None)),
        })
    }
}

impl Default for PassLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
