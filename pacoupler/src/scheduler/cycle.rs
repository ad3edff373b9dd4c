//! Sync cycle wiring
//!
//! A cycle resolves the watermark and runs the sync pipeline once. Building
//! one from the configuration creates fresh HTTP clients and an empty
//! enrichment cache, which is what a reload needs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use pacoupler_client::{IndexClient, PaApiClient, PaCredentials, TagDbClient, build_http_client};

use crate::config::{Config, ConfigOverrides};
use crate::error::SyncError;
use crate::repository::{ElasticsearchIndex, IndexRepository, SourceRepository, TagRepository};
use crate::service::{EnrichmentService, SyncPipeline, SyncReport, WatermarkResolver};

/// One unit of work run by the coordinator
#[async_trait]
pub trait Cycle: Send + Sync {
    async fn run(&self, force_full: bool) -> Result<SyncReport, SyncError>;
}

pub struct SyncCycle {
    resolver: WatermarkResolver,
    pipeline: SyncPipeline,
}

impl SyncCycle {
    pub fn new(resolver: WatermarkResolver, pipeline: SyncPipeline) -> Self {
        Self { resolver, pipeline }
    }

    /// Wires clients and services from a loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = build_http_client(config.coupler.http_timeout()).context("Failed to build the HTTP client")?;

        let pa = &config.pa;
        let source: Arc<dyn SourceRepository> = Arc::new(
            PaApiClient::with_client(
                pa.endpoint.clone(),
                pa.realm.clone(),
                PaCredentials::new(pa.username.clone(), pa.password.clone(), pa.basic_auth.clone()),
                http.clone(),
            )
            .with_page_size(pa.page_size),
        );

        let tags: Arc<dyn TagRepository> = Arc::new(TagDbClient::with_client(config.tagdb.endpoint.clone(), http.clone()));

        let es = &config.elasticsearch;
        let mut index_client = IndexClient::with_client(es.hosts.clone(), http);
        if let (Some(username), Some(password)) = (&es.username, &es.password) {
            index_client = index_client.with_basic_auth(username.clone(), password.clone());
        }
        let index: Arc<dyn IndexRepository> = Arc::new(ElasticsearchIndex::new(
            index_client,
            es.testrun_index.clone(),
            es.pageobject_index.clone(),
        ));

        let since = pa.since().context("Invalid pa.since")?;
        let resolver = WatermarkResolver::new(index.clone(), since);
        let pipeline = SyncPipeline::new(source, index, EnrichmentService::new(tags), pa.jobtemplates.clone());
        Ok(Self::new(resolver, pipeline))
    }
}

#[async_trait]
impl Cycle for SyncCycle {
    async fn run(&self, force_full: bool) -> Result<SyncReport, SyncError> {
        let watermark = self.resolver.resolve(force_full).await?;
        self.pipeline.sync(watermark.as_ref(), force_full).await
    }
}

/// A cycle together with the process settings that come with it
#[derive(Clone)]
pub struct CycleSetup {
    pub cycle: Arc<dyn Cycle>,
    pub poll_period: Duration,
    pub lock_path: PathBuf,
    pub lock_timeout: Duration,
}

impl CycleSetup {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            cycle: Arc::new(SyncCycle::from_config(config)?),
            poll_period: config.coupler.poll_period(),
            lock_path: config.coupler.lockfile.clone(),
            lock_timeout: config.coupler.lock_timeout(),
        })
    }
}

/// Builds cycle setups; called at startup and on every reload
pub trait CycleFactory: Send + Sync {
    fn build(&self) -> Result<CycleSetup>;
}

/// Reads the configuration file each time a setup is built
pub struct ConfigCycleFactory {
    config_path: PathBuf,
    overrides: ConfigOverrides,
}

impl ConfigCycleFactory {
    pub fn new(config_path: PathBuf, overrides: ConfigOverrides) -> Self {
        Self {
            config_path,
            overrides,
        }
    }
}

impl CycleFactory for ConfigCycleFactory {
    fn build(&self) -> Result<CycleSetup> {
        let config = Config::load(&self.config_path, &self.overrides)
            .with_context(|| format!("Failed to load {:?}", self.config_path))?;
        CycleSetup::from_config(&config)
    }
}
