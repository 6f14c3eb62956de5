//! Wall Pipeline - Single Entry Point
//!
//! Templates are parsed when the pipeline is built, so a malformed template
//! aborts the run before anything is rendered or read from storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::account::AccountLists;
use crate::config::{ConfigError, WallConfig};
use crate::hashing::content_digest;
use crate::layout::SectionExtents;
use crate::minify::Minifier;
use crate::publish::{publish_if_changed, PublishOutcome};
use crate::render::{render_canvas, RenderContext};
use crate::storage::{ArtifactStore, StorageError};
use crate::template::{Template, TemplateError};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid {which} template: {source}")]
    Template {
        which: &'static str,
        #[source]
        source: TemplateError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionCounts {
    pub contributors: usize,
    pub collaborators: usize,
    pub bots: usize,
}

impl SectionCounts {
    fn of(lists: &AccountLists) -> Self {
        Self {
            contributors: lists.contributors.len(),
            collaborators: lists.collaborators.len(),
            bots: lists.bots.len(),
        }
    }
}

/// Output of the rendering stages, before minification
#[derive(Debug, Clone)]
pub struct Rendered {
    pub markup: String,
    pub counts: SectionCounts,
    pub extents: SectionExtents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub id: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub path: String,
    pub digest: String,
    pub counts: SectionCounts,
    pub extents: SectionExtents,
    pub outcome: PublishOutcome,
}

impl RunReport {
    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// The wall pipeline - configuration plus parsed templates
#[derive(Debug)]
pub struct WallPipeline {
    config: WallConfig,
    item_template: Template,
    svg_template: Template,
}

impl WallPipeline {
    /// Validate the configuration and parse both templates
    pub fn new(config: WallConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let item_template = Template::parse(&config.item_template)
            .map_err(|source| PipelineError::Template { which: "item", source })?;
        let svg_template = Template::parse(&config.svg_template)
            .map_err(|source| PipelineError::Template { which: "svg", source })?;

        Ok(Self {
            config,
            item_template,
            svg_template,
        })
    }

    pub fn config(&self) -> &WallConfig {
        &self.config
    }

    /// Layout, item and canvas stages
    pub fn render(&self, lists: &AccountLists) -> Rendered {
        let counts = SectionCounts::of(lists);
        tracing::info!(
            contributors = counts.contributors,
            collaborators = counts.collaborators,
            bots = counts.bots,
            "rendering wall"
        );

        let extents = SectionExtents::compute(lists, &self.config);
        let context = RenderContext::build(&self.item_template, lists, extents, self.config.svg_width);
        let markup = render_canvas(&self.svg_template, &context);

        Rendered {
            markup,
            counts,
            extents,
        }
    }

    /// Render, minify and publish if the stored artifact differs
    pub fn run(
        &self,
        lists: &AccountLists,
        minifier: &dyn Minifier,
        store: &mut dyn ArtifactStore,
    ) -> Result<RunReport, PipelineError> {
        let rendered = self.render(lists);
        let content = minifier.minify(&rendered.markup);
        let digest = content_digest(&content);
        tracing::debug!(bytes = content.len(), digest = %digest, "minified wall");

        let path = &self.config.svg_path;
        let outcome = publish_if_changed(store, path, &content, &self.config.commit_message)?;
        match &outcome {
            PublishOutcome::Written(revision) => {
                tracing::info!(%revision, "Generated \"{}\"", path);
            }
            PublishOutcome::Skipped => tracing::info!("\"{}\" is up to date", path),
        }

        Ok(RunReport {
            id: Uuid::new_v4().to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            path: path.clone(),
            digest,
            counts: rendered.counts,
            extents: rendered.extents,
            outcome,
        })
    }
}
