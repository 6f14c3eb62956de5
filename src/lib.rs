//! Wall Core - Contributor Wall Renderer
//!
//! # Pipeline
//! 1. Layout: rows per category -> section extents
//! 2. Items: item template expanded once per account
//! 3. Canvas: svg template expanded with sections, extents and `{{#sum}}`
//! 4. Publish: minified output written only when it differs from the stored copy

pub mod account;
pub mod config;
pub mod expr;
pub mod hashing;
pub mod layout;
pub mod minify;
pub mod pipeline;
pub mod publish;
pub mod render;
pub mod storage;
pub mod template;

pub use account::{Account, AccountLists, Category};
pub use config::{ConfigError, WallConfig};
pub use layout::{section_extent, SectionExtents};
pub use minify::{CollapseWhitespace, Minifier, Passthrough};
pub use pipeline::{PipelineError, Rendered, RunReport, WallPipeline};
pub use publish::{publish_if_changed, PublishOutcome};
pub use render::{render_canvas, render_items, RenderContext};
pub use storage::{Artifact, ArtifactStore, FsStore, MemoryStore, Revision, StorageError};
pub use template::{Template, TemplateError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
