//! Wall Configuration - Layout, Templates, Publish Target

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Layout and publish parameters for one run.
///
/// Loaded once and passed explicitly to the pipeline; nothing here is read
/// from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallConfig {
    /// `owner/name` of the repository the lists belong to (informational)
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default = "default_svg_path")]
    pub svg_path: String,
    #[serde(default = "default_svg_width")]
    pub svg_width: u32,
    #[serde(default = "default_row_capacity")]
    pub row_capacity: u32,
    #[serde(default = "default_row_height")]
    pub row_height: f64,
    #[serde(default = "default_item_template")]
    pub item_template: String,
    #[serde(default = "default_svg_template")]
    pub svg_template: String,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
}

fn default_svg_path() -> String { "CONTRIBUTORS.svg".to_string() }
fn default_svg_width() -> u32 { 740 }
fn default_row_capacity() -> u32 { 12 }
fn default_row_height() -> f64 { 64.0 }
fn default_commit_message() -> String { "chore: update contributors wall".to_string() }

fn default_item_template() -> String {
    r#"<a xlink:href="https://github.com/{{login}}" class="item" target="_blank"><title>{{login}}</title><image width="48" height="48" xlink:href="{{avatar_url}}" /></a>"#
        .to_string()
}

fn default_svg_template() -> String {
    r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{{width}}" height="{{#sum}}{{contributorsHeight}} + {{collaboratorsHeight}} + {{botsHeight}} + 120{{/sum}}">
  <style>.header { font: bold 14px sans-serif; }</style>
  <text class="header" x="0" y="20">Collaborators</text>
  <g transform="translate(0, 30)">{{{collaborators}}}</g>
  <text class="header" x="0" y="{{#sum}}{{collaboratorsHeight}} + 60{{/sum}}">Contributors</text>
  <g transform="translate(0, {{#sum}}{{collaboratorsHeight}} + 70{{/sum}})">{{{contributors}}}</g>
  <text class="header" x="0" y="{{#sum}}{{collaboratorsHeight}} + {{contributorsHeight}} + 100{{/sum}}">Bots</text>
  <g transform="translate(0, {{#sum}}{{collaboratorsHeight}} + {{contributorsHeight}} + 110{{/sum}})">{{{bots}}}</g>
</svg>"#
        .to_string()
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            repo: None,
            svg_path: default_svg_path(),
            svg_width: default_svg_width(),
            row_capacity: default_row_capacity(),
            row_height: default_row_height(),
            item_template: default_item_template(),
            svg_template: default_svg_template(),
            commit_message: default_commit_message(),
        }
    }
}

impl WallConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Layout parameters must be positive; the height calculator relies on it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rowCapacity",
                message: "must be at least 1".to_string(),
            });
        }
        if !(self.row_height.is_finite() && self.row_height > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "rowHeight",
                message: format!("must be a positive number, got {}", self.row_height),
            });
        }
        if self.svg_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "svgPath",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Split `repo` into owner and name, if it is of the form `owner/name`
    pub fn repo_parts(&self) -> Option<(&str, &str)> {
        let repo = self.repo.as_deref()?;
        let mut parts = repo.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
                Some((owner, name))
            }
            _ => None,
        }
    }
}
