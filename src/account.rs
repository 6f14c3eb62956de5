//! Account Records - Resolved Input Lists
//!
//! Discovery happens upstream; this module only models the records handed to
//! the renderer and loads them from a JSON document.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Contributor,
    Collaborator,
    Bot,
}

/// One account as seen by the item template.
///
/// Field names are the placeholder names: `{{login}}`, `{{avatar_url}}`, ...
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub contributions: u64,
    #[serde(default)]
    pub category: Category,
}

impl Account {
    pub fn new(login: impl Into<String>, category: Category) -> Self {
        Self {
            login: login.into(),
            category,
            ..Self::default()
        }
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = url.into();
        self
    }

    pub fn with_contributions(mut self, count: u64) -> Self {
        self.contributions = count;
        self
    }
}

/// The three categorized lists, in display order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountLists {
    #[serde(default)]
    pub contributors: Vec<Account>,
    #[serde(default)]
    pub collaborators: Vec<Account>,
    #[serde(default)]
    pub bots: Vec<Account>,
}

impl AccountLists {
    /// Parse lists from JSON. The list a record sits in decides its category.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut lists: Self = serde_json::from_str(json)?;
        lists.retag();
        Ok(lists)
    }

    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content).map_err(std::io::Error::from)
    }

    pub fn get(&self, category: Category) -> &[Account] {
        match category {
            Category::Contributor => &self.contributors,
            Category::Collaborator => &self.collaborators,
            Category::Bot => &self.bots,
        }
    }

    fn retag(&mut self) {
        for (accounts, category) in [
            (&mut self.contributors, Category::Contributor),
            (&mut self.collaborators, Category::Collaborator),
            (&mut self.bots, Category::Bot),
        ] {
            for account in accounts.iter_mut() {
                account.category = category;
            }
        }
    }
}
