//! Two-Stage Rendering - Items, then Canvas
//!
//! Stage one expands the item template once per account. Stage two expands the
//! canvas template with the joined sections, the section extents, the width and
//! the `sum` evaluation section.

use serde_json::json;

use crate::account::{Account, AccountLists, Category};
use crate::expr;
use crate::layout::SectionExtents;
use crate::template::{format_number, Context, Template};

/// Name of the evaluation section in the canvas template
pub const EVALUATION_SECTION: &str = "sum";

/// Expand `template` for every record and join the results with `\n`.
///
/// Fields are substituted raw. A field the record lacks renders empty.
pub fn render_items(template: &Template, records: &[Account]) -> String {
    records
        .iter()
        .map(|account| template.render(&account_context(account)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn account_context(account: &Account) -> Context {
    Context::from_value(json!({
        "login": account.login,
        "name": account.name,
        "avatar_url": account.avatar_url,
        "html_url": account.html_url,
        "contributions": account.contributions,
        "category": category_name(account.category),
    }))
}

fn category_name(category: Category) -> &'static str {
    match category {
        Category::Contributor => "contributor",
        Category::Collaborator => "collaborator",
        Category::Bot => "bot",
    }
}

/// Everything the canvas template can see. Built once, rendered once.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub contributors: String,
    pub collaborators: String,
    pub bots: String,
    pub extents: SectionExtents,
    pub width: u32,
}

impl RenderContext {
    /// Run stage one over all three categories
    pub fn build(
        item_template: &Template,
        lists: &AccountLists,
        extents: SectionExtents,
        width: u32,
    ) -> Self {
        Self {
            contributors: render_items(item_template, &lists.contributors),
            collaborators: render_items(item_template, &lists.collaborators),
            bots: render_items(item_template, &lists.bots),
            extents,
            width,
        }
    }

    fn to_template_context(&self) -> Context {
        let mut context = Context::new()
            .with("contributors", self.contributors.as_str())
            .with("collaborators", self.collaborators.as_str())
            .with("bots", self.bots.as_str())
            .with("width", self.width);
        for (name, value) in self.extents.named() {
            context.insert(name, value);
        }
        context.with_lambda(EVALUATION_SECTION, evaluation_section(self.extents))
    }
}

/// Build the `sum` lambda over the given extents.
///
/// The inner text is first expanded against the extent values, then evaluated
/// as arithmetic. If evaluation fails the expanded text is used as-is. Either
/// way the result goes through the normal render step.
pub fn evaluation_section(
    extents: SectionExtents,
) -> impl Fn(&str, &dyn Fn(&str) -> String) -> String + Send + Sync + 'static {
    let named = extents.named();
    move |text: &str, render: &dyn Fn(&str) -> String| -> String {
        let mut heights = Context::new();
        for (name, value) in named {
            heights.insert(name, value);
        }
        let lookup = |name: &str| named.iter().find(|(n, _)| *n == name).map(|(_, v)| *v);
        evaluate_span(text, &heights, lookup, render)
    }
}

/// Shared core of the evaluation section, independent of which values are in
/// scope: `values` expands placeholders, `lookup` resolves bare identifiers.
pub fn evaluate_span<F>(text: &str, values: &Context, lookup: F, render: &dyn Fn(&str) -> String) -> String
where
    F: Fn(&str) -> Option<f64>,
{
    let substituted = match Template::parse(text) {
        Ok(template) => template.render(values),
        Err(_) => text.to_string(),
    };
    match expr::evaluate(&substituted, lookup) {
        Ok(value) => render(&format_number(value)),
        Err(err) => {
            tracing::trace!(expression = %substituted, error = %err, "kept unevaluated");
            render(&substituted)
        }
    }
}

/// Stage two: expand the canvas template
pub fn render_canvas(template: &Template, context: &RenderContext) -> String {
    template.render(&context.to_template_context())
}
