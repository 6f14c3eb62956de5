//! Markup Minification
//!
//! The publish gate compares minified output, so any transform used here must
//! be deterministic.

pub trait Minifier {
    fn minify(&self, markup: &str) -> String;
}

/// Leaves markup untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Minifier for Passthrough {
    fn minify(&self, markup: &str) -> String {
        markup.to_string()
    }
}

/// Drops whitespace between tags and collapses every other whitespace run to
/// a single space. Leading and trailing whitespace is removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollapseWhitespace;

impl Minifier for CollapseWhitespace {
    fn minify(&self, markup: &str) -> String {
        let mut out = String::with_capacity(markup.len());
        let mut pending_space = false;

        for c in markup.chars() {
            if c.is_whitespace() {
                pending_space = true;
                continue;
            }
            if pending_space && !out.is_empty() && !(out.ends_with('>') && c == '<') {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }

        out
    }
}

impl<F> Minifier for F
where
    F: Fn(&str) -> String,
{
    fn minify(&self, markup: &str) -> String {
        self(markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough() {
        assert_eq!(Passthrough.minify("<a>\n  </a>"), "<a>\n  </a>");
    }

    #[test]
    fn test_collapse_between_tags() {
        let markup = "\n<svg width=\"10\">\n  <g>\n    <text>Hello   world</text>\n  </g>\n</svg>\n";
        assert_eq!(
            CollapseWhitespace.minify(markup),
            "<svg width=\"10\"><g><text>Hello world</text></g></svg>"
        );
    }

    #[test]
    fn test_collapse_is_idempotent() {
        let once = CollapseWhitespace.minify("<a>  x  </a>\n<b/>");
        assert_eq!(CollapseWhitespace.minify(&once), once);
        assert_eq!(once, "<a> x </a><b/>");
    }

    #[test]
    fn test_closure_minifier() {
        let upper = |s: &str| s.to_uppercase();
        assert_eq!(upper.minify("<a/>"), "<A/>");
    }
}
