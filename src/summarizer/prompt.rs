//! Prompt templates.
//!
//! A template carries exactly one `{name}` and one `{reviews}` placeholder.
//! Rendering is a single left-to-right pass, so placeholder-like text inside
//! the interpolated values is copied verbatim.

use anyhow::Result;

pub const NAME_PLACEHOLDER: &str = "{name}";
pub const REVIEWS_PLACEHOLDER: &str = "{reviews}";

/// Template for a pre-merged review corpus.
pub const DEFAULT_AGGREGATE_TEMPLATE: &str = "In about 100 words, summarize what students say about professor {name}. \
Focus first on the professor's personality, then on course structure, and finally on any general critiques to watch out for.

Student Feedback:
{reviews}

Summary Paragraph:
";

/// Template for a list of individual reviews.
pub const DEFAULT_LEGACY_TEMPLATE: &str = "Here are student reviews for professor {name}:

{reviews}

In about 100 words, summarize the professor's personality, course structure, and any critiques students raise.

Summary Paragraph:
";

/// The pair of templates used by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplates {
    pub aggregate: String,
    pub legacy: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            aggregate: DEFAULT_AGGREGATE_TEMPLATE.to_string(),
            legacy: DEFAULT_LEGACY_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Check that both templates carry each placeholder exactly once.
    pub fn validate(&self) -> Result<()> {
        validate_template("aggregate", &self.aggregate)?;
        validate_template("legacy", &self.legacy)
    }

    /// Prompt for a pre-merged corpus.
    pub fn aggregate_prompt(&self, name: &str, corpus: &str) -> String {
        render(&self.aggregate, name, corpus)
    }

    /// Prompt for a list of individual reviews, one bullet per review.
    pub fn legacy_prompt(&self, professor: &str, reviews: &[String]) -> String {
        let listed = reviews
            .iter()
            .map(|review| format!("- {}", review))
            .collect::<Vec<_>>()
            .join("\n");

        render(&self.legacy, professor, &listed)
    }
}

fn validate_template(label: &str, template: &str) -> Result<()> {
    for placeholder in [NAME_PLACEHOLDER, REVIEWS_PLACEHOLDER] {
        let count = template.matches(placeholder).count();
        if count != 1 {
            anyhow::bail!(
                "The {} prompt template must contain {} exactly once (found {})",
                label,
                placeholder,
                count
            );
        }
    }
    Ok(())
}

/// Substitute `{name}` and `{reviews}` in one pass.
pub fn render(template: &str, name: &str, reviews: &str) -> String {
    let mut output = String::with_capacity(template.len() + name.len() + reviews.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        output.push_str(&rest[..start]);
        let tail = &rest[start..];

        if let Some(after) = tail.strip_prefix(NAME_PLACEHOLDER) {
            output.push_str(name);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(REVIEWS_PLACEHOLDER) {
            output.push_str(reviews);
            rest = after;
        } else {
            output.push('{');
            rest = &tail[1..];
        }
    }

    output.push_str(rest);
    output
}
