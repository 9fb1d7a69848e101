//! Prompt templates for RAG generation
//!
//! Retrieved chunks are "stuffed" into a single context block, most relevant
//! first, and substituted into a system instruction plus a user turn.

use serde::{Deserialize, Serialize};

use crate::config::PromptConfig;
use crate::types::Chunk;

/// Placeholder replaced by the joined chunk texts
pub const CONTEXT_PLACEHOLDER: &str = "{context}";
/// Placeholder replaced by the user's question
pub const INPUT_PLACEHOLDER: &str = "{input}";
/// Separator placed between chunk texts in the context block
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// A two-part chat prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// System instruction (contains the context block)
    pub system: String,
    /// User turn (contains the question)
    pub user: String,
}

impl Prompt {
    /// Flatten into a single prompt for completion-style endpoints
    pub fn to_single_text(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// Template with `{context}` and `{input}` placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// System part
    pub system: String,
    /// User part
    pub user: String,
}

impl PromptTemplate {
    /// Create a template from raw parts
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Grounded-answer template for a documentation domain
    ///
    /// Instructs the model to answer only from the context, to reply with a
    /// fixed refusal when the context is insufficient, and to answer in
    /// `language`.
    pub fn grounded(domain: &str, language: &str) -> Self {
        let refusal = refusal_sentence(language);
        let system = format!(
            "You are an expert on the {domain} framework. Answer the user's question \
             precisely using only the context provided below. \
             The context may contain several related passages of documentation. \
             Do not use knowledge that is not in the context. \
             If the context does not contain enough information to answer the question, \
             reply exactly: \"{refusal}\". \
             Answer in {language}.\n\nContext:\n{context}",
            domain = domain,
            refusal = refusal,
            language = language,
            context = CONTEXT_PLACEHOLDER,
        );
        let user = format!("Question: {}", INPUT_PLACEHOLDER);
        Self { system, user }
    }

    /// Template built from the `[prompt]` config section
    pub fn from_config(config: &PromptConfig) -> Self {
        Self::grounded(&config.domain, &config.language)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::from_config(&PromptConfig::default())
    }
}

/// Sentence the model must use when the context cannot answer the question
pub fn refusal_sentence(language: &str) -> &'static str {
    match language.trim().to_lowercase().as_str() {
        "chinese" | "zh" | "zh-cn" | "中文" => "根据我所掌握的知识，无法回答这个问题",
        _ => "Based on the knowledge available to me, I cannot answer this question.",
    }
}

/// Join chunk texts in rank order into the context block
pub fn build_context<'a, I>(chunks: I) -> String
where
    I: IntoIterator<Item = &'a Chunk>,
{
    chunks
        .into_iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}

/// Assemble the prompt for `question` from ranked `chunks`
pub fn assemble<'a, I>(question: &str, chunks: I, template: &PromptTemplate) -> Prompt
where
    I: IntoIterator<Item = &'a Chunk>,
{
    let context = build_context(chunks);
    Prompt {
        system: render(&template.system, &context, question),
        user: render(&template.user, &context, question),
    }
}

/// Substitute placeholders in one pass so placeholder text inside the
/// substituted values is left untouched
fn render(template: &str, context: &str, input: &str) -> String {
    let mut out = String::with_capacity(template.len() + context.len() + input.len());
    let mut rest = template;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix(CONTEXT_PLACEHOLDER) {
            out.push_str(context);
            rest = after;
        } else if let Some(after) = tail.strip_prefix(INPUT_PLACEHOLDER) {
            out.push_str(input);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);

    out
}
