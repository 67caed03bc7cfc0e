//! Grounding prompt templates

use crate::config::PromptLanguage;
use crate::types::RetrievalResult;

/// Separator placed between retrieved document texts in the context block
pub const CONTEXT_DELIMITER: &str = "\n";

const FRENCH_TEMPLATE: &str = "Utilisez les informations suivantes issues de la base de connaissances pour répondre à la question. \
Si vous ne connaissez pas la réponse ou que l'information n'est pas présente, dites simplement que vous ne savez pas. \
Ne faites pas d'hypothèses.

Contexte: {context}

Question: {question}

Réponse utile:";

const ENGLISH_TEMPLATE: &str = "Use the following information from the knowledge base to answer the question. \
If you don't know the answer or the information is not present, just say that you don't know. \
Don't make assumptions.

Context: {context}

Question: {question}

Helpful answer:";

/// Fixed grounding template with a context block and a question block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptTemplate {
    language: PromptLanguage,
}

impl PromptTemplate {
    pub fn new(language: PromptLanguage) -> Self {
        Self { language }
    }

    /// Concatenate retrieved texts in retrieval order
    pub fn build_context(result: &RetrievalResult) -> String {
        result
            .iter()
            .map(|hit| hit.document.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_DELIMITER)
    }

    /// Render the prompt for `question` grounded in `result`
    ///
    /// An empty result still yields a complete prompt with an empty context.
    pub fn assemble(&self, question: &str, result: &RetrievalResult) -> String {
        let template = match self.language {
            PromptLanguage::French => FRENCH_TEMPLATE,
            PromptLanguage::English => ENGLISH_TEMPLATE,
        };

        // Substitute the question first so `{context}` inside it stays literal
        let (head, tail) = template
            .split_once("{question}")
            .unwrap_or((template, ""));
        let head = head.replacen("{context}", &Self::build_context(result), 1);
        format!("{}{}{}", head, question, tail)
    }
}
