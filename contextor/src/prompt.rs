//! Prompt texts used by the pipeline, kept together as one artifact.
//!
//! The grounding preamble is the only part whose token cost is reserved
//! out of the context budget, so the budget is derived from the same
//! [`PromptSet`] value the composer sends.

/// Shared grounding preamble for answer generation.
pub const GROUNDING_PREAMBLE: &str = "You are a helpful assistant for the Nestlé website. \
Use the provided context to answer questions accurately. \
If you're not sure about something, say so rather than making assumptions. \
Always maintain a professional and friendly tone.";

/// Answer format instructions appended to the preamble.
pub const ANSWER_FORMAT: &str = r#"Structure your response like a product information card:

1. Start with a direct answer to the question
2. List specific product variations with their details in bullet points
3. Include nutritional information when available
4. Add a reference link when relevant

Format your response as a JSON object with these fields:
{
    "mainAnswer": "The primary response to the question",
    "productDetails": [
        {
            "name": "Product name/variant",
            "details": ["Detail 1", "Detail 2"]
        }
    ],
    "referenceLink": "URL or text reference",
    "followUpInfo": "Additional relevant information (optional)"
}

Example for calories question:
{
    "mainAnswer": "The calorie content of a KitKat bar varies depending on the size and type:",
    "productDetails": [
        {
            "name": "KITKAT 4-Finger Wafer Bar, Milk Chocolate (45 g)",
            "details": ["Calories: 230 per bar"]
        },
        {
            "name": "KITKAT mini Chocolate Wafer Bars Pack of 30",
            "details": ["Calories: 100 per 2 bars (25g)"]
        }
    ],
    "referenceLink": "For more information, visit our nutrition page",
    "followUpInfo": "Calorie content may vary by region and recipe"
}"#;

/// System instruction for the query rewrite call.
pub const REWRITE_SYSTEM: &str = r#"You are an AI assistant that generates search queries for Nestlé website content.
Given a user query, infer the user's intent and provide a search query. Format a JSON response
with a search_query field that would best find relevant information.
Examples: {"search_query": "Does Nestle sell kitkat chocolate"}"#;

/// Reply for queries that do not need the catalog.
pub const DEFAULT_GREETING: &str = "Hello! I am an AI assistant for the Made with Nestlé website. \
I can help you find recipes, cooking tips, and answer questions about Nestlé products.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptSet {
    pub preamble: String,
    pub answer_format: String,
    pub rewrite_system: String,
    pub greeting: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            preamble: GROUNDING_PREAMBLE.to_string(),
            answer_format: ANSWER_FORMAT.to_string(),
            rewrite_system: REWRITE_SYSTEM.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

impl PromptSet {
    /// Full system message for the answer call.
    pub fn answer_system(&self) -> String {
        if self.answer_format.is_empty() {
            return self.preamble.clone();
        }
        format!("{}\n\n{}", self.preamble, self.answer_format)
    }
}

/// Build the user message: context block, then the question.
///
/// # Example
/// ```
/// # use contextor::prompt::build_user_prompt;
/// let p = build_user_prompt("Content: KitKat\nSource: p1", "calories?");
/// assert!(p.starts_with("Context: Content: KitKat"));
/// assert!(p.contains("Question: calories?"));
/// ```
pub fn build_user_prompt(context: &str, query: &str) -> String {
    format!(
        "Context: {context}\n\nQuestion: {query}\n\n\
         Please provide a concise answer based on the context provided."
    )
}
