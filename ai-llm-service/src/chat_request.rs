/// A single system/user chat exchange with per-call sampling overrides.
///
/// `temperature` and `max_tokens` override the profile defaults when set.
/// `json_output` asks the provider for a JSON object reply (OpenAI
/// `response_format`, Ollama `format`).
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system: Option<&'a str>,
    pub user: &'a str,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub json_output: bool,
}

impl<'a> ChatRequest<'a> {
    /// Plain user prompt using the profile's sampling defaults.
    pub fn new(user: &'a str) -> Self {
        Self {
            system: None,
            user,
            temperature: None,
            max_tokens: None,
            json_output: false,
        }
    }

    pub fn with_system(mut self, system: &'a str) -> Self {
        self.system = Some(system);
        self
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = Some(temperature);
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_output = true;
        self
    }
}
