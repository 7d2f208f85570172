use crate::frame::{DecodedImage, MAX_IMAGE_EDGE};

/// Options applied once when the model and its preprocessor are loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadOptions {
    /// Longest edge, in pixels, the image preprocessor resizes inputs to.
    pub image_longest_edge: u32,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            image_longest_edge: MAX_IMAGE_EDGE,
        }
    }
}

/// Trait for the capability that loads a vision-language model.
///
/// Implementors wrap whatever library actually owns the weights and
/// preprocessor. The [`ModelLoader`](crate::ModelLoader) calls [`load`](Self::load)
/// at most once at a time and keeps the returned model for the rest of the
/// process lifetime.
pub trait ModelSource: Send + Sync {
    /// The loaded model handle.
    type Model: VisionLanguageModel;
    /// The error type returned when loading fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Human readable identifier of the model, used in logs and errors.
    fn model_id(&self) -> &str;

    /// Loads the model and configures its preprocessor with `options`.
    fn load(&self, options: &LoadOptions) -> Result<Self::Model, Self::Error>;
}

/// A single generation call handed to the model.
pub struct GenerationRequest<'a> {
    /// Prompt already carrying the image placeholder.
    pub prompt: &'a str,
    pub image: &'a DecodedImage,
    pub max_tokens: usize,
    pub temperature: f32,
    pub repetition_penalty: f32,
    pub repetition_context_size: usize,
}

impl GenerationRequest<'_> {
    /// Sampling settings as `key=value` pairs, for backends that log what
    /// they cannot apply.
    pub fn sampling_summary(&self) -> String {
        format!(
            "temperature={} repetition_penalty={} repetition_context_size={}",
            self.temperature, self.repetition_penalty, self.repetition_context_size
        )
    }
}

/// The shapes a text generator may hand its output back in.
#[derive(Clone, Debug, PartialEq)]
pub enum Generation {
    /// Plain generated text.
    Text(String),
    /// Text produced as separate pieces.
    Segments(Vec<String>),
    /// Text together with generation statistics.
    Detailed { text: String, generated_tokens: usize },
}

impl Generation {
    /// Collapses every shape into a single string. Segments are joined with
    /// single spaces and statistics are discarded.
    pub fn into_text(self) -> String {
        match self {
            Generation::Text(text) => text,
            Generation::Segments(segments) => segments.join(" "),
            Generation::Detailed { text, .. } => text,
        }
    }
}

impl From<String> for Generation {
    fn from(text: String) -> Self {
        Generation::Text(text)
    }
}

impl From<Vec<String>> for Generation {
    fn from(segments: Vec<String>) -> Self {
        Generation::Segments(segments)
    }
}

/// Trait for vision-language models that describe an image given a prompt.
///
/// `generate` takes `&self` so that one loaded model can serve several
/// clients at once. Backends that need exclusive access to their state must
/// provide it themselves.
pub trait VisionLanguageModel: Send + Sync + 'static {
    /// The error type that can be returned during generation.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs generation for the given request.
    fn generate(&self, request: GenerationRequest<'_>) -> Result<Generation, Self::Error>;
}
