use crate::error::InferenceError;
use crate::frame::DecodedImage;
use crate::model::{GenerationRequest, VisionLanguageModel};
use std::time::Instant;

/// Placeholder token marking where the image goes in the prompt.
pub const IMAGE_TOKEN: &str = "<image>";

/// Chat delimiters some models leak into their output.
const CONTROL_TOKENS: [&str; 2] = ["<|im_start|>", "<|im_end|>"];

// Repetition handling is disabled to keep per-frame latency low.
const REPETITION_PENALTY: f32 = 1.0;
const REPETITION_CONTEXT_SIZE: usize = 0;

/// Sampling parameters for one analysis request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: usize,
    pub temperature: f32,
}

/// Prepends the image placeholder to the user prompt.
pub fn format_prompt(prompt: &str) -> String {
    format!("{IMAGE_TOKEN}\n{prompt}")
}

/// Removes chat control tokens and surrounding whitespace.
pub fn clean_generated_text(text: &str) -> String {
    CONTROL_TOKENS
        .iter()
        .fold(text.to_string(), |acc, token| acc.replace(token, ""))
        .trim()
        .to_string()
}

/// Runs the model on one frame and returns the cleaned generated text.
///
/// Errors from the model are converted into [`InferenceError`] carrying the
/// underlying message.
pub fn infer<M: VisionLanguageModel>(
    model: &M,
    image: &DecodedImage,
    prompt: &str,
    params: GenerationParams,
) -> Result<String, InferenceError> {
    let prompt = format_prompt(prompt);

    log::debug!(
        "Running inference on {}x{} frame (max_tokens: {}, temperature: {})",
        image.width(),
        image.height(),
        params.max_tokens,
        params.temperature
    );
    let start_time = Instant::now();

    let generation = model
        .generate(GenerationRequest {
            prompt: &prompt,
            image,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            repetition_penalty: REPETITION_PENALTY,
            repetition_context_size: REPETITION_CONTEXT_SIZE,
        })
        .map_err(|e| InferenceError::Generation(e.to_string()))?;

    log::info!("Inference time: {:.2}s", start_time.elapsed().as_secs_f32());

    Ok(clean_generated_text(&generation.into_text()))
}
