use thiserror::Error;

/// Error raised when the model source fails to produce a ready model.
#[derive(Debug, Error)]
#[error("failed to load model {model}: {reason}")]
pub struct ModelLoadError {
    /// Identifier of the model that was being loaded.
    pub model: String,
    /// Description of the underlying failure.
    pub reason: String,
}

impl ModelLoadError {
    pub fn new(model: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            model: model.into(),
            reason: reason.to_string(),
        }
    }
}

/// Error raised while turning a client payload into a decoded image.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The message carried no image data.
    #[error("missing image payload")]
    MissingPayload,

    /// The payload is not valid base64.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The decoded bytes are not an image the codec understands.
    #[error("invalid image data: {0}")]
    Image(#[from] image::ImageError),

    /// The client frame could not be parsed as a known message.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

/// Error raised by the external text generator.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("{0}")]
    Generation(String),
}

/// Failure of one stage of the frame analysis pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to decode frame: {0}")]
    Decode(#[from] DecodeError),

    #[error("inference failed: {0}")]
    Inference(#[from] InferenceError),
}
