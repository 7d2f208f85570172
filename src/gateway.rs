use crate::error::{AnalysisError, DecodeError};
use crate::frame::decode_frame;
use crate::inference::infer;
use crate::loader::ModelLoader;
use crate::messages::{AnalysisRequest, AnalysisResult, ClientEvent, ServerEvent};
use crate::model::{ModelSource, VisionLanguageModel};
use crate::trimmer::trim_to_complete_sentences;

/// Response used when the model produced nothing usable.
pub const EMPTY_RESPONSE: &str = "No response generated.";

/// Connects remote clients to the decode, inference and trimming pipeline.
///
/// The gateway is transport agnostic: the server hands it connection events
/// and raw text frames and sends back whatever it returns. One gateway is
/// shared by all connections; the model handle lives in its [`ModelLoader`].
pub struct SessionGateway<S: ModelSource> {
    loader: ModelLoader<S>,
}

impl<S: ModelSource> SessionGateway<S> {
    pub fn new(source: S) -> Self {
        Self::with_loader(ModelLoader::new(source))
    }

    pub fn with_loader(loader: ModelLoader<S>) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &ModelLoader<S> {
        &self.loader
    }

    /// Called when a client connects. Starts loading the model if needed and
    /// returns an error event for the client when that fails.
    pub fn on_connect(&self) -> Option<ServerEvent> {
        log::info!("Client connected");
        if self.loader.ensure_model_loaded() {
            None
        } else {
            Some(ServerEvent::Error {
                message: "Failed to load model".to_string(),
            })
        }
    }

    /// Called when a client disconnects. The model is process wide, so there
    /// is nothing to release.
    pub fn on_disconnect(&self) {
        log::info!("Client disconnected");
    }

    /// Handles one raw text frame from a client, always producing exactly one
    /// event to send back.
    pub fn handle_message(&self, text: &str) -> ServerEvent {
        match serde_json::from_str::<ClientEvent>(text) {
            Ok(ClientEvent::AnalyzeFrame(request)) => self.analyze_frame(&request).into(),
            Err(e) => {
                log::warn!("Rejecting malformed client message: {e}");
                let error = AnalysisError::from(DecodeError::MalformedMessage(e.to_string()));
                failure(&error).into()
            }
        }
    }

    /// Runs one frame through decode, inference and sentence trimming.
    pub fn analyze_frame(&self, request: &AnalysisRequest) -> AnalysisResult {
        if !self.loader.is_ready() && !self.loader.ensure_model_loaded() {
            return AnalysisResult::Failure {
                error: "Model not loaded".to_string(),
            };
        }
        let Some(model) = self.loader.model() else {
            return AnalysisResult::Failure {
                error: "Model not loaded".to_string(),
            };
        };

        let result = run_pipeline(model.as_ref(), request);

        match result {
            Ok(text) if text.is_empty() => AnalysisResult::Success {
                response: EMPTY_RESPONSE.to_string(),
            },
            Ok(response) => {
                log::info!("Analysis complete: {}", preview(&response));
                AnalysisResult::Success { response }
            }
            Err(e) => failure(&e),
        }
    }
}

fn run_pipeline<M: VisionLanguageModel>(
    model: &M,
    request: &AnalysisRequest,
) -> Result<String, AnalysisError> {
    let raw = request.image.as_deref().ok_or(DecodeError::MissingPayload)?;
    let image = decode_frame(raw)?;
    let text = infer(model, &image, request.prompt(), request.generation_params())?;
    Ok(trim_to_complete_sentences(&text))
}

fn failure(error: &AnalysisError) -> AnalysisResult {
    let error = format!("Analysis error: {error}");
    log::error!("{error}");
    AnalysisResult::Failure { error }
}

fn preview(text: &str) -> String {
    const PREVIEW_CHARS: usize = 100;
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
