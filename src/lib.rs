//! Real-time description of webcam frames with a locally loaded
//! vision-language model.
//!
//! A browser streams captured frames over a WebSocket; the
//! [`SessionGateway`] decodes each frame, runs it through the model and
//! returns the generated text trimmed to whole sentences.
//!
//! The crate does not ship a model. Users implement [`ModelSource`] to load
//! their model and [`VisionLanguageModel`] to run it, and the gateway takes
//! care of the rest: lazy loading, frame decoding and resizing, prompt
//! formatting, output cleanup and error reporting.
//!
//! ```no_run
//! use kornia_glimpse::{
//!     Generation, GenerationRequest, LoadOptions, ModelSource, SessionGateway,
//!     VisionLanguageModel,
//! };
//!
//! struct Captioner;
//!
//! impl VisionLanguageModel for Captioner {
//!     type Error = std::io::Error;
//!
//!     fn generate(&self, _request: GenerationRequest<'_>) -> Result<Generation, Self::Error> {
//!         Ok(Generation::Text("A person at a desk".to_string()))
//!     }
//! }
//!
//! struct CaptionerSource;
//!
//! impl ModelSource for CaptionerSource {
//!     type Model = Captioner;
//!     type Error = std::io::Error;
//!
//!     fn model_id(&self) -> &str {
//!         "captioner"
//!     }
//!
//!     fn load(&self, _options: &LoadOptions) -> Result<Self::Model, Self::Error> {
//!         Ok(Captioner)
//!     }
//! }
//!
//! let gateway = SessionGateway::new(CaptionerSource);
//! let reply = gateway.handle_message(r#"{"event":"analyze_frame","data":{"image":"..."}}"#);
//! println!("{}", serde_json::to_string(&reply).unwrap());
//! ```

mod error;
mod frame;
mod gateway;
mod inference;
mod loader;
mod messages;
mod model;
mod trimmer;

pub use error::{AnalysisError, DecodeError, InferenceError, ModelLoadError};
pub use frame::{DecodedImage, MAX_IMAGE_EDGE, NATIVE_PATCH_SIZE, decode_frame};
pub use gateway::{EMPTY_RESPONSE, SessionGateway};
pub use inference::{GenerationParams, IMAGE_TOKEN, clean_generated_text, format_prompt, infer};
pub use loader::{ModelLoader, ModelState, ModelStatus};
pub use messages::{
    AnalysisRequest, AnalysisResult, ClientEvent, DEFAULT_MAX_TOKENS, DEFAULT_PROMPT,
    DEFAULT_TEMPERATURE, MAX_TOKENS_LIMIT, ServerEvent,
};
pub use model::{Generation, GenerationRequest, LoadOptions, ModelSource, VisionLanguageModel};
pub use trimmer::trim_to_complete_sentences;
