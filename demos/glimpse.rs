use argh::FromArgs;
use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::{Html, IntoResponse},
    routing::get,
};
use kornia_glimpse::{
    AnalysisResult, Generation, GenerationRequest, LoadOptions, ModelSource, ServerEvent,
    SessionGateway, VisionLanguageModel,
};
use kornia_image::{Image, ImageError, ImageSize, allocator::CpuAllocator};
use kornia_vlm::paligemma::{Paligemma, PaligemmaConfig, PaligemmaError};
use std::{
    io::ErrorKind,
    sync::{Arc, Mutex, PoisonError},
};

// defaults for the server
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
// weights are whatever PaligemmaConfig::default() points kornia-vlm at
const PALIGEMMA_MODEL_LABEL: &str = "paligemma (kornia-vlm default config)";

const INDEX_HTML: &str = include_str!("static/index.html");

#[derive(FromArgs)]
/// Glimpse describes webcam frames in real time with a vision-language model.
struct GlimpseArgs {
    /// the host to run the server on
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to run the server on
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// enable debug logging
    #[argh(switch, short = 'd')]
    debug: bool,
}

type Gateway = SessionGateway<PaligemmaSource>;

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(gateway): State<Arc<Gateway>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, gateway))
}

async fn handle_socket(mut socket: WebSocket, gateway: Arc<Gateway>) {
    // loading can take minutes, keep it off the async workers
    let connected = tokio::task::spawn_blocking({
        let gateway = gateway.clone();
        move || gateway.on_connect()
    })
    .await
    .unwrap_or_else(|e| {
        log::error!("Model loading task failed: {e}");
        Some(ServerEvent::Error {
            message: "Failed to load model".to_string(),
        })
    });

    if let Some(event) = connected {
        if let Err(e) = send_event(&mut socket, &event).await {
            log::warn!("Failed to notify client: {e}");
            gateway.on_disconnect();
            return;
        }
    }

    while let Some(message) = socket.recv().await {
        let text = match message {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Binary(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                log::warn!("WebSocket receive failed: {e}");
                break;
            }
        };

        let event = tokio::task::spawn_blocking({
            let gateway = gateway.clone();
            move || gateway.handle_message(&text)
        })
        .await
        .unwrap_or_else(|e| {
            log::error!("Analysis task failed: {e}");
            AnalysisResult::Failure {
                error: format!("Analysis error: {e}"),
            }
            .into()
        });

        if let Err(e) = send_event(&mut socket, &event).await {
            log::warn!("Failed to send result: {e}");
            break;
        }
    }

    gateway.on_disconnect();
}

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), axum::Error> {
    let payload = serde_json::to_string(event).map_err(axum::Error::new)?;
    socket.send(Message::Text(payload.into())).await
}

// loads Paligemma lazily on the first client connection
struct PaligemmaSource;

impl ModelSource for PaligemmaSource {
    type Model = PaligemmaModel;
    type Error = PaligemmaError;

    fn model_id(&self) -> &str {
        PALIGEMMA_MODEL_LABEL
    }

    fn load(&self, options: &LoadOptions) -> Result<Self::Model, Self::Error> {
        // Paligemma resizes to its own input size, frames already arrive bounded
        log::debug!(
            "Frames are bounded to {}px before reaching the model",
            options.image_longest_edge
        );
        let model = Paligemma::new(PaligemmaConfig::default())?;
        Ok(PaligemmaModel(Mutex::new(model)))
    }
}

// inference needs exclusive access to the model state
struct PaligemmaModel(Mutex<Paligemma>);

#[derive(Debug, thiserror::Error)]
enum PaligemmaModelError {
    #[error(transparent)]
    Paligemma(#[from] PaligemmaError),

    #[error("invalid frame: {0}")]
    Image(#[from] ImageError),
}

impl VisionLanguageModel for PaligemmaModel {
    type Error = PaligemmaModelError;

    fn generate(&self, request: GenerationRequest<'_>) -> Result<Generation, Self::Error> {
        let image = Image::<u8, 3, CpuAllocator>::new(
            ImageSize {
                width: request.image.width() as usize,
                height: request.image.height() as usize,
            },
            request.image.as_raw().to_vec(),
            CpuAllocator,
        )?;

        // sampling follows PaligemmaConfig, only the token budget is per request
        log::debug!(
            "Paligemma ignores per-request sampling: {}",
            request.sampling_summary()
        );
        let mut model = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let text = model.inference(&image, request.prompt, request.max_tokens, false)?;

        Ok(Generation::Text(text))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: GlimpseArgs = argh::from_env();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let host = if args.host == "localhost" {
        "127.0.0.1".to_string()
    } else {
        args.host
    };

    // format the host and port
    let addr = format!("{}:{}", host, args.port);

    let gateway = Arc::new(SessionGateway::new(PaligemmaSource));

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .with_state(gateway);

    log::info!("🚀 Starting the server");
    log::info!("📱 Model: {}", PALIGEMMA_MODEL_LABEL);
    log::info!("🌐 Open http://{} in your browser", addr);
    log::info!("🔧 Press Ctrl+C to stop the server");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            match e.kind() {
                ErrorKind::PermissionDenied => {
                    log::error!("❌ Permission denied on port {}", args.port)
                }
                ErrorKind::AddrInUse => log::error!("❌ Port {} is already in use", args.port),
                _ => log::error!("❌ Network error: {e}"),
            }
            log::error!("💡 Try a different port: --port 8081");
            return Err(e.into());
        }
    };
    axum::serve(listener, app).await?;

    Ok(())
}
