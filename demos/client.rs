use argh::FromArgs;
use base64::{Engine as _, engine::general_purpose};
use kornia_glimpse::{
    AnalysisRequest, ClientEvent, DEFAULT_MAX_TOKENS, DEFAULT_PROMPT, DEFAULT_TEMPERATURE,
    ServerEvent,
};
use std::path::{Path, PathBuf};
use tungstenite::Message;

// defaults for the client
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;

#[derive(FromArgs)]
/// Glimpse client that sends one image for analysis and prints the result
struct ClientArgs {
    /// the host to connect to
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to connect to
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// the path to the image
    #[argh(option, short = 'i')]
    image_path: PathBuf,

    /// the prompt to use
    #[argh(option, default = "DEFAULT_PROMPT.to_string()")]
    prompt: String,

    /// maximum number of tokens to generate
    #[argh(option, default = "DEFAULT_MAX_TOKENS")]
    max_tokens: i64,

    /// sampling temperature
    #[argh(option, default = "DEFAULT_TEMPERATURE")]
    temperature: f32,
}

fn image_data_uri(path: &Path) -> std::io::Result<String> {
    let mime = match path.extension().and_then(|ext| ext.to_str()) {
        Some("png") => "image/png",
        _ => "image/jpeg",
    };
    let bytes = std::fs::read(path)?;
    Ok(format!(
        "data:{mime};base64,{}",
        general_purpose::STANDARD.encode(bytes)
    ))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: ClientArgs = argh::from_env();

    // format the host and port
    let addr = format!("ws://{}:{}/ws", args.host, args.port);

    let request = ClientEvent::AnalyzeFrame(AnalysisRequest {
        image: Some(image_data_uri(&args.image_path)?),
        prompt: Some(args.prompt),
        max_tokens: Some(args.max_tokens),
        temperature: Some(args.temperature),
    });

    let (mut socket, _response) = tungstenite::connect(addr)?;
    socket.send(Message::Text(serde_json::to_string(&request)?.into()))?;

    loop {
        let text = match socket.read()? {
            Message::Text(text) => text,
            Message::Close(_) => return Ok(()),
            _ => continue,
        };

        match serde_json::from_str::<ServerEvent>(text.as_str())? {
            ServerEvent::Error { message } => println!("Server error: {message}"),
            ServerEvent::AnalysisResult(result) => {
                println!("Result: {}", serde_json::to_string_pretty(&result)?);
                break;
            }
        }
    }

    socket.close(None)?;

    Ok(())
}
