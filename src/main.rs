use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voice_chat::api::ApiServerBuilder;
use voice_chat::language::compose_instruction;
use voice_chat::llm::{GeminiClient, GenerationRequest, Generator};
use voice_chat::voice::{
    SpeechToText, SttProvider, Synthesizer, TextToSpeech, Transcriber, Transcript,
};
use voice_chat::{ChatHandler, Config, HandlerOptions, LanguageId, PersonalityId};

/// Voice Chat - talk to a language model by text or voice
#[derive(Parser)]
#[command(name = "voice-chat", version, about)]
struct Cli {
    /// Port to listen on (overrides config)
    #[arg(long, env = "VOICE_CHAT_PORT")]
    port: Option<u16>,

    /// Bind address (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory with the web UI
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable voice input and output
    #[arg(long, env = "VOICE_CHAT_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Synthesize text and write the MP3 to a file
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
        /// Language whose voice to use
        #[arg(short, long, default_value = "english")]
        language: String,
        /// Output file
        #[arg(short, long, default_value = "tts-test.mp3")]
        out: PathBuf,
    },
    /// Transcribe a WAV recording
    TestStt {
        /// Path to a WAV file
        path: PathBuf,
        /// Language spoken in the recording
        #[arg(short, long, default_value = "english")]
        language: String,
    },
    /// Send one prompt to the model and print the reply
    Ask {
        /// The prompt
        prompt: String,
        /// Personality to answer as
        #[arg(short, long, default_value = "general_assistant")]
        personality: String,
        /// Language to answer in
        #[arg(short, long, default_value = "english")]
        language: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voice_chat=info",
        1 => "info,voice_chat=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load_from(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if cli.static_dir.is_some() {
        config.server.static_dir = cli.static_dir;
    }
    if cli.disable_voice {
        config.voice.enabled = false;
    }
    tracing::debug!(?config, "loaded configuration");

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestTts {
                text,
                language,
                out,
            } => test_tts(&config, &text, &language, &out).await,
            Command::TestStt { path, language } => test_stt(&config, &path, &language).await,
            Command::Ask {
                prompt,
                personality,
                language,
            } => ask(&config, prompt, &personality, &language).await,
        };
    }

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        model = %config.generation.model,
        voice = config.voice.enabled,
        "starting voice chat"
    );

    let handler = build_handler(&config)?;
    if !handler.stt_available() {
        tracing::warn!("voice input unavailable (disabled or no API key)");
    }
    if !handler.tts_available() {
        tracing::warn!("voice output unavailable (disabled or no API key)");
    }

    let server = ApiServerBuilder::new(handler, config.server.port)
        .host(config.server.host.clone())
        .model(config.generation.model.clone())
        .session_ttl(config.session_ttl)
        .static_dir(config.server.static_dir.clone())
        .rate_limit(config.server.rate_limit_per_minute)
        .build();

    server.run().await?;
    Ok(())
}

/// Wire the adapters selected by configuration into a handler
fn build_handler(config: &Config) -> anyhow::Result<ChatHandler> {
    let generator = build_generator(config)?;
    let transcriber = if config.voice.enabled {
        build_transcriber(config)?.map(|t| Arc::new(t) as Arc<dyn Transcriber>)
    } else {
        None
    };
    let synthesizer = if config.voice.enabled {
        build_synthesizer(config)?.map(|s| Arc::new(s) as Arc<dyn Synthesizer>)
    } else {
        None
    };

    Ok(ChatHandler::new(Arc::new(generator))
        .with_transcriber(transcriber)
        .with_synthesizer(synthesizer)
        .with_options(HandlerOptions {
            auto_speak: config.voice.auto_speak,
            include_history: config.generation.include_history,
        }))
}

fn build_generator(config: &Config) -> anyhow::Result<GeminiClient> {
    let api_key = config
        .api_keys
        .gemini
        .clone()
        .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY is not set"))?;
    Ok(GeminiClient::new(
        api_key,
        config.generation.model.clone(),
        config.http_timeout,
    )?)
}

fn build_transcriber(config: &Config) -> anyhow::Result<Option<SpeechToText>> {
    let Some(key) = config.stt_api_key() else {
        return Ok(None);
    };
    let stt = match config.voice.stt_provider {
        SttProvider::Google => SpeechToText::new_google(key.to_string(), config.http_timeout)?,
        SttProvider::Whisper => SpeechToText::new_whisper(
            key.to_string(),
            config.voice.whisper_model.clone(),
            config.http_timeout,
        )?,
    };
    Ok(Some(stt))
}

fn build_synthesizer(config: &Config) -> anyhow::Result<Option<TextToSpeech>> {
    let Some(key) = config.api_keys.google.clone() else {
        return Ok(None);
    };
    let tts = TextToSpeech::new_google(key, config.voice.tts_speed, config.http_timeout)?
        .with_scratch_dir(config.voice.scratch_dir.clone());
    Ok(Some(tts))
}

/// Synthesize a sentence with the language's voice
async fn test_tts(
    config: &Config,
    text: &str,
    language: &str,
    out: &std::path::Path,
) -> anyhow::Result<()> {
    let language = LanguageId::parse(language)?.language();
    let tts = build_synthesizer(config)?
        .ok_or_else(|| anyhow::anyhow!("GOOGLE_API_KEY is not set"))?;

    println!("Synthesizing \"{text}\" with voice {}...", language.voice);
    let audio = tts.synthesize(text, language.voice).await?;
    println!("Got {} bytes of audio data", audio.len());

    tokio::fs::write(out, &audio).await?;
    println!("Wrote {}", out.display());
    Ok(())
}

/// Transcribe a WAV file
async fn test_stt(config: &Config, path: &std::path::Path, language: &str) -> anyhow::Result<()> {
    let language = LanguageId::parse(language)?.language();
    let stt = build_transcriber(config)?.ok_or_else(|| {
        anyhow::anyhow!("no API key for the {:?} STT provider", config.voice.stt_provider)
    })?;

    let audio = tokio::fs::read(path).await?;
    println!(
        "Transcribing {} ({} bytes, {})...",
        path.display(),
        audio.len(),
        language.locale
    );

    match stt.transcribe(&audio, language.locale).await? {
        Transcript::Text(text) => println!("Transcript: {text}"),
        Transcript::NoMatch => println!("No speech recognized"),
    }
    Ok(())
}

/// One-shot prompt through the generation service
async fn ask(
    config: &Config,
    prompt: String,
    personality: &str,
    language: &str,
) -> anyhow::Result<()> {
    let personality = PersonalityId::parse(personality)?.personality();
    let language = LanguageId::parse(language)?.language();
    let generator = build_generator(config)?;

    let request = GenerationRequest {
        instruction: compose_instruction(personality.instruction, language),
        prompt,
        history: Vec::new(),
    };

    let reply = generator.generate(&request).await?;
    println!("{} {}: {reply}", personality.icon, personality.name);
    Ok(())
}
