// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, error, info};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use readaloud::app_config::{self, Config, SpeechBackendKind};
use readaloud::app_controller::{Controller, ReadOptions, ReadOutcome};
use readaloud::playback::{SessionCommand, VoiceSettings};
use readaloud::speech::{SynthesisRequest, VoiceType};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for SpeechBackendKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliSpeechBackend {
    Mock,
    Http,
}

impl From<CliSpeechBackend> for SpeechBackendKind {
    fn from(cli_backend: CliSpeechBackend) -> Self {
        match cli_backend {
            CliSpeechBackend::Mock => SpeechBackendKind::Mock,
            CliSpeechBackend::Http => SpeechBackendKind::Http,
        }
    }
}

/// CLI Wrapper for VoiceType to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliVoiceType {
    Narrator,
    Character,
    Child,
    Adult,
}

impl From<CliVoiceType> for VoiceType {
    fn from(cli_voice: CliVoiceType) -> Self {
        match cli_voice {
            CliVoiceType::Narrator => VoiceType::Narrator,
            CliVoiceType::Character => VoiceType::Character,
            CliVoiceType::Child => VoiceType::Child,
            CliVoiceType::Adult => VoiceType::Adult,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract the line layout of a document and print it as JSON
    Extract {
        /// Document to extract (PDF or plain text)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Enrichment JSON to apply to the layout
        #[arg(short, long)]
        enrichment: Option<PathBuf>,
    },

    /// Synthesize one line and print the audio reference and word timings
    Speak {
        /// Text to speak
        text: String,

        /// Character speaking the line
        #[arg(short, long)]
        character: Option<String>,

        /// Voice role used when no character is given
        #[arg(long, value_enum, default_value = "narrator")]
        voice_type: CliVoiceType,

        /// Speech rate multiplier
        #[arg(short, long, default_value_t = 1.0)]
        rate: f32,

        /// Named voice profile
        #[arg(short, long)]
        voice: Option<String>,
    },

    /// Synthesize a JSON list of {text, character} segments into one clip
    Segments {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// List available voices
    Voices,

    /// Read a document aloud; type p, r, s, a, m, a line number or q + Enter
    Read {
        /// Document to read (PDF or plain text)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Document-wide line to start from
        #[arg(short, long, default_value_t = 0)]
        start_line: usize,

        /// Stop after each line and wait for a command
        #[arg(long)]
        no_auto_advance: bool,

        /// Enrichment JSON to apply before reading
        #[arg(short, long)]
        enrichment: Option<PathBuf>,

        /// Voice role for the narration
        #[arg(long, value_enum)]
        voice_type: Option<CliVoiceType>,

        /// Speech rate multiplier
        #[arg(short, long)]
        rate: Option<f32>,
    },

    /// Generate shell completions for readaloud
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// readaloud - document read-aloud pipeline
///
/// Turns documents into ordered lines, synthesizes timed speech for them and
/// plays them back line by line under interactive control.
#[derive(Parser, Debug)]
#[command(name = "readaloud")]
#[command(version)]
#[command(about = "Read documents aloud line by line")]
#[command(long_about = "readaloud extracts lines from documents and reads them aloud with word timings.

EXAMPLES:
    readaloud extract story.pdf                 # Print the line layout as JSON
    readaloud speak \"Hello there\" -c teacher    # Synthesize one line
    readaloud read story.pdf --start-line 10    # Read from line 10
    readaloud voices                            # List voices
    readaloud completions bash > readaloud.bash # Generate bash completions

CONFIGURATION:
    Configuration is stored in readaloud.json by default. You can specify a
    different config file with --config-path. If the config file doesn't exist,
    a default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short = 'C', long, global = true, default_value = "readaloud.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Speech backend to use
    #[arg(short, long, global = true, value_enum)]
    backend: Option<CliSpeechBackend>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger; the max level is adjusted after config load
    fn init() -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(LevelFilter::Info);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color code for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // Dependencies (lopdf logs every decoded string) only surface warnings
        if !metadata.target().starts_with("readaloud") && metadata.level() > Level::Warn {
            return false;
        }
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    CustomLogger::init()?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "readaloud", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_create(Path::new(&cli.config_path)).await?;
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if let Some(backend) = cli.backend {
        config.speech.backend = backend.into();
    }
    log::set_max_level(config.log_level.to_level_filter());
    debug!("Using {} speech backend", config.speech.backend.display_name());

    let controller = Controller::with_config(config)?;

    if let Err(e) = run_command(&controller, cli.command).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run_command(controller: &Controller, command: Commands) -> Result<()> {
    match command {
        Commands::Extract { file, enrichment } => {
            let layout = controller.extract_file(&file, enrichment.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&layout)?);
        }
        Commands::Speak {
            text,
            character,
            voice_type,
            rate,
            voice,
        } => {
            let mut request = SynthesisRequest::new(text).voice_type(voice_type.into()).rate(rate);
            request.character = character;
            request.voice_name = voice;
            let line = controller.speak(&request).await;
            println!("{}", serde_json::to_string_pretty(&line)?);
        }
        Commands::Segments { file } => {
            let reference = controller.speak_segments_file(&file).await?;
            println!("{}", serde_json::json!({ "audio_url": reference }));
        }
        Commands::Voices => {
            println!("{}", serde_json::to_string_pretty(&controller.voices())?);
        }
        Commands::Read {
            file,
            start_line,
            no_auto_advance,
            enrichment,
            voice_type,
            rate,
        } => {
            controller.test_backend().await?;
            let layout = controller.extract_file(&file, enrichment.as_deref()).await?;

            let voice_settings = VoiceSettings {
                voice_type: voice_type.map(Into::into),
                rate,
                voice_name: None,
            };
            let options = ReadOptions {
                start_line,
                auto_advance: !no_auto_advance,
                voice_settings,
            };

            let outcome = controller.read(layout, options, spawn_stdin_commands()).await?;
            if outcome == ReadOutcome::Stopped {
                info!("Stopped before the end of the document");
            }
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}

/// Forward terminal input to the session as commands. `q` stops reading.
fn spawn_stdin_commands() -> mpsc::UnboundedReceiver<SessionCommand> {
    let (sender, receiver) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read command input: {}", e);
                    break;
                }
            };

            let command = if line.trim() == "q" {
                Some(SessionCommand::Stop)
            } else {
                SessionCommand::from_shorthand(&line)
            };
            match command {
                Some(command) => {
                    if sender.send(command).is_err() {
                        break;
                    }
                }
                None => error!("Unknown command '{}'", line.trim()),
            }
        }
    });
    receiver
}
