//! Selfie voice CLI
//!
//! Runs the voice orchestration stack against simulated engines and shows
//! the effective configuration.

#![allow(clippy::print_stdout)]

mod simulate;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use infrastructure::{AppConfig, init_logging};

/// Selfie voice CLI
#[derive(Parser)]
#[command(name = "selfie-voice")]
#[command(author, version, about = "Voice guidance orchestration demo", long_about = None)]
struct Cli {
    /// Verbosity level (overrides the configured log filter)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (default: ./voice.toml if present)
    #[arg(short, long, env = "SELFIE_VOICE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted voice session with simulated engines
    ///
    /// Each transcript is preceded by a detector onset, so the full
    /// detect, recognize, dispatch, speak and resume cycle runs.
    /// Example: selfie-voice simulate -t "take photo" -t "how do I look"
    Simulate {
        /// Utterances to feed, in order
        #[arg(short, long = "transcript", default_value = "take photo")]
        transcripts: Vec<String>,

        /// Make the primary voice detector fail to initialize
        #[arg(long)]
        fail_primary: bool,

        /// Finish with a silent short-reply window of this many milliseconds
        #[arg(long)]
        reply_window_ms: Option<u64>,

        /// Override the configured language
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(cli.config.as_deref())?;
    if let Some(filter) = log_filter_from_verbosity(cli.verbose) {
        config.telemetry.log_filter = filter.to_string();
    }

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml()?);
        },

        Commands::Simulate {
            transcripts,
            fail_primary,
            reply_window_ms,
            language,
        } => {
            init_logging(&config.telemetry)?;
            if let Some(language) = language {
                config.orchestrator.language = language;
            }

            println!("🚀 Starting simulated voice session");
            let report = simulate::run(
                &config,
                simulate::ScenarioOptions {
                    fail_primary,
                    transcripts,
                    reply_window: reply_window_ms.map(Duration::from_millis),
                },
            )
            .await;

            println!();
            println!("✅ Session finished");
            println!("   🎙️  Listening mode: {}", report.mode);
            println!("   📡 Events: {}", report.events);
            println!("   🔊 Spoken:");
            for line in &report.spoken {
                println!("      \"{line}\"");
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn log_filter_verbosity() {
        assert_eq!(log_filter_from_verbosity(0), None);
        assert_eq!(log_filter_from_verbosity(1), Some("info"));
        assert_eq!(log_filter_from_verbosity(2), Some("debug"));
        assert_eq!(log_filter_from_verbosity(7), Some("trace"));
    }

    #[test]
    fn simulate_defaults_to_take_photo() {
        let cli = Cli::try_parse_from(["selfie-voice", "simulate"]).unwrap();
        match cli.command {
            Commands::Simulate {
                transcripts,
                fail_primary,
                reply_window_ms,
                ..
            } => {
                assert_eq!(transcripts, vec!["take photo".to_string()]);
                assert!(!fail_primary);
                assert!(reply_window_ms.is_none());
            },
            Commands::Config => panic!("expected simulate"),
        }
    }

    #[test]
    fn simulate_accepts_repeated_transcripts() {
        let cli = Cli::try_parse_from([
            "selfie-voice",
            "-vv",
            "simulate",
            "-t",
            "take photo",
            "-t",
            "how do I look",
            "--fail-primary",
            "--reply-window-ms",
            "4500",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Simulate {
                transcripts,
                fail_primary,
                reply_window_ms,
                ..
            } => {
                assert_eq!(transcripts.len(), 2);
                assert!(fail_primary);
                assert_eq!(reply_window_ms, Some(4500));
            },
            Commands::Config => panic!("expected simulate"),
        }
    }
}
