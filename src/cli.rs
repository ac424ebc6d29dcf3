use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::config::Overrides;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "winlogstream",
    about = "Stream a live event log to stdout as simple or RFC 5424 lines",
    version = env!("GIT_DESCRIBE"),
    after_help = "Options also read FORMAT, MSGOUT, LOGNAME, USECOLOR and LOG_LEVEL from the environment or a .env file.\n\nLogs are written to: ~/.local/share/winlogstream/logs/winlogstream.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to winlogstream.yaml config file")]
    pub config: Option<PathBuf>,

    /// Line style: simple or rfc5424
    #[arg(long, env = "FORMAT", global = true)]
    pub format: Option<String>,

    /// Message output: full, singleline or singlelinetrim
    #[arg(long, env = "MSGOUT", global = true)]
    pub msgout: Option<String>,

    /// Name of the log to subscribe to
    #[arg(long = "log-name", env = "LOGNAME", global = true)]
    pub log_name: Option<String>,

    /// Color the severity token in simple lines ("true" to enable)
    #[arg(long = "use-color", env = "USECOLOR", global = true)]
    pub use_color: Option<String>,

    /// Diagnostic log level (trace, debug, info, warn, error, off)
    #[arg(long = "log-level", env = "LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            format: self.format.clone(),
            msgout: self.msgout.clone(),
            log_name: self.log_name.clone(),
            use_color: self.use_color.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream events until interrupted (the default)
    Stream,

    /// Show the effective configuration
    Config {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        output: Option<OutputFormat>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "winlogstream",
            "--format",
            "rfc5424",
            "--msgout",
            "full",
            "--log-name",
            "System",
            "--use-color",
            "true",
        ])
        .unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.format.as_deref(), Some("rfc5424"));
        assert_eq!(overrides.msgout.as_deref(), Some("full"));
        assert_eq!(overrides.log_name.as_deref(), Some("System"));
        assert_eq!(overrides.use_color.as_deref(), Some("true"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_config_subcommand() {
        let cli = Cli::try_parse_from(["winlogstream", "config", "-o", "yaml"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                output: Some(OutputFormat::Yaml)
            })
        ));
    }

    #[test]
    fn test_explicit_output_format_wins() {
        assert_eq!(OutputFormat::resolve(Some(OutputFormat::Yaml)), OutputFormat::Yaml);
    }
}
