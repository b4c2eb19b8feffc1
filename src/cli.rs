use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::settings::SettingsKind;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "🍅 tomatick - A Terminal Pomodoro Timer")]
pub struct Cli {
    /// Pomodoro length, e.g. 25m, 1h30m, 90s or bare minutes
    #[arg(short, long, value_parser = parse_duration)]
    pub work: Option<f64>,
    #[arg(short, long, value_parser = parse_duration)]
    pub short: Option<f64>,
    #[arg(short, long, value_parser = parse_duration)]
    pub long: Option<f64>,
    #[arg(long)]
    pub no_sound: bool,

    /// Where settings, the cached token and the log live
    #[arg(long, env = "TOMATICK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
    /// Keep settings in memory only
    #[arg(long)]
    pub ephemeral: bool,

    /// Enables the Spotify integration
    #[arg(long, env = "SPOTIFY_CLIENT_ID")]
    pub spotify_client_id: Option<String>,
    #[arg(long, default_value = "http://localhost:8888/callback")]
    pub spotify_redirect_uri: String,
    /// Access token to connect with on startup
    #[arg(long, env = "SPOTIFY_TOKEN", hide_env_values = true)]
    pub spotify_token: Option<String>,
    #[arg(long, hide = true, default_value = crate::spotify::api::DEFAULT_API_BASE)]
    pub spotify_api_base: String,

    /// Fixed seed for quotes and scene picks
    #[arg(long, hide = true)]
    pub seed: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the stored settings as JSON
    Show,
    /// Apply a partial update, e.g. `set sounds '{"volume": 40}'`
    Set {
        /// timers, sounds or general
        kind: SettingsKind,
        patch: String,
    },
    /// Restore timer and general settings to their defaults
    Reset {
        #[arg(long)]
        yes: bool,
    },
    /// Print the Spotify authorization URL
    AuthUrl,
}

/// Parses `1h30m`, `25m`, `90s` or a bare number of minutes into minutes.
pub fn parse_duration(s: &str) -> Result<f64, String> {
    let s = s.trim().to_lowercase();
    let mut total = 0.0;
    let mut num = String::new();

    for c in s.chars() {
        match c {
            '0'..='9' | '.' => num.push(c),
            'h' => {
                total += num.parse::<f64>().map_err(|_| "Invalid hours")? * 60.0;
                num.clear();
            }
            'm' => {
                total += num.parse::<f64>().map_err(|_| "Invalid minutes")?;
                num.clear();
            }
            's' => {
                total += num.parse::<f64>().map_err(|_| "Invalid seconds")? / 60.0;
                num.clear();
            }
            _ => return Err("Invalid format".into()),
        }
    }
    if !num.is_empty() {
        total += num.parse::<f64>().map_err(|_| "Invalid minutes")?;
    }

    if total > 0.0 {
        Ok(total)
    } else {
        Err("Duration must be > 0".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("25m"), Ok(25.0));
        assert_eq!(parse_duration("1h30m"), Ok(90.0));
        assert_eq!(parse_duration("90s"), Ok(1.5));
        assert_eq!(parse_duration("15"), Ok(15.0));
        assert!(parse_duration("0m").is_err());
        assert!(parse_duration("ten").is_err());
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["tomatick", "--work", "50m", "set", "sounds", r#"{"volume":40}"#])
            .unwrap();
        assert_eq!(cli.work, Some(50.0));
        match cli.command {
            Some(Command::Set { kind, patch }) => {
                assert_eq!(kind, SettingsKind::Sounds);
                assert_eq!(patch, r#"{"volume":40}"#);
            }
            other => panic!("unexpected {other:?}"),
        }

        let cli = Cli::try_parse_from(["tomatick", "reset", "--yes"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Reset { yes: true })));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
