use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdeck",
    version,
    about = "taskdeck: a terminal client for a REST task list",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    /// Config file (defaults to $TASKDECK_CONFIG, then ~/.taskdeckrc).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Backend base URL, overrides `api.url`.
    #[arg(long = "api")]
    pub api: Option<String>,

    /// Directory for client-side state.
    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the filtered, sorted task list with progress.
    List(ListArgs),
    /// Create a task.
    Add(AddArgs),
    /// Change fields of a task.
    Edit(EditArgs),
    /// Show one task in full.
    Show { id: String },
    /// Flip a task between active and completed.
    #[command(alias = "done")]
    Toggle { id: String },
    /// Delete a task after confirmation.
    #[command(alias = "rm")]
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
    /// List the categories in use.
    Categories,
    /// Show completion progress only.
    Progress,
    /// Check that the backend is reachable.
    Health,
    /// Show or change the theme preference (light, dark, toggle).
    Theme { value: Option<String> },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// all, active or completed.
    #[arg(long)]
    pub tab: Option<String>,

    /// A category name or `all`.
    #[arg(long)]
    pub category: Option<String>,

    /// low, medium, high or `all`.
    #[arg(long)]
    pub priority: Option<String>,

    /// Case-insensitive text matched against title and description.
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// priority, deadline or created.
    #[arg(long)]
    pub sort: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(required = true, num_args = 1..)]
    pub title: Vec<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long, short = 'p')]
    pub priority: Option<String>,

    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// YYYY-MM-DD.
    #[arg(long)]
    pub deadline: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: String,

    #[arg(long, short = 't')]
    pub title: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long, short = 'p')]
    pub priority: Option<String>,

    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// YYYY-MM-DD.
    #[arg(long, conflicts_with = "clear_deadline")]
    pub deadline: Option<String>,

    #[arg(long)]
    pub clear_deadline: bool,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` overrides out of argv.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use clap::Parser;

    use super::{Command, GlobalCli, preprocess_args};

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_extracted() {
        let pre = preprocess_args(&args(&["taskdeck", "rc.color=off", "list", "rc.api.timeout:5"]))
            .expect("preprocess");
        assert_eq!(pre.cleaned_args, args(&["taskdeck", "list"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.api.timeout".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn parses_add_with_multiword_title() {
        let cli = GlobalCli::try_parse_from(args(&[
            "taskdeck", "add", "buy", "milk", "-p", "high", "--deadline", "2025-03-01",
        ]))
        .expect("parse");
        let Some(Command::Add(add)) = cli.command else {
            panic!("expected add command");
        };
        assert_eq!(add.title.join(" "), "buy milk");
        assert_eq!(add.priority.as_deref(), Some("high"));
        assert_eq!(add.deadline.as_deref(), Some("2025-03-01"));
    }

    #[test]
    fn done_is_an_alias_for_toggle() {
        let cli = GlobalCli::try_parse_from(args(&["taskdeck", "done", "4"])).expect("parse");
        assert!(matches!(cli.command, Some(Command::Toggle { ref id }) if id == "4"));
    }

    #[test]
    fn edit_rejects_deadline_with_clear() {
        let parsed = GlobalCli::try_parse_from(args(&[
            "taskdeck",
            "edit",
            "2",
            "--deadline",
            "2025-01-01",
            "--clear-deadline",
        ]));
        assert!(parsed.is_err());
    }
}
