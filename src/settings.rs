use anyhow::{Context, Result};
use backtrace::Backtrace;
use clap::Parser;
use log::{error, LevelFilter};
use serde::Deserialize;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::corpus::DEFAULT_MIN_MESSAGES;

const DEFAULT_PORT: u16 = 993;
const DEFAULT_OUTPUT_DIR: &str = "emails";

// Common folder names that never make useful categories.
const DEFAULT_IGNORED_FOLDERS: [&str; 7] = [
    "Sent",
    "Trash",
    "INBOX",
    "Brouillons",
    "Corbeille",
    "Draft",
    "Junk",
];

/// Reads emails from leaf folders of an email account and writes them on the disk.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Address of the IMAP server.
    pub imap_server: Option<String>,

    /// Directory where the emails will be written, in folders matching the mailbox folders.
    pub output_dir: Option<PathBuf>,

    /// Minimum number of emails in a folder to be retrieved. Folders with too few emails are useless for the classifier.
    #[arg(short = 'm', long = "min-nb-emails")]
    pub min_messages: Option<usize>,

    /// IMAP port.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Login; asked for when absent.
    #[arg(short, long)]
    pub username: Option<String>,

    /// YAML settings file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// More output per occurrence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Contents of the YAML settings file. Every field is optional.
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
pub struct FileSettings {
    pub imap_server: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub min_messages: Option<usize>,
    pub ignored_folders: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub imap_server: String,
    pub port: u16,
    pub username: Option<String>,
    pub output_dir: PathBuf,
    pub min_messages: usize,
    pub ignored_folders: Vec<String>,
}

impl Settings {
    /// Command-line values win over the file.
    pub fn merge(cli: &Cli, file: FileSettings) -> Result<Self> {
        let imap_server = cli
            .imap_server
            .clone()
            .or(file.imap_server)
            .context("No IMAP server given, on the command line or in the settings file")?;

        Ok(Settings {
            imap_server,
            port: cli.port.or(file.port).unwrap_or(DEFAULT_PORT),
            username: cli.username.clone().or(file.username),
            output_dir: cli
                .output_dir
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            min_messages: cli
                .min_messages
                .or(file.min_messages)
                .unwrap_or(DEFAULT_MIN_MESSAGES),
            ignored_folders: file.ignored_folders.unwrap_or_else(|| {
                DEFAULT_IGNORED_FOLDERS
                    .iter()
                    .map(|name| name.to_string())
                    .collect()
            }),
        })
    }
}

pub fn read_settings_file(path: &Path) -> Result<FileSettings> {
    let file = File::open(path).map_err(|err| {
        error!("Error: {}", err);

        // Capture and print the backtrace
        let backtrace = Backtrace::new();
        error!("Backtrace:\n{:?}", backtrace);
        err
    });
    let file = file.with_context(|| format!("Cannot find settings {}", path.display()))?;

    let reader = BufReader::new(file);

    // Parse the YAML file into the settings struct
    let settings: Result<FileSettings, serde_yaml::Error> = serde_yaml::from_reader(reader).map_err(|err| {
        error!("Error: {}", err);

        let backtrace = Backtrace::new();
        error!("Backtrace:\n{:?}", backtrace);
        err
    });
    settings.with_context(|| format!("Cannot deserialize settings {}", path.display()))
}

pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let file = match &cli.config {
        Some(path) => read_settings_file(path)?,
        None => FileSettings::default(),
    };
    Settings::merge(cli, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_overrides_file() {
        let cli = Cli::parse_from(["mailcorpus", "imap.example.com", "out", "-m", "3"]);
        let file = FileSettings {
            imap_server: Some("other.example.com".to_string()),
            min_messages: Some(20),
            port: Some(1993),
            ..Default::default()
        };

        let settings = Settings::merge(&cli, file).unwrap();
        assert_eq!(settings.imap_server, "imap.example.com");
        assert_eq!(settings.output_dir, PathBuf::from("out"));
        assert_eq!(settings.min_messages, 3);
        assert_eq!(settings.port, 1993);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["mailcorpus", "imap.example.com"]);
        let settings = Settings::merge(&cli, FileSettings::default()).unwrap();
        assert_eq!(settings.port, 993);
        assert_eq!(settings.min_messages, 10);
        assert_eq!(settings.output_dir, PathBuf::from("emails"));
        assert!(settings.ignored_folders.contains(&"Trash".to_string()));
        assert_eq!(cli.log_level(), LevelFilter::Info);
    }

    #[test]
    fn test_missing_server_is_an_error() {
        let cli = Cli::parse_from(["mailcorpus"]);
        assert!(Settings::merge(&cli, FileSettings::default()).is_err());
    }

    #[test]
    fn test_read_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "imap_server: mail.example.org\nusername: alice\nignored_folders:\n  - Spam"
        )
        .unwrap();

        let settings = read_settings_file(file.path()).unwrap();
        assert_eq!(settings.imap_server.as_deref(), Some("mail.example.org"));
        assert_eq!(settings.username.as_deref(), Some("alice"));
        assert_eq!(settings.ignored_folders, Some(vec!["Spam".to_string()]));
        assert_eq!(settings.port, None);
    }
}
