use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use miette::{Context, IntoDiagnostic, Result};
use serde::Deserialize;
use tracing::debug;

use crate::{cli::Args, io::default_download_dir, io::Naming, types::Mode};

/// Default values read from the configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub out_dir: Option<PathBuf>,
    pub mode: Option<Mode>,
    pub name: Option<String>,
    pub program: Option<String>,
    pub clean: bool,
}

impl FileConfig {
    /// Read the configuration file.
    ///
    /// An explicitly given file must exist. Otherwise the file in the user
    /// configuration directory is read if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match default_config_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        debug!("Reading configuration from '{}'", path.display());
        Config::builder()
            .add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(required),
            )
            .build()
            .and_then(Config::try_deserialize)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not read configuration '{}'", path.display()))
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ytax").join("config.toml"))
}

/// The final settings, command-line values taking precedence over the file ones
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub out_dir: PathBuf,
    pub mode: Mode,
    pub naming: Naming,
    pub program: Option<String>,
    pub clean: bool,
}

impl Settings {
    pub fn resolve(args: &Args, file: FileConfig) -> Self {
        let out_dir = args
            .out
            .clone()
            .or(file.out_dir)
            .unwrap_or_else(default_download_dir);

        let naming = match args.name.clone().or(file.name) {
            Some(stem) => Naming::Fixed(stem),
            None => Naming::AuthorTitle,
        };

        Self {
            out_dir,
            mode: args.mode.or(file.mode).unwrap_or_default(),
            naming,
            program: args.program.clone().or(file.program),
            clean: !args.no_clean && (args.clean || file.clean),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["ytax", "https://youtu.be/abc123"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn read_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "out_dir = \"/srv/music\"\nmode = \"video\"\nname = \"track\"\nclean = true\n",
        )
        .unwrap();

        let file = FileConfig::load(Some(&path)).unwrap();
        assert_eq!(file.out_dir, Some(PathBuf::from("/srv/music")));
        assert_eq!(file.mode, Some(Mode::Video));
        assert_eq!(file.name.as_deref(), Some("track"));
        assert_eq!(file.program, None);
        assert!(file.clean);
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn command_line_overrides_file() {
        let file = FileConfig {
            out_dir: Some(PathBuf::from("/srv/music")),
            mode: Some(Mode::Video),
            name: Some("track".to_owned()),
            program: Some("yt-dlp-nightly".to_owned()),
            clean: false,
        };
        let settings = Settings::resolve(
            &args(&["--out", "/tmp/out", "--mode", "audio", "--clean"]),
            file,
        );

        assert_eq!(
            settings,
            Settings {
                out_dir: PathBuf::from("/tmp/out"),
                mode: Mode::Audio,
                naming: Naming::Fixed("track".to_owned()),
                program: Some("yt-dlp-nightly".to_owned()),
                clean: true,
            }
        );
    }

    #[test]
    fn defaults_without_any_value() {
        let settings = Settings::resolve(&args(&[]), FileConfig::default());
        assert_eq!(settings.mode, Mode::Audio);
        assert_eq!(settings.naming, Naming::AuthorTitle);
        assert_eq!(settings.out_dir, default_download_dir());
        assert!(!settings.clean);
    }

    #[test]
    fn command_line_turns_off_clean_from_file() {
        let file = || FileConfig {
            clean: true,
            ..FileConfig::default()
        };

        assert!(Settings::resolve(&args(&[]), file()).clean);
        assert!(!Settings::resolve(&args(&["--no-clean"]), file()).clean);
    }
}
