use std::path::PathBuf;

use clap::Parser;

use crate::types::Mode;

macro_rules! arg_env {
    ($v:literal) => {
        concat!("YTAX_", $v)
    };
}

/// Save the best audio stream of a web video into a local file.
///
/// Relies on `yt-dlp` (or `youtube-dl`) to fetch the video metadata and streams.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// The URL of the video to download
    #[arg(env = arg_env!("URL"))]
    pub url: String,

    /// The path to the output directory.
    /// Defaults to the Downloads folder if it exists, otherwise the current directory
    #[arg(long, env = arg_env!("OUT"))]
    pub out: Option<PathBuf>,

    /// Download only audio streams (`.m4a`) or accept any stream carrying audio (`.mp4`)
    #[arg(long, value_enum, env = arg_env!("MODE"))]
    pub mode: Option<Mode>,

    /// Use this fixed file name (without extension) instead of `<author> - <title>`
    #[arg(long, env = arg_env!("NAME"))]
    pub name: Option<String>,

    /// Strip the tracking parameters from the URL before the first attempt,
    /// instead of only when the server rejects the decorated URL
    #[arg(long, overrides_with = "no_clean", env = arg_env!("CLEAN"))]
    pub clean: bool,

    /// Keep the URL as given until the server rejects it, even if the
    /// configuration file enables `clean`
    #[arg(long, overrides_with = "clean")]
    pub no_clean: bool,

    /// The program to use instead of looking for `yt-dlp` then `youtube-dl`
    #[arg(long, env = arg_env!("PROGRAM"))]
    pub program: Option<String>,

    /// The path to a TOML configuration file providing default values for the options above
    #[arg(long, env = arg_env!("CONFIG"))]
    pub config: Option<PathBuf>,

    /// The maximum level of the logs to display
    #[arg(long, default_value_t = tracing::Level::INFO, env = arg_env!("LOG_LEVEL"))]
    pub log_level: tracing::Level,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn parse_all_options() {
        let args = Args::try_parse_from([
            "ytax",
            "https://youtu.be/abc123",
            "--out",
            "/tmp/music",
            "--mode",
            "video",
            "--name",
            "clip",
            "--clean",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.url, "https://youtu.be/abc123");
        assert_eq!(args.out, Some(PathBuf::from("/tmp/music")));
        assert_eq!(args.mode, Some(Mode::Video));
        assert_eq!(args.name.as_deref(), Some("clip"));
        assert!(args.clean);
        assert!(!args.no_clean);
        assert_eq!(args.log_level, tracing::Level::DEBUG);
    }

    #[test]
    fn last_clean_flag_wins() {
        let args =
            Args::try_parse_from(["ytax", "https://youtu.be/abc", "--clean", "--no-clean"]).unwrap();
        assert!(!args.clean);
        assert!(args.no_clean);

        let args =
            Args::try_parse_from(["ytax", "https://youtu.be/abc", "--no-clean", "--clean"]).unwrap();
        assert!(args.clean);
        assert!(!args.no_clean);
    }
}
