use std::{path::Path, process::Output};

use miette::{miette, Context, IntoDiagnostic};
use serde::Deserialize;
use tracing::debug;

use super::command::{check_version, run_command, Capture, YT_DL, YT_DLP};
use crate::{
    result::{bail, Result, TransferError},
    types::{Bitrate, FormatDescriptor, VideoInfo},
};

/// Interface for fetching video metadata and transferring streams
pub trait Extractor: Send + Sync {
    /// Get the video metadata and the list of its available formats.
    fn fetch_video(&self, url: &str) -> miette::Result<VideoInfo>;

    /// Download the stream of the given format into `path`.
    ///
    /// Blocks until the transfer is over. The file at `path` may be left
    /// partially written on failure.
    fn transfer(
        &self,
        url: &str,
        format: &FormatDescriptor,
        path: &Path,
    ) -> std::result::Result<(), TransferError>;
}

/// Interface for the [yt-dlp](https://github.com/yt-dlp/yt-dlp) program,
/// or its [youtube-dl](https://github.com/ytdl-org/youtube-dl) ancestor
#[derive(Debug)]
pub struct Ytdl {
    program: String,
    /// `youtube-dl` has no `--force-overwrites`
    force_overwrites: bool,
}

impl Ytdl {
    /// Verify that the `yt-dlp` or `youtube-dl` binaries are reachable
    pub fn new() -> Result<Self> {
        if check_version(YT_DLP).is_ok() {
            Ok(Self::from_program(YT_DLP))
        } else if check_version(YT_DL).is_ok() {
            Ok(Self::from_program(YT_DL))
        } else {
            bail("Neither yt-dlp nor youtube-dl found")
        }
    }

    /// Use the given program, verifying that it is reachable
    pub fn with_program(program: &str) -> Result<Self> {
        check_version(program)
            .map_err(|err| err.wrap_err_with(|| format!("Program '{program}' is not usable")))?;

        Ok(Self::from_program(program))
    }

    fn from_program(program: &str) -> Self {
        let is_youtube_dl = Path::new(program)
            .file_stem()
            .is_some_and(|stem| stem == YT_DL);

        Self {
            program: program.to_owned(),
            force_overwrites: !is_youtube_dl,
        }
    }

    /// Arguments printing the JSON description of a single video
    fn metadata_args(url: &str) -> Vec<&str> {
        vec!["-q", "--skip-download", "--no-playlist", "-J", "--", url]
    }

    /// Arguments saving one format of a single video at the literal `template` path
    fn transfer_args<'a>(
        &self,
        url: &'a str,
        format_id: &'a str,
        template: &'a str,
    ) -> Vec<&'a str> {
        let mut args = vec!["-q", "--no-playlist", "--no-continue", "--no-part"];
        if self.force_overwrites {
            args.push("--force-overwrites");
        }
        args.extend(["-f", format_id, "-o", template, "--", url]);
        args
    }

    /// Run the program, returning its output if it exited successfully.
    ///
    /// Otherwise, the `ERROR:` lines of its stderr are classified into a [`TransferError`].
    fn run_classified(
        &self,
        args: &[&str],
        capture: Capture,
    ) -> std::result::Result<Output, TransferError> {
        let res = run_command(&self.program, args, capture | Capture::STDERR)
            .map_err(|err| TransferError::Failed(err.into()))?;

        if res.status.success() {
            Ok(res)
        } else {
            let stderr = String::from_utf8_lossy(&res.stderr);
            Err(classify_failure(&self.program, &stderr))
        }
    }
}

impl Extractor for Ytdl {
    fn fetch_video(&self, url: &str) -> miette::Result<VideoInfo> {
        let res = self
            .run_classified(&Self::metadata_args(url), Capture::STDOUT)
            .map_err(|err| match err {
                TransferError::Failed(report) => report,
                TransferError::Forbidden(msg) => miette!("{msg}"),
            })?;

        let output = String::from_utf8_lossy(&res.stdout);
        parse_video_info(&output)
    }

    fn transfer(
        &self,
        url: &str,
        format: &FormatDescriptor,
        path: &Path,
    ) -> std::result::Result<(), TransferError> {
        let template = path
            .to_str()
            .map(escape_template)
            .ok_or_else(|| TransferError::Failed(miette!("Output path is not valid UTF-8")))?;

        debug!("Transferring format {} into '{template}'", format.id);
        self.run_classified(
            &self.transfer_args(url, &format.id, &template),
            Capture::empty(),
        )?;

        Ok(())
    }
}

/// `%` starts a field in output templates, so literal paths must double it
fn escape_template(path: &str) -> String {
    path.replace('%', "%%")
}

/// Classify a failure out of the program's stderr.
///
/// Only the `ERROR:` lines are kept in the message.
fn classify_failure(program: &str, stderr: &str) -> TransferError {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR:"))
        .collect();

    let msg = if errors.is_empty() {
        format!("{program} did run but was not successful")
    } else {
        errors.join("\n")
    };

    if errors.iter().any(|line| line.contains("HTTP Error 403")) {
        TransferError::Forbidden(msg)
    } else {
        TransferError::Failed(miette!("{msg}"))
    }
}

#[derive(Debug, Deserialize)]
struct RawVideo {
    title: String,
    uploader: Option<String>,
    channel: Option<String>,
    duration: Option<f64>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: String,
    ext: Option<String>,
    acodec: Option<String>,
    vcodec: Option<String>,
    abr: Option<f64>,
    tbr: Option<f64>,
}

/// A codec is present when it is listed and not explicitly `none`
fn has_codec(codec: &Option<String>) -> bool {
    codec.as_deref().is_some_and(|c| c != "none")
}

impl From<RawFormat> for FormatDescriptor {
    fn from(raw: RawFormat) -> Self {
        let has_audio = has_codec(&raw.acodec);
        let has_video = has_codec(&raw.vcodec);

        let kind = if has_video { "video" } else { "audio" };
        let ext = raw.ext.as_deref().unwrap_or("unknown");

        // Audio-only streams report their bitrate in `abr`, muxed ones in `tbr`
        let bitrate = if has_video {
            raw.tbr.or(raw.abr)
        } else {
            raw.abr.or(raw.tbr)
        };

        FormatDescriptor {
            id: raw.format_id,
            mime_type: format!("{kind}/{ext}"),
            bitrate: bitrate.and_then(Bitrate::from_kbps_f64),
            has_audio,
            has_video,
        }
    }
}

/// Parse the JSON document printed by `-J`
fn parse_video_info(json: &str) -> miette::Result<VideoInfo> {
    let raw: RawVideo = serde_json::from_str(json)
        .into_diagnostic()
        .wrap_err("Could not parse the video JSON description")?;

    let author = raw
        .uploader
        .or(raw.channel)
        .unwrap_or_else(|| "Unknown".to_owned());

    Ok(VideoInfo {
        title: raw.title,
        author,
        duration: raw
            .duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.round() as u64),
        formats: raw.formats.into_iter().map(FormatDescriptor::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIDEO_JSON: &str = r#"{
        "id": "abc123",
        "title": "Some Song",
        "uploader": "Some Band",
        "channel": "Some Band - Topic",
        "duration": 212.4,
        "formats": [
            {"format_id": "sb0", "ext": "mhtml", "acodec": "none", "vcodec": "none"},
            {"format_id": "139", "ext": "m4a", "acodec": "mp4a.40.5", "vcodec": "none", "abr": 48.7, "tbr": 48.7},
            {"format_id": "140", "ext": "m4a", "acodec": "mp4a.40.2", "vcodec": "none", "abr": 129.5},
            {"format_id": "251", "ext": "webm", "acodec": "opus", "vcodec": "none", "abr": null, "tbr": 135.2},
            {"format_id": "18", "ext": "mp4", "acodec": "mp4a.40.2", "vcodec": "avc1.42001E", "abr": 96, "tbr": 500.3},
            {"format_id": "137", "ext": "mp4", "acodec": "none", "vcodec": "avc1.640028", "tbr": 4000}
        ]
    }"#;

    #[test]
    fn parse_video_json() {
        let info = parse_video_info(VIDEO_JSON).unwrap();
        assert_eq!(info.title, "Some Song");
        assert_eq!(info.author, "Some Band");
        assert_eq!(info.duration, Some(212));
        assert_eq!(info.formats.len(), 6);

        let ids: Vec<&str> = info.formats.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["sb0", "139", "140", "251", "18", "137"]);

        let storyboard = &info.formats[0];
        assert!(!storyboard.has_audio && !storyboard.has_video);

        let m4a = &info.formats[2];
        assert!(m4a.is_audio_only());
        assert_eq!(m4a.mime_type, "audio/m4a");
        assert_eq!(m4a.bitrate.map(Bitrate::kbps), Some(130));

        // Falls back to `tbr` when `abr` is missing
        assert_eq!(info.formats[3].bitrate.map(Bitrate::kbps), Some(135));

        let muxed = &info.formats[4];
        assert!(muxed.has_audio && muxed.has_video);
        assert_eq!(muxed.mime_type, "video/mp4");
        assert_eq!(muxed.bitrate.map(Bitrate::kbps), Some(500));

        assert!(!info.formats[5].has_audio);
    }

    #[test]
    fn author_falls_back_to_channel() {
        let info = parse_video_info(r#"{"title": "t", "channel": "c"}"#).unwrap();
        assert_eq!(info.author, "c");
        assert!(info.formats.is_empty());
        assert_eq!(info.duration, None);

        let info = parse_video_info(r#"{"title": "t"}"#).unwrap();
        assert_eq!(info.author, "Unknown");
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_video_info("").is_err());
        assert!(parse_video_info(r#"{"formats": []}"#).is_err());
    }

    #[test]
    fn forbidden_transfers_are_recognized() {
        let stderr = "WARNING: [youtube] something\n\
            ERROR: unable to download video data: HTTP Error 403: Forbidden\n";
        match classify_failure(YT_DLP, stderr) {
            TransferError::Forbidden(msg) => {
                assert_eq!(msg, "ERROR: unable to download video data: HTTP Error 403: Forbidden")
            }
            err => panic!("Unexpected classification: {err:?}"),
        }
    }

    #[test]
    fn other_failures_are_generic() {
        let err = classify_failure(YT_DLP, "ERROR: [youtube] abc123: Video unavailable\n");
        assert!(matches!(err, TransferError::Failed(_)));
        assert_eq!(err.to_string(), "ERROR: [youtube] abc123: Video unavailable");

        // A 403 outside of an error line does not count
        let err = classify_failure(YT_DLP, "WARNING: retrying after HTTP Error 403\n");
        assert!(matches!(err, TransferError::Failed(_)));
        assert_eq!(err.to_string(), "yt-dlp did run but was not successful");
    }

    #[test]
    fn percent_signs_are_escaped() {
        assert_eq!(escape_template("/music/100% Hits - A.m4a"), "/music/100%% Hits - A.m4a");
        assert_eq!(escape_template("/music/plain.m4a"), "/music/plain.m4a");
    }

    #[test]
    fn metadata_is_fetched_for_a_single_video() {
        let args = Ytdl::metadata_args("https://www.youtube.com/watch?v=abc&list=PL1");
        assert!(args.contains(&"--no-playlist"));
        assert!(args.contains(&"-J"));
        assert_eq!(
            args[args.len() - 2..],
            ["--", "https://www.youtube.com/watch?v=abc&list=PL1"]
        );
    }

    #[test]
    fn transfer_overwrites_a_single_video() {
        let ytdl = Ytdl::from_program(YT_DLP);
        let template = escape_template("/music/100% Hits.m4a");
        let args = ytdl.transfer_args("https://youtu.be/abc", "140", &template);

        assert_eq!(
            args,
            [
                "-q",
                "--no-playlist",
                "--no-continue",
                "--no-part",
                "--force-overwrites",
                "-f",
                "140",
                "-o",
                "/music/100%% Hits.m4a",
                "--",
                "https://youtu.be/abc",
            ]
        );
    }

    #[test]
    fn youtube_dl_gets_no_force_overwrites() {
        for program in [YT_DL, "/usr/local/bin/youtube-dl"] {
            let ytdl = Ytdl::from_program(program);
            let args = ytdl.transfer_args("https://youtu.be/abc", "140", "/music/a.m4a");
            assert!(!args.contains(&"--force-overwrites"), "{program}");
            assert!(args.contains(&"--no-playlist"), "{program}");
        }

        let ytdl = Ytdl::from_program("/opt/yt-dlp-nightly/yt-dlp");
        assert!(ytdl.force_overwrites);
    }
}
