use clap::ValueEnum;
use serde::Deserialize;

/// Which streams are acceptable for a download
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Audio-only streams, saved as `.m4a`
    #[default]
    Audio,

    /// Any stream carrying an audio channel, video included, saved as `.mp4`
    Video,
}

impl Mode {
    pub fn extension(self) -> Extension {
        match self {
            Mode::Audio => Extension::M4a,
            Mode::Video => Extension::Mp4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    M4a,
    Mp4,
}

impl Extension {
    /// Return the extension with the leading dot.
    /// e.g. ".ext"
    pub fn with_dot(self) -> &'static str {
        match self {
            Extension::M4a => ".m4a",
            Extension::Mp4 => ".mp4",
        }
    }
}
