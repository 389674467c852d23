use std::fmt::Display;

use super::Bitrate;

/// One retrievable stream variant of a video, as reported by the extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// Identifier understood by the extractor when asking for the transfer
    pub id: String,
    pub mime_type: String,
    pub bitrate: Option<Bitrate>,
    pub has_audio: bool,
    pub has_video: bool,
}

impl FormatDescriptor {
    pub fn is_audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }
}

impl Display for FormatDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.bitrate {
            Some(bitrate) => write!(f, "{} [{}] (Bitrate: {bitrate})", self.mime_type, self.id),
            None => write!(f, "{} [{}] (Bitrate: unknown)", self.mime_type, self.id),
        }
    }
}
