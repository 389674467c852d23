mod bitrate;
mod extension;
mod format;
mod metadata;

pub use bitrate::Bitrate;
pub use extension::{Extension, Mode};
pub use format::FormatDescriptor;
pub use metadata::VideoInfo;
