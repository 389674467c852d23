use super::FormatDescriptor;

/// Video metadata along with its available stream variants,
/// kept in the order the extractor listed them
#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub title: String,
    pub author: String,
    pub duration: Option<u64>,
    pub formats: Vec<FormatDescriptor>,
}
