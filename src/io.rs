use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use regex::Regex;
use tracing::{debug, warn};

use crate::types::Extension;

/// Maximum length of a sanitized name, in bytes
const MAX_NAME_LEN: usize = 200;

static RESERVED_CHARS_RE: OnceLock<Regex> = OnceLock::new();

/// Make a string usable as a file name on every major platform.
///
/// Reserved characters are replaced by `_`, the result is cut to at most
/// [`MAX_NAME_LEN`] bytes (on a char boundary) and trimmed.
pub fn sanitize(name: &str) -> String {
    let re = RESERVED_CHARS_RE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());
    let mut safe = re.replace_all(name, "_").into_owned();

    if safe.len() > MAX_NAME_LEN {
        let mut cut = MAX_NAME_LEN;
        while !safe.is_char_boundary(cut) {
            cut -= 1;
        }
        safe.truncate(cut);
    }

    safe.trim().to_owned()
}

/// How the output file is named
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Naming {
    /// `<author> - <title><ext>`
    AuthorTitle,

    /// `<stem><ext>`, whatever the video
    Fixed(String),
}

impl Naming {
    pub fn file_name(&self, author: &str, title: &str, extension: Extension) -> String {
        let dot_ext = extension.with_dot();
        match self {
            Naming::AuthorTitle => format!("{} - {}{dot_ext}", sanitize(author), sanitize(title)),
            Naming::Fixed(stem) => format!("{}{dot_ext}", sanitize(stem)),
        }
    }
}

/// Remove a file that may or may not exist, logging instead of failing
pub fn remove_if_exists(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed '{}'", path.display()),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!("Could not remove '{}': {err}", path.display()),
    }
}

/// Check that the file exists and has content
pub fn is_non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.len() > 0)
}

/// The user's Downloads folder if it exists, otherwise the current directory
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| PathBuf::from("."))
}
