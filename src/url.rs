use std::{fmt::Display, sync::OnceLock};

use regex::Regex;

use crate::result::{Error, Result};

/// An optional scheme and `www.` subdomain
macro_rules! opt_prefix {
    () => {
        r#"(?:https?://)?(?:www\.)?"#
    };
}
/// The accepted hosts: the main site or its short-link domain
macro_rules! host {
    () => {
        r#"(?:youtube\.com|youtu\.be)"#
    };
}
/// A non-empty path, query included
macro_rules! path {
    () => {
        r#"/.+"#
    };
}
const VIDEO_URL_PATTERN: &str = concat!("^", opt_prefix!(), host!(), path!(), "$");

/// The query parameter identifying the video on watch-style URLs
const ID_PARAM_PREFIX: &str = "v=";

static VIDEO_URL_RE: OnceLock<Regex> = OnceLock::new();

fn video_url_re() -> &'static Regex {
    VIDEO_URL_RE.get_or_init(|| Regex::new(VIDEO_URL_PATTERN).unwrap())
}

/// Check that the input looks like a URL of a supported video host
pub fn validate(input: &str) -> bool {
    video_url_re().is_match(input)
}

/// Strip the tracking parameters of a video URL.
///
/// Watch-style URLs keep their first `v=` parameter, every other URL loses
/// its whole query. URLs without a query are returned as-is.
pub fn clean(input: &str) -> String {
    let Some((base, rest)) = input.split_once('?') else {
        return input.to_owned();
    };
    // A stray second `?` ends the query
    let query = rest.split('?').next().unwrap_or_default();

    if base.contains("/watch") {
        if let Some(id) = query.split('&').find(|p| p.starts_with(ID_PARAM_PREFIX)) {
            return format!("{base}?{id}");
        }
    }

    base.to_owned()
}

/// A validated URL identifying one remote video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoReference(String);

impl VideoReference {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::Validation("Please enter a YouTube URL".to_owned()));
        }
        if !validate(input) {
            return Err(Error::Validation(
                "Please enter a valid YouTube URL".to_owned(),
            ));
        }

        Ok(Self(input.to_owned()))
    }

    /// The same reference without its tracking parameters
    pub fn cleaned(&self) -> Self {
        Self(clean(&self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VideoReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
