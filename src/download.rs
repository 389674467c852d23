use std::path::{Path, PathBuf};

use miette::{Context, IntoDiagnostic};
use tracing::{debug, info, warn};

use crate::{
    io::{is_non_empty_file, remove_if_exists, Naming},
    outside::Extractor,
    result::{Error, Result},
    types::{Bitrate, FormatDescriptor, Mode},
    url::VideoReference,
};

/// Download one video stream into a directory.
///
/// Every call is independent: nothing is remembered between downloads.
#[derive(Clone, Copy)]
pub struct Downloader<'a> {
    extractor: &'a dyn Extractor,
    mode: Mode,
    naming: &'a Naming,
}

impl<'a> Downloader<'a> {
    pub fn new(extractor: &'a dyn Extractor, mode: Mode, naming: &'a Naming) -> Self {
        Self {
            extractor,
            mode,
            naming,
        }
    }

    /// Fetch the video, pick its best stream for the mode and save it in `out_dir`.
    ///
    /// Return the path of the written file, which is guaranteed to be non-empty.
    pub fn download(&self, reference: &VideoReference, out_dir: &Path) -> Result<PathBuf> {
        let url = reference.as_str();

        let video = self.extractor.fetch_video(url).map_err(Error::Metadata)?;
        info!("Title: {}", video.title);
        match video.duration {
            Some(duration) => info!("Duration: {duration}s"),
            None => info!("Duration: unknown"),
        }

        let candidates: Vec<&FormatDescriptor> = video
            .formats
            .iter()
            .filter(|format| accepts(self.mode, format))
            .collect();
        debug!("{} formats, {} usable", video.formats.len(), candidates.len());

        let format = select_best(&candidates).ok_or(Error::NoFormat(self.mode))?;
        info!("Downloading {format}");

        let file_name = self
            .naming
            .file_name(&video.author, &video.title, self.mode.extension());

        std::fs::create_dir_all(out_dir)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not create directory '{}'", out_dir.display()))?;
        let output = out_dir.join(file_name);

        // A file left by a previous download must never pass for this one
        remove_if_exists(&output);

        if let Err(err) = self.extractor.transfer(url, format, &output) {
            remove_if_exists(&output);
            return Err(Error::Download(err));
        }

        if !is_non_empty_file(&output) {
            remove_if_exists(&output);
            return Err(Error::Verification(output));
        }

        info!("Download complete: '{}'", output.display());
        Ok(output)
    }

    /// Like [`Self::download`], but when the transfer is rejected with HTTP 403
    /// and the URL carries tracking parameters, try once more with the cleaned URL.
    ///
    /// `on_retry` is called with the cleaned reference right before the retry.
    pub fn download_with_retry<F>(
        &self,
        reference: &VideoReference,
        out_dir: &Path,
        on_retry: F,
    ) -> Result<PathBuf>
    where
        F: FnOnce(&VideoReference),
    {
        match self.download(reference, out_dir) {
            Err(err) if err.is_forbidden() => {
                let cleaned = reference.cleaned();
                if cleaned == *reference {
                    return Err(err);
                }

                warn!("Got 403 error, retrying with sanitized URL '{cleaned}'");
                on_retry(&cleaned);
                self.download(&cleaned, out_dir)
            }
            res => res,
        }
    }
}

/// Whether the format is usable for the mode
fn accepts(mode: Mode, format: &FormatDescriptor) -> bool {
    match mode {
        Mode::Audio => format.is_audio_only(),
        Mode::Video => format.has_audio,
    }
}

/// Pick the format with the highest bitrate.
///
/// A format replaces the current pick only with a strictly greater bitrate,
/// so the first one wins ties and missing bitrates.
fn select_best<'f>(formats: &[&'f FormatDescriptor]) -> Option<&'f FormatDescriptor> {
    let mut selected = None;
    let mut max_bitrate = 0;
    for &format in formats {
        let bitrate = format.bitrate.map_or(0, Bitrate::kbps);
        if bitrate > max_bitrate {
            max_bitrate = bitrate;
            selected = Some(format);
        }
    }

    selected.or_else(|| formats.first().copied())
}
