use std::{
    fmt::Display,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use crossbeam_channel::{unbounded, Receiver, Sender};
use miette::miette;
use tracing::debug;

use crate::{
    download::Downloader,
    io::Naming,
    outside::Extractor,
    result::{Error, Result},
    types::Mode,
    url::VideoReference,
};

/// Everything needed to run one download
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub reference: VideoReference,
    pub out_dir: PathBuf,
    pub mode: Mode,
    pub naming: Naming,
}

/// Progress of a download, as seen by its subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Downloading { url: String },
    Retrying { url: String },
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Downloading { url } => write!(f, "Downloading {url}..."),
            Status::Retrying { url } => {
                write!(f, "Got 403 error, retrying with sanitized URL {url}...")
            }
        }
    }
}

/// Runs downloads in the background, one at a time
pub struct TaskRunner {
    extractor: Arc<dyn Extractor>,
    busy: Arc<AtomicBool>,
}

impl TaskRunner {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self {
            extractor,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the download on a background thread.
    ///
    /// Fails with [`Error::Busy`] if the previous download has not finished yet.
    pub fn spawn(&self, request: DownloadRequest) -> Result<DownloadTask> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Busy);
        }
        let slot = SlotGuard(self.busy.clone());

        let (send, events) = unbounded();
        let extractor = self.extractor.clone();

        let handle = std::thread::Builder::new()
            .name("download".to_owned())
            .spawn(move || {
                let _slot = slot;
                run_download(extractor.as_ref(), request, &send)
            })?;

        Ok(DownloadTask { events, handle })
    }
}

/// Release the busy flag when the background unit ends, panics included
struct SlotGuard(Arc<AtomicBool>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn run_download(
    extractor: &dyn Extractor,
    request: DownloadRequest,
    send: &Sender<Status>,
) -> Result<PathBuf> {
    let DownloadRequest {
        reference,
        out_dir,
        mode,
        naming,
    } = request;

    // The subscriber may have gone away, in which case nobody cares about the events
    let notify = |status: Status| {
        if send.send(status).is_err() {
            debug!("Status subscriber dropped");
        }
    };

    notify(Status::Downloading {
        url: reference.to_string(),
    });

    let downloader = Downloader::new(extractor, mode, &naming);
    downloader.download_with_retry(&reference, &out_dir, |cleaned| {
        notify(Status::Retrying {
            url: cleaned.to_string(),
        })
    })
}

/// Handle over a download running in the background
pub struct DownloadTask {
    events: Receiver<Status>,
    handle: JoinHandle<Result<PathBuf>>,
}

impl DownloadTask {
    /// Iterate over the status events, until the download is over
    pub fn events(&self) -> impl Iterator<Item = Status> + '_ {
        self.events.iter()
    }

    /// Block until the download is over and return its result
    pub fn wait(self) -> Result<PathBuf> {
        self.handle
            .join()
            .unwrap_or_else(|_| Err(Error::Miette(miette!("The download thread panicked"))))
    }
}
