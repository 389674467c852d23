use std::{
    ffi::OsStr,
    process::{Command, Output, Stdio},
};

use bitflags::bitflags;
use miette::{Context, IntoDiagnostic};
use tracing::{debug, trace, Level};

use crate::result::{bail, Result};

pub const YT_DL: &str = "youtube-dl";
pub const YT_DLP: &str = "yt-dlp";

bitflags! {
    /// Which standard streams of the child process are piped back
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capture: u8 {
        const STDOUT = 0b0000010;
        const STDERR = 0b0000100;
    }
}

fn piped_if(capture: bool) -> Stdio {
    if capture {
        Stdio::piped()
    } else {
        Stdio::null()
    }
}

/// Run `program` with `args`, returning its raw output handle.
///
/// Stdin is always closed. Outputs are piped when requested, or always at
/// Debug level so their sizes can be logged (and their content at Trace level).
///
/// Only a failure to start the program is an error: a non-0 exit status is
/// left for the caller to interpret.
pub fn run_command<I, S>(program: &str, args: I, capture: Capture) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let is_debug = tracing::enabled!(Level::DEBUG);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(piped_if(is_debug || capture.contains(Capture::STDOUT)))
        .stderr(piped_if(is_debug || capture.contains(Capture::STDERR)));

    debug!("Executing command: {cmd:?}");
    let res = cmd
        .output()
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not run {program} command"))?;

    if is_debug {
        debug!(
            "{program} exited with {}, stdout {} bytes, stderr {} bytes",
            res.status,
            res.stdout.len(),
            res.stderr.len()
        );
        trace!("stdout: {:?}", String::from_utf8_lossy(&res.stdout));
        trace!("stderr: {:?}", String::from_utf8_lossy(&res.stderr));
    }

    Ok(res)
}

/// Check that `program --version` runs successfully
pub fn check_version(program: &str) -> Result<()> {
    let res = run_command(program, ["--version"], Capture::empty())?;
    if res.status.success() {
        Ok(())
    } else {
        bail(format!("{program} --version did run but was not successful"))
    }
}
