use std::fmt::Display;

/// A stream bitrate, in kbit/s
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Bitrate(u32);

impl Bitrate {
    /// Build a bitrate out of the fractional kbit/s value reported by the extractor.
    /// Non-finite or non-positive values mean "unknown".
    pub fn from_kbps_f64(kbps: f64) -> Option<Self> {
        if kbps.is_finite() && kbps >= 1.0 {
            Some(Self(kbps.round() as u32))
        } else {
            None
        }
    }

    pub fn kbps(self) -> u32 {
        self.0
    }
}

impl Display for Bitrate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}K", self.0)
    }
}
