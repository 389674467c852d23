mod command;
mod ytdl;

pub use ytdl::{Extractor, Ytdl};
