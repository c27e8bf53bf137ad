//! Process-spawning helpers for the external binaries this crate shells out
//! to (`yt-dlp` and `ffmpeg`). Cross-platform quirks live in
//! [`multiplatform`]; nothing above this module should call
//! [`std::process::Command::new`] directly.

pub mod multiplatform;
pub mod transcoder;
pub mod ytdlp_bin;
