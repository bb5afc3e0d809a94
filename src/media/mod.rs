//! External media capabilities
//!
//! Extraction and transcoding are delegated to external tools. The rest of
//! the crate only sees the traits in this module:
//!
//! - [`MediaResolver`] - source URL to [`MediaInfo`], no payload transfer
//! - [`MediaFetcher`] - payload to local storage with byte-level progress
//! - [`Transcoder`] - audio extraction to the target codec
//!
//! [`YtDlp`] and [`Ffmpeg`] are the production implementations.

mod error;
mod ffmpeg;
mod traits;
mod types;
mod ytdlp;

pub use error::MediaError;
pub use ffmpeg::Ffmpeg;
pub use traits::{MediaFetcher, MediaResolver, ProgressCallback, Transcoder};
pub use types::{FetchRequest, MediaInfo, OutputKind, TransferProgress};
pub use ytdlp::{YtDlp, YtDlpConfig};
