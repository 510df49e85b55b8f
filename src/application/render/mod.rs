//! The render pipeline: staging uploads, running the encoder, releasing files.
//!
//! Each request moves through [`stage`], [`FfmpegExecutor::execute`] and
//! finally the cleanup guards in [`crate::infra::guard`]. Stages return
//! explicit [`RenderError`] values; cleanup never turns into an error.

mod command;
mod error;
mod executor;
mod pipeline;
mod policy;
mod stage;

pub use command::{EncoderCommand, escape_filter_path, subtitles_filter, unescape_filter_path};
pub use error::RenderError;
pub use executor::{EncodedVideo, FfmpegExecutor};
pub use pipeline::{RenderPipeline, RenderedVideo};
pub use policy::RenderPolicy;
pub use stage::{UploadParts, stage};
