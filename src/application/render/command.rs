//! Encoder argument vector construction.
//!
//! Arguments are handed to the child process as discrete tokens; no shell ever
//! sees them. The one structured value is the subtitle filter, whose path is
//! escaped for ffmpeg's filtergraph syntax.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::domain::artifacts::StagedArtifacts;

use super::policy::RenderPolicy;

/// Program plus argument vector for one encoder run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl EncoderCommand {
    pub fn build(program: &Path, artifacts: &StagedArtifacts, policy: &RenderPolicy) -> Self {
        let mut args: Vec<OsString> = Vec::with_capacity(24);
        let mut push = |value: &OsStr| args.push(value.to_os_string());

        push("-y".as_ref());
        push("-loop".as_ref());
        push("1".as_ref());
        push("-i".as_ref());
        push(artifacts.image_path().as_os_str());
        push("-i".as_ref());
        push(artifacts.audio_path().as_os_str());

        if let Some(subtitles) = artifacts.subtitle_path() {
            push("-vf".as_ref());
            push(subtitles_filter(subtitles).as_ref());
        }

        for value in [
            "-c:v",
            policy.video_codec,
            "-tune",
            policy.tune,
            "-c:a",
            policy.audio_codec,
            "-b:a",
            policy.audio_bitrate,
            "-pix_fmt",
            policy.pixel_format,
        ] {
            push(value.as_ref());
        }
        if policy.stop_at_shortest {
            push("-shortest".as_ref());
        }
        push(artifacts.output_path().as_os_str());

        Self {
            program: program.to_path_buf(),
            args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Space-joined rendering for logs only; never executed.
    pub fn display_line(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(OsStr::to_string_lossy)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `subtitles='<escaped path>'` filter expression for the given file.
pub fn subtitles_filter(path: &Path) -> String {
    format!(
        "subtitles='{}'",
        escape_filter_path(&path.to_string_lossy())
    )
}

/// Escape `:` and `'` so a path can sit inside a quoted filter option.
pub fn escape_filter_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len() + 4);
    for ch in path.chars() {
        if matches!(ch, ':' | '\'') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Inverse of [`escape_filter_path`].
pub fn unescape_filter_path(escaped: &str) -> String {
    let mut path = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\'
            && let Some(&next) = chars.peek()
            && matches!(next, ':' | '\'')
        {
            path.push(next);
            chars.next();
            continue;
        }
        path.push(ch);
    }
    path
}
