use std::{
    io::ErrorKind,
    path::PathBuf,
    process::Stdio,
    time::{Duration, Instant},
};

use tokio::process::Command;
use tracing::{info, warn};

use crate::domain::artifacts::StagedArtifacts;

use super::{command::EncoderCommand, error::RenderError, policy::RenderPolicy};

const SOURCE: &str = "stillframe::render::executor";

/// A finished encode: the populated output path and its size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedVideo {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Runs the external encoder against staged artifacts.
#[derive(Debug, Clone)]
pub struct FfmpegExecutor {
    program: PathBuf,
    policy: RenderPolicy,
    timeout: Option<Duration>,
}

impl FfmpegExecutor {
    pub fn new(program: PathBuf, timeout: Option<Duration>) -> Self {
        Self {
            program,
            policy: RenderPolicy::STILL_IMAGE,
            timeout,
        }
    }

    pub fn command_for(&self, artifacts: &StagedArtifacts) -> EncoderCommand {
        EncoderCommand::build(&self.program, artifacts, &self.policy)
    }

    /// Encode `artifacts` into their output path.
    ///
    /// Non-zero exit, spawn failure and timeout all surface as
    /// [`RenderError::EncodingFailed`] carrying the encoder's diagnostics.
    pub async fn execute(&self, artifacts: &StagedArtifacts) -> Result<EncodedVideo, RenderError> {
        let run_id = artifacts.run_id();
        let command = self.command_for(artifacts);

        info!(
            target = SOURCE,
            run_id = %run_id,
            command = %command.display_line(),
            "running encoder"
        );

        let started_at = Instant::now();
        let child = Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        target = SOURCE,
                        run_id = %run_id,
                        elapsed_ms = started_at.elapsed().as_millis() as u64,
                        timeout_ms = limit.as_millis() as u64,
                        error_code = "timeout",
                        "encoder timed out"
                    );
                    return Err(RenderError::encoding(format!(
                        "encoder did not finish within {limit:?} and was terminated"
                    )));
                }
            },
            None => child.await,
        };

        let output = output.map_err(|err| {
            let error_code = if err.kind() == ErrorKind::NotFound {
                "encoder_not_found"
            } else {
                "spawn_encoder"
            };
            warn!(
                target = SOURCE,
                run_id = %run_id,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error_code,
                program = %self.program.display(),
                error = %err,
                "failed to spawn encoder"
            );
            RenderError::encoding(format!("failed to run encoder: {err}"))
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        metrics::histogram!("stillframe_encode_ms").record(elapsed_ms as f64);

        if !output.status.success() {
            let exit_code = output.status.code().map(i64::from).unwrap_or(-1);
            warn!(
                target = SOURCE,
                run_id = %run_id,
                elapsed_ms,
                exit_code,
                error_code = "encoder_exit",
                stderr = %stderr,
                "encoder failed"
            );
            let details = if stderr.trim().is_empty() {
                let stdout = String::from_utf8_lossy(&output.stdout);
                if stdout.trim().is_empty() {
                    format!("encoder exited with {}", output.status)
                } else {
                    stdout.into_owned()
                }
            } else {
                stderr
            };
            return Err(RenderError::encoding(details));
        }

        info!(
            target = SOURCE,
            run_id = %run_id,
            elapsed_ms,
            stderr = %stderr,
            "encoder finished"
        );

        let output_path = artifacts.output_path().to_path_buf();
        let size_bytes = tokio::fs::metadata(&output_path)
            .await
            .map_err(|err| {
                RenderError::unexpected(format!("rendered output is not readable: {err}"))
            })?
            .len();

        Ok(EncodedVideo {
            path: output_path,
            size_bytes,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::artifacts::RunId;
    use std::{fs, os::unix::fs::PermissionsExt};
    use tempfile::TempDir;

    fn write_script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).expect("write script");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("set perms");
        path
    }

    fn staged(dir: &TempDir, with_subtitles: bool) -> StagedArtifacts {
        let artifacts = StagedArtifacts::layout(dir.path(), RunId::new(), with_subtitles);
        fs::write(artifacts.image_path(), b"jpeg").expect("image");
        fs::write(artifacts.audio_path(), b"mp3").expect("audio");
        if let Some(path) = artifacts.subtitle_path() {
            fs::write(path, b"[Script Info]").expect("subs");
        }
        artifacts
    }

    #[tokio::test]
    async fn writes_output_and_reports_size() {
        let dir = TempDir::new().expect("temp dir");
        let args_log = dir.path().join("args.log");
        let script = write_script(
            &dir,
            "fake-ffmpeg",
            &format!(
                r#"#!/bin/sh
for arg in "$@"; do printf '%s\n' "$arg"; done > "{log}"
for last; do :; done
printf 'rendered-video' > "$last"
echo "frame=1 fps=0.0 size=1kB" >&2
"#,
                log = args_log.display()
            ),
        );
        let artifacts = staged(&dir, false);

        let executor = FfmpegExecutor::new(script, None);
        let encoded = executor.execute(&artifacts).await.expect("encode");

        assert_eq!(encoded.path, artifacts.output_path());
        assert_eq!(encoded.size_bytes, "rendered-video".len() as u64);

        let logged = fs::read_to_string(&args_log).expect("args log");
        let args: Vec<&str> = logged.lines().collect();
        assert_eq!(&args[..3], &["-y", "-loop", "1"]);
        assert!(!args.contains(&"-vf"));
    }

    #[tokio::test]
    async fn passes_escaped_filter_as_single_argument() {
        let dir = TempDir::new().expect("temp dir");
        let root = dir.path().join("test:it's");
        fs::create_dir(&root).expect("root");
        let args_log = dir.path().join("args.log");
        let script = write_script(
            &dir,
            "fake-ffmpeg",
            &format!(
                r#"#!/bin/sh
for arg in "$@"; do printf '%s\n' "$arg"; done > "{log}"
for last; do :; done
printf 'ok' > "$last"
"#,
                log = args_log.display()
            ),
        );
        let artifacts = StagedArtifacts::layout(&root, RunId::new(), true);
        fs::write(artifacts.image_path(), b"jpeg").expect("image");
        fs::write(artifacts.audio_path(), b"mp3").expect("audio");
        fs::write(artifacts.subtitle_path().expect("subs"), b"subs").expect("subs");

        FfmpegExecutor::new(script, None)
            .execute(&artifacts)
            .await
            .expect("encode");

        let logged = fs::read_to_string(&args_log).expect("args log");
        let args: Vec<&str> = logged.lines().collect();
        let vf = args.iter().position(|arg| *arg == "-vf").expect("-vf");
        let expected_root = root.to_string_lossy().replace(':', "\\:").replace('\'', "\\'");
        assert_eq!(
            args[vf + 1],
            format!(
                "subtitles='{expected_root}/{}_subs.ass'",
                artifacts.run_id()
            )
        );
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let dir = TempDir::new().expect("temp dir");
        let script = write_script(
            &dir,
            "fake-ffmpeg",
            "#!/bin/sh\necho 'Invalid data found when processing input' >&2\nexit 1\n",
        );
        let artifacts = staged(&dir, false);

        let err = FfmpegExecutor::new(script, None)
            .execute(&artifacts)
            .await
            .expect_err("must fail");

        match err {
            RenderError::EncodingFailed { details } => {
                assert!(details.contains("Invalid data found when processing input"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn silent_failure_still_has_details() {
        let dir = TempDir::new().expect("temp dir");
        let script = write_script(&dir, "fake-ffmpeg", "#!/bin/sh\nexit 3\n");
        let artifacts = staged(&dir, false);

        let err = FfmpegExecutor::new(script, None)
            .execute(&artifacts)
            .await
            .expect_err("must fail");

        match err {
            RenderError::EncodingFailed { details } => assert!(!details.trim().is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_an_encoding_failure() {
        let dir = TempDir::new().expect("temp dir");
        let artifacts = staged(&dir, false);

        let program = dir.path().join("hidden-dir").join("no-such-ffmpeg");

        let err = FfmpegExecutor::new(program, None)
            .execute(&artifacts)
            .await
            .expect_err("must fail");

        match err {
            RenderError::EncodingFailed { details } => {
                assert!(details.starts_with("failed to run encoder: "));
                assert!(!details.contains("hidden-dir"), "path leaked: {details}");
                assert!(!details.contains("no-such-ffmpeg"), "path leaked: {details}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn timeout_is_an_encoding_failure() {
        let dir = TempDir::new().expect("temp dir");
        let script = write_script(&dir, "slow-ffmpeg", "#!/bin/sh\nexec sleep 30\n");
        let artifacts = staged(&dir, false);

        let err = FfmpegExecutor::new(script, Some(Duration::from_millis(200)))
            .execute(&artifacts)
            .await
            .expect_err("must time out");

        match err {
            RenderError::EncodingFailed { details } => assert!(details.contains("terminated")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
