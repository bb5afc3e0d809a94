//! yt-dlp backed resolver and fetcher
//!
//! Metadata comes from `--dump-single-json`. Downloads run yt-dlp with a
//! machine-readable progress template and print the final file path, so the
//! output can be parsed line by line while the child is running.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::error::MediaError;
use super::traits::{MediaFetcher, MediaResolver, ProgressCallback};
use super::types::{FetchRequest, MediaInfo, OutputKind, TransferProgress};
use crate::config::DownloadConfig;

const PROGRESS_MARKER: &str = "tubefetch-progress";
const FILE_MARKER: &str = "tubefetch-file";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
const STDERR_TAIL_LINES: usize = 20;

const VIDEO_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";
const AUDIO_FORMAT: &str = "bestaudio/best";

/// yt-dlp invocation settings
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    pub bin: String,
    pub socket_timeout: Duration,
    pub retries: u32,
    pub fragment_retries: u32,
    pub max_filesize: u64,
    pub proxy: Option<String>,
    pub cookie_file: Option<PathBuf>,
}

impl YtDlpConfig {
    pub fn from_download(config: &DownloadConfig, cookie_file: Option<PathBuf>) -> Self {
        Self {
            bin: config.yt_dlp_bin.clone(),
            socket_timeout: config.socket_timeout(),
            retries: config.retries,
            fragment_retries: config.fragment_retries,
            max_filesize: config.max_filesize.as_u64(),
            proxy: config.proxy.clone(),
            cookie_file,
        }
    }
}

/// Resolver and fetcher driving the yt-dlp executable
#[derive(Debug, Clone)]
pub struct YtDlp {
    config: YtDlpConfig,
}

impl YtDlp {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    /// Whether the executable can be launched at all
    pub async fn is_available(&self) -> bool {
        Command::new(&self.config.bin)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.bin);
        cmd.args(["--no-warnings", "--no-playlist", "--force-ipv4"])
            .arg("--socket-timeout")
            .arg(self.config.socket_timeout.as_secs().to_string())
            .arg("--retries")
            .arg(self.config.retries.to_string())
            .arg("--add-header")
            .arg(format!("User-Agent:{USER_AGENT}"))
            .arg("--add-header")
            .arg("Accept-Language:en-US,en;q=0.9");

        if let Some(proxy) = &self.config.proxy {
            cmd.arg("--proxy").arg(proxy);
        }
        if let Some(cookies) = &self.config.cookie_file {
            cmd.arg("--cookies").arg(cookies);
        }

        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    fn fetch_args(&self, request: &FetchRequest) -> Vec<String> {
        let mut args = vec![
            "--format".to_string(),
            match request.kind {
                OutputKind::Mp4 => VIDEO_FORMAT,
                OutputKind::Mp3 => AUDIO_FORMAT,
            }
            .to_string(),
        ];

        if request.kind == OutputKind::Mp4 {
            args.extend(["--merge-output-format", "mp4", "--remux-video", "mp4"].map(String::from));
        }

        args.extend([
            "--fragment-retries".to_string(),
            self.config.fragment_retries.to_string(),
            "--skip-unavailable-fragments".to_string(),
            "--max-filesize".to_string(),
            self.config.max_filesize.to_string(),
            "--quiet".to_string(),
            "--progress".to_string(),
            "--newline".to_string(),
            "--progress-template".to_string(),
            format!(
                "download:{PROGRESS_MARKER} %(progress.downloaded_bytes)s %(progress.total_bytes)s %(progress.total_bytes_estimate)s"
            ),
            "--print".to_string(),
            format!("after_move:{FILE_MARKER} %(filepath)s"),
            "--output".to_string(),
            format!("{}.%(ext)s", request.output_stem.display()),
        ]);

        args
    }
}

#[async_trait]
impl MediaResolver for YtDlp {
    async fn resolve(&self, url: &str) -> Result<MediaInfo, MediaError> {
        debug!(url, "Resolving metadata");

        let output = self
            .command()
            .args(["--dump-single-json", "--skip-download"])
            .arg("--")
            .arg(url)
            .output()
            .await
            .map_err(|e| MediaError::Transient(format!("failed to launch {}: {e}", self.config.bin)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(url, status = %output.status, "yt-dlp metadata lookup failed");
            return Err(MediaError::classify(&stderr));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| MediaError::Transient(format!("unreadable metadata: {e}")))
    }
}

#[async_trait]
impl MediaFetcher for YtDlp {
    async fn fetch(
        &self,
        request: &FetchRequest,
        on_progress: ProgressCallback<'_>,
    ) -> Result<PathBuf, MediaError> {
        info!(url = %request.url, kind = %request.kind, "Starting yt-dlp download");

        let mut child = self
            .command()
            .args(self.fetch_args(request))
            .arg("--")
            .arg(&request.url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MediaError::Transient(format!("failed to launch {}: {e}", self.config.bin)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::Transient("stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::Transient("stderr not captured".into()))?;

        let mut out_reader = BufReader::new(stdout);
        let mut err_reader = BufReader::new(stderr);
        let (mut out_buf, mut err_buf) = (Vec::new(), Vec::new());
        let mut out_open = true;
        let mut err_open = true;
        let mut written: Option<PathBuf> = None;
        let mut stderr_tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

        // Progress may arrive on either stream depending on --quiet handling.
        while out_open || err_open {
            let (line, from_stderr) = tokio::select! {
                line = next_lossy_line(&mut out_reader, &mut out_buf), if out_open => (line?, false),
                line = next_lossy_line(&mut err_reader, &mut err_buf), if err_open => (line?, true),
            };

            let Some(line) = line else {
                if from_stderr {
                    err_open = false;
                } else {
                    out_open = false;
                }
                continue;
            };

            match parse_line(&line) {
                ToolLine::Progress(progress) => on_progress(progress),
                ToolLine::File(path) => written = Some(path),
                ToolLine::Other if from_stderr => {
                    if stderr_tail.len() == STDERR_TAIL_LINES {
                        stderr_tail.pop_front();
                    }
                    stderr_tail.push_back(line);
                }
                ToolLine::Other => debug!(line = %line, "yt-dlp output"),
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            warn!(url = %request.url, %status, "yt-dlp download failed");
            let tail: Vec<String> = stderr_tail.into();
            return Err(MediaError::classify(&tail.join("\n")));
        }

        match written {
            Some(path) => Ok(path),
            // Older builds do not print after_move; fall back to the
            // extension the format selection forces.
            None if request.kind == OutputKind::Mp4 => Ok(PathBuf::from(format!(
                "{}.{}",
                request.output_stem.display(),
                OutputKind::Mp4.extension()
            ))),
            None => Err(MediaError::Transient("yt-dlp did not report an output file".into())),
        }
    }
}

/// Next line of tool output with invalid UTF-8 replaced, `None` at EOF.
///
/// Partial input stays in `buf` when the read is cancelled inside a
/// `select!`, and the next call picks it up.
async fn next_lossy_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let read = reader.read_until(b'\n', buf).await?;
    if read == 0 && buf.is_empty() {
        return Ok(None);
    }

    let line = String::from_utf8_lossy(buf)
        .trim_end_matches(['\r', '\n'])
        .to_string();
    buf.clear();
    Ok(Some(line))
}

#[derive(Debug, PartialEq)]
enum ToolLine {
    Progress(TransferProgress),
    File(PathBuf),
    Other,
}

fn parse_line(line: &str) -> ToolLine {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(PROGRESS_MARKER) {
        let mut fields = rest.split_whitespace();
        let downloaded = fields.next().and_then(parse_bytes);
        let total = fields.next().and_then(parse_bytes);
        let estimate = fields.next().and_then(parse_bytes);

        return match downloaded {
            Some(downloaded) => ToolLine::Progress(TransferProgress {
                downloaded,
                total: total.or(estimate),
            }),
            None => ToolLine::Other,
        };
    }

    if let Some(path) = line.strip_prefix(FILE_MARKER) {
        let path = path.trim();
        if !path.is_empty() && path != "NA" {
            return ToolLine::File(PathBuf::from(path));
        }
    }

    ToolLine::Other
}

/// yt-dlp prints `NA` for missing fields and floats for estimates
fn parse_bytes(field: &str) -> Option<u64> {
    field
        .parse::<u64>()
        .ok()
        .or_else(|| field.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ytdlp() -> YtDlp {
        YtDlp::new(YtDlpConfig::from_download(&DownloadConfig::default(), None))
    }

    #[test]
    fn test_parse_progress_with_total() {
        assert_eq!(
            parse_line("tubefetch-progress 50 200 NA"),
            ToolLine::Progress(TransferProgress { downloaded: 50, total: Some(200) })
        );
    }

    #[test]
    fn test_parse_progress_falls_back_to_estimate() {
        assert_eq!(
            parse_line("tubefetch-progress 1024 NA 4096.5"),
            ToolLine::Progress(TransferProgress { downloaded: 1024, total: Some(4096) })
        );
        assert_eq!(
            parse_line("tubefetch-progress 1024 NA NA"),
            ToolLine::Progress(TransferProgress { downloaded: 1024, total: None })
        );
    }

    #[test]
    fn test_parse_file_and_noise() {
        assert_eq!(
            parse_line("tubefetch-file downloads/abc.mp4"),
            ToolLine::File(PathBuf::from("downloads/abc.mp4"))
        );
        assert_eq!(parse_line("tubefetch-file NA"), ToolLine::Other);
        assert_eq!(parse_line("[youtube] abc: Downloading webpage"), ToolLine::Other);
        assert_eq!(parse_line("tubefetch-progress NA NA NA"), ToolLine::Other);
    }

    #[test]
    fn test_fetch_args_for_video() {
        let request = FetchRequest {
            url: "https://www.youtube.com/watch?v=abc".to_string(),
            kind: OutputKind::Mp4,
            output_stem: PathBuf::from("downloads/abc"),
        };
        let args = ytdlp().fetch_args(&request);

        assert!(args.contains(&VIDEO_FORMAT.to_string()));
        assert!(args.contains(&"--merge-output-format".to_string()));
        assert!(args.contains(&"downloads/abc.%(ext)s".to_string()));
        assert!(args.contains(&(2u64 * 1024 * 1024 * 1024).to_string()));
    }

    #[test]
    fn test_fetch_args_for_audio_source() {
        let request = FetchRequest {
            url: "https://www.youtube.com/watch?v=abc".to_string(),
            kind: OutputKind::Mp3,
            output_stem: PathBuf::from("downloads/abc.source"),
        };
        let args = ytdlp().fetch_args(&request);

        assert!(args.contains(&AUDIO_FORMAT.to_string()));
        assert!(!args.contains(&"--merge-output-format".to_string()));
        assert!(args.contains(&"downloads/abc.source.%(ext)s".to_string()));
    }

    #[tokio::test]
    async fn test_lines_survive_invalid_utf8() {
        let output: &[u8] = b"[download] Destination: Caf\xe9.mp4\r\ntubefetch-progress 50 200 NA\nlast";
        let mut reader = BufReader::new(output);
        let mut buf = Vec::new();

        let first = next_lossy_line(&mut reader, &mut buf).await.unwrap().unwrap();
        assert_eq!(first, "[download] Destination: Caf\u{FFFD}.mp4");

        let second = next_lossy_line(&mut reader, &mut buf).await.unwrap().unwrap();
        assert_eq!(
            parse_line(&second),
            ToolLine::Progress(TransferProgress { downloaded: 50, total: Some(200) })
        );

        assert_eq!(next_lossy_line(&mut reader, &mut buf).await.unwrap().as_deref(), Some("last"));
        assert_eq!(next_lossy_line(&mut reader, &mut buf).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let mut config = YtDlpConfig::from_download(&DownloadConfig::default(), None);
        config.bin = "/nonexistent/yt-dlp".to_string();
        let ytdlp = YtDlp::new(config);

        assert!(!ytdlp.is_available().await);
        assert!(matches!(
            ytdlp.resolve("https://example.com/watch").await,
            Err(MediaError::Transient(_))
        ));
    }
}
