use thiserror::Error;

/// Failures reported by the external media tools
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("media unavailable or removed")]
    Unavailable,
    #[error("media is private")]
    Private,
    #[error("media requires login")]
    LoginRequired,
    #[error("media is age restricted")]
    AgeRestricted,
    #[error("media is blocked on copyright grounds")]
    Copyright,
    #[error("transcoding failed: {0}")]
    Transcode(String),
    #[error("media tool failed: {0}")]
    Transient(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Classify a tool's error output.
    ///
    /// Matching is ordered: the more specific restriction wins over the
    /// generic "unavailable" wording that yt-dlp appends to most failures.
    pub fn classify(output: &str) -> Self {
        let message = output.to_lowercase();
        let has = |needle: &str| message.contains(needle);

        if has("is not a valid url") || has("unsupported url") {
            MediaError::InvalidUrl(last_line(output))
        } else if has("confirm your age") || has("age-restricted") || has("age restricted") {
            MediaError::AgeRestricted
        } else if has("login required") || has("sign in") || has("log in") {
            MediaError::LoginRequired
        } else if has("private") {
            MediaError::Private
        } else if has("copyright") {
            MediaError::Copyright
        } else if has("unavailable") || has("not available") || has("removed") {
            MediaError::Unavailable
        } else {
            MediaError::Transient(last_line(output))
        }
    }
}

fn last_line(output: &str) -> String {
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unknown error")
        .to_string()
}
