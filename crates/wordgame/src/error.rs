//! Error types for the word game layer.
//!
//! Start-request rejections carry a stable code that is broadcast to the
//! requesting realm in a `fail` message; word-source failures are mapped
//! onto those codes at the rejection site. Nothing here is ever fatal to a
//! session or the process.

/// Why a start request was rejected.
///
/// The `Display` form of each variant is the stable wire code clients key
/// their error handling on, so these strings must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StartFailure {
    /// Game options were never fetched for this realm; a later start
    /// attempt re-checks after the realm's options are retried
    #[error("SETTINGS_DONT_EXIST")]
    SettingsNotReady,

    /// The realm's roster does not satisfy the start quorum
    #[error("START_NOT_ALLOWED")]
    StartNotAllowed,

    /// A round is already counting down or running
    #[error("GAME_GOING")]
    GameAlreadyInProgress,

    /// The word-list fetch failed or returned nothing usable
    #[error("NULL_WORD_LIST")]
    NullWordList,

    /// The enriched-question fetch failed
    #[error("QUESTION_INFO")]
    QuestionInfoFailure,
}

/// Failures talking to the external word-source provider.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The HTTP request itself failed
    #[error("word source request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("word source returned status {0}")]
    Status(u16),

    /// The provider's payload did not decode
    #[error("word source payload malformed: {0}")]
    Decode(#[from] serde_json::Error),

    /// The provider's payload was not valid UTF-8
    #[error("word source payload was not utf-8")]
    NotUtf8,
}
