//! The external word-source adapter.
//!
//! Game options, word lists, and enriched question payloads all come from
//! an external provider over HTTP. The raw transport lives behind the
//! [`WordSource`] capability so the game layer (and its tests) never care
//! where the bytes came from; the typed fetchers on top of it own the
//! endpoint paths and payload decoding.

use crate::error::SourceError;
use crate::words::{GameOptions, Question, WordList};
use async_trait::async_trait;
use realm_hub::Realm;
use serde::Serialize;
use std::time::Duration;

/// Raw byte-level access to the word-source provider.
#[async_trait]
pub trait WordSource: Send + Sync {
    /// GET a path and return the response body.
    async fn get(&self, path: &str) -> Result<Vec<u8>, SourceError>;

    /// POST a JSON-encoded buffer to a path and return the response body.
    async fn post(&self, path: &str, body: Vec<u8>) -> Result<Vec<u8>, SourceError>;
}

/// The production [`WordSource`]: a reqwest client against a base URL.
#[derive(Debug, Clone)]
pub struct HttpWordSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpWordSource {
    /// Creates a source with the default client configuration.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Creates a source whose requests time out after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl WordSource for HttpWordSource {
    async fn get(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let response = self.client.get(self.url(path)).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn post(&self, path: &str, body: Vec<u8>) -> Result<Vec<u8>, SourceError> {
        let response = self
            .client
            .post(self.url(path))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Fetches the game options configured for a realm.
pub async fn fetch_game_options(
    source: &dyn WordSource,
    realm: &Realm,
) -> Result<GameOptions, SourceError> {
    let body = source
        .get(&format!("/wordwalls/api/game_options/{realm}/"))
        .await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Fetches a word list by id and derives its answer index.
pub async fn fetch_word_list(
    source: &dyn WordSource,
    word_list_id: i64,
) -> Result<WordList, SourceError> {
    let body = source
        .get(&format!("/base/api/wordlist/{word_list_id}?action=continue"))
        .await?;
    let mut list: WordList = serde_json::from_slice(&body)?;
    list.index_answers();
    Ok(list)
}

#[derive(Serialize)]
struct FullQuestionsRequest<'a> {
    questions: &'a [Question],
    lexicon: &'a str,
}

/// Turns raw drawn questions into the enriched payload clients render.
/// The provider's response is forwarded opaquely, so it stays a string.
pub async fn fetch_full_questions(
    source: &dyn WordSource,
    questions: &[Question],
    lexicon: &str,
) -> Result<String, SourceError> {
    let request = serde_json::to_vec(&FullQuestionsRequest { questions, lexicon })?;
    let body = source
        .post("/base/api/word_db/full_questions/", request)
        .await?;
    String::from_utf8(body).map_err(|_| SourceError::NotUtf8)
}
