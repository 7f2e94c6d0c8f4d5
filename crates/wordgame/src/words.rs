//! Word-game data types: options, word lists, and answer events.
//!
//! Field names follow the provider's JSON contract exactly; see the
//! individual serde renames.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Realm-scoped game configuration, fetched once when a realm is created
/// and read-only afterwards. A realm whose options are absent cannot start
/// a game until a later fetch succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOptions {
    /// How many questions to draw for a round
    #[serde(rename = "questionsToPull")]
    pub questions_to_pull: usize,

    /// Per-round answer quota
    #[serde(rename = "numAnswersThisRound")]
    pub answers_this_round: usize,

    /// Game type identifier, e.g. "challenge" or "regular"
    #[serde(rename = "gameType")]
    pub game_type: String,

    /// Challenge identifier when `game_type` is a challenge
    #[serde(rename = "challengeId")]
    pub challenge_id: i64,

    /// Round duration in seconds
    #[serde(rename = "timerSecs")]
    pub timer_secs: u64,

    /// Whether finishing this round qualifies for an award
    #[serde(rename = "qualifyForAward")]
    pub qualify_for_award: bool,

    /// The word list backing this realm's rounds
    #[serde(rename = "_word_list_id")]
    pub word_list_id: i64,
}

/// One question: an alphagram and the answers it accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub alphagram: String,
    pub idx: i64,
    #[serde(default)]
    pub answers: Vec<String>,
}

/// An entry in the answer index: where a valid answer points back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub alphagram: String,
    pub idx: i64,
}

/// An ordered collection of questions plus the derived answer index.
///
/// The index maps every accepted answer to its question and is shrunk as
/// answers are claimed, which is what makes a correct guess claimable
/// exactly once. A word list is owned exclusively by one realm's session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WordList {
    #[serde(default)]
    pub lexicon: String,

    #[serde(default)]
    pub questions: Vec<Question>,

    /// answer word → question it belongs to; built by [`index_answers`](WordList::index_answers)
    #[serde(skip)]
    pub answers: HashMap<String, Answer>,
}

impl WordList {
    /// Derives the answer index from the current questions. Called once
    /// when a freshly fetched list is installed.
    pub fn index_answers(&mut self) {
        self.answers = self
            .questions
            .iter()
            .flat_map(|q| {
                q.answers.iter().map(move |word| {
                    (
                        word.clone(),
                        Answer {
                            alphagram: q.alphagram.clone(),
                            idx: q.idx,
                        },
                    )
                })
            })
            .collect();
    }

    /// Draws the next `count` questions off the front of the list,
    /// shrinking it. Returns fewer when the list is nearly exhausted.
    pub fn next_set(&mut self, count: usize) -> Vec<Question> {
        let count = count.min(self.questions.len());
        self.questions.drain(..count).collect()
    }

    /// Number of unclaimed answers remaining.
    pub fn answers_remaining(&self) -> usize {
        self.answers.len()
    }
}

/// A correct-answer event: who claimed which answer and their new running
/// total. Broadcast to the realm as the payload of a `score` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectAnswer {
    pub answer: String,
    pub alphagram: String,
    pub user: String,
    pub idx: i64,
    pub score: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_list() -> WordList {
        let mut list: WordList = serde_json::from_str(
            r#"{
                "lexicon": "America",
                "questions": [
                    {"alphagram": "AEGLN", "idx": 0, "answers": ["ANGEL", "GLEAN"]},
                    {"alphagram": "AEINRST", "idx": 1, "answers": ["ANESTRI"]},
                    {"alphagram": "DEOPST", "idx": 2, "answers": ["DESPOT", "POSTED"]}
                ]
            }"#,
        )
        .expect("fixture decodes");
        list.index_answers();
        list
    }

    #[test]
    fn index_covers_every_answer() {
        let list = sample_list();
        assert_eq!(list.answers_remaining(), 5);
        assert_eq!(
            list.answers.get("GLEAN"),
            Some(&Answer {
                alphagram: "AEGLN".to_string(),
                idx: 0,
            })
        );
    }

    #[test]
    fn next_set_shrinks_the_list() {
        let mut list = sample_list();
        let drawn = list.next_set(2);
        assert_eq!(drawn.len(), 2);
        assert_eq!(drawn[0].alphagram, "AEGLN");
        assert_eq!(list.questions.len(), 1);

        // Asking past the end drains what remains.
        let rest = list.next_set(50);
        assert_eq!(rest.len(), 1);
        assert!(list.questions.is_empty());
    }

    #[test]
    fn game_options_decode_provider_field_names() {
        let options: GameOptions = serde_json::from_str(
            r#"{"numAnswersThisRound": 0, "qualifyForAward": true,
                "gameType": "challenge", "challengeId": 43643, "timerSecs": 270,
                "_word_list_id": 22447, "questionsToPull": 50}"#,
        )
        .expect("options decode");
        assert_eq!(options.questions_to_pull, 50);
        assert_eq!(options.timer_secs, 270);
        assert_eq!(options.word_list_id, 22447);
    }
}
