//! # Wordgame - Timed Word-Guessing Rounds for Realm Hub
//!
//! The game layer behind the realm hub's lifecycle seam. Each realm hosts
//! one game session: users join a table, declare whether they want to
//! play, and once the quorum agrees a timed round runs in which correct
//! guesses claim answers for points.
//!
//! ## Components
//!
//! * **Roster** - Per-realm presence and participation intent; computes
//!   the start quorum
//! * **Game Session** - The per-realm state machine (Done → Initializing →
//!   CountingDown → Started → Done), its word list, scores, and timers
//! * **Word Source** - The external provider of game options, word lists,
//!   and enriched question payloads, behind a capability trait
//! * **Handler** - The [`WordgameHandler`] the hub dispatches into
//!
//! ## Concurrency
//!
//! All of a session's state sits behind one per-realm mutex. Start
//! arbitration holds it across the external fetches, so of N racing start
//! requests exactly one fetches a list and arms the countdown; guess
//! scoring holds it across the claim-and-credit step, so an answer is
//! credited exactly once no matter how many identical guesses race.

// Re-export core types and functions for easy access
pub use error::{SourceError, StartFailure};
pub use handler::{WordgameHandler, COUNTDOWN_SECS};
pub use roster::{Intent, Roster};
pub use session::{GamePhase, GameSession, GameSessions};
pub use source::{
    fetch_full_questions, fetch_game_options, fetch_word_list, HttpWordSource, WordSource,
};
pub use words::{Answer, CorrectAnswer, GameOptions, Question, WordList};

// Public module declarations
pub mod error;
pub mod handler;
pub mod roster;
pub mod session;
pub mod source;
pub mod words;
