//! Per-realm game session state and the session registry.
//!
//! Each realm owns exactly one [`GameSession`], created when the realm is
//! created and discarded when it is deleted. Every field of a session is
//! protected by a single `tokio::sync::Mutex` so phase changes, list
//! mutation, and scoring can never interleave.
//!
//! Locking is two-tier: the [`GameSessions`] registry hands out
//! `Arc<Mutex<GameSession>>` clones, and registry access never overlaps an
//! await on a session lock, so operations on different realms proceed
//! fully in parallel and lock order cannot invert.

use crate::words::{CorrectAnswer, GameOptions, Question, WordList};
use dashmap::DashMap;
use realm_hub::Realm;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Where a realm's round currently is.
///
/// Transitions are strictly ordered Done → Initializing → CountingDown →
/// Started → Done; a start request finding any phase but `Done` is
/// rejected, never allowed to skip ahead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GamePhase {
    /// No round running; the initial and terminal state
    #[default]
    Done,
    /// A start request is fetching list and question data
    Initializing,
    /// Pre-game countdown; guesses are not yet accepted
    CountingDown,
    /// Round in progress; guesses are scored
    Started,
}

/// The authoritative state of one realm's round.
#[derive(Debug, Default)]
pub struct GameSession {
    phase: GamePhase,
    options: Option<GameOptions>,
    list: Option<WordList>,
    scores: HashMap<String, i64>,
    countdown_task: Option<JoinHandle<()>>,
    play_task: Option<JoinHandle<()>>,
}

impl GameSession {
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: GamePhase) {
        debug!("Game phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    pub fn options(&self) -> Option<&GameOptions> {
        self.options.as_ref()
    }

    pub fn set_options(&mut self, options: Option<GameOptions>) {
        self.options = options;
    }

    /// Installs a freshly fetched word list and zeroes the scoreboard.
    /// Scores reset exactly when a new list arrives, never in between.
    pub fn install_list(&mut self, list: WordList) {
        self.list = Some(list);
        self.scores = HashMap::new();
    }

    /// Draws the next `count` questions from the installed list.
    pub fn next_question_set(&mut self, count: usize) -> Vec<Question> {
        match self.list.as_mut() {
            Some(list) => list.next_set(count),
            None => Vec::new(),
        }
    }

    /// Claims `guess` for `user` if it is an unclaimed valid answer.
    ///
    /// The index removal and the score increment happen together under the
    /// session lock, so an answer can never be credited twice: of any
    /// number of simultaneous identical guesses, only the first to hold
    /// the lock finds the answer still present.
    pub fn claim_answer(&mut self, guess: &str, user: &str) -> Option<CorrectAnswer> {
        let list = self.list.as_mut()?;
        let answer = list.answers.remove(guess)?;
        let score = self
            .scores
            .entry(user.to_string())
            .and_modify(|s| *s += 1)
            .or_insert(1);
        Some(CorrectAnswer {
            answer: guess.to_string(),
            alphagram: answer.alphagram,
            user: user.to_string(),
            idx: answer.idx,
            score: *score,
        })
    }

    pub fn scores(&self) -> &HashMap<String, i64> {
        &self.scores
    }

    pub fn set_countdown_task(&mut self, task: JoinHandle<()>) {
        self.countdown_task = Some(task);
    }

    pub fn set_play_task(&mut self, task: JoinHandle<()>) {
        self.play_task = Some(task);
    }

    /// Cancels any outstanding countdown or play timers. A timer whose
    /// callback is already in flight re-checks the phase after taking the
    /// lock and becomes a no-op, so cancellation racing a fire is safe.
    pub fn cancel_timers(&mut self) {
        if let Some(task) = self.countdown_task.take() {
            debug!("Cancelling countdown timer");
            task.abort();
        }
        if let Some(task) = self.play_task.take() {
            debug!("Cancelling play timer");
            task.abort();
        }
    }
}

/// Registry of all live game sessions, one per realm.
#[derive(Debug, Default)]
pub struct GameSessions {
    sessions: DashMap<Realm, Arc<Mutex<GameSession>>>,
}

impl GameSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the session for a newly created realm. Called exactly once
    /// per realm lifetime, from the hub's serialized creation path.
    pub fn create(&self, realm: &Realm) -> Arc<Mutex<GameSession>> {
        debug!("Creating game session for realm {}", realm);
        let session = Arc::new(Mutex::new(GameSession::default()));
        self.sessions.insert(realm.clone(), Arc::clone(&session));
        session
    }

    /// Looks up a realm's session. The registry reference is dropped
    /// before the caller awaits the session lock.
    pub fn get(&self, realm: &Realm) -> Option<Arc<Mutex<GameSession>>> {
        self.sessions.get(realm).map(|s| Arc::clone(&s))
    }

    /// Removes and returns a realm's session.
    pub fn remove(&self, realm: &Realm) -> Option<Arc<Mutex<GameSession>>> {
        self.sessions.remove(realm).map(|(_, session)| session)
    }

    /// Snapshot of a realm's current phase.
    pub async fn phase(&self, realm: &Realm) -> Option<GamePhase> {
        match self.get(realm) {
            Some(session) => Some(session.lock().await.phase()),
            None => None,
        }
    }

    /// Snapshot of a realm's scoreboard.
    pub async fn scores(&self, realm: &Realm) -> Option<HashMap<String, i64>> {
        match self.get(realm) {
            Some(session) => Some(session.lock().await.scores().clone()),
            None => None,
        }
    }

    /// Drops every session. Teardown hook for tests.
    pub fn reset(&self) {
        self.sessions.clear();
    }
}
