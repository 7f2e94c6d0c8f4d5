//! The word game's realm handler: lifecycle reactions, start arbitration,
//! timers, and guess scoring.
//!
//! `WordgameHandler` is the [`RealmHandler`] the hub dispatches into. It
//! owns the roster and the session registry, talks to the external word
//! source, and emits its broadcasts back through the hub's
//! [`MessageSender`].

use crate::error::StartFailure;
use crate::roster::{Intent, Roster};
use crate::session::{GamePhase, GameSessions};
use crate::source::{fetch_full_questions, fetch_game_options, fetch_word_list, WordSource};
use async_trait::async_trait;
use realm_hub::{ConnectionId, Message, MessageSender, MessageType, Realm, RealmHandler};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Seconds of countdown between a successful start and the first question.
pub const COUNTDOWN_SECS: u64 = 3;

/// The game layer behind the hub's lifecycle seam.
pub struct WordgameHandler {
    source: Arc<dyn WordSource>,
    sender: Arc<dyn MessageSender>,
    roster: Arc<Roster>,
    sessions: Arc<GameSessions>,
}

impl WordgameHandler {
    /// Creates a handler with its own roster and session registry, talking
    /// to the given word source and broadcasting through `sender`.
    pub fn new(source: Arc<dyn WordSource>, sender: Arc<dyn MessageSender>) -> Self {
        Self {
            source,
            sender,
            roster: Arc::new(Roster::new()),
            sessions: Arc::new(GameSessions::new()),
        }
    }

    /// The roster backing this handler.
    pub fn roster(&self) -> Arc<Roster> {
        Arc::clone(&self.roster)
    }

    /// The session registry backing this handler.
    pub fn sessions(&self) -> Arc<GameSessions> {
        Arc::clone(&self.sessions)
    }

    /// Clears all game state. Teardown hook for tests.
    pub fn reset(&self) {
        self.roster.reset();
        self.sessions.reset();
    }

    async fn handle_table_command(&self, realm: &Realm, user: &str, command: &str) {
        match command {
            "start" => {
                if let Err(failure) = self.handle_start(realm, user).await {
                    self.sender
                        .broadcast_message(realm, MessageType::Fail, failure.to_string());
                }
            }
            other => debug!("Unrecognized table command {:?} from {}", other, user),
        }
    }

    /// Arbitrates a start request.
    ///
    /// The session lock is held for the entire sequence, including the
    /// word-list and question fetches. That is what collapses any number
    /// of racing start requests into at most one in-flight start per
    /// realm: the losers block here and then fail the phase check.
    pub async fn handle_start(&self, realm: &Realm, user: &str) -> Result<(), StartFailure> {
        debug!("▶️ Start requested by {} in realm {}", user, realm);
        let Some(session) = self.sessions.get(realm) else {
            // A start can race realm deletion; nothing to do.
            warn!("Start request for realm {} with no session", realm);
            return Ok(());
        };
        let mut state = session.lock().await;

        let Some(options) = state.options().cloned() else {
            error!("Settings for realm {} do not yet exist", realm);
            return Err(StartFailure::SettingsNotReady);
        };
        self.roster.wants_to_play(realm, user);
        if !self.roster.allow_start(realm) {
            debug!("Start not yet allowed in realm {}", realm);
            return Err(StartFailure::StartNotAllowed);
        }
        if state.phase() != GamePhase::Done {
            debug!("A game is already going in realm {}", realm);
            return Err(StartFailure::GameAlreadyInProgress);
        }

        state.set_phase(GamePhase::Initializing);
        let list = match fetch_word_list(self.source.as_ref(), options.word_list_id).await {
            Ok(list) => list,
            Err(e) => {
                error!("Fetching word list {} failed: {}", options.word_list_id, e);
                state.set_phase(GamePhase::Done);
                return Err(StartFailure::NullWordList);
            }
        };
        let lexicon = list.lexicon.clone();
        state.install_list(list);
        let to_send = state.next_question_set(options.questions_to_pull);
        let questions =
            match fetch_full_questions(self.source.as_ref(), &to_send, &lexicon).await {
                Ok(questions) => questions,
                Err(e) => {
                    error!("Fetching full question info failed: {}", e);
                    state.set_phase(GamePhase::Done);
                    return Err(StartFailure::QuestionInfoFailure);
                }
            };

        state.set_phase(GamePhase::CountingDown);
        self.sender
            .broadcast_message(realm, MessageType::Countdown, COUNTDOWN_SECS.to_string());
        info!(
            "⏳ Realm {} counting down; {} questions queued",
            realm,
            to_send.len()
        );
        // The question payload is held back until the countdown elapses;
        // guesses are not accepted before the phase flips to Started.
        state.set_countdown_task(tokio::spawn(run_countdown(
            Arc::clone(&self.sessions),
            Arc::clone(&self.sender),
            realm.clone(),
            questions,
        )));
        Ok(())
    }

    /// Scores a guess. Outside a running round this is a benign race and
    /// silently ignored; wrong or already-claimed guesses are no-ops.
    pub async fn handle_guess(&self, realm: &Realm, user: &str, guess: &str) {
        let Some(session) = self.sessions.get(realm) else {
            debug!("Guess for realm {} with no session", realm);
            return;
        };
        let mut state = session.lock().await;
        if state.phase() != GamePhase::Started {
            debug!("Got a guess from {} when no game was running", user);
            return;
        }
        let Some(correct) = state.claim_answer(guess, user) else {
            return;
        };
        drop(state);

        match serde_json::to_string(&correct) {
            Ok(payload) => {
                self.sender
                    .broadcast_message(realm, MessageType::Score, payload)
            }
            Err(e) => error!("Failed to encode correct answer: {}", e),
        }
    }
}

#[async_trait]
impl RealmHandler for WordgameHandler {
    async fn handle_message(&self, msg: Message) {
        trace!(
            "Got a {:?} message from {} in realm {}",
            msg.mtype,
            msg.from,
            msg.realm
        );
        match msg.mtype {
            MessageType::TableCmd => {
                self.handle_table_command(&msg.realm, &msg.from, &msg.data)
                    .await
            }
            MessageType::Guess => self.handle_guess(&msg.realm, &msg.from, &msg.data).await,
            other => trace!("Ignoring {:?} message", other),
        }
    }

    async fn realm_creation(&self, realm: Realm) {
        let session = self.sessions.create(&realm);
        let options = match fetch_game_options(self.source.as_ref(), &realm).await {
            Ok(options) => Some(options),
            Err(e) => {
                // Leaves the realm unstartable until a later attempt; each
                // start request re-checks.
                error!("Fetching game options for realm {} failed: {}", realm, e);
                None
            }
        };
        let mut state = session.lock().await;
        state.set_options(options);
        debug!(
            "Realm {} created; settings ready: {}",
            realm,
            state.options().is_some()
        );
    }

    async fn realm_join(&self, realm: Realm, user: &str, conn_id: ConnectionId, first_user: bool) {
        let intent = if first_user {
            Intent::Sitting
        } else {
            Intent::Watching
        };
        self.roster.add(&realm, user, intent, conn_id);
    }

    async fn realm_leave(&self, realm: Realm, user: &str, conn_id: ConnectionId) {
        self.roster.remove(&realm, user, conn_id);
    }

    async fn realm_deletion(&self, realm: Realm) {
        if let Some(session) = self.sessions.remove(&realm) {
            let mut state = session.lock().await;
            state.cancel_timers();
            state.set_phase(GamePhase::Done);
        }
        debug!("Realm {} deleted; session discarded", realm);
    }
}

/// Countdown continuation: flips the realm into `Started`, ships the
/// question set and round timer, and arms the play timer.
///
/// Runs detached from the start request that armed it, so it reacquires
/// the session lock and re-checks the phase first; a countdown cancelled
/// by realm deletion (or finding anything but `CountingDown`) is a no-op.
async fn run_countdown(
    sessions: Arc<GameSessions>,
    sender: Arc<dyn MessageSender>,
    realm: Realm,
    questions: String,
) {
    tokio::time::sleep(Duration::from_secs(COUNTDOWN_SECS)).await;
    let Some(session) = sessions.get(&realm) else {
        return;
    };
    let mut state = session.lock().await;
    if state.phase() != GamePhase::CountingDown {
        debug!("Countdown for realm {} fired out of phase; ignoring", realm);
        return;
    }

    debug!("🏁 Countdown finished for realm {}; sending questions", realm);
    state.set_phase(GamePhase::Started);
    let timer_secs = state.options().map(|o| o.timer_secs).unwrap_or_default();
    sender.broadcast_message(&realm, MessageType::Questions, questions);
    sender.broadcast_message(&realm, MessageType::Timer, timer_secs.to_string());
    state.set_play_task(tokio::spawn(run_game_over(
        Arc::clone(&sessions),
        Arc::clone(&sender),
        realm.clone(),
        timer_secs,
    )));
}

/// Play-timer continuation: ends the round. Guesses still in flight when
/// this fires lose the lock race and are rejected by the phase check in
/// [`WordgameHandler::handle_guess`].
async fn run_game_over(
    sessions: Arc<GameSessions>,
    sender: Arc<dyn MessageSender>,
    realm: Realm,
    timer_secs: u64,
) {
    tokio::time::sleep(Duration::from_secs(timer_secs)).await;
    let Some(session) = sessions.get(&realm) else {
        return;
    };
    let mut state = session.lock().await;
    if state.phase() != GamePhase::Started {
        debug!("Play timer for realm {} fired out of phase; ignoring", realm);
        return;
    }

    info!("🏆 This game in realm {} is over", realm);
    state.set_phase(GamePhase::Done);
    sender.broadcast_message(&realm, MessageType::GameOver, String::new());
}
