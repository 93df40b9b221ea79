//! Analyzer Façade and Keychain Gate
//!
//! The event-driven orchestrator that ties the pipeline together. One
//! analyzer audits one hand: it captures per-move events while the hand
//! is played, arms a deadline when the game enters the analyze phase,
//! collects every player's keychain (or times out), replays the hand, and
//! scores the verified result.
//!
//! The lifecycle is an explicit state machine — the phase gates which
//! events are accepted, replacing the staged unsubscription of an
//! event-bus design:
//!
//! ```text
//! Active ──(analyze)──▶ Analyzing ──(all keychains)──▶ Analyzed ──▶ Scored
//!                           │
//!                           └──(deadline / verification error)──▶ Failed
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use super::events::{AuditSignal, GameEvent, PlayerId, PlayerProfile};
use super::score::{self, ScoredHand, Winner};
use super::transcript::TranscriptStore;
use super::{deal, deck, AuditError};
use crate::cards::Card;
use crate::crypto::CardCipher;

/// Analyzer configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// How long to wait for every player's keychain once the gate arms.
    pub keychain_commit_timeout: Duration,
    /// Outbound signal channel capacity.
    pub signal_capacity: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            keychain_commit_timeout: Duration::from_millis(crate::KEYCHAIN_COMMIT_TIMEOUT_MS),
            signal_capacity: 16,
        }
    }
}

/// Analyzer lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerPhase {
    /// Capturing per-move events.
    Active,
    /// Gate armed, awaiting keychain commits.
    Analyzing,
    /// Verification succeeded.
    Analyzed,
    /// Scoring finished; the report is frozen.
    Scored,
    /// Deadline expired or verification failed.
    Failed,
}

/// The audit verdict, frozen once the analyzer finishes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Verified hole cards per selecting player.
    pub private_cards: BTreeMap<PlayerId, Vec<Card>>,
    /// Verified community cards, in resolution order.
    pub community: Vec<Card>,
    /// Scored sub-hands per non-folded player.
    pub hands: BTreeMap<PlayerId, Vec<ScoredHand>>,
    /// Winner set; more than one entry is a split pot.
    pub winners: Vec<Winner>,
    /// True once the analysis is frozen (verdict or failure).
    pub complete: bool,
    /// The first failure encountered, if any.
    pub error: Option<AuditError>,
    /// Digest of the sealed transcript the verdict was computed from.
    pub transcript_digest: Option<[u8; 32]>,
}

/// Event-driven post-hand auditor. One instance audits one hand.
pub struct Analyzer<C> {
    config: AnalyzerConfig,
    cipher: C,
    phase: AnalyzerPhase,
    transcript: TranscriptStore,
    roster: Vec<PlayerProfile>,
    report: AnalysisReport,
    signals: broadcast::Sender<AuditSignal>,
}

impl<C: CardCipher> Analyzer<C> {
    /// Create an analyzer for one hand.
    pub fn new(cipher: C, config: AnalyzerConfig) -> Self {
        let (signals, _) = broadcast::channel(config.signal_capacity);
        Self {
            config,
            cipher,
            phase: AnalyzerPhase::Active,
            transcript: TranscriptStore::new(),
            roster: Vec::new(),
            report: AnalysisReport::default(),
            signals,
        }
    }

    /// Subscribe to the lifecycle signals.
    pub fn subscribe(&self) -> broadcast::Receiver<AuditSignal> {
        self.signals.subscribe()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> AnalyzerPhase {
        self.phase
    }

    /// The transcript captured so far.
    pub fn transcript(&self) -> &TranscriptStore {
        &self.transcript
    }

    /// Consume the inbound event stream until the hand resolves and
    /// return the frozen report.
    pub async fn run(mut self, mut events: mpsc::Receiver<GameEvent>) -> AnalysisReport {
        while let Some(event) = events.recv().await {
            if let GameEvent::Analyze { players } = event {
                self.arm(players);
                break;
            }
            self.capture(event);
        }

        if self.phase != AnalyzerPhase::Analyzing {
            warn!("event stream closed before the analyze phase");
            return self.report;
        }

        self.emit(AuditSignal::Analyzing(self.report.clone()));

        let gate = self.await_keychains(&mut events).await;
        self.transcript.seal();
        self.report.transcript_digest = Some(self.transcript.digest());

        match gate {
            Err(error) => self.fail(error),
            Ok(()) => match self.verify().await {
                Err(error) => self.fail(error),
                Ok(()) => {
                    self.phase = AnalyzerPhase::Analyzed;
                    info!("hand verified");
                    self.emit(AuditSignal::Analyzed(self.report.clone()));

                    self.score();
                    self.report.complete = true;
                    self.phase = AnalyzerPhase::Scored;
                    info!(winners = self.report.winners.len(), "hand scored");
                    self.emit(AuditSignal::Scored(self.report.clone()));
                }
            },
        }

        self.report
    }

    /// Capture one per-move event into the transcript.
    fn capture(&mut self, event: GameEvent) {
        let result = match event {
            GameEvent::DeckGenerated { dealer, mappings } => {
                self.transcript.record_deck_generation(dealer, mappings)
            }
            GameEvent::DeckEncrypted { player, deck } => {
                self.transcript.record_encryption(player, deck)
            }
            GameEvent::DealSelected {
                dealer,
                from,
                cards,
                private,
            } => self.transcript.record_selection(dealer, from, cards, private),
            GameEvent::DealDecrypted {
                dealer,
                from,
                cards,
                private,
            } => self.transcript.record_decryption(dealer, from, cards, private),
            GameEvent::CardsDealt { cards, private } => self.transcript.record_dealt(cards, private),
            GameEvent::KeychainCommitted { player, keychain } => {
                // early commits are accepted; the gate re-checks on arming
                if !self.transcript.record_keychain(player.clone(), keychain) {
                    debug!(player = %player, "duplicate keychain ignored");
                }
                Ok(())
            }
            // handled by the run loop
            GameEvent::Analyze { .. } => Ok(()),
        };

        if let Err(error) = result {
            warn!(error = %error, "transcript rejected event");
        }
    }

    /// Enter the analyze phase with the roster copy.
    fn arm(&mut self, players: Vec<PlayerProfile>) {
        info!(
            players = players.len(),
            timeout_ms = self.config.keychain_commit_timeout.as_millis() as u64,
            "analyze phase: awaiting keychain commits"
        );
        self.roster = players;
        self.phase = AnalyzerPhase::Analyzing;
    }

    fn all_committed(&self) -> bool {
        !self.roster.is_empty()
            && self
                .roster
                .iter()
                .all(|p| self.transcript.keychain(&p.player_id).is_some())
    }

    /// Collect keychain commits until the roster is complete or the
    /// deadline expires. Per-move events are not accepted any more.
    async fn await_keychains(
        &mut self,
        events: &mut mpsc::Receiver<GameEvent>,
    ) -> Result<(), AuditError> {
        let deadline = Instant::now() + self.config.keychain_commit_timeout;

        while !self.all_committed() {
            let event = match timeout_at(deadline, events.recv()).await {
                Err(_) => return Err(AuditError::KeychainTimeout),
                // a closed stream can no longer deliver the missing commits
                Ok(None) => return Err(AuditError::KeychainTimeout),
                Ok(Some(event)) => event,
            };

            match event {
                GameEvent::KeychainCommitted { player, keychain } => {
                    if self.transcript.record_keychain(player.clone(), keychain) {
                        debug!(player = %player, "keychain committed");
                    } else {
                        debug!(player = %player, "duplicate keychain ignored");
                    }
                }
                _ => debug!("per-move event ignored after gate armed"),
            }
        }

        Ok(())
    }

    /// Replay the whole hand against the committed keychains.
    async fn verify(&mut self) -> Result<(), AuditError> {
        let pool = deck::verify_deck_chain(
            self.transcript.snapshots(),
            self.transcript.keychains(),
            &self.cipher,
        )
        .await?;
        info!(
            stages = self.transcript.snapshots().len().saturating_sub(1),
            "deck chain verified"
        );

        let registry = match self.transcript.registry() {
            // nothing was dealt this hand
            None => return Ok(()),
            Some(registry) => registry,
        };

        let outcome = deal::verify_deals(
            self.transcript.deals(),
            pool,
            self.transcript.keychains(),
            registry,
            &self.cipher,
        )
        .await?;
        info!(
            players = outcome.private_cards.len(),
            community = outcome.community.len(),
            "deals verified"
        );

        self.report.private_cards = outcome.private_cards;
        self.report.community = outcome.community;
        Ok(())
    }

    /// Score every non-folded player's pool and resolve the winner set.
    fn score(&mut self) {
        let empty = Vec::new();
        let mut hands = BTreeMap::new();
        for player in self.roster.iter().filter(|p| !p.has_folded) {
            let private = self
                .report
                .private_cards
                .get(&player.player_id)
                .unwrap_or(&empty);
            hands.insert(
                player.player_id.clone(),
                score::score_pools(private, &self.report.community),
            );
        }

        self.report.winners = score::resolve_winners(&self.roster, &hands, &self.report.private_cards);
        self.report.hands = hands;
    }

    /// Freeze the report with a failure. Scoring is skipped and the
    /// `Scored` signal is never emitted.
    fn fail(&mut self, error: AuditError) {
        warn!(code = error.code(), error = %error, "audit failed");
        self.report.error = Some(error);
        self.report.complete = true;
        self.phase = AnalyzerPhase::Failed;
        self.emit(AuditSignal::Analyzed(self.report.clone()));
    }

    fn emit(&self, signal: AuditSignal) {
        // nobody listening is fine; the report is also returned
        let _ = self.signals.send(signal);
    }
}
