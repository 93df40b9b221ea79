//! # Poker Audit
//!
//! Post-hand auditor for commutatively-encrypted (mental poker) card games.
//!
//! The auditor is passive while a hand is played: it captures every deck
//! re-encryption, card selection, and partial decryption the game layer
//! broadcasts. Once the hand moves to the analyze phase it waits — under a
//! deadline — for every player to commit their keychain, then replays the
//! whole hand against the committed keys and scores the verified hands.
//! No player can cheat on the shuffle, the draw, or the reveal without the
//! replay detecting it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       POKER AUDIT                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── residue.rs  - Opaque large-integer card values          │
//! │  └── multiset.rs - Order-insensitive deck comparison         │
//! │                                                              │
//! │  cards/          - Face values and the active-game registry  │
//! │                                                              │
//! │  crypto/         - Commutative cipher capability             │
//! │  ├── mod.rs      - Keypair, Keychain, CardCipher trait       │
//! │  └── sra.rs      - SRA modular-exponentiation cipher         │
//! │                                                              │
//! │  audit/          - The verification pipeline                 │
//! │  ├── events.rs   - Inbound game events, outbound signals     │
//! │  ├── transcript.rs - Append-only hand transcript (capture)   │
//! │  ├── deck.rs     - Re-encryption chain verifier              │
//! │  ├── deal.rs     - Selection/decryption replay verifier      │
//! │  ├── score.rs    - Deterministic hand scoring + winners      │
//! │  └── analyzer.rs - Event-driven façade and keychain gate     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! Everything after the keychain gate is **100% deterministic**: the same
//! transcript and the same committed keychains always produce the same
//! verdict, the same scores, and the same winner set on any platform. The
//! only wall-clock dependency is the keychain-commit deadline itself.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod cards;
pub mod core;
pub mod crypto;

// Re-export commonly used types
pub use crate::audit::analyzer::{AnalysisReport, Analyzer, AnalyzerConfig, AnalyzerPhase};
pub use crate::audit::events::{AuditSignal, GameEvent, PlayerId, PlayerProfile};
pub use crate::audit::AuditError;
pub use crate::cards::{Card, CardRegistry, Suit, DECK_SIZE};
pub use crate::core::residue::Residue;
pub use crate::crypto::{CardCipher, Keychain, Keypair, SraCipher};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default keychain-commit deadline in milliseconds.
pub const KEYCHAIN_COMMIT_TIMEOUT_MS: u64 = 10_000;
