//! Player roster: identities and aggregated statistics.
//!
//! Players are long-lived and owned by the roster; tournaments refer to them by
//! [`PlayerId`] only. Lookup and persistence go through
//! [`PlayerRepository`](crate::db::PlayerRepository).

pub mod models;

pub use models::{Player, PlayerId, PlayerStats, PlayerTournamentRecord};
