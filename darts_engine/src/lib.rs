//! # Darts Engine
//!
//! Progression engine for darts tournaments: a round-robin group stage
//! followed by a single-elimination knockout.
//!
//! ## Lifecycle
//!
//! A tournament moves through four states:
//!
//! - **Created**: players and boards registered
//! - **Group**: groups drawn, round-robin matches played on the boards
//! - **Knockout**: the best players of each group meet in a bracket
//! - **Finished**: the final is decided and placements are written
//!
//! Any finished match may be re-committed with a corrected result. The old
//! result is reverted first, so standings and the bracket always equal what
//! the current results produce.
//!
//! ## Core Modules
//!
//! - [`tournament`]: scheduling, standings, qualification, bracket and the manager
//! - [`roster`]: players and their lifetime statistics
//! - [`db`]: storage traits with in-memory and PostgreSQL implementations
//! - [`config`]: engine tunables

/// Engine tunables.
pub mod config;

/// Storage collaborator traits and implementations.
pub mod db;

/// Player roster.
pub mod roster;

/// Tournament progression.
pub mod tournament;
pub use tournament::{
    ErrorKind, MatchResult, Tournament, TournamentError, TournamentManager, TournamentResult,
    TournamentStatus,
};
