//! PostgreSQL implementation of the repository traits.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use super::repository::{
    BatchRepository, BoardRepository, MatchRepository, PlayerRepository, TournamentRepository,
    WriteBatch,
};
use crate::roster::{Player, PlayerId, PlayerStats, PlayerTournamentRecord};
use crate::tournament::{
    Board, BoardStatus, Knockout, Match, MatchFilter, MatchId, MatchStatus, NewTournament,
    Tournament, TournamentError, TournamentId, TournamentResult, TournamentStatus,
};

/// Schema applied by [`PgStore::migrate`]
pub const SCHEMA: &str = include_str!("../../migrations/0001_tournaments.sql");

const TOURNAMENT_COLUMNS: &str =
    "id, name, players, board_count, status, groups, knockout, placements, created_at";

const MATCH_COLUMNS: &str =
    "id, tournament_id, board_id, player1, player2, scorer, status, round, is_knockout, winner, stats, legs";

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create missing tables and indexes
    pub async fn migrate(&self) -> TournamentResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

fn to_db_int(value: usize, what: &str) -> TournamentResult<i32> {
    i32::try_from(value)
        .map_err(|_| TournamentError::MalformedRecord(format!("{what} {value} out of range")))
}

fn from_db_int<T: TryFrom<i32>>(value: i32, what: &str) -> TournamentResult<T> {
    T::try_from(value)
        .map_err(|_| TournamentError::MalformedRecord(format!("{what} {value} out of range")))
}

fn tournament_from_row(row: &PgRow) -> TournamentResult<Tournament> {
    let status: String = row.try_get("status")?;

    Ok(Tournament {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        players: row.try_get("players")?,
        board_count: from_db_int(row.try_get("board_count")?, "board_count")?,
        status: TournamentStatus::parse(&status).ok_or_else(|| {
            TournamentError::MalformedRecord(format!("unknown tournament status {status}"))
        })?,
        groups: serde_json::from_value(row.try_get("groups")?)?,
        knockout: serde_json::from_value(row.try_get("knockout")?)?,
        placements: serde_json::from_value(row.try_get("placements")?)?,
        created_at: row.try_get("created_at")?,
    })
}

fn match_from_row(row: &PgRow) -> TournamentResult<Match> {
    let status: String = row.try_get("status")?;

    Ok(Match {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        board_id: row.try_get("board_id")?,
        player1: row.try_get("player1")?,
        player2: row.try_get("player2")?,
        scorer: row.try_get("scorer")?,
        status: MatchStatus::parse(&status).ok_or_else(|| {
            TournamentError::MalformedRecord(format!("unknown match status {status}"))
        })?,
        round: from_db_int(row.try_get("round")?, "round")?,
        is_knockout: row.try_get("is_knockout")?,
        winner: row.try_get("winner")?,
        stats: serde_json::from_value(row.try_get("stats")?)?,
        legs: serde_json::from_value(row.try_get("legs")?)?,
    })
}

fn board_from_row(row: &PgRow) -> TournamentResult<Board> {
    let status: String = row.try_get("status")?;

    Ok(Board {
        tournament_id: row.try_get("tournament_id")?,
        board_id: row.try_get("board_id")?,
        status: BoardStatus::parse(&status).ok_or_else(|| {
            TournamentError::MalformedRecord(format!("unknown board status {status}"))
        })?,
        waiting_players: row.try_get("waiting_players")?,
        current_match: row.try_get("current_match")?,
    })
}

fn player_from_row(row: &PgRow) -> TournamentResult<Player> {
    Ok(Player {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        lifetime: serde_json::from_value(row.try_get("lifetime")?)?,
    })
}

async fn insert_board(tx: &mut Transaction<'_, Postgres>, board: &Board) -> TournamentResult<()> {
    sqlx::query(
        "INSERT INTO boards (tournament_id, board_id, status, waiting_players, current_match)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(board.tournament_id)
    .bind(board.board_id)
    .bind(board.status.as_str())
    .bind(&board.waiting_players)
    .bind(board.current_match)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn update_board(tx: &mut Transaction<'_, Postgres>, board: &Board) -> TournamentResult<()> {
    let result = sqlx::query(
        "UPDATE boards SET status = $1, waiting_players = $2, current_match = $3
         WHERE tournament_id = $4 AND board_id = $5",
    )
    .bind(board.status.as_str())
    .bind(&board.waiting_players)
    .bind(board.current_match)
    .bind(board.tournament_id)
    .bind(board.board_id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(TournamentError::BoardNotFound {
            tournament_id: board.tournament_id,
            board_id: board.board_id,
        });
    }
    Ok(())
}

async fn insert_match(tx: &mut Transaction<'_, Postgres>, m: &Match) -> TournamentResult<()> {
    sqlx::query(&format!(
        "INSERT INTO matches ({MATCH_COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
    ))
    .bind(m.id)
    .bind(m.tournament_id)
    .bind(m.board_id)
    .bind(m.player1)
    .bind(m.player2)
    .bind(m.scorer)
    .bind(m.status.as_str())
    .bind(to_db_int(m.round, "round")?)
    .bind(m.is_knockout)
    .bind(m.winner)
    .bind(serde_json::to_value(&m.stats)?)
    .bind(serde_json::to_value(&m.legs)?)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn update_match(tx: &mut Transaction<'_, Postgres>, m: &Match) -> TournamentResult<()> {
    let result = sqlx::query(
        "UPDATE matches
         SET board_id = $1, player1 = $2, player2 = $3, scorer = $4, status = $5,
             round = $6, is_knockout = $7, winner = $8, stats = $9, legs = $10
         WHERE id = $11",
    )
    .bind(m.board_id)
    .bind(m.player1)
    .bind(m.player2)
    .bind(m.scorer)
    .bind(m.status.as_str())
    .bind(to_db_int(m.round, "round")?)
    .bind(m.is_knockout)
    .bind(m.winner)
    .bind(serde_json::to_value(&m.stats)?)
    .bind(serde_json::to_value(&m.legs)?)
    .bind(m.id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(TournamentError::MatchNotFound(m.id));
    }
    Ok(())
}

async fn update_tournament(
    tx: &mut Transaction<'_, Postgres>,
    tournament: &Tournament,
) -> TournamentResult<()> {
    let result = sqlx::query(
        "UPDATE tournaments
         SET name = $1, players = $2, board_count = $3, status = $4,
             groups = $5, knockout = $6, placements = $7
         WHERE id = $8",
    )
    .bind(&tournament.name)
    .bind(&tournament.players)
    .bind(to_db_int(tournament.board_count as usize, "board_count")?)
    .bind(tournament.status.as_str())
    .bind(serde_json::to_value(&tournament.groups)?)
    .bind(serde_json::to_value(&tournament.knockout)?)
    .bind(serde_json::to_value(&tournament.placements)?)
    .bind(tournament.id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(TournamentError::TournamentNotFound(tournament.id));
    }
    Ok(())
}

async fn upsert_result(
    tx: &mut Transaction<'_, Postgres>,
    record: &PlayerTournamentRecord,
) -> TournamentResult<()> {
    sqlx::query(
        "INSERT INTO player_tournament_results (player_id, tournament_id, placement, stats)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (player_id, tournament_id)
         DO UPDATE SET placement = EXCLUDED.placement, stats = EXCLUDED.stats",
    )
    .bind(record.player_id)
    .bind(record.tournament_id)
    .bind(to_db_int(record.placement, "placement")?)
    .bind(serde_json::to_value(&record.stats)?)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn update_player(
    tx: &mut Transaction<'_, Postgres>,
    player: &Player,
) -> TournamentResult<()> {
    let result = sqlx::query("UPDATE players SET name = $1, lifetime = $2 WHERE id = $3")
        .bind(&player.name)
        .bind(serde_json::to_value(&player.lifetime)?)
        .bind(player.id)
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(TournamentError::PlayerNotFound(player.id.to_string()));
    }
    Ok(())
}

#[async_trait]
impl TournamentRepository for PgStore {
    async fn create_tournament(&self, new: NewTournament) -> TournamentResult<Tournament> {
        let board_count = to_db_int(new.board_count as usize, "board_count")?;
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "INSERT INTO tournaments (name, players, board_count, status, knockout)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {TOURNAMENT_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.players)
        .bind(board_count)
        .bind(TournamentStatus::Created.as_str())
        .bind(serde_json::to_value(Knockout::default())?)
        .fetch_one(&mut *tx)
        .await?;
        let tournament = tournament_from_row(&row)?;

        for board_id in 1..=board_count {
            insert_board(&mut tx, &Board::idle(tournament.id, board_id)).await?;
        }

        tx.commit().await?;
        Ok(tournament)
    }

    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }
}

#[async_trait]
impl MatchRepository for PgStore {
    async fn find_matches(&self, filter: &MatchFilter) -> TournamentResult<Vec<Match>> {
        let round = filter
            .round
            .map(|round| to_db_int(round, "round"))
            .transpose()?;

        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE ($1::BIGINT IS NULL OR tournament_id = $1)
               AND ($2::INTEGER IS NULL OR board_id = $2)
               AND ($3::TEXT IS NULL OR status = $3)
               AND ($4::BOOLEAN IS NULL OR is_knockout = $4)
               AND ($5::INTEGER IS NULL OR round = $5)
             ORDER BY id"
        ))
        .bind(filter.tournament_id)
        .bind(filter.board_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.is_knockout)
        .bind(round)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn find_match(&self, id: MatchId) -> TournamentResult<Option<Match>> {
        let row = sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn reserve_match_ids(&self, count: usize) -> TournamentResult<Vec<MatchId>> {
        let mut ids: Vec<MatchId> = sqlx::query_scalar(
            "SELECT nextval(pg_get_serial_sequence('matches', 'id'))
             FROM generate_series(1, $1)",
        )
        .bind(to_db_int(count, "match count")?)
        .fetch_all(&self.pool)
        .await?;

        ids.sort_unstable();
        Ok(ids)
    }
}

#[async_trait]
impl BoardRepository for PgStore {
    async fn find_boards(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Board>> {
        let rows = sqlx::query(
            "SELECT tournament_id, board_id, status, waiting_players, current_match
             FROM boards WHERE tournament_id = $1 ORDER BY board_id",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(board_from_row).collect()
    }
}

#[async_trait]
impl PlayerRepository for PgStore {
    async fn create_player(&self, name: &str) -> TournamentResult<Player> {
        let row = sqlx::query(
            "INSERT INTO players (name, lifetime) VALUES ($1, $2) RETURNING id, name, lifetime",
        )
        .bind(name)
        .bind(serde_json::to_value(PlayerStats::default())?)
        .fetch_one(&self.pool)
        .await?;

        player_from_row(&row)
    }

    async fn find_player(&self, id: PlayerId) -> TournamentResult<Option<Player>> {
        let row = sqlx::query("SELECT id, name, lifetime FROM players WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(player_from_row).transpose()
    }

    async fn find_player_by_name(&self, name: &str) -> TournamentResult<Option<Player>> {
        let row = sqlx::query("SELECT id, name, lifetime FROM players WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(player_from_row).transpose()
    }

    async fn find_tournament_results(
        &self,
        player_id: PlayerId,
    ) -> TournamentResult<Vec<PlayerTournamentRecord>> {
        let rows = sqlx::query(
            "SELECT player_id, tournament_id, placement, stats
             FROM player_tournament_results WHERE player_id = $1 ORDER BY tournament_id",
        )
        .bind(player_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> TournamentResult<PlayerTournamentRecord> {
                Ok(PlayerTournamentRecord {
                    tournament_id: row.try_get("tournament_id")?,
                    player_id: row.try_get("player_id")?,
                    placement: from_db_int(row.try_get("placement")?, "placement")?,
                    stats: serde_json::from_value(row.try_get("stats")?)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl BatchRepository for PgStore {
    async fn apply_batch(&self, batch: WriteBatch) -> TournamentResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        // Dropping the transaction on an early return rolls everything back
        let mut tx = self.pool.begin().await?;

        if !batch.delete_matches.is_empty() {
            sqlx::query("DELETE FROM matches WHERE id = ANY($1)")
                .bind(&batch.delete_matches)
                .execute(&mut *tx)
                .await?;
        }
        for m in &batch.insert_matches {
            insert_match(&mut tx, m).await?;
        }
        for m in &batch.save_matches {
            update_match(&mut tx, m).await?;
        }
        if let Some(tournament) = &batch.tournament {
            update_tournament(&mut tx, tournament).await?;
        }
        for board in &batch.boards {
            update_board(&mut tx, board).await?;
        }
        for record in &batch.results {
            upsert_result(&mut tx, record).await?;
        }
        for player in &batch.players {
            update_player(&mut tx, player).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
