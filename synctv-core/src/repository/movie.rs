use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{postgres::PgRow, PgPool, Row};

use super::{position_to_db, MovieRepository};
use crate::{
    models::{Movie, MovieBase, MovieId, RoomId, UserId},
    Error, Result,
};

/// PostgreSQL-backed movie repository
///
/// ```sql
/// CREATE TABLE movies (
///     id         CHAR(12) PRIMARY KEY,
///     room_id    CHAR(12) NOT NULL,
///     creator_id CHAR(12) NOT NULL,
///     position   BIGINT NOT NULL,
///     base       JSONB NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL,
///     UNIQUE (room_id, position)
/// );
/// ```
#[derive(Clone)]
pub struct PgMovieRepository {
    pool: PgPool,
}

impl PgMovieRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert<'e, E>(movie: &Movie, executor: E) -> Result<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let base = serde_json::to_value(&movie.base)?;
        sqlx::query(
            "INSERT INTO movies (id, room_id, creator_id, position, base, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(movie.id.as_str())
        .bind(movie.room_id.as_str())
        .bind(movie.creator_id.as_str())
        .bind(position_to_db(movie.position)?)
        .bind(&base)
        .bind(movie.created_at)
        .bind(movie.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    fn row_to_movie(row: &PgRow) -> Result<Movie> {
        let base: JsonValue = row.try_get("base")?;
        let base: MovieBase = serde_json::from_value(base)?;
        let position: i64 = row.try_get("position")?;

        Ok(Movie {
            id: MovieId::from_string(row.try_get("id")?),
            room_id: RoomId::from_string(row.try_get("room_id")?),
            creator_id: UserId::from_string(row.try_get("creator_id")?),
            position: u64::try_from(position)
                .map_err(|_| Error::Database(format!("negative position {position}")))?,
            base,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl MovieRepository for PgMovieRepository {
    async fn get_all_by_room(&self, room_id: &RoomId) -> Result<Vec<Movie>> {
        let rows = sqlx::query(
            "SELECT id, room_id, creator_id, position, base, created_at, updated_at
             FROM movies
             WHERE room_id = $1
             ORDER BY position ASC",
        )
        .bind(room_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_movie).collect()
    }

    async fn create(&self, movie: &Movie) -> Result<()> {
        Self::insert(movie, &self.pool).await
    }

    async fn create_batch(&self, movies: &[Movie]) -> Result<()> {
        if movies.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for movie in movies {
            Self::insert(movie, &mut *tx).await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn save(&self, movie: &Movie) -> Result<()> {
        let base = serde_json::to_value(&movie.base)?;
        let result = sqlx::query(
            "UPDATE movies
             SET position = $3, base = $4, updated_at = $5
             WHERE room_id = $1 AND id = $2",
        )
        .bind(movie.room_id.as_str())
        .bind(movie.id.as_str())
        .bind(position_to_db(movie.position)?)
        .bind(&base)
        .bind(movie.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("movie {}", movie.id)));
        }
        Ok(())
    }

    async fn delete_by_id(&self, room_id: &RoomId, id: &MovieId) -> Result<()> {
        let result = sqlx::query("DELETE FROM movies WHERE room_id = $1 AND id = $2")
            .bind(room_id.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("movie {id}")));
        }
        Ok(())
    }

    async fn delete_by_ids(&self, room_id: &RoomId, ids: &[MovieId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let ids: Vec<&str> = ids.iter().map(MovieId::as_str).collect();
        let result = sqlx::query("DELETE FROM movies WHERE room_id = $1 AND id = ANY($2)")
            .bind(room_id.as_str())
            .bind(&ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_by_room(&self, room_id: &RoomId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM movies WHERE room_id = $1")
            .bind(room_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn swap_positions(&self, room_id: &RoomId, id1: &MovieId, id2: &MovieId) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Lock both rows so concurrent swaps serialize
        let rows = sqlx::query(
            "SELECT id, position FROM movies
             WHERE room_id = $1 AND id IN ($2, $3)
             ORDER BY id
             FOR UPDATE",
        )
        .bind(room_id.as_str())
        .bind(id1.as_str())
        .bind(id2.as_str())
        .fetch_all(&mut *tx)
        .await?;

        let position_of = |id: &MovieId| -> Result<i64> {
            rows.iter()
                .find(|row| row.try_get::<String, _>("id").is_ok_and(|v| v == id.as_str()))
                .map(|row| row.try_get::<i64, _>("position"))
                .transpose()?
                .ok_or_else(|| Error::NotFound(format!("movie {id}")))
        };
        let pos1 = position_of(id1)?;
        let pos2 = position_of(id2)?;

        // (room_id, position) is unique; park the first row on a free slot
        sqlx::query("UPDATE movies SET position = -1 WHERE room_id = $1 AND id = $2")
            .bind(room_id.as_str())
            .bind(id1.as_str())
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE movies SET position = $3 WHERE room_id = $1 AND id = $2")
            .bind(room_id.as_str())
            .bind(id2.as_str())
            .bind(pos1)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE movies SET position = $3 WHERE room_id = $1 AND id = $2")
            .bind(room_id.as_str())
            .bind(id1.as_str())
            .bind(pos2)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
