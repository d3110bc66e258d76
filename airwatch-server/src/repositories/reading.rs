use std::sync::Arc;

use sqlx::Error;
use time::OffsetDateTime;

use crate::configs::Storage;
use crate::models::Reading;

/// Append/query gateway over the reading log.
///
/// Writes come from the collector, reads from the evaluation tick and the
/// presentation layer; the pool is safe for that single-writer,
/// multiple-reader split. Callers treat an empty query result as "no fresh
/// data", never as an error.
pub struct ReadingRepository {
    storage: Arc<Storage>,
}

impl ReadingRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    // Append one decoded reading
    pub async fn append(&self, reading: &Reading) -> Result<i32, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO readings (temperature, humidity, pm25, noise, time)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(reading.temperature)
        .bind(reading.humidity)
        .bind(reading.pm25)
        .bind(reading.noise)
        .bind(reading.time)
        .execute(self.storage.get_pool())
        .await?
        .last_insert_rowid();

        Ok(id as i32)
    }

    // Newest reading by timestamp
    pub async fn find_latest(&self) -> Result<Option<Reading>, Error> {
        let reading: Option<Reading> =
            sqlx::query_as("SELECT * FROM readings ORDER BY time DESC LIMIT 1")
                .fetch_optional(self.storage.get_pool())
                .await?;

        Ok(reading)
    }

    // Readings within a time window, ascending by timestamp
    pub async fn find_by_time_range(
        &self,
        start_time: OffsetDateTime,
        end_time: OffsetDateTime,
    ) -> Result<Vec<Reading>, Error> {
        let readings: Vec<Reading> = sqlx::query_as(
            r#"
            SELECT * FROM readings
            WHERE time >= $1 AND time <= $2
            ORDER BY time ASC
            "#,
        )
        .bind(start_time)
        .bind(end_time)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(readings)
    }

    // Delete all readings before a given time (data cleanup)
    pub async fn delete_before(&self, time: OffsetDateTime) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM readings WHERE time < $1")
            .bind(time)
            .execute(self.storage.get_pool())
            .await?;

        Ok(result.rows_affected())
    }
}
