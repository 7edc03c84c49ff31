//! `PostgreSQL` delivery store.
//!
//! Idempotent inserts rely on the unique constraints on
//! `messages.idempotency_key` and `attempts (message_id, channel)`; status
//! writes are conditional on the row version.

use super::{
    conversion::{
        attempt_to_row, event_to_row, message_to_row, row_to_attempt, row_to_event,
        row_to_message,
    },
    models::{AttemptRow, EventRow, MessageRow},
    schema::{attempts, events, messages},
};
use crate::notification::{
    domain::{
        Attempt, AttemptId, AttemptStatus, Channel, DeliveryEvent, IdempotencyKey, Message,
        MessageId, MessageStatus,
    },
    ports::{
        AttemptRepository, EventRepository, InsertOutcome, MessageRepository, RepositoryError,
        RepositoryResult,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by the delivery store.
pub type DeliveryPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed delivery store.
#[derive(Debug, Clone)]
pub struct PostgresDeliveryStore {
    pool: DeliveryPgPool,
}

impl PostgresDeliveryStore {
    /// Creates a store from a connection pool.
    #[must_use]
    pub const fn new(pool: DeliveryPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(RepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(RepositoryError::persistence)?
    }
}

/// Writes an attempt row unless the stored attempt is already terminal.
fn update_open_attempt(
    connection: &mut PgConnection,
    row: &AttemptRow,
    attempt_id: AttemptId,
) -> RepositoryResult<bool> {
    let open_statuses = [
        AttemptStatus::Pending.as_str(),
        AttemptStatus::Started.as_str(),
    ];
    let updated = diesel::update(
        attempts::table
            .filter(attempts::id.eq(row.id))
            .filter(attempts::status.eq_any(open_statuses)),
    )
    .set((
        attempts::status.eq(&row.status),
        attempts::error_code.eq(&row.error_code),
        attempts::error_message.eq(&row.error_message),
        attempts::external_id.eq(&row.external_id),
        attempts::started_at.eq(row.started_at),
        attempts::finished_at.eq(row.finished_at),
    ))
    .execute(connection)?;

    if updated == 1 {
        return Ok(true);
    }

    let exists = diesel::select(diesel::dsl::exists(
        attempts::table.filter(attempts::id.eq(row.id)),
    ))
    .get_result::<bool>(connection)?;
    if exists {
        Ok(false)
    } else {
        Err(RepositoryError::AttemptNotFound(attempt_id))
    }
}

fn map_foreign_key(err: DieselError, message_id: MessageId) -> RepositoryError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            RepositoryError::NotFound(message_id)
        }
        other => RepositoryError::persistence(other),
    }
}

#[async_trait]
impl MessageRepository for PostgresDeliveryStore {
    async fn insert_or_get(&self, message: &Message) -> RepositoryResult<InsertOutcome<Message>> {
        let row = message_to_row(message)?;
        self.run_blocking(move |connection| {
            let key = row.idempotency_key.clone();
            let inserted = diesel::insert_into(messages::table)
                .values(&row)
                .on_conflict(messages::idempotency_key)
                .do_nothing()
                .returning(MessageRow::as_returning())
                .get_result::<MessageRow>(connection)
                .optional()
                .map_err(RepositoryError::persistence)?;

            if let Some(row) = inserted {
                return row_to_message(row).map(InsertOutcome::Inserted);
            }

            let existing = messages::table
                .filter(messages::idempotency_key.eq(key))
                .select(MessageRow::as_select())
                .first::<MessageRow>(connection)
                .map_err(RepositoryError::persistence)?;
            row_to_message(existing).map(InsertOutcome::Existing)
        })
        .await
    }

    async fn find_message(&self, id: MessageId) -> RepositoryResult<Option<Message>> {
        self.run_blocking(move |connection| {
            messages::table
                .filter(messages::id.eq(id.into_inner()))
                .select(MessageRow::as_select())
                .first::<MessageRow>(connection)
                .optional()
                .map_err(RepositoryError::persistence)?
                .map(row_to_message)
                .transpose()
        })
        .await
    }

    async fn find_message_by_key(
        &self,
        key: &IdempotencyKey,
    ) -> RepositoryResult<Option<Message>> {
        let lookup = key.as_str().to_owned();
        self.run_blocking(move |connection| {
            messages::table
                .filter(messages::idempotency_key.eq(lookup))
                .select(MessageRow::as_select())
                .first::<MessageRow>(connection)
                .optional()
                .map_err(RepositoryError::persistence)?
                .map(row_to_message)
                .transpose()
        })
        .await
    }

    async fn update_status(
        &self,
        id: MessageId,
        expected_version: i64,
        status: MessageStatus,
        at: DateTime<Utc>,
    ) -> RepositoryResult<bool> {
        self.run_blocking(move |connection| {
            let updated = diesel::update(
                messages::table
                    .filter(messages::id.eq(id.into_inner()))
                    .filter(messages::version.eq(expected_version)),
            )
            .set((
                messages::status.eq(status.as_str()),
                messages::version.eq(expected_version + 1),
                messages::updated_at.eq(at),
            ))
            .execute(connection)
            .map_err(RepositoryError::persistence)?;

            if updated == 1 {
                return Ok(true);
            }

            let exists = diesel::select(diesel::dsl::exists(
                messages::table.filter(messages::id.eq(id.into_inner())),
            ))
            .get_result::<bool>(connection)
            .map_err(RepositoryError::persistence)?;
            if exists {
                Ok(false)
            } else {
                Err(RepositoryError::NotFound(id))
            }
        })
        .await
    }
}

#[async_trait]
impl AttemptRepository for PostgresDeliveryStore {
    async fn insert_or_get_attempt(
        &self,
        attempt: &Attempt,
    ) -> RepositoryResult<InsertOutcome<Attempt>> {
        let row = attempt_to_row(attempt);
        let message_id = attempt.message_id();
        self.run_blocking(move |connection| {
            let inserted = diesel::insert_into(attempts::table)
                .values(&row)
                .on_conflict((attempts::message_id, attempts::channel))
                .do_nothing()
                .returning(AttemptRow::as_returning())
                .get_result::<AttemptRow>(connection)
                .optional()
                .map_err(|err| map_foreign_key(err, message_id))?;

            if let Some(row) = inserted {
                return row_to_attempt(row).map(InsertOutcome::Inserted);
            }

            let existing = attempts::table
                .filter(attempts::message_id.eq(row.message_id))
                .filter(attempts::channel.eq(&row.channel))
                .select(AttemptRow::as_select())
                .first::<AttemptRow>(connection)
                .map_err(RepositoryError::persistence)?;
            row_to_attempt(existing).map(InsertOutcome::Existing)
        })
        .await
    }

    async fn save_attempt(&self, attempt: &Attempt) -> RepositoryResult<bool> {
        let row = attempt_to_row(attempt);
        let attempt_id = attempt.id();
        self.run_blocking(move |connection| update_open_attempt(connection, &row, attempt_id))
            .await
    }

    async fn finish_attempt(
        &self,
        attempt: &Attempt,
        events: &[DeliveryEvent],
    ) -> RepositoryResult<bool> {
        let row = attempt_to_row(attempt);
        let attempt_id = attempt.id();
        let message_id = attempt.message_id();
        let event_rows: Vec<_> = events.iter().map(event_to_row).collect();
        self.run_blocking(move |connection| {
            connection.transaction::<_, RepositoryError, _>(|tx| {
                if !update_open_attempt(tx, &row, attempt_id)? {
                    return Ok(false);
                }
                if !event_rows.is_empty() {
                    diesel::insert_into(events::table)
                        .values(&event_rows)
                        .execute(tx)
                        .map_err(|err| map_foreign_key(err, message_id))?;
                }
                Ok(true)
            })
        })
        .await
    }

    async fn find_attempt(
        &self,
        message_id: MessageId,
        channel: Channel,
    ) -> RepositoryResult<Option<Attempt>> {
        self.run_blocking(move |connection| {
            attempts::table
                .filter(attempts::message_id.eq(message_id.into_inner()))
                .filter(attempts::channel.eq(channel.as_str()))
                .select(AttemptRow::as_select())
                .first::<AttemptRow>(connection)
                .optional()
                .map_err(RepositoryError::persistence)?
                .map(row_to_attempt)
                .transpose()
        })
        .await
    }

    async fn list_attempts(&self, message_id: MessageId) -> RepositoryResult<Vec<Attempt>> {
        self.run_blocking(move |connection| {
            attempts::table
                .filter(attempts::message_id.eq(message_id.into_inner()))
                .order(attempts::created_at.asc())
                .select(AttemptRow::as_select())
                .load::<AttemptRow>(connection)
                .map_err(RepositoryError::persistence)?
                .into_iter()
                .map(row_to_attempt)
                .collect()
        })
        .await
    }
}

#[async_trait]
impl EventRepository for PostgresDeliveryStore {
    async fn append_events(&self, events: &[DeliveryEvent]) -> RepositoryResult<()> {
        let Some(first) = events.first() else {
            return Ok(());
        };
        let message_id = first.message_id();
        let rows: Vec<_> = events.iter().map(event_to_row).collect();
        self.run_blocking(move |connection| {
            diesel::insert_into(events::table)
                .values(&rows)
                .execute(connection)
                .map_err(|err| map_foreign_key(err, message_id))?;
            Ok(())
        })
        .await
    }

    async fn list_events(&self, message_id: MessageId) -> RepositoryResult<Vec<DeliveryEvent>> {
        self.run_blocking(move |connection| {
            events::table
                .filter(events::message_id.eq(message_id.into_inner()))
                .order((events::created_at.asc(), events::seq.asc()))
                .select(EventRow::as_select())
                .load::<EventRow>(connection)
                .map_err(RepositoryError::persistence)?
                .into_iter()
                .map(row_to_event)
                .collect()
        })
        .await
    }
}
