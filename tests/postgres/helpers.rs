//! Embedded `PostgreSQL` wiring for delivery store tests.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use herald::notification::{
    adapters::PostgresDeliveryStore,
    domain::{Message, RawEnvelope},
    ports::EnvelopeValidator,
    validation::service::DefaultEnvelopeValidator,
};
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::TestCluster;
use tokio::runtime::Runtime;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// SQL creating the messages, attempts, and events tables.
const CREATE_TABLES_SQL: &str =
    include_str!("../../migrations/2026-10-01-000000_create_delivery_tables/up.sql");

/// Template database name for the pre-migrated schema.
const TEMPLATE_DB: &str = "herald_test_template";

/// A store bound to a throwaway database that is dropped with the guard.
pub struct TestStore {
    pub store: PostgresDeliveryStore,
    pub runtime: Runtime,
    _guard: CleanupGuard,
}

impl TestStore {
    /// Creates a fresh database from the template and opens a store on it.
    pub fn open(cluster: &'static TestCluster, prefix: &str) -> Result<Self, BoxError> {
        ensure_template(cluster)?;
        let db_name = format!("{prefix}_{}", uuid::Uuid::new_v4().simple());
        let guard = CleanupGuard {
            cluster,
            db_name: db_name.clone(),
        };
        cluster
            .create_database_from_template(db_name.as_str(), TEMPLATE_DB)
            .map_err(|err| Box::new(err) as BoxError)?;
        let url = cluster.connection().database_url(&db_name);
        let manager = ConnectionManager::<PgConnection>::new(url);
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|err| Box::new(err) as BoxError)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            store: PostgresDeliveryStore::new(pool),
            runtime,
            _guard: guard,
        })
    }
}

/// Builds an accepted email and SMS message for the given idempotency key.
pub fn accepted_message(key: &str) -> Message {
    let envelope = DefaultEnvelopeValidator::new()
        .validate(&RawEnvelope::new(key, "hello").with_channels(["email", "sms"]))
        .expect("valid envelope");
    Message::accept(envelope, &DefaultClock)
}

fn ensure_template(cluster: &TestCluster) -> Result<(), BoxError> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|e| eyre::eyre!("{e}"))?;
            execute_sql_statements(&mut conn, CREATE_TABLES_SQL)?;
            Ok(())
        })
        .map_err(|err| Box::new(err) as BoxError)?;
    Ok(())
}

/// Runs each `;`-separated statement, since `sql_query` takes one at a time.
fn execute_sql_statements(conn: &mut PgConnection, sql: &str) -> eyre::Result<()> {
    for statement in sql.split(';') {
        let trimmed = statement.trim();
        if trimmed.is_empty() {
            continue;
        }
        diesel::sql_query(trimmed)
            .execute(conn)
            .map_err(|e| eyre::eyre!("SQL error: {e}\nStatement: {trimmed}"))?;
    }
    Ok(())
}

struct CleanupGuard {
    cluster: &'static TestCluster,
    db_name: String,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Err(err) = self.cluster.drop_database(self.db_name.as_str()) {
            eprintln!("Warning: failed to drop test database {}: {err}", self.db_name);
        }
    }
}
