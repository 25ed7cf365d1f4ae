use crate::entities::notes;
use crate::error::StorageError;
use crate::models::{Note, NoteData, NoteId};
use crate::storage::{self, NoteStorage};
use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database,
    DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Schema, Set,
};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Postgres-backed canonical store. Every call is bounded by `timeout`.
#[derive(Clone)]
pub struct PostgresStorage {
    db: DatabaseConnection,
    timeout: Duration,
}

impl PostgresStorage {
    pub async fn connect(database_url: &str, timeout: Duration) -> Result<Self, StorageError> {
        let mut options = ConnectOptions::new(database_url.to_owned());
        options
            .max_connections(5)
            .connect_timeout(timeout)
            .acquire_timeout(timeout)
            .sqlx_logging(false);

        let db = Database::connect(options).await?;
        let storage = Self { db, timeout };
        storage.init_database().await?;

        Ok(storage)
    }

    async fn init_database(&self) -> Result<(), StorageError> {
        let backend = self.db.get_database_backend();
        let mut table = Schema::new(backend).create_table_from_entity(notes::Entity);
        table.if_not_exists();

        self.bounded(self.db.execute(backend.build(&table))).await?;
        Ok(())
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, DbErr>>,
    {
        storage::bounded(self.timeout, call).await
    }
}

#[async_trait]
impl NoteStorage for PostgresStorage {
    async fn find_all(&self) -> Result<Vec<Note>, StorageError> {
        let models = self
            .bounded(
                notes::Entity::find()
                    .order_by_asc(notes::Column::Id)
                    .all(&self.db),
            )
            .await?;
        debug!(count = models.len(), "loaded notes");

        models.into_iter().map(Note::try_from).collect()
    }

    async fn find_by_id(&self, id: &NoteId) -> Result<Option<Note>, StorageError> {
        let model = self
            .bounded(notes::Entity::find_by_id(id.to_string()).one(&self.db))
            .await?;

        model.map(Note::try_from).transpose()
    }

    async fn create(&self, data: NoteData) -> Result<Note, StorageError> {
        let note = Note::new(NoteId::generate(), data);
        let model = notes::ActiveModel {
            id: Set(note.id.to_string()),
            title: Set(note.title.clone()),
            content: Set(note.content.clone()),
        };

        self.bounded(model.insert(&self.db)).await?;
        debug!(id = %note.id, "inserted note");

        Ok(note)
    }

    async fn update(&self, id: &NoteId, data: NoteData) -> Result<Option<Note>, StorageError> {
        let result = self
            .bounded(
                notes::Entity::update_many()
                    .col_expr(notes::Column::Title, Expr::value(data.title.clone()))
                    .col_expr(notes::Column::Content, Expr::value(data.content.clone()))
                    .filter(notes::Column::Id.eq(id.to_string()))
                    .exec(&self.db),
            )
            .await?;
        debug!(id = %id, rows = result.rows_affected, "replaced note");

        // Postgres counts matched rows, so an unchanged replace still reports 1.
        Ok((result.rows_affected > 0).then(|| Note::new(*id, data)))
    }

    async fn delete(&self, id: &NoteId) -> Result<bool, StorageError> {
        let result = self
            .bounded(notes::Entity::delete_by_id(id.to_string()).exec(&self.db))
            .await?;
        debug!(id = %id, rows = result.rows_affected, "deleted note");

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use dotenvy::dotenv;

    async fn setup_test_db() -> Result<PostgresStorage> {
        dotenv().ok();
        let database_url = std::env::var("DATABASE_URL")?;
        let storage = PostgresStorage::connect(&database_url, Duration::from_secs(5)).await?;
        notes::Entity::delete_many().exec(&storage.db).await?;
        Ok(storage)
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
    async fn test_crud_operations() -> Result<()> {
        let storage = setup_test_db().await?;

        let created = storage.create(NoteData::new("Test Title", "Test Content")).await?;
        let found = storage.find_by_id(&created.id).await?;
        assert_eq!(found.as_ref(), Some(&created));

        let updated = storage
            .update(&created.id, NoteData::new("Updated", "Updated Content"))
            .await?
            .expect("note exists");
        assert_eq!(updated.id, created.id);
        assert_eq!(storage.find_by_id(&created.id).await?, Some(updated));

        assert!(storage.delete(&created.id).await?);
        assert!(storage.find_by_id(&created.id).await?.is_none());
        assert!(!storage.delete(&created.id).await?);

        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
    async fn test_multiple_documents() -> Result<()> {
        let storage = setup_test_db().await?;

        let first = storage.create(NoteData::new("First Doc", "First Content")).await?;
        let second = storage.create(NoteData::new("Second Doc", "Second Content")).await?;

        let all = storage.find_all().await?;
        assert_eq!(all, vec![first, second]);

        let absent = NoteId::parse("000000000000000000000000")?;
        assert!(storage.update(&absent, NoteData::new("T", "C")).await?.is_none());

        Ok(())
    }
}
