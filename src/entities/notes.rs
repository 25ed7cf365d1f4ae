use crate::error::StorageError;
use crate::models::{Note, NoteId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Char(Some(24))")]
    pub id: String,
    #[sea_orm(column_type = "Text")]
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Note {
    type Error = StorageError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let id = NoteId::parse(model.id.trim()).map_err(|err| {
            StorageError::Database(DbErr::Type(format!("notes.id: {err}")))
        })?;
        Ok(Note {
            id,
            title: model.title,
            content: model.content,
        })
    }
}
