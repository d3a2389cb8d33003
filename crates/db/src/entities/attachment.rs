use sea_orm::entity::prelude::*;

use crate::types::AttachmentCategory;

/// `parent_id` is the row id in the table selected by `category`. No FK:
/// cleanup happens in the model layer when the parent goes away.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "attachments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uuid: Uuid,
    pub category: AttachmentCategory,
    pub parent_id: i64,
    pub original_name: String,
    pub storage_key: String,
    pub url: String,
    pub size_bytes: i64,
    pub mime_type: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
