use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{entities::attachment, models::ids, types::AttachmentCategory};

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Attachment not found")]
    NotFound,
    #[error("Attachment parent not found")]
    ParentNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub category: AttachmentCategory,
    pub parent_id: Uuid,
    pub original_name: String,
    pub storage_key: String,
    pub url: String,
    pub size_bytes: i64,
    pub mime_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub category: AttachmentCategory,
    pub parent_id: Uuid,
    pub original_name: String,
    pub storage_key: String,
    pub url: String,
    pub size_bytes: i64,
    pub mime_type: Option<String>,
}

async fn parent_row_id<C: ConnectionTrait>(
    db: &C,
    category: AttachmentCategory,
    parent_id: Uuid,
) -> Result<Option<i64>, DbErr> {
    match category {
        AttachmentCategory::Project => ids::project_id_by_uuid(db, parent_id).await,
        AttachmentCategory::Task => ids::task_id_by_uuid(db, parent_id).await,
        AttachmentCategory::Comment => ids::comment_id_by_uuid(db, parent_id).await,
    }
}

async fn parent_uuid<C: ConnectionTrait>(
    db: &C,
    category: AttachmentCategory,
    parent_row_id: i64,
) -> Result<Option<Uuid>, DbErr> {
    match category {
        AttachmentCategory::Project => ids::project_uuid_by_id(db, parent_row_id).await,
        AttachmentCategory::Task => ids::task_uuid_by_id(db, parent_row_id).await,
        AttachmentCategory::Comment => ids::comment_uuid_by_id(db, parent_row_id).await,
    }
}

impl Attachment {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: attachment::Model,
    ) -> Result<Self, DbErr> {
        let parent = parent_uuid(db, model.category, model.parent_id)
            .await?
            .ok_or(DbErr::RecordNotFound(
                "Attachment parent not found".to_string(),
            ))?;

        Ok(Self {
            id: model.uuid,
            category: model.category,
            parent_id: parent,
            original_name: model.original_name,
            storage_key: model.storage_key,
            url: model.url,
            size_bytes: model.size_bytes,
            mime_type: model.mime_type,
            created_at: model.created_at.into(),
        })
    }

    pub async fn find_by_parent<C: ConnectionTrait>(
        db: &C,
        category: AttachmentCategory,
        parent_id: Uuid,
    ) -> Result<Vec<Self>, AttachmentError> {
        let parent_row = parent_row_id(db, category, parent_id)
            .await?
            .ok_or(AttachmentError::ParentNotFound)?;

        let records = attachment::Entity::find()
            .filter(attachment::Column::Category.eq(category))
            .filter(attachment::Column::ParentId.eq(parent_row))
            .order_by_asc(attachment::Column::CreatedAt)
            .all(db)
            .await?;

        let mut attachments = Vec::with_capacity(records.len());
        for model in records {
            attachments.push(Self::from_model(db, model).await?);
        }
        Ok(attachments)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = attachment::Entity::find()
            .filter(attachment::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateAttachment,
        attachment_id: Uuid,
    ) -> Result<Self, AttachmentError> {
        let parent_row = parent_row_id(db, data.category, data.parent_id)
            .await?
            .ok_or(AttachmentError::ParentNotFound)?;

        let active = attachment::ActiveModel {
            uuid: Set(attachment_id),
            category: Set(data.category),
            parent_id: Set(parent_row),
            original_name: Set(data.original_name.clone()),
            storage_key: Set(data.storage_key.clone()),
            url: Set(data.url.clone()),
            size_bytes: Set(data.size_bytes),
            mime_type: Set(data.mime_type.clone()),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Self::from_model(db, model).await.map_err(Into::into)
    }

    /// Removes every attachment row under the given parent rows, handing
    /// back the storage keys. Called from the parents' delete paths, which
    /// is the only cleanup attachments get: the table carries no FK.
    pub(crate) async fn delete_for_parents<C: ConnectionTrait>(
        db: &C,
        category: AttachmentCategory,
        parent_row_ids: &[i64],
    ) -> Result<Vec<String>, DbErr> {
        if parent_row_ids.is_empty() {
            return Ok(Vec::new());
        }

        let records = attachment::Entity::find()
            .filter(attachment::Column::Category.eq(category))
            .filter(attachment::Column::ParentId.is_in(parent_row_ids.iter().copied()))
            .all(db)
            .await?;
        let keys = records.into_iter().map(|r| r.storage_key).collect();

        attachment::Entity::delete_many()
            .filter(attachment::Column::Category.eq(category))
            .filter(attachment::Column::ParentId.is_in(parent_row_ids.iter().copied()))
            .exec(db)
            .await?;
        Ok(keys)
    }

    /// Removes the row and hands back the storage key so the caller can
    /// delete the stored object as well.
    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<String, AttachmentError> {
        let record = attachment::Entity::find()
            .filter(attachment::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(AttachmentError::NotFound)?;

        let storage_key = record.storage_key.clone();
        attachment::Entity::delete_by_id(record.id).exec(db).await?;
        Ok(storage_key)
    }
}
