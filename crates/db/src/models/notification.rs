use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{entities::notification, models::ids};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Notification not found")]
    NotFound,
    #[error("User not found")]
    UserNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: notification::Model,
    ) -> Result<Self, DbErr> {
        let user_uuid = ids::user_uuid_by_id(db, model.user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            user_id: user_uuid,
            title: model.title,
            message: model.message,
            is_read: model.is_read,
            created_at: model.created_at.into(),
        })
    }

    /// Inserts a notification row for a user, keyed by row id. Called from
    /// other models' write paths inside their transaction.
    pub(crate) async fn enqueue<C: ConnectionTrait>(
        db: &C,
        user_row_id: i64,
        title: &str,
        message: String,
    ) -> Result<(), DbErr> {
        let active = notification::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            user_id: Set(user_row_id),
            title: Set(title.to_string()),
            message: Set(message),
            is_read: Set(false),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        active.insert(db).await?;
        Ok(())
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let records = notification::Entity::find()
            .order_by_desc(notification::Column::CreatedAt)
            .all(db)
            .await?;
        let mut notifications = Vec::with_capacity(records.len());
        for model in records {
            notifications.push(Self::from_model(db, model).await?);
        }
        Ok(notifications)
    }

    pub async fn find_by_user_id<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<Self>, NotificationError> {
        let user_row_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(NotificationError::UserNotFound)?;

        let records = notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_row_id))
            .order_by_desc(notification::Column::CreatedAt)
            .all(db)
            .await?;

        let mut notifications = Vec::with_capacity(records.len());
        for model in records {
            notifications.push(Self::from_model(db, model).await?);
        }
        Ok(notifications)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = notification::Entity::find()
            .filter(notification::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Marking an already-read notification read is a no-op, not an error.
    pub async fn mark_read<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Self, NotificationError> {
        let record = notification::Entity::find()
            .filter(notification::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(NotificationError::NotFound)?;

        if record.is_read {
            return Ok(Self::from_model(db, record).await?);
        }

        let mut active: notification::ActiveModel = record.into();
        active.is_read = Set(true);
        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<u64, DbErr> {
        let result = notification::Entity::delete_many()
            .filter(notification::Column::Uuid.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::user::{CreateUser, User};

    use super::*;

    async fn setup() -> (sea_orm::DatabaseConnection, Uuid, i64) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();

        let user_id = Uuid::new_v4();
        User::create(
            &db,
            &CreateUser {
                id: None,
                username: "dave".to_string(),
                email: "dave@example.com".to_string(),
                password: "pw".to_string(),
                display_name: None,
                role: None,
            },
            user_id,
        )
        .await
        .unwrap();
        let row_id = ids::user_id_by_uuid(&db, user_id).await.unwrap().unwrap();
        (db, user_id, row_id)
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let (db, user_id, row_id) = setup().await;
        Notification::enqueue(&db, row_id, "Task assigned", "You got one".to_string())
            .await
            .unwrap();

        let list = Notification::find_by_user_id(&db, user_id).await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(!list[0].is_read);

        let once = Notification::mark_read(&db, list[0].id).await.unwrap();
        assert!(once.is_read);
        let twice = Notification::mark_read(&db, list[0].id).await.unwrap();
        assert!(twice.is_read);
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let (db, user_id, row_id) = setup().await;
        Notification::enqueue(&db, row_id, "t", "m".to_string())
            .await
            .unwrap();
        let list = Notification::find_by_user_id(&db, user_id).await.unwrap();
        assert_eq!(Notification::delete(&db, list[0].id).await.unwrap(), 1);
        assert!(Notification::find_by_user_id(&db, user_id)
            .await
            .unwrap()
            .is_empty());
    }
}
