use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entities::{comment, task},
    models::{attachment::Attachment, ids, notification::Notification},
    types::AttachmentCategory,
};

#[derive(Debug, Error)]
pub enum CommentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Comment not found")]
    NotFound,
    #[error("Task not found")]
    TaskNotFound,
    #[error("Author user not found")]
    AuthorNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateComment {
    pub body: String,
}

impl Comment {
    async fn from_model<C: ConnectionTrait>(db: &C, model: comment::Model) -> Result<Self, DbErr> {
        let task_uuid = ids::task_uuid_by_id(db, model.task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let user_uuid = ids::user_uuid_by_id(db, model.user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        Ok(Self {
            id: model.uuid,
            task_id: task_uuid,
            user_id: user_uuid,
            body: model.body,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    pub async fn find_by_task_id<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<Self>, CommentError> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(CommentError::TaskNotFound)?;

        let records = comment::Entity::find()
            .filter(comment::Column::TaskId.eq(task_row_id))
            .order_by_asc(comment::Column::CreatedAt)
            .all(db)
            .await?;

        let mut comments = Vec::with_capacity(records.len());
        for model in records {
            comments.push(Self::from_model(db, model).await?);
        }
        Ok(comments)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = comment::Entity::find()
            .filter(comment::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Insert plus the assignee notification run in one transaction.
    pub async fn create<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        data: &CreateComment,
        comment_id: Uuid,
    ) -> Result<Self, CommentError> {
        let txn = db.begin().await?;

        let task_row_id = ids::task_id_by_uuid(&txn, data.task_id)
            .await?
            .ok_or(CommentError::TaskNotFound)?;
        let user_row_id = ids::user_id_by_uuid(&txn, data.user_id)
            .await?
            .ok_or(CommentError::AuthorNotFound)?;

        let now = Utc::now();
        let active = comment::ActiveModel {
            uuid: Set(comment_id),
            task_id: Set(task_row_id),
            user_id: Set(user_row_id),
            body: Set(data.body.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(&txn).await?;

        // The task's assignee hears about new comments, unless they wrote it.
        let task_row = task::Entity::find_by_id(task_row_id).one(&txn).await?;
        if let Some(task_row) = task_row
            && let Some(assignee_row_id) = task_row.assignee_id
            && assignee_row_id != user_row_id
        {
            Notification::enqueue(
                &txn,
                assignee_row_id,
                "New comment",
                format!("New comment on '{}'", task_row.title),
            )
            .await?;
        }

        let comment = Self::from_model(&txn, model).await?;
        txn.commit().await?;
        Ok(comment)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateComment,
    ) -> Result<Self, CommentError> {
        let record = comment::Entity::find()
            .filter(comment::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(CommentError::NotFound)?;

        let mut active: comment::ActiveModel = record.into();
        active.body = Set(payload.body.clone());
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await.map_err(Into::into)
    }

    /// Removes the comment and its attachment rows, handing back the
    /// storage keys of the deleted attachments.
    pub async fn delete<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Vec<String>, CommentError> {
        let txn = db.begin().await?;

        let record = comment::Entity::find()
            .filter(comment::Column::Uuid.eq(id))
            .one(&txn)
            .await?
            .ok_or(CommentError::NotFound)?;

        let keys =
            Attachment::delete_for_parents(&txn, AttachmentCategory::Comment, &[record.id])
                .await?;

        comment::Entity::delete_by_id(record.id).exec(&txn).await?;
        txn.commit().await?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::{
        notification::Notification,
        project::{CreateProject, Project},
        task::{CreateTask, Task},
        user::{CreateUser, User},
    };

    use super::*;

    async fn setup() -> (sea_orm::DatabaseConnection, Uuid, Uuid, Uuid) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();

        let manager_id = Uuid::new_v4();
        User::create(
            &db,
            &CreateUser {
                id: None,
                username: "manager".to_string(),
                email: "m@example.com".to_string(),
                password: "pw".to_string(),
                display_name: None,
                role: None,
            },
            manager_id,
        )
        .await
        .unwrap();

        let assignee_id = Uuid::new_v4();
        User::create(
            &db,
            &CreateUser {
                id: None,
                username: "assignee".to_string(),
                email: "a@example.com".to_string(),
                password: "pw".to_string(),
                display_name: None,
                role: None,
            },
            assignee_id,
        )
        .await
        .unwrap();

        let project_id = Uuid::new_v4();
        Project::create(
            &db,
            &CreateProject {
                id: None,
                name: "Apollo".to_string(),
                description: None,
                status: None,
                priority: None,
                manager_id,
                due_date: None,
                members: Vec::new(),
            },
            project_id,
        )
        .await
        .unwrap();

        let task_id = Uuid::new_v4();
        Task::create(
            &db,
            &CreateTask {
                id: None,
                project_id,
                title: "Review design".to_string(),
                description: None,
                assignee_id: Some(assignee_id),
                deadline: None,
                status: None,
                priority: None,
            },
            task_id,
        )
        .await
        .unwrap();

        (db, task_id, manager_id, assignee_id)
    }

    #[tokio::test]
    async fn comment_by_other_user_notifies_assignee() {
        let (db, task_id, manager_id, assignee_id) = setup().await;
        // one notification already exists from task assignment
        let before = Notification::find_by_user_id(&db, assignee_id)
            .await
            .unwrap()
            .len();

        Comment::create(
            &db,
            &CreateComment {
                task_id,
                user_id: manager_id,
                body: "Looks good".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let after = Notification::find_by_user_id(&db, assignee_id)
            .await
            .unwrap();
        assert_eq!(after.len(), before + 1);
    }

    #[tokio::test]
    async fn comment_by_assignee_does_not_self_notify() {
        let (db, task_id, _, assignee_id) = setup().await;
        let before = Notification::find_by_user_id(&db, assignee_id)
            .await
            .unwrap()
            .len();

        Comment::create(
            &db,
            &CreateComment {
                task_id,
                user_id: assignee_id,
                body: "Working on it".to_string(),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let after = Notification::find_by_user_id(&db, assignee_id)
            .await
            .unwrap();
        assert_eq!(after.len(), before);
    }

    #[tokio::test]
    async fn comments_listed_in_creation_order() {
        let (db, task_id, manager_id, _) = setup().await;
        for body in ["first", "second"] {
            Comment::create(
                &db,
                &CreateComment {
                    task_id,
                    user_id: manager_id,
                    body: body.to_string(),
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();
        }

        let comments = Comment::find_by_task_id(&db, task_id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].body, "first");
        assert_eq!(comments[1].body, "second");
    }

    #[tokio::test]
    async fn update_replaces_body() {
        let (db, task_id, manager_id, _) = setup().await;
        let comment_id = Uuid::new_v4();
        Comment::create(
            &db,
            &CreateComment {
                task_id,
                user_id: manager_id,
                body: "draft".to_string(),
            },
            comment_id,
        )
        .await
        .unwrap();

        let updated = Comment::update(
            &db,
            comment_id,
            &UpdateComment {
                body: "final".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.body, "final");
    }

    #[tokio::test]
    async fn comment_on_unknown_task_is_rejected() {
        let (db, _, manager_id, _) = setup().await;
        let result = Comment::create(
            &db,
            &CreateComment {
                task_id: Uuid::new_v4(),
                user_id: manager_id,
                body: "void".to_string(),
            },
            Uuid::new_v4(),
        )
        .await;
        assert!(matches!(result, Err(CommentError::TaskNotFound)));
    }
}
