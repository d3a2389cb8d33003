use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entities::{comment, task},
    models::{attachment::Attachment, ids, notification::Notification},
    types::{AttachmentCategory, Priority, TaskStatus},
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found")]
    NotFound,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Assignee user not found")]
    AssigneeNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTask {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
}

/// Full-replace update: every mutable field is overwritten from the payload.
/// Concurrent updates are last-write-wins by design.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTask {
    pub title: String,
    pub description: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub priority: Priority,
}

impl Task {
    async fn from_model<C: ConnectionTrait>(db: &C, model: task::Model) -> Result<Self, DbErr> {
        let project_uuid = ids::project_uuid_by_id(db, model.project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
        let assignee_id = match model.assignee_id {
            Some(id) => ids::user_uuid_by_id(db, id)
                .await?
                .ok_or(DbErr::RecordNotFound("User not found".to_string()))
                .map(Some)?,
            None => None,
        };

        Ok(Self {
            id: model.uuid,
            project_id: project_uuid,
            title: model.title,
            description: model.description,
            assignee_id,
            deadline: model.deadline.map(Into::into),
            status: model.status,
            priority: model.priority,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    async fn resolve_assignee<C: ConnectionTrait>(
        db: &C,
        assignee_id: Option<Uuid>,
    ) -> Result<Option<i64>, TaskError> {
        match assignee_id {
            Some(id) => ids::user_id_by_uuid(db, id)
                .await?
                .ok_or(TaskError::AssigneeNotFound)
                .map(Some),
            None => Ok(None),
        }
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let records = task::Entity::find()
            .order_by_desc(task::Column::CreatedAt)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(records.len());
        for model in records {
            tasks.push(Self::from_model(db, model).await?);
        }
        Ok(tasks)
    }

    /// Filters in SQL, not over a full fetch.
    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, TaskError> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(TaskError::ProjectNotFound)?;

        let records = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project_row_id))
            .order_by_desc(task::Column::CreatedAt)
            .all(db)
            .await?;

        let mut tasks = Vec::with_capacity(records.len());
        for model in records {
            tasks.push(Self::from_model(db, model).await?);
        }
        Ok(tasks)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Insert plus the assignment notification run in one transaction.
    pub async fn create<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        data: &CreateTask,
        task_id: Uuid,
    ) -> Result<Self, TaskError> {
        let txn = db.begin().await?;

        let project_row_id = ids::project_id_by_uuid(&txn, data.project_id)
            .await?
            .ok_or(TaskError::ProjectNotFound)?;
        let assignee_row_id = Self::resolve_assignee(&txn, data.assignee_id).await?;

        let now = Utc::now();
        let active = task::ActiveModel {
            uuid: Set(task_id),
            project_id: Set(project_row_id),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            assignee_id: Set(assignee_row_id),
            deadline: Set(data.deadline.map(Into::into)),
            status: Set(data.status.clone().unwrap_or_default()),
            priority: Set(data.priority.clone().unwrap_or_default()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(&txn).await?;

        if let Some(user_row_id) = assignee_row_id {
            Notification::enqueue(
                &txn,
                user_row_id,
                "Task assigned",
                format!("You were assigned to '{}'", data.title),
            )
            .await?;
        }

        let created = Self::from_model(&txn, model).await?;
        txn.commit().await?;
        Ok(created)
    }

    pub async fn update<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateTask,
    ) -> Result<Self, TaskError> {
        let txn = db.begin().await?;

        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(&txn)
            .await?
            .ok_or(TaskError::NotFound)?;

        let assignee_row_id = Self::resolve_assignee(&txn, payload.assignee_id).await?;
        let assignee_changed =
            assignee_row_id.is_some() && assignee_row_id != record.assignee_id;

        let mut active: task::ActiveModel = record.into();
        active.title = Set(payload.title.clone());
        active.description = Set(payload.description.clone());
        active.assignee_id = Set(assignee_row_id);
        active.deadline = Set(payload.deadline.map(Into::into));
        active.status = Set(payload.status.clone());
        active.priority = Set(payload.priority.clone());
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(&txn).await?;

        if assignee_changed
            && let Some(user_row_id) = assignee_row_id
        {
            Notification::enqueue(
                &txn,
                user_row_id,
                "Task assigned",
                format!("You were assigned to '{}'", payload.title),
            )
            .await?;
        }

        let task = Self::from_model(&txn, updated).await?;
        txn.commit().await?;
        Ok(task)
    }

    /// Removes the task, its comments (FK cascade) and the attachment rows
    /// hanging off either, handing back the storage keys of the deleted
    /// attachments.
    pub async fn delete<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Vec<String>, TaskError> {
        let txn = db.begin().await?;

        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(&txn)
            .await?
            .ok_or(TaskError::NotFound)?;

        let comment_row_ids: Vec<i64> = comment::Entity::find()
            .select_only()
            .column(comment::Column::Id)
            .filter(comment::Column::TaskId.eq(record.id))
            .into_tuple()
            .all(&txn)
            .await?;

        let mut keys =
            Attachment::delete_for_parents(&txn, AttachmentCategory::Task, &[record.id]).await?;
        keys.extend(
            Attachment::delete_for_parents(&txn, AttachmentCategory::Comment, &comment_row_ids)
                .await?,
        );

        task::Entity::delete_by_id(record.id).exec(&txn).await?;
        txn.commit().await?;
        Ok(keys)
    }
}
