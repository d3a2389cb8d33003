use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entities::{comment, project, project_member, task},
    models::{
        attachment::Attachment,
        ids,
        project_member::{CreateProjectMember, ProjectMember},
    },
    types::{AttachmentCategory, Priority, ProjectRole, ProjectStatus},
};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Project not found")]
    NotFound,
    #[error("Manager user not found")]
    ManagerNotFound,
    #[error("Failed to create project: {0}")]
    CreateFailed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub manager_id: Uuid,
    pub due_date: Option<DateTime<Utc>>,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub manager_id: Uuid,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub members: Vec<CreateProjectMember>,
}

/// Full-replace update over the mutable field set.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProject {
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub manager_id: Uuid,
    pub due_date: Option<DateTime<Utc>>,
}

impl Project {
    async fn from_model<C: ConnectionTrait>(db: &C, model: project::Model) -> Result<Self, DbErr> {
        let manager_uuid = ids::user_uuid_by_id(db, model.manager_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            name: model.name,
            description: model.description,
            status: model.status,
            priority: model.priority,
            manager_id: manager_uuid,
            due_date: model.due_date.map(Into::into),
            is_archived: model.is_archived,
            archived_at: model.archived_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    /// Default listings hide archived projects. Archived means hidden,
    /// not deleted.
    pub async fn find_all<C: ConnectionTrait>(
        db: &C,
        include_archived: bool,
    ) -> Result<Vec<Self>, DbErr> {
        let mut query = project::Entity::find().order_by_desc(project::Column::CreatedAt);
        if !include_archived {
            query = query.filter(project::Column::IsArchived.eq(false));
        }
        let records = query.all(db).await?;

        let mut projects = Vec::with_capacity(records.len());
        for model in records {
            projects.push(Self::from_model(db, model).await?);
        }
        Ok(projects)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Creates the project plus its membership rows in one transaction: the
    /// manager becomes a `manager` member, any supplied users become
    /// contributors. A failed member insert rolls the whole create back.
    pub async fn create<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        data: &CreateProject,
        project_id: Uuid,
    ) -> Result<Self, ProjectError> {
        let txn = db.begin().await?;

        let manager_row_id = ids::user_id_by_uuid(&txn, data.manager_id)
            .await?
            .ok_or(ProjectError::ManagerNotFound)?;

        let now = Utc::now();
        let active = project::ActiveModel {
            uuid: Set(project_id),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            status: Set(data.status.clone().unwrap_or_default()),
            priority: Set(data.priority.clone().unwrap_or_default()),
            manager_id: Set(manager_row_id),
            due_date: Set(data.due_date.map(Into::into)),
            is_archived: Set(false),
            archived_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(&txn).await?;

        // The manager's membership is implicit, so it gets no "added to
        // project" notification. Explicit member adds do.
        let manager_member = project_member::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            project_id: Set(model.id),
            user_id: Set(manager_row_id),
            role: Set(ProjectRole::Manager),
            created_at: Set(now.into()),
            ..Default::default()
        };
        manager_member.insert(&txn).await?;

        for member in &data.members {
            if member.user_id == data.manager_id {
                continue;
            }
            ProjectMember::add(&txn, project_id, member)
                .await
                .map_err(|err| ProjectError::CreateFailed(err.to_string()))?;
        }

        let project = Self::from_model(&txn, model).await?;
        txn.commit().await?;
        Ok(project)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateProject,
    ) -> Result<Self, ProjectError> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ProjectError::NotFound)?;

        let manager_row_id = ids::user_id_by_uuid(db, payload.manager_id)
            .await?
            .ok_or(ProjectError::ManagerNotFound)?;

        let mut active: project::ActiveModel = record.into();
        active.name = Set(payload.name.clone());
        active.description = Set(payload.description.clone());
        active.status = Set(payload.status.clone());
        active.priority = Set(payload.priority.clone());
        active.manager_id = Set(manager_row_id);
        active.due_date = Set(payload.due_date.map(Into::into));
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await.map_err(Into::into)
    }

    /// Archiving twice keeps the first archive timestamp.
    pub async fn set_archived<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        archived: bool,
    ) -> Result<Self, ProjectError> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ProjectError::NotFound)?;

        if record.is_archived == archived {
            return Self::from_model(db, record).await.map_err(Into::into);
        }

        let mut active: project::ActiveModel = record.into();
        active.is_archived = Set(archived);
        active.archived_at = Set(archived.then(|| Utc::now().into()));
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Self::from_model(db, updated).await.map_err(Into::into)
    }

    /// Removes the project and everything under it. Membership, task and
    /// comment rows go via FK cascade; attachment rows carry no FK, so they
    /// are collected and deleted here, and their storage keys handed back
    /// for the caller to delete the stored objects.
    pub async fn delete<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Vec<String>, ProjectError> {
        let txn = db.begin().await?;

        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(&txn)
            .await?
            .ok_or(ProjectError::NotFound)?;

        let task_row_ids: Vec<i64> = task::Entity::find()
            .select_only()
            .column(task::Column::Id)
            .filter(task::Column::ProjectId.eq(record.id))
            .into_tuple()
            .all(&txn)
            .await?;
        let comment_row_ids: Vec<i64> = comment::Entity::find()
            .select_only()
            .column(comment::Column::Id)
            .filter(comment::Column::TaskId.is_in(task_row_ids.iter().copied()))
            .into_tuple()
            .all(&txn)
            .await?;

        let mut keys =
            Attachment::delete_for_parents(&txn, AttachmentCategory::Project, &[record.id])
                .await?;
        keys.extend(
            Attachment::delete_for_parents(&txn, AttachmentCategory::Task, &task_row_ids).await?,
        );
        keys.extend(
            Attachment::delete_for_parents(&txn, AttachmentCategory::Comment, &comment_row_ids)
                .await?,
        );

        project::Entity::delete_by_id(record.id).exec(&txn).await?;
        txn.commit().await?;
        Ok(keys)
    }
}
