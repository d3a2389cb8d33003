use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entities::project_member,
    models::{ids, notification::Notification},
    types::ProjectRole,
};

#[derive(Debug, Error)]
pub enum ProjectMemberError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Project not found")]
    ProjectNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("User is already a member of this project")]
    AlreadyMember,
    #[error("Membership not found")]
    NotFound,
}

/// One row of the User×Project join. The contributor list of a project is
/// always derived from these rows at read time, never stored on the project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectMember {
    pub user_id: Uuid,
    pub role: Option<ProjectRole>,
}

impl ProjectMember {
    async fn from_model<C: ConnectionTrait>(
        db: &C,
        model: project_member::Model,
    ) -> Result<Self, DbErr> {
        let project_uuid = ids::project_uuid_by_id(db, model.project_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Project not found".to_string()))?;
        let user_uuid = ids::user_uuid_by_id(db, model.user_id)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        Ok(Self {
            id: model.uuid,
            project_id: project_uuid,
            user_id: user_uuid,
            role: model.role,
            created_at: model.created_at.into(),
        })
    }

    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, ProjectMemberError> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(ProjectMemberError::ProjectNotFound)?;

        let records = project_member::Entity::find()
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .order_by_asc(project_member::Column::CreatedAt)
            .all(db)
            .await?;

        let mut members = Vec::with_capacity(records.len());
        for model in records {
            members.push(Self::from_model(db, model).await?);
        }
        Ok(members)
    }

    /// Insert plus the "added to project" notification run in one
    /// transaction. Every explicit add notifies the user, whatever the role.
    pub async fn add<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        project_id: Uuid,
        data: &CreateProjectMember,
    ) -> Result<Self, ProjectMemberError> {
        let txn = db.begin().await?;

        let project_row_id = ids::project_id_by_uuid(&txn, project_id)
            .await?
            .ok_or(ProjectMemberError::ProjectNotFound)?;
        let user_row_id = ids::user_id_by_uuid(&txn, data.user_id)
            .await?
            .ok_or(ProjectMemberError::UserNotFound)?;

        let existing = project_member::Entity::find()
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .filter(project_member::Column::UserId.eq(user_row_id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(ProjectMemberError::AlreadyMember);
        }

        let role = data.role.unwrap_or(ProjectRole::Contributor);
        let active = project_member::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            project_id: Set(project_row_id),
            user_id: Set(user_row_id),
            role: Set(role),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        Notification::enqueue(
            &txn,
            user_row_id,
            "Added to project",
            format!("You were added to a project as {role}"),
        )
        .await?;

        let member = Self::from_model(&txn, model).await?;
        txn.commit().await?;
        Ok(member)
    }

    pub async fn remove<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<(), ProjectMemberError> {
        let project_row_id = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(ProjectMemberError::ProjectNotFound)?;
        let user_row_id = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(ProjectMemberError::UserNotFound)?;

        let result = project_member::Entity::delete_many()
            .filter(project_member::Column::ProjectId.eq(project_row_id))
            .filter(project_member::Column::UserId.eq(user_row_id))
            .exec(db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ProjectMemberError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::models::{
        notification::Notification,
        project::{CreateProject, Project},
        user::{CreateUser, User},
    };

    use super::*;

    async fn setup() -> (sea_orm::DatabaseConnection, Uuid, Uuid) {
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

        (db, project_id, manager_id)
    }

    async fn add_user(db: &sea_orm::DatabaseConnection, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        User::create(
            db,
            &CreateUser {
                id: None,
                username: name.to_string(),
                email: format!("{name}@example.com"),
                password: "pw".to_string(),
                display_name: None,
                role: None,
            },
            id,
        )
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn adding_contributor_notifies_them() {
        let (db, project_id, _) = setup().await;
        let user_id = add_user(&db, "eve").await;

        ProjectMember::add(
            &db,
            project_id,
            &CreateProjectMember {
                user_id,
                role: None,
            },
        )
        .await
        .unwrap();

        let members = ProjectMember::find_by_project_id(&db, project_id)
            .await
            .unwrap();
        assert_eq!(members.len(), 2);

        let notifications = Notification::find_by_user_id(&db, user_id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Added to project");
    }

    #[tokio::test]
    async fn adding_a_manager_notifies_them_too() {
        let (db, project_id, _) = setup().await;
        let user_id = add_user(&db, "mira").await;

        ProjectMember::add(
            &db,
            project_id,
            &CreateProjectMember {
                user_id,
                role: Some(ProjectRole::Manager),
            },
        )
        .await
        .unwrap();

        let notifications = Notification::find_by_user_id(&db, user_id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Added to project");
    }

    #[tokio::test]
    async fn duplicate_membership_is_rejected() {
        let (db, project_id, _) = setup().await;
        let user_id = add_user(&db, "eve").await;
        let data = CreateProjectMember {
            user_id,
            role: None,
        };

        ProjectMember::add(&db, project_id, &data).await.unwrap();
        let err = ProjectMember::add(&db, project_id, &data).await.unwrap_err();
        assert!(matches!(err, ProjectMemberError::AlreadyMember));
    }

    #[tokio::test]
    async fn remove_membership() {
        let (db, project_id, _) = setup().await;
        let user_id = add_user(&db, "eve").await;
        ProjectMember::add(
            &db,
            project_id,
            &CreateProjectMember {
                user_id,
                role: None,
            },
        )
        .await
        .unwrap();

        ProjectMember::remove(&db, project_id, user_id).await.unwrap();
        let err = ProjectMember::remove(&db, project_id, user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectMemberError::NotFound));
    }
}
