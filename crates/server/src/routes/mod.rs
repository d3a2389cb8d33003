pub mod comments;
pub mod files;
pub mod health;
pub mod notifications;
pub mod projects;
pub mod tasks;
pub mod users;
