pub mod attachment;
pub mod comment;
pub mod ids;
pub mod notification;
pub mod project;
pub mod project_member;
pub mod task;
pub mod user;
