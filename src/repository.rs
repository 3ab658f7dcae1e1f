use async_trait::async_trait;
use thiserror::Error;

use crate::entities::{goal, task};
use crate::model::{GoalPatch, NewGoal, NewTask};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

#[async_trait]
pub trait GoalRepository: Send + Sync {
    async fn create(&self, goal: NewGoal) -> Result<goal::Model, RepoError>;

    async fn update(&self, id: i64, patch: GoalPatch) -> Result<(), RepoError>;

    async fn list(&self) -> Result<Vec<goal::Model>, RepoError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<task::Model>, RepoError>;

    async fn create_for_goal(&self, goal_id: i64, task: NewTask) -> Result<task::Model, RepoError>;

    /// Highest ladder position already used on `goal_id`, or 0 for none.
    async fn last_ladder_position(&self, goal_id: i64) -> Result<i32, RepoError>;

    /// Sets an existing task's `goal_id`. Does not create a task record.
    async fn link_to_goal(
        &self,
        task_id: i64,
        goal_id: i64,
        position: i32,
    ) -> Result<(), RepoError>;
}
