use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Schema, Statement};
use url::Url;

use crate::entities::{goal, task};
use crate::error::AppError;

pub fn resolve_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("steady.db")
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn open_lock(path: &Path) -> Result<fd_lock::RwLock<File>, AppError> {
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path)?;
    Ok(fd_lock::RwLock::new(file))
}

pub async fn connect(path: &Path) -> Result<DatabaseConnection, AppError> {
    let mut url = Url::from_file_path(path)
        .map_err(|_| AppError::InvalidInput(format!("invalid sqlite path: {}", path.display())))?;
    url.set_query(Some("mode=rwc"));
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    Ok(Database::connect(&sqlite_url).await?)
}

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), AppError> {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await?;

    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut goal_stmt = schema.create_table_from_entity(goal::Entity);
    goal_stmt.if_not_exists();
    db.execute(builder.build(&goal_stmt)).await?;

    let mut task_stmt = schema.create_table_from_entity(task::Entity);
    task_stmt.if_not_exists();
    db.execute(builder.build(&task_stmt)).await?;

    let mut ladder_index = Index::create()
        .name("idx_tasks_goal_position")
        .table(task::Entity)
        .col(task::Column::GoalId)
        .col(task::Column::LadderPosition)
        .to_owned();
    ladder_index.if_not_exists();
    db.execute(builder.build(&ladder_index)).await?;

    let mut status_index = Index::create()
        .name("idx_goals_status_end")
        .table(goal::Entity)
        .col(goal::Column::Status)
        .col(goal::Column::EndDate)
        .to_owned();
    status_index.if_not_exists();
    db.execute(builder.build(&status_index)).await?;

    Ok(())
}
