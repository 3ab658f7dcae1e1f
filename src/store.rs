use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info};

use crate::entities::{goal, task};
use crate::model::{
    title_len, GoalPatch, GoalStatus, NewGoal, NewTask, TaskStatus, GOAL_TITLE_MAX,
    TASK_TITLE_MAX,
};
use crate::repository::{GoalRepository, RepoError, TaskRepository};

pub struct SqliteStore {
    db: DatabaseConnection,
}

pub struct LadderDetail {
    pub goal: goal::Model,
    pub tasks: Vec<task::Model>,
}

impl LadderDetail {
    pub fn completed(&self) -> usize {
        self.tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Completed.as_str())
            .count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GoalStatusChange {
    pub goal_id: i64,
    pub from: String,
    pub to: String,
    pub reason: String,
}

impl SqliteStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn add_goal(&self, input: NewGoal) -> Result<goal::Model, RepoError> {
        ensure_title("goal title", &input.title, GOAL_TITLE_MAX)?;
        if !(input.target_value.is_finite() && input.target_value > 0.0) {
            return Err(RepoError::Invalid(
                "goal target must be greater than zero".to_string(),
            ));
        }
        if input.end_date <= input.start_date {
            return Err(RepoError::Invalid(
                "goal must end after it starts".to_string(),
            ));
        }
        let now = Utc::now();
        let active = goal::ActiveModel {
            title: Set(input.title.trim().to_string()),
            target_value: Set(input.target_value),
            unit: Set(input.unit.as_str().to_string()),
            custom_unit: Set(input.custom_unit),
            period: Set(input.period.as_str().to_string()),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            current_value: Set(0.0),
            status: Set(GoalStatus::Active.as_str().to_string()),
            is_ladder: Set(input.is_ladder),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let insert = goal::Entity::insert(active).exec(&self.db).await?;
        let created = goal::Entity::find_by_id(insert.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| RepoError::NotFound("goal after insert".to_string()))?;
        info!(goal_id = created.id, title = %created.title, "goal created");
        Ok(created)
    }

    pub async fn list_goals(&self) -> Result<Vec<goal::Model>, RepoError> {
        Ok(goal::Entity::find()
            .order_by_asc(goal::Column::EndDate)
            .order_by_asc(goal::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get_goal(&self, id: i64) -> Result<goal::Model, RepoError> {
        get_goal_with_conn(&self.db, id).await
    }

    pub async fn update_goal(&self, id: i64, patch: GoalPatch) -> Result<goal::Model, RepoError> {
        let mut active = goal::ActiveModel {
            id: Set(id),
            ..Default::default()
        };
        if let Some(is_ladder) = patch.is_ladder {
            active.is_ladder = Set(is_ladder);
        }
        if let Some(status) = patch.status {
            active.status = Set(status.as_str().to_string());
        }
        if let Some(value) = patch.current_value {
            active.current_value = Set(value);
        }
        active.updated_at = Set(Utc::now());

        match active.update(&self.db).await {
            Ok(model) => Ok(model),
            Err(sea_orm::DbErr::RecordNotFound(_)) | Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(RepoError::NotFound(format!("goal id {id}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn record_goal_value(
        &self,
        id: i64,
        value: f64,
    ) -> Result<(goal::Model, Option<GoalStatusChange>), RepoError> {
        if !(value.is_finite() && value >= 0.0) {
            return Err(RepoError::Invalid(
                "goal value cannot be negative".to_string(),
            ));
        }
        let goal = self.get_goal(id).await?;
        let reached = value >= goal.target_value && goal.status == GoalStatus::Active.as_str();
        let patch = GoalPatch {
            current_value: Some(value),
            status: reached.then_some(GoalStatus::Completed),
            ..Default::default()
        };
        let updated = self.update_goal(id, patch).await?;
        let change = reached.then(|| GoalStatusChange {
            goal_id: id,
            from: goal.status.clone(),
            to: GoalStatus::Completed.as_str().to_string(),
            reason: "target reached".to_string(),
        });
        Ok((updated, change))
    }

    pub async fn expire_goals(&self, today: NaiveDate) -> Result<Vec<GoalStatusChange>, RepoError> {
        let txn = self.db.begin().await?;
        let result: Result<Vec<GoalStatusChange>, RepoError> = async {
            let overdue = goal::Entity::find()
                .filter(goal::Column::Status.eq(GoalStatus::Active.as_str()))
                .filter(goal::Column::EndDate.lt(today))
                .order_by_asc(goal::Column::Id)
                .all(&txn)
                .await?;
            let now = Utc::now();
            let mut changes = Vec::with_capacity(overdue.len());
            for goal_model in overdue {
                let (to, reason) = if goal_model.current_value >= goal_model.target_value {
                    (GoalStatus::Completed, "target reached by period end")
                } else {
                    (GoalStatus::Failed, "period ended before target")
                };
                changes.push(GoalStatusChange {
                    goal_id: goal_model.id,
                    from: goal_model.status.clone(),
                    to: to.as_str().to_string(),
                    reason: reason.to_string(),
                });
                let mut active: goal::ActiveModel = goal_model.into();
                active.status = Set(to.as_str().to_string());
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
            Ok(changes)
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn add_task(&self, title: &str) -> Result<task::Model, RepoError> {
        ensure_title("task title", title, TASK_TITLE_MAX)?;
        insert_task(&self.db, title.trim(), TaskStatus::Pending, None, None).await
    }

    pub async fn list_tasks(&self, unlinked_only: bool) -> Result<Vec<task::Model>, RepoError> {
        let mut select = task::Entity::find();
        if unlinked_only {
            select = select.filter(task::Column::GoalId.is_null());
        }
        Ok(select.order_by_asc(task::Column::Id).all(&self.db).await?)
    }

    pub async fn get_task(&self, id: i64) -> Result<task::Model, RepoError> {
        task::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("task id {id}")))
    }

    pub async fn get_ladder(&self, goal_id: i64) -> Result<LadderDetail, RepoError> {
        let goal = self.get_goal(goal_id).await?;
        let tasks = ladder_tasks_with_conn(&self.db, goal_id).await?;
        Ok(LadderDetail { goal, tasks })
    }

    pub async fn set_task_status(
        &self,
        id: i64,
        status: TaskStatus,
    ) -> Result<(task::Model, Option<GoalStatusChange>), RepoError> {
        let txn = self.db.begin().await?;
        let result: Result<(task::Model, Option<GoalStatusChange>), RepoError> = async {
            let existing = task::Entity::find_by_id(id)
                .one(&txn)
                .await?
                .ok_or_else(|| RepoError::NotFound(format!("task id {id}")))?;
            let goal_id = existing.goal_id;
            let reopened = TaskStatus::parse(&existing.status) == Some(TaskStatus::Completed)
                && status != TaskStatus::Completed;
            let mut active: task::ActiveModel = existing.into();
            active.status = Set(status.as_str().to_string());
            active.updated_at = Set(Utc::now());
            let model = active.update(&txn).await?;
            let change = match goal_id {
                Some(goal_id) => refresh_goal_status_with_conn(&txn, goal_id, reopened).await?,
                None => None,
            };
            Ok((model, change))
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn create_task_for_goal(
        &self,
        goal_id: i64,
        input: NewTask,
    ) -> Result<task::Model, RepoError> {
        ensure_title("task title", &input.title, TASK_TITLE_MAX)?;
        let txn = self.db.begin().await?;
        let result: Result<task::Model, RepoError> = async {
            get_goal_with_conn(&txn, goal_id).await?;
            let model = insert_task(
                &txn,
                input.title.trim(),
                input.status,
                Some(goal_id),
                Some(input.position),
            )
            .await?;
            refresh_goal_status_with_conn(&txn, goal_id, false).await?;
            Ok(model)
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn link_task(
        &self,
        task_id: i64,
        goal_id: i64,
        position: i32,
    ) -> Result<task::Model, RepoError> {
        let txn = self.db.begin().await?;
        let result: Result<task::Model, RepoError> = async {
            get_goal_with_conn(&txn, goal_id).await?;
            let existing = task::Entity::find_by_id(task_id)
                .one(&txn)
                .await?
                .ok_or_else(|| RepoError::NotFound(format!("task id {task_id}")))?;
            if let Some(current) = existing.goal_id {
                if current != goal_id {
                    return Err(RepoError::Invalid(format!(
                        "task id {task_id} already belongs to goal id {current}"
                    )));
                }
            }
            let mut active: task::ActiveModel = existing.into();
            active.goal_id = Set(Some(goal_id));
            active.ladder_position = Set(Some(position));
            active.updated_at = Set(Utc::now());
            let model = active.update(&txn).await?;
            refresh_goal_status_with_conn(&txn, goal_id, false).await?;
            debug!(task_id, goal_id, position, "task linked");
            Ok(model)
        }
        .await;

        finalize_transaction(txn, result).await
    }
}

#[async_trait]
impl GoalRepository for SqliteStore {
    async fn create(&self, goal: NewGoal) -> Result<goal::Model, RepoError> {
        self.add_goal(goal).await
    }

    async fn update(&self, id: i64, patch: GoalPatch) -> Result<(), RepoError> {
        self.update_goal(id, patch).await.map(|_| ())
    }

    async fn list(&self) -> Result<Vec<goal::Model>, RepoError> {
        self.list_goals().await
    }
}

#[async_trait]
impl TaskRepository for SqliteStore {
    async fn list(&self) -> Result<Vec<task::Model>, RepoError> {
        self.list_tasks(false).await
    }

    async fn create_for_goal(&self, goal_id: i64, task: NewTask) -> Result<task::Model, RepoError> {
        self.create_task_for_goal(goal_id, task).await
    }

    async fn last_ladder_position(&self, goal_id: i64) -> Result<i32, RepoError> {
        let last = task::Entity::find()
            .filter(task::Column::GoalId.eq(goal_id))
            .filter(task::Column::LadderPosition.is_not_null())
            .order_by_desc(task::Column::LadderPosition)
            .one(&self.db)
            .await?;
        Ok(last.and_then(|task| task.ladder_position).unwrap_or(0))
    }

    async fn link_to_goal(
        &self,
        task_id: i64,
        goal_id: i64,
        position: i32,
    ) -> Result<(), RepoError> {
        self.link_task(task_id, goal_id, position).await.map(|_| ())
    }
}

async fn get_goal_with_conn<C: ConnectionTrait>(db: &C, id: i64) -> Result<goal::Model, RepoError> {
    goal::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("goal id {id}")))
}

async fn ladder_tasks_with_conn<C: ConnectionTrait>(
    db: &C,
    goal_id: i64,
) -> Result<Vec<task::Model>, RepoError> {
    Ok(task::Entity::find()
        .filter(task::Column::GoalId.eq(goal_id))
        .order_by_asc(task::Column::LadderPosition)
        .order_by_asc(task::Column::Id)
        .all(db)
        .await?)
}

async fn insert_task<C: ConnectionTrait>(
    db: &C,
    title: &str,
    status: TaskStatus,
    goal_id: Option<i64>,
    position: Option<i32>,
) -> Result<task::Model, RepoError> {
    let now = Utc::now();
    let active = task::ActiveModel {
        title: Set(title.to_string()),
        status: Set(status.as_str().to_string()),
        goal_id: Set(goal_id),
        ladder_position: Set(position),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let insert = task::Entity::insert(active).exec(db).await?;
    task::Entity::find_by_id(insert.last_insert_id)
        .one(db)
        .await?
        .ok_or_else(|| RepoError::NotFound("task after insert".to_string()))
}

/// A ladder goal completes when every linked task is completed. It reopens
/// only when a completed task was reopened and the recorded value is still
/// short of the target. Failed goals are left alone.
async fn refresh_goal_status_with_conn<C: ConnectionTrait>(
    db: &C,
    goal_id: i64,
    task_reopened: bool,
) -> Result<Option<GoalStatusChange>, RepoError> {
    let goal_model = get_goal_with_conn(db, goal_id).await?;
    if !goal_model.is_ladder {
        return Ok(None);
    }
    let tasks = ladder_tasks_with_conn(db, goal_id).await?;
    if tasks.is_empty() {
        return Ok(None);
    }
    let all_done = tasks
        .iter()
        .all(|task| TaskStatus::parse(&task.status) == Some(TaskStatus::Completed));
    let target_reached = goal_model.current_value >= goal_model.target_value;
    let (to, reason) = match GoalStatus::parse(&goal_model.status) {
        Some(GoalStatus::Active) if all_done => {
            (GoalStatus::Completed, "all ladder tasks completed")
        }
        Some(GoalStatus::Completed) if task_reopened && !all_done && !target_reached => {
            (GoalStatus::Active, "ladder task reopened")
        }
        _ => return Ok(None),
    };

    let change = GoalStatusChange {
        goal_id,
        from: goal_model.status.clone(),
        to: to.as_str().to_string(),
        reason: reason.to_string(),
    };
    let mut active: goal::ActiveModel = goal_model.into();
    active.status = Set(to.as_str().to_string());
    active.updated_at = Set(Utc::now());
    active.update(db).await?;
    info!(
        goal_id,
        from = %change.from,
        to = %change.to,
        "goal status refreshed"
    );
    Ok(Some(change))
}

async fn finalize_transaction<T>(
    txn: DatabaseTransaction,
    result: Result<T, RepoError>,
) -> Result<T, RepoError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                return Err(rollback_err.into());
            }
            Err(err)
        }
    }
}

fn ensure_title(label: &str, value: &str, max: usize) -> Result<(), RepoError> {
    if value.trim().is_empty() {
        return Err(RepoError::Invalid(format!("{label} cannot be empty")));
    }
    if title_len(value) > max {
        return Err(RepoError::Invalid(format!(
            "{label} must be at most {max} characters"
        )));
    }
    Ok(())
}
