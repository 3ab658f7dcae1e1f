use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{GoalPatch, NewGoal, NewTask};
use crate::repository::{GoalRepository, RepoError, TaskRepository};
use crate::wizard::{LadderEntry, WizardError, WizardSelection, WizardStep};

#[derive(Clone, Debug, PartialEq)]
pub enum GoalSource {
    New(NewGoal),
    Existing(i64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskLink {
    pub task_id: i64,
    pub position: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LadderPlan {
    pub goal: GoalSource,
    pub drafts: Vec<NewTask>,
    pub links: Vec<TaskLink>,
    /// Added to every position. `None` appends after the goal's current ladder.
    pub position_base: Option<i32>,
}

impl LadderPlan {
    pub fn from_selection(selection: &WizardSelection) -> Result<Self, WizardError> {
        let goal = if selection.is_creating_new_goal() {
            GoalSource::New(selection.draft_goal().validate()?)
        } else {
            match selection.selected_goal() {
                Some(goal) => GoalSource::Existing(goal.id),
                None => {
                    return Err(WizardError::Validation(
                        "choose an existing goal or create a new one".to_string(),
                    ))
                }
            }
        };

        let mut drafts = Vec::new();
        let mut links = Vec::new();
        for entry in selection.ladder_sequence() {
            match entry {
                LadderEntry::Existing { task_id, position } => {
                    links.push(TaskLink { task_id, position })
                }
                LadderEntry::Draft {
                    title,
                    status,
                    position,
                } => drafts.push(NewTask {
                    title,
                    status,
                    position,
                }),
            }
        }

        Ok(Self {
            goal,
            drafts,
            links,
            position_base: None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssemblyStage {
    ResolveGoal,
    CreateTask { title: String },
    LinkTask { task_id: i64 },
}

impl fmt::Display for AssemblyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResolveGoal => write!(f, "resolving the goal"),
            Self::CreateTask { title } => write!(f, "creating task \"{title}\""),
            Self::LinkTask { task_id } => write!(f, "linking task {task_id}"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssemblyProgress {
    pub goal_id: Option<i64>,
    pub created_task_ids: Vec<i64>,
    pub linked_task_ids: Vec<i64>,
}

impl AssemblyProgress {
    pub fn summary(&self) -> String {
        match self.goal_id {
            None => "nothing was saved".to_string(),
            Some(goal_id) => format!(
                "goal {goal_id} saved, {} task(s) created, {} task(s) linked",
                self.created_task_ids.len(),
                self.linked_task_ids.len()
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error("{} failed ({}): {}", .stage, .progress.summary(), .source)]
    Partial {
        progress: AssemblyProgress,
        remaining: LadderPlan,
        stage: AssemblyStage,
        #[source]
        source: RepoError,
    },
}

pub struct LadderAssembler<'a, G: ?Sized, T: ?Sized> {
    goals: &'a G,
    tasks: &'a T,
}

impl<'a, G, T> LadderAssembler<'a, G, T>
where
    G: GoalRepository + ?Sized,
    T: TaskRepository + ?Sized,
{
    pub fn new(goals: &'a G, tasks: &'a T) -> Self {
        Self { goals, tasks }
    }

    pub async fn confirm(&self, selection: WizardSelection) -> Result<i64, AssemblyError> {
        if selection.step() != WizardStep::Review {
            return Err(WizardError::InvalidStep {
                step: selection.step(),
                action: "confirm",
            }
            .into());
        }
        let plan = LadderPlan::from_selection(&selection)?;
        self.execute(plan).await
    }

    pub async fn execute(&self, plan: LadderPlan) -> Result<i64, AssemblyError> {
        let mut progress = AssemblyProgress::default();

        let (goal_id, base) = match self.resolve_goal(&plan).await {
            Ok(resolved) => resolved,
            Err(source) => {
                warn!(error = %source, "ladder goal could not be resolved");
                return Err(AssemblyError::Partial {
                    progress,
                    remaining: plan,
                    stage: AssemblyStage::ResolveGoal,
                    source,
                });
            }
        };
        progress.goal_id = Some(goal_id);
        info!(goal_id, position_base = base, "ladder goal resolved");

        for (idx, draft) in plan.drafts.iter().enumerate() {
            let mut new_task = draft.clone();
            new_task.position += base;
            let position = new_task.position;
            match self.tasks.create_for_goal(goal_id, new_task).await {
                Ok(task) => {
                    debug!(goal_id, task_id = task.id, position, "ladder task created");
                    progress.created_task_ids.push(task.id);
                }
                Err(source) => {
                    warn!(
                        goal_id,
                        error = %source,
                        summary = %progress.summary(),
                        "ladder task creation failed"
                    );
                    return Err(AssemblyError::Partial {
                        stage: AssemblyStage::CreateTask {
                            title: draft.title.clone(),
                        },
                        remaining: LadderPlan {
                            goal: GoalSource::Existing(goal_id),
                            drafts: plan.drafts[idx..].to_vec(),
                            links: plan.links.clone(),
                            position_base: Some(base),
                        },
                        progress,
                        source,
                    });
                }
            }
        }

        for (idx, link) in plan.links.iter().enumerate() {
            let position = link.position + base;
            match self.tasks.link_to_goal(link.task_id, goal_id, position).await {
                Ok(()) => {
                    debug!(
                        goal_id,
                        task_id = link.task_id,
                        position,
                        "task linked to ladder"
                    );
                    progress.linked_task_ids.push(link.task_id);
                }
                Err(source) => {
                    warn!(
                        goal_id,
                        task_id = link.task_id,
                        error = %source,
                        summary = %progress.summary(),
                        "task link failed"
                    );
                    return Err(AssemblyError::Partial {
                        stage: AssemblyStage::LinkTask {
                            task_id: link.task_id,
                        },
                        remaining: LadderPlan {
                            goal: GoalSource::Existing(goal_id),
                            drafts: Vec::new(),
                            links: plan.links[idx..].to_vec(),
                            position_base: Some(base),
                        },
                        progress,
                        source,
                    });
                }
            }
        }

        info!(
            goal_id,
            created = progress.created_task_ids.len(),
            linked = progress.linked_task_ids.len(),
            "ladder assembled"
        );
        Ok(goal_id)
    }

    async fn resolve_goal(&self, plan: &LadderPlan) -> Result<(i64, i32), RepoError> {
        match &plan.goal {
            GoalSource::New(new_goal) => {
                let goal = self.goals.create(new_goal.clone()).await?;
                Ok((goal.id, plan.position_base.unwrap_or(0)))
            }
            GoalSource::Existing(goal_id) => {
                let base = match plan.position_base {
                    Some(base) => base,
                    None => self.tasks.last_ladder_position(*goal_id).await?,
                };
                self.goals.update(*goal_id, GoalPatch::ladder()).await?;
                Ok((*goal_id, base))
            }
        }
    }
}
