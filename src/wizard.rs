use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::entities::goal;
use crate::model::{
    title_len, GoalPeriod, GoalUnit, NewGoal, TaskStatus, GOAL_TITLE_MAX, LADDER_TASK_LIMIT,
    TASK_TITLE_MAX,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WizardStep {
    SelectGoal,
    AddTasks,
    Review,
}

impl WizardStep {
    pub fn number(&self) -> u8 {
        match self {
            Self::SelectGoal => 1,
            Self::AddTasks => 2,
            Self::Review => 3,
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            Self::SelectGoal => Some(Self::AddTasks),
            Self::AddTasks => Some(Self::Review),
            Self::Review => None,
        }
    }

    fn previous(self) -> Option<Self> {
        match self {
            Self::SelectGoal => None,
            Self::AddTasks => Some(Self::SelectGoal),
            Self::Review => Some(Self::AddTasks),
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SelectGoal => "select goal",
            Self::AddTasks => "add tasks",
            Self::Review => "review",
        };
        write!(f, "step {} ({name})", self.number())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("a ladder can hold at most {limit} tasks")]
    LimitExceeded { limit: usize },
    #[error("no draft task at index {index} ({len} drafted)")]
    Index { index: usize, len: usize },
    #[error("cannot {action} from {step}")]
    InvalidStep {
        step: WizardStep,
        action: &'static str,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DraftGoal {
    pub title: String,
    pub target_value: Option<f64>,
    pub unit: Option<GoalUnit>,
    pub custom_unit: Option<String>,
    pub period: Option<GoalPeriod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DraftGoal {
    pub fn validate(&self) -> Result<NewGoal, WizardError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(invalid("goal title cannot be empty"));
        }
        if title_len(title) > GOAL_TITLE_MAX {
            return Err(invalid(format!(
                "goal title must be at most {GOAL_TITLE_MAX} characters"
            )));
        }
        let target_value = match self.target_value {
            Some(value) if value.is_finite() && value > 0.0 => value,
            Some(_) => return Err(invalid("goal target must be greater than zero")),
            None => return Err(invalid("goal target is required")),
        };
        let unit = self.unit.ok_or_else(|| invalid("goal unit is required"))?;
        let custom_unit = match unit {
            GoalUnit::Custom => {
                let name = self
                    .custom_unit
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| invalid("custom unit needs a name"))?;
                Some(name.to_string())
            }
            _ if self.custom_unit.is_some() => {
                return Err(invalid("a unit name only applies to the custom unit"));
            }
            _ => None,
        };
        let period = self.period.ok_or_else(|| invalid("goal period is required"))?;
        let (start_date, end_date) = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if end > start => (start, end),
            (Some(_), Some(_)) => return Err(invalid("goal must end after it starts")),
            _ => return Err(invalid("goal dates have not been derived")),
        };

        Ok(NewGoal {
            title: title.to_string(),
            target_value,
            unit,
            custom_unit,
            period,
            start_date,
            end_date,
            is_ladder: true,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DraftTask {
    pub title: String,
    pub status: TaskStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LadderEntry {
    Existing { task_id: i64, position: i32 },
    Draft {
        title: String,
        status: TaskStatus,
        position: i32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct WizardSelection {
    step: WizardStep,
    selected_goal: Option<goal::Model>,
    is_creating_new_goal: bool,
    draft_goal: DraftGoal,
    selected_existing_task_ids: Vec<i64>,
    draft_tasks: Vec<DraftTask>,
}

impl WizardSelection {
    fn new() -> Self {
        Self {
            step: WizardStep::SelectGoal,
            selected_goal: None,
            is_creating_new_goal: false,
            draft_goal: DraftGoal::default(),
            selected_existing_task_ids: Vec::new(),
            draft_tasks: Vec::new(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn selected_goal(&self) -> Option<&goal::Model> {
        self.selected_goal.as_ref()
    }

    pub fn is_creating_new_goal(&self) -> bool {
        self.is_creating_new_goal
    }

    pub fn draft_goal(&self) -> &DraftGoal {
        &self.draft_goal
    }

    pub fn selected_existing_task_ids(&self) -> &[i64] {
        &self.selected_existing_task_ids
    }

    pub fn draft_tasks(&self) -> &[DraftTask] {
        &self.draft_tasks
    }

    pub fn task_count(&self) -> usize {
        self.selected_existing_task_ids.len() + self.draft_tasks.len()
    }

    pub fn ladder_sequence(&self) -> Vec<LadderEntry> {
        let mut sequence = Vec::with_capacity(self.task_count());
        for task_id in &self.selected_existing_task_ids {
            let position = (sequence.len() + 1) as i32;
            sequence.push(LadderEntry::Existing {
                task_id: *task_id,
                position,
            });
        }
        for draft in &self.draft_tasks {
            let position = (sequence.len() + 1) as i32;
            sequence.push(LadderEntry::Draft {
                title: draft.title.clone(),
                status: draft.status,
                position,
            });
        }
        sequence
    }
}

pub struct LadderWizard {
    selection: WizardSelection,
    today: NaiveDate,
}

impl LadderWizard {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            selection: WizardSelection::new(),
            today,
        }
    }

    pub fn selection(&self) -> &WizardSelection {
        &self.selection
    }

    pub fn into_selection(self) -> WizardSelection {
        self.selection
    }

    pub fn step(&self) -> WizardStep {
        self.selection.step
    }

    pub fn select_existing_goal(&mut self, goal: goal::Model) -> Result<(), WizardError> {
        self.ensure_step(WizardStep::SelectGoal, "select a goal")?;
        self.selection.selected_goal = Some(goal);
        self.selection.is_creating_new_goal = false;
        Ok(())
    }

    pub fn begin_new_goal(&mut self) -> Result<(), WizardError> {
        self.ensure_step(WizardStep::SelectGoal, "start a new goal")?;
        self.selection.is_creating_new_goal = true;
        self.selection.selected_goal = None;
        Ok(())
    }

    pub fn cancel_new_goal(&mut self) -> Result<(), WizardError> {
        self.ensure_step(WizardStep::SelectGoal, "cancel the new goal")?;
        self.selection.is_creating_new_goal = false;
        self.selection.draft_goal = DraftGoal::default();
        Ok(())
    }

    pub fn set_goal_title(&mut self, title: &str) -> Result<(), WizardError> {
        self.draft_goal_mut()?.title = title.to_string();
        Ok(())
    }

    pub fn set_goal_target(&mut self, target_value: f64) -> Result<(), WizardError> {
        self.draft_goal_mut()?.target_value = Some(target_value);
        Ok(())
    }

    pub fn set_goal_unit(
        &mut self,
        unit: GoalUnit,
        custom_unit: Option<String>,
    ) -> Result<(), WizardError> {
        let draft = self.draft_goal_mut()?;
        if unit != GoalUnit::Custom && custom_unit.is_some() {
            return Err(invalid("a unit name only applies to the custom unit"));
        }
        draft.unit = Some(unit);
        draft.custom_unit = custom_unit;
        Ok(())
    }

    pub fn set_goal_period(&mut self, period: GoalPeriod) -> Result<(), WizardError> {
        let today = self.today;
        let draft = self.draft_goal_mut()?;
        let (start, end) = period.date_range(today);
        draft.period = Some(period);
        draft.start_date = Some(start);
        draft.end_date = Some(end);
        Ok(())
    }

    pub fn advance(&mut self) -> Result<WizardStep, WizardError> {
        let step = self.selection.step;
        match step {
            WizardStep::SelectGoal => self.validate_goal_source()?,
            WizardStep::AddTasks => {
                if self.selection.task_count() == 0 {
                    return Err(invalid("add at least one task to the ladder"));
                }
            }
            WizardStep::Review => {}
        }
        let next = step.next().ok_or(WizardError::InvalidStep {
            step,
            action: "advance",
        })?;
        self.selection.step = next;
        Ok(next)
    }

    pub fn retreat(&mut self) -> Result<WizardStep, WizardError> {
        let step = self.selection.step;
        let previous = step.previous().ok_or(WizardError::InvalidStep {
            step,
            action: "go back",
        })?;
        self.selection.step = previous;
        Ok(previous)
    }

    /// Re-adding an id already picked is a no-op, even at capacity.
    pub fn add_existing_task(&mut self, task_id: i64) -> Result<(), WizardError> {
        if self.selection.selected_existing_task_ids.contains(&task_id) {
            return Ok(());
        }
        self.ensure_capacity()?;
        self.selection.selected_existing_task_ids.push(task_id);
        Ok(())
    }

    pub fn remove_existing_task(&mut self, task_id: i64) {
        self.selection
            .selected_existing_task_ids
            .retain(|id| *id != task_id);
    }

    pub fn add_draft_task(&mut self, title: &str) -> Result<(), WizardError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(invalid("task title cannot be empty"));
        }
        if title_len(title) > TASK_TITLE_MAX {
            return Err(invalid(format!(
                "task title must be at most {TASK_TITLE_MAX} characters"
            )));
        }
        self.ensure_capacity()?;
        self.selection.draft_tasks.push(DraftTask {
            title: title.to_string(),
            status: TaskStatus::Pending,
        });
        Ok(())
    }

    pub fn remove_draft_task(&mut self, index: usize) -> Result<DraftTask, WizardError> {
        let len = self.selection.draft_tasks.len();
        if index >= len {
            return Err(WizardError::Index { index, len });
        }
        Ok(self.selection.draft_tasks.remove(index))
    }

    fn validate_goal_source(&self) -> Result<(), WizardError> {
        if self.selection.is_creating_new_goal {
            self.selection.draft_goal.validate().map(|_| ())
        } else if self.selection.selected_goal.is_some() {
            Ok(())
        } else {
            Err(invalid("choose an existing goal or create a new one"))
        }
    }

    fn draft_goal_mut(&mut self) -> Result<&mut DraftGoal, WizardError> {
        self.ensure_step(WizardStep::SelectGoal, "edit the new goal")?;
        if !self.selection.is_creating_new_goal {
            return Err(invalid("no new goal is being created"));
        }
        Ok(&mut self.selection.draft_goal)
    }

    fn ensure_step(&self, expected: WizardStep, action: &'static str) -> Result<(), WizardError> {
        if self.selection.step != expected {
            return Err(WizardError::InvalidStep {
                step: self.selection.step,
                action,
            });
        }
        Ok(())
    }

    fn ensure_capacity(&self) -> Result<(), WizardError> {
        if self.selection.task_count() >= LADDER_TASK_LIMIT {
            return Err(WizardError::LimitExceeded {
                limit: LADDER_TASK_LIMIT,
            });
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> WizardError {
    WizardError::Validation(message.into())
}
