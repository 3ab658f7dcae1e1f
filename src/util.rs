use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::entities::{goal, task};
use crate::store::{GoalStatusChange, LadderDetail};
use crate::wizard::{LadderEntry, WizardSelection};

pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

pub fn format_goal_line(goal: &goal::Model) -> String {
    let ladder = if goal.is_ladder { " ladder" } else { "" };
    format!(
        "- [{}] {} (goal id {}, {}/{} {}, {} until {}{ladder})",
        goal.status,
        goal.title,
        goal.id,
        format_amount(goal.current_value),
        format_amount(goal.target_value),
        goal.unit_label(),
        goal.period,
        goal.end_date
    )
}

pub fn format_goal_detail(goal: &goal::Model) -> String {
    let mut output = String::new();
    output.push_str(&format!("Goal ID: {}\n", goal.id));
    output.push_str(&format!("Title: {}\n", goal.title));
    output.push_str(&format!("Status: {}\n", goal.status));
    output.push_str(&format!(
        "Target: {} {}\n",
        format_amount(goal.target_value),
        goal.unit_label()
    ));
    output.push_str(&format!("Current: {}\n", format_amount(goal.current_value)));
    output.push_str(&format!("Period: {}\n", goal.period));
    output.push_str(&format!(
        "Dates: {} -> {}\n",
        goal.start_date, goal.end_date
    ));
    output.push_str(&format!(
        "Ladder: {}\n",
        if goal.is_ladder { "yes" } else { "no" }
    ));
    output.push_str(&format!("Created: {}\n", format_datetime(goal.created_at)));
    output.push_str(&format!("Updated: {}", format_datetime(goal.updated_at)));
    output
}

pub fn format_task_line(task: &task::Model) -> String {
    match task.goal_id {
        Some(goal_id) => format!(
            "- [{}] {} (task id {}, goal id {goal_id})",
            task.status, task.title, task.id
        ),
        None => format!("- [{}] {} (task id {})", task.status, task.title, task.id),
    }
}

pub fn format_ladder_detail(ladder: &LadderDetail) -> String {
    let mut output = format_goal_detail(&ladder.goal);
    output.push_str("\n\n");
    if ladder.tasks.is_empty() {
        output.push_str("Tasks: (none)");
        return output;
    }
    output.push_str(&format!(
        "Tasks ({}/{} completed):\n",
        ladder.completed(),
        ladder.tasks.len()
    ));
    for (idx, task) in ladder.tasks.iter().enumerate() {
        output.push_str(&format!(
            "{}. [{}] {} (task id {})\n",
            idx + 1,
            task.status,
            task.title,
            task.id
        ));
    }
    output.trim_end().to_string()
}

pub fn format_review(selection: &WizardSelection, known: &HashMap<i64, task::Model>) -> String {
    let mut output = String::from("Review ladder\n");
    match (selection.selected_goal(), selection.is_creating_new_goal()) {
        (Some(goal), false) => {
            output.push_str(&format!(
                "Goal: {} (existing, goal id {})\n",
                goal.title, goal.id
            ));
        }
        _ => {
            let draft = selection.draft_goal();
            let target = draft.target_value.map(format_amount).unwrap_or_default();
            let unit = match (draft.unit, draft.custom_unit.as_deref()) {
                (Some(_), Some(name)) => name.to_string(),
                (Some(unit), None) => unit.as_str().to_string(),
                (None, _) => String::new(),
            };
            let title = draft.title.trim();
            output.push_str(&format!("Goal: {title} (new, {target} {unit}"));
            if let (Some(period), Some(start), Some(end)) =
                (draft.period, draft.start_date, draft.end_date)
            {
                output.push_str(&format!(", {} {start} -> {end}", period.as_str()));
            }
            output.push_str(")\n");
        }
    }
    output.push_str("Tasks:\n");
    for entry in selection.ladder_sequence() {
        match entry {
            LadderEntry::Existing { task_id, position } => {
                let title = known
                    .get(&task_id)
                    .map(|task| task.title.as_str())
                    .unwrap_or("(unknown task)");
                output.push_str(&format!("{position}. {title} (link task id {task_id})\n"));
            }
            LadderEntry::Draft {
                title, position, ..
            } => {
                output.push_str(&format!("{position}. {title} (new)\n"));
            }
        }
    }
    output.trim_end().to_string()
}

pub fn format_status_change(change: &GoalStatusChange) -> String {
    format!(
        "Goal ID: {} status auto-updated from {} to {} ({}).",
        change.goal_id, change.from, change.to, change.reason
    )
}

pub fn goal_json(goal: &goal::Model) -> Value {
    json!({
        "id": goal.id,
        "title": goal.title,
        "target_value": goal.target_value,
        "unit": goal.unit,
        "custom_unit": goal.custom_unit,
        "period": goal.period,
        "start_date": goal.start_date.to_string(),
        "end_date": goal.end_date.to_string(),
        "current_value": goal.current_value,
        "status": goal.status,
        "is_ladder": goal.is_ladder,
    })
}

pub fn task_json(task: &task::Model) -> Value {
    json!({
        "id": task.id,
        "title": task.title,
        "status": task.status,
        "goal_id": task.goal_id,
        "ladder_position": task.ladder_position,
    })
}

pub fn ladder_json(ladder: &LadderDetail) -> Value {
    json!({
        "goal": goal_json(&ladder.goal),
        "tasks": ladder.tasks.iter().map(task_json).collect::<Vec<_>>(),
        "completed": ladder.completed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GoalPeriod, GoalUnit};
    use crate::wizard::tests::{existing_goal, today};
    use crate::wizard::LadderWizard;

    #[test]
    fn amounts_drop_trailing_zero() {
        assert_eq!(format_amount(10000.0), "10000");
        assert_eq!(format_amount(2.5), "2.50");
    }

    #[test]
    fn review_lists_existing_before_drafts() {
        let mut wizard = LadderWizard::new(today());
        wizard.begin_new_goal().unwrap();
        wizard.set_goal_title("Launch v2").unwrap();
        wizard.set_goal_target(10000.0).unwrap();
        wizard.set_goal_unit(GoalUnit::Dollars, None).unwrap();
        wizard.set_goal_period(GoalPeriod::Monthly).unwrap();
        wizard.advance().unwrap();
        wizard.add_draft_task("Write copy").unwrap();
        wizard.add_existing_task(4).unwrap();

        let review = format_review(wizard.selection(), &HashMap::new());
        assert_eq!(
            review,
            "Review ladder\n\
             Goal: Launch v2 (new, 10000 dollars, monthly 2026-03-02 -> 2026-04-02)\n\
             Tasks:\n\
             1. (unknown task) (link task id 4)\n\
             2. Write copy (new)"
        );
    }

    #[test]
    fn goal_line_marks_ladder_goals() {
        let mut goal = existing_goal(2);
        goal.is_ladder = true;
        assert_eq!(
            format_goal_line(&goal),
            "- [active] Goal 2 (goal id 2, 0/20 calls, weekly until 2026-03-09 ladder)"
        );
    }
}
