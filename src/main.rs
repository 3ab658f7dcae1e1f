use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use steadyladder::assembler::LadderAssembler;
use steadyladder::cli::{
    Cli, Command, GoalAdd, GoalCommand, GoalList, GoalRecord, GoalShow, LadderBuild,
    LadderCommand, LadderShow, TaskAdd, TaskCommand, TaskId, TaskList,
};
use steadyladder::db;
use steadyladder::error::AppError;
use steadyladder::model::{GoalPeriod, GoalStatus, TaskStatus};
use steadyladder::store::{GoalStatusChange, SqliteStore};
use steadyladder::util::{
    format_amount, format_goal_detail, format_goal_line, format_ladder_detail, format_review,
    format_status_change, format_task_line, goal_json, ladder_json, task_json,
};
use steadyladder::wizard::{DraftGoal, LadderWizard};

const DATA_DIR_ENV: &str = "STEADY_HOME";
const DEFAULT_DATA_DIR: &str = ".steadymanager";

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let Cli {
        data_dir,
        today,
        verbose,
        command,
    } = Cli::parse();
    init_tracing(verbose);

    let data_dir = resolve_data_dir(data_dir)?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let db_path = db::resolve_db_path(&data_dir);
    db::ensure_parent_dir(&db_path)?;
    let mut lock = db::open_lock(&db_path)?;
    let _guard = lock.write()?;

    let db = db::connect(&db_path).await?;
    db::ensure_schema(&db).await?;
    let store = SqliteStore::new(db);

    match command {
        Command::Goal(command) => handle_goal(&store, command, today).await,
        Command::Task(command) => handle_task(&store, command).await,
        Command::Ladder(command) => handle_ladder(&store, command, today).await,
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "steadyladder=debug,warn"
    } else {
        "steadyladder=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    if let Ok(home) = std::env::var("HOME") {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home).join(DEFAULT_DATA_DIR));
        }
    }
    Err(AppError::InvalidInput(format!(
        "unable to resolve data directory; set {DATA_DIR_ENV} or pass --data-dir"
    )))
}

async fn handle_goal(
    store: &SqliteStore,
    command: GoalCommand,
    today: NaiveDate,
) -> Result<(), AppError> {
    match command {
        GoalCommand::Add(args) => handle_goal_add(store, args, today).await,
        GoalCommand::List(args) => handle_goal_list(store, args).await,
        GoalCommand::Show(args) => handle_goal_show(store, args).await,
        GoalCommand::Record(args) => handle_goal_record(store, args).await,
        GoalCommand::Expire => handle_goal_expire(store, today).await,
    }
}

async fn handle_task(store: &SqliteStore, command: TaskCommand) -> Result<(), AppError> {
    match command {
        TaskCommand::Add(args) => handle_task_add(store, args).await,
        TaskCommand::List(args) => handle_task_list(store, args).await,
        TaskCommand::Show(args) => handle_task_show(store, args).await,
        TaskCommand::Start(args) => handle_task_status(store, args, TaskStatus::InProgress).await,
        TaskCommand::Done(args) => handle_task_status(store, args, TaskStatus::Completed).await,
        TaskCommand::Reopen(args) => handle_task_status(store, args, TaskStatus::Pending).await,
    }
}

async fn handle_ladder(
    store: &SqliteStore,
    command: LadderCommand,
    today: NaiveDate,
) -> Result<(), AppError> {
    match command {
        LadderCommand::Build(args) => handle_ladder_build(store, args, today).await,
        LadderCommand::Show(args) => handle_ladder_show(store, args).await,
    }
}

async fn handle_goal_add(
    store: &SqliteStore,
    args: GoalAdd,
    today: NaiveDate,
) -> Result<(), AppError> {
    let period: GoalPeriod = args.period.into();
    let (start_date, end_date) = period.date_range(today);
    let draft = DraftGoal {
        title: args.title,
        target_value: Some(args.target),
        unit: Some(args.unit.into()),
        custom_unit: args.custom_unit,
        period: Some(period),
        start_date: Some(start_date),
        end_date: Some(end_date),
    };
    let mut new_goal = draft.validate()?;
    new_goal.is_ladder = false;
    let goal = store.add_goal(new_goal).await?;
    println!("Created goal ID: {}: {}", goal.id, goal.title);
    Ok(())
}

async fn handle_goal_list(store: &SqliteStore, args: GoalList) -> Result<(), AppError> {
    let goals: Vec<_> = store
        .list_goals()
        .await?
        .into_iter()
        .filter(|goal| args.all || goal.status == GoalStatus::Active.as_str())
        .collect();
    if args.json {
        let items: Vec<Value> = goals.iter().map(goal_json).collect();
        return print_json(&Value::Array(items));
    }
    if goals.is_empty() {
        println!("No goals found.");
        return Ok(());
    }
    for goal in &goals {
        println!("{}", format_goal_line(goal));
    }
    Ok(())
}

async fn handle_goal_show(store: &SqliteStore, args: GoalShow) -> Result<(), AppError> {
    let goal = store.get_goal(args.id).await?;
    if args.json {
        return print_json(&goal_json(&goal));
    }
    println!("{}", format_goal_detail(&goal));
    Ok(())
}

async fn handle_goal_record(store: &SqliteStore, args: GoalRecord) -> Result<(), AppError> {
    let (goal, change) = store.record_goal_value(args.id, args.value).await?;
    println!(
        "Updated goal ID: {}: {} ({}/{} {})",
        goal.id,
        goal.title,
        format_amount(goal.current_value),
        format_amount(goal.target_value),
        goal.unit_label()
    );
    print_status_changes(change.as_slice());
    Ok(())
}

async fn handle_goal_expire(store: &SqliteStore, today: NaiveDate) -> Result<(), AppError> {
    let changes = store.expire_goals(today).await?;
    if changes.is_empty() {
        println!("No goals expired.");
        return Ok(());
    }
    print_status_changes(&changes);
    Ok(())
}

async fn handle_task_add(store: &SqliteStore, args: TaskAdd) -> Result<(), AppError> {
    for title in args.titles {
        require_non_empty("task title", &title)?;
        let task = store.add_task(&title).await?;
        println!("Created task ID: {}: {}", task.id, task.title);
    }
    Ok(())
}

async fn handle_task_list(store: &SqliteStore, args: TaskList) -> Result<(), AppError> {
    let tasks = store.list_tasks(args.unlinked).await?;
    if args.json {
        let items: Vec<Value> = tasks.iter().map(task_json).collect();
        return print_json(&Value::Array(items));
    }
    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    for task in &tasks {
        println!("{}", format_task_line(task));
    }
    Ok(())
}

async fn handle_task_show(store: &SqliteStore, args: TaskId) -> Result<(), AppError> {
    let task = store.get_task(args.id).await?;
    println!("{}", format_task_line(&task));
    Ok(())
}

async fn handle_task_status(
    store: &SqliteStore,
    args: TaskId,
    status: TaskStatus,
) -> Result<(), AppError> {
    let (task, change) = store.set_task_status(args.id, status).await?;
    println!("Task ID: {} marked {}.", task.id, task.status);
    print_status_changes(change.as_slice());
    Ok(())
}

async fn handle_ladder_build(
    store: &SqliteStore,
    args: LadderBuild,
    today: NaiveDate,
) -> Result<(), AppError> {
    let mut wizard = LadderWizard::new(today);
    let target_goal = match (args.goal, args.new_goal) {
        (Some(goal_id), _) => {
            let goal = store.get_goal(goal_id).await?;
            wizard.select_existing_goal(goal)?;
            Some(goal_id)
        }
        (None, Some(title)) => {
            wizard.begin_new_goal()?;
            wizard.set_goal_title(&title)?;
            if let Some(target) = args.target {
                wizard.set_goal_target(target)?;
            }
            if let Some(unit) = args.unit {
                wizard.set_goal_unit(unit.into(), args.custom_unit.clone())?;
            }
            if let Some(period) = args.period {
                wizard.set_goal_period(period.into())?;
            }
            None
        }
        (None, None) => {
            return Err(AppError::InvalidInput(
                "ladder build needs --goal <ID> or --new-goal <TITLE>".to_string(),
            ))
        }
    };
    wizard.advance()?;

    let known: HashMap<i64, _> = store
        .list_tasks(false)
        .await?
        .into_iter()
        .map(|task| (task.id, task))
        .collect();
    for task_id in args.links {
        let task = known
            .get(&task_id)
            .ok_or_else(|| AppError::NotFound(format!("task id {task_id}")))?;
        if let Some(owner) = task.goal_id {
            if Some(owner) != target_goal {
                return Err(AppError::InvalidInput(format!(
                    "task id {task_id} already belongs to goal id {owner}"
                )));
            }
        }
        wizard.add_existing_task(task_id)?;
    }
    for title in &args.tasks {
        wizard.add_draft_task(title)?;
    }
    wizard.advance()?;

    println!("{}", format_review(wizard.selection(), &known));
    if args.dry_run {
        let selection = wizard.selection();
        println!(
            "\nDry run: nothing saved ({} task(s) to link, {} to create).",
            selection.selected_existing_task_ids().len(),
            selection.draft_tasks().len()
        );
        return Ok(());
    }

    let goal_id = LadderAssembler::new(store, store)
        .confirm(wizard.into_selection())
        .await?;
    println!("\nCreated ladder for goal ID: {goal_id}");
    Ok(())
}

async fn handle_ladder_show(store: &SqliteStore, args: LadderShow) -> Result<(), AppError> {
    let ladder = store.get_ladder(args.goal_id).await?;
    if args.json {
        return print_json(&ladder_json(&ladder));
    }
    println!("{}", format_ladder_detail(&ladder));
    Ok(())
}

fn print_json(value: &Value) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn require_non_empty(label: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{label} cannot be empty")));
    }
    Ok(())
}

fn print_status_changes(changes: &[GoalStatusChange]) {
    if changes.is_empty() {
        return;
    }
    println!("Auto status updates:");
    for change in changes {
        println!("- {}", format_status_change(change));
    }
}
