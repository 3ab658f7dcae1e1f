use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::{GoalPeriod, GoalUnit};

#[derive(Parser, Debug)]
#[command(
    name = "steadyladder",
    version,
    about = "Break goals into ordered task ladders"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "STEADY_HOME",
        value_name = "PATH",
        help = "Directory holding the SteadyLadder database"
    )]
    pub data_dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        value_name = "YYYY-MM-DD",
        help = "Reference date used for new goal periods and expiry"
    )]
    pub today: Option<NaiveDate>,
    #[arg(short, long, global = true, help = "Enable debug logging on stderr")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(subcommand)]
    Goal(GoalCommand),
    #[command(subcommand)]
    Task(TaskCommand),
    #[command(subcommand)]
    Ladder(LadderCommand),
}

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    Add(GoalAdd),
    List(GoalList),
    Show(GoalShow),
    Record(GoalRecord),
    Expire,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    Add(TaskAdd),
    List(TaskList),
    Show(TaskId),
    Start(TaskId),
    Done(TaskId),
    Reopen(TaskId),
}

#[derive(Subcommand, Debug)]
pub enum LadderCommand {
    Build(LadderBuild),
    Show(LadderShow),
}

#[derive(Args, Debug)]
pub struct GoalAdd {
    pub title: String,
    #[arg(long)]
    pub target: f64,
    #[arg(long, value_enum)]
    pub unit: GoalUnitArg,
    #[arg(long, value_name = "NAME")]
    pub custom_unit: Option<String>,
    #[arg(long, value_enum)]
    pub period: GoalPeriodArg,
}

#[derive(Args, Debug)]
pub struct GoalList {
    #[arg(long, help = "Include completed and failed goals")]
    pub all: bool,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct GoalShow {
    pub id: i64,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct GoalRecord {
    pub id: i64,
    #[arg(long)]
    pub value: f64,
}

#[derive(Args, Debug)]
pub struct TaskAdd {
    #[arg(value_name = "TITLE", num_args = 1..)]
    pub titles: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TaskList {
    #[arg(long, help = "Only tasks not linked to any goal")]
    pub unlinked: bool,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct TaskId {
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct LadderBuild {
    #[arg(long, value_name = "ID", conflicts_with = "new_goal")]
    pub goal: Option<i64>,
    #[arg(long, value_name = "TITLE")]
    pub new_goal: Option<String>,
    #[arg(long, requires = "new_goal")]
    pub target: Option<f64>,
    #[arg(long, value_enum, requires = "new_goal")]
    pub unit: Option<GoalUnitArg>,
    #[arg(long, value_name = "NAME", requires = "unit")]
    pub custom_unit: Option<String>,
    #[arg(long, value_enum, requires = "new_goal")]
    pub period: Option<GoalPeriodArg>,
    #[arg(long = "link", value_name = "TASK_ID")]
    pub links: Vec<i64>,
    #[arg(long = "task", value_name = "TITLE")]
    pub tasks: Vec<String>,
    #[arg(long, help = "Print the review without saving anything")]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct LadderShow {
    pub goal_id: i64,
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum GoalUnitArg {
    Dollars,
    Leads,
    Tasks,
    Calls,
    Meetings,
    Hours,
    Custom,
}

impl From<GoalUnitArg> for GoalUnit {
    fn from(value: GoalUnitArg) -> Self {
        match value {
            GoalUnitArg::Dollars => GoalUnit::Dollars,
            GoalUnitArg::Leads => GoalUnit::Leads,
            GoalUnitArg::Tasks => GoalUnit::Tasks,
            GoalUnitArg::Calls => GoalUnit::Calls,
            GoalUnitArg::Meetings => GoalUnit::Meetings,
            GoalUnitArg::Hours => GoalUnit::Hours,
            GoalUnitArg::Custom => GoalUnit::Custom,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum GoalPeriodArg {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl From<GoalPeriodArg> for GoalPeriod {
    fn from(value: GoalPeriodArg) -> Self {
        match value {
            GoalPeriodArg::Weekly => GoalPeriod::Weekly,
            GoalPeriodArg::Monthly => GoalPeriod::Monthly,
            GoalPeriodArg::Quarterly => GoalPeriod::Quarterly,
            GoalPeriodArg::Yearly => GoalPeriod::Yearly,
        }
    }
}
