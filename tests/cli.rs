use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::TempDir;

const TODAY: &str = "2026-03-02";

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_steadyladder"))
}

fn run_cmd_on(dir: &TempDir, today: &str, args: &[&str]) -> Output {
    let mut cmd = Command::new(bin_path());
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("--today")
        .arg(today)
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("STEADY_HOME");
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    cmd.output().expect("run command")
}

fn run_cmd(dir: &TempDir, args: &[&str]) -> Output {
    run_cmd_on(dir, TODAY, args)
}

fn output_stdout(output: Output) -> String {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout utf8")
}

fn output_stderr_failure(output: Output) -> String {
    assert!(
        !output.status.success(),
        "expected failure, stdout: {}",
        String::from_utf8_lossy(&output.stdout)
    );
    String::from_utf8(output.stderr).expect("stderr utf8")
}

fn parse_created_id(stdout: &str, prefix: &str) -> i64 {
    let line = stdout
        .lines()
        .find(|line| line.starts_with(prefix))
        .unwrap_or_else(|| panic!("missing {prefix:?} in {stdout}"));
    let rest = line.strip_prefix(prefix).expect("prefix");
    let id_str = rest.split(':').next().expect("id");
    id_str.trim().parse().expect("id parse")
}

fn json_output(dir: &TempDir, args: &[&str]) -> Value {
    let stdout = output_stdout(run_cmd(dir, args));
    serde_json::from_str(&stdout).expect("json output")
}

fn add_goal(dir: &TempDir, title: &str) -> i64 {
    let stdout = output_stdout(run_cmd(
        dir,
        &[
            "goal", "add", title, "--target", "20", "--unit", "calls", "--period", "weekly",
        ],
    ));
    parse_created_id(&stdout, "Created goal ID: ")
}

fn add_task(dir: &TempDir, title: &str) -> i64 {
    let stdout = output_stdout(run_cmd(dir, &["task", "add", title]));
    parse_created_id(&stdout, "Created task ID: ")
}

fn ladder_titles(ladder: &Value) -> Vec<String> {
    ladder["tasks"]
        .as_array()
        .expect("tasks array")
        .iter()
        .map(|task| task["title"].as_str().expect("title").to_string())
        .collect()
}

#[test]
fn goal_add_derives_period_dates() {
    let dir = TempDir::new().expect("temp dir");
    let goal_id = add_goal(&dir, "Cold calls");

    let goal = json_output(&dir, &["goal", "show", &goal_id.to_string(), "--json"]);
    assert_eq!(goal["title"], "Cold calls");
    assert_eq!(goal["start_date"], "2026-03-02");
    assert_eq!(goal["end_date"], "2026-03-09");
    assert_eq!(goal["status"], "active");
    assert_eq!(goal["is_ladder"], false);

    let stdout = output_stdout(run_cmd(&dir, &["goal", "list"]));
    assert!(stdout.contains("Cold calls (goal id 1, 0/20 calls, weekly until 2026-03-09)"));
}

#[test]
fn goal_add_rejects_long_title() {
    let dir = TempDir::new().expect("temp dir");
    let title = "x".repeat(36);
    let stderr = output_stderr_failure(run_cmd(
        &dir,
        &[
            "goal", "add", &title, "--target", "5", "--unit", "leads", "--period", "monthly",
        ],
    ));
    assert!(stderr.contains("at most 35 characters"), "stderr: {stderr}");
}

#[test]
fn ladder_build_new_goal_keeps_task_order() {
    let dir = TempDir::new().expect("temp dir");
    let stdout = output_stdout(run_cmd(
        &dir,
        &[
            "ladder",
            "build",
            "--new-goal",
            "Launch v2",
            "--target",
            "10000",
            "--unit",
            "dollars",
            "--period",
            "monthly",
            "--task",
            "Write copy",
            "--task",
            "Ship landing page",
        ],
    ));
    let goal_line = "Goal: Launch v2 (new, 10000 dollars, monthly 2026-03-02 -> 2026-04-02)";
    assert!(stdout.contains(goal_line));
    let goal_id = parse_created_id(&stdout, "Created ladder for goal ID: ");

    let ladder = json_output(&dir, &["ladder", "show", &goal_id.to_string(), "--json"]);
    assert_eq!(ladder["goal"]["is_ladder"], true);
    let titles = ladder_titles(&ladder);
    assert_eq!(titles, vec!["Write copy", "Ship landing page"]);
    assert_eq!(ladder["tasks"][0]["status"], "pending");
}

#[test]
fn ladder_build_links_existing_tasks_first() {
    let dir = TempDir::new().expect("temp dir");
    let goal_id = add_goal(&dir, "Pipeline");
    let t1 = add_task(&dir, "Call Acme");
    let t2 = add_task(&dir, "Email Globex");
    let goal_arg = goal_id.to_string();
    let t1_arg = t1.to_string();
    let t2_arg = t2.to_string();

    output_stdout(run_cmd(
        &dir,
        &[
            "ladder", "build", "--goal", &goal_arg, "--task", "Demo", "--link", &t1_arg, "--link",
            &t2_arg,
        ],
    ));

    let ladder = json_output(&dir, &["ladder", "show", &goal_arg, "--json"]);
    assert_eq!(ladder["goal"]["is_ladder"], true);
    let titles = ladder_titles(&ladder);
    assert_eq!(titles, vec!["Call Acme", "Email Globex", "Demo"]);

    let unlinked = json_output(&dir, &["task", "list", "--unlinked", "--json"]);
    assert_eq!(unlinked.as_array().expect("array").len(), 0);
}

#[test]
fn ladder_build_requires_tasks() {
    let dir = TempDir::new().expect("temp dir");
    let goal_id = add_goal(&dir, "Pipeline");
    let goal_arg = goal_id.to_string();
    let stderr = output_stderr_failure(run_cmd(&dir, &["ladder", "build", "--goal", &goal_arg]));
    assert!(stderr.contains("add at least one task"), "stderr: {stderr}");

    let goal = json_output(&dir, &["goal", "show", &goal_id.to_string(), "--json"]);
    assert_eq!(goal["is_ladder"], false);
}

#[test]
fn ladder_build_rejects_empty_task_title() {
    let dir = TempDir::new().expect("temp dir");
    let stderr = output_stderr_failure(run_cmd(
        &dir,
        &[
            "ladder",
            "build",
            "--new-goal",
            "Launch",
            "--target",
            "3",
            "--unit",
            "meetings",
            "--period",
            "weekly",
            "--task",
            "",
        ],
    ));
    assert!(stderr.contains("task title cannot be empty"), "stderr: {stderr}");

    let goals = json_output(&dir, &["goal", "list", "--all", "--json"]);
    assert_eq!(goals.as_array().expect("array").len(), 0);
}

#[test]
fn ladder_build_reports_missing_goal_fields() {
    let dir = TempDir::new().expect("temp dir");
    let stderr = output_stderr_failure(run_cmd(
        &dir,
        &[
            "ladder",
            "build",
            "--new-goal",
            "Launch",
            "--unit",
            "custom",
            "--period",
            "weekly",
            "--task",
            "Plan",
        ],
    ));
    assert!(stderr.contains("goal target is required"), "stderr: {stderr}");
}

#[test]
fn ladder_build_rejects_task_of_other_goal() {
    let dir = TempDir::new().expect("temp dir");
    let first = add_goal(&dir, "First").to_string();
    let second = add_goal(&dir, "Second").to_string();
    let task = add_task(&dir, "Shared").to_string();
    output_stdout(run_cmd(
        &dir,
        &["ladder", "build", "--goal", &first, "--link", &task],
    ));

    let stderr = output_stderr_failure(run_cmd(
        &dir,
        &["ladder", "build", "--goal", &second, "--link", &task],
    ));
    assert!(stderr.contains("already belongs to goal id"), "stderr: {stderr}");
}

#[test]
fn ladder_build_enforces_task_limit() {
    let dir = TempDir::new().expect("temp dir");
    let goal_id = add_goal(&dir, "Big push").to_string();
    let titles: Vec<String> = (1..=51).map(|n| format!("Task {n}")).collect();
    let mut args = vec!["task", "add"];
    args.extend(titles.iter().map(String::as_str));
    output_stdout(run_cmd(&dir, &args));

    let ids: Vec<String> = (1..=51).map(|n: i64| n.to_string()).collect();
    let mut args = vec!["ladder", "build", "--goal", goal_id.as_str()];
    for id in &ids {
        args.push("--link");
        args.push(id.as_str());
    }
    let stderr = output_stderr_failure(run_cmd(&dir, &args));
    assert!(stderr.contains("at most 50 tasks"), "stderr: {stderr}");

    let unlinked = json_output(&dir, &["task", "list", "--unlinked", "--json"]);
    assert_eq!(unlinked.as_array().expect("array").len(), 51);
}

#[test]
fn ladder_dry_run_saves_nothing() {
    let dir = TempDir::new().expect("temp dir");
    let stdout = output_stdout(run_cmd(
        &dir,
        &[
            "ladder",
            "build",
            "--new-goal",
            "Demos",
            "--target",
            "4",
            "--unit",
            "custom",
            "--custom-unit",
            "demos",
            "--period",
            "quarterly",
            "--task",
            "Pick accounts",
            "--dry-run",
        ],
    ));
    assert!(stdout.contains("1. Pick accounts (new)"));
    assert!(stdout.contains("Dry run: nothing saved (0 task(s) to link, 1 to create)."));

    let goals = json_output(&dir, &["goal", "list", "--all", "--json"]);
    assert_eq!(goals.as_array().expect("array").len(), 0);
}

#[test]
fn finishing_ladder_tasks_completes_goal() {
    let dir = TempDir::new().expect("temp dir");
    let stdout = output_stdout(run_cmd(
        &dir,
        &[
            "ladder",
            "build",
            "--new-goal",
            "Follow ups",
            "--target",
            "2",
            "--unit",
            "tasks",
            "--period",
            "weekly",
            "--task",
            "First",
            "--task",
            "Second",
        ],
    ));
    let goal_id = parse_created_id(&stdout, "Created ladder for goal ID: ").to_string();
    let ladder = json_output(&dir, &["ladder", "show", &goal_id, "--json"]);
    let first = ladder["tasks"][0]["id"].as_i64().expect("id").to_string();
    let second = ladder["tasks"][1]["id"].as_i64().expect("id").to_string();

    let stdout = output_stdout(run_cmd(&dir, &["task", "done", &first]));
    assert!(!stdout.contains("Auto status updates"));
    let stdout = output_stdout(run_cmd(&dir, &["task", "done", &second]));
    assert!(stdout.contains("status auto-updated from active to completed"));

    let stdout = output_stdout(run_cmd(&dir, &["ladder", "show", &goal_id]));
    assert!(stdout.contains("Tasks (2/2 completed):"));

    let stdout = output_stdout(run_cmd(&dir, &["task", "reopen", &second]));
    assert!(stdout.contains("status auto-updated from completed to active"));
}

#[test]
fn goal_expire_closes_overdue_goals() {
    let dir = TempDir::new().expect("temp dir");
    let missed = add_goal(&dir, "Missed").to_string();
    let hit = add_goal(&dir, "Hit").to_string();
    output_stdout(run_cmd(&dir, &["goal", "record", &hit, "--value", "25"]));

    output_stdout(run_cmd(
        &dir,
        &[
            "goal", "add", "Later", "--target", "1", "--unit", "hours", "--period", "yearly",
        ],
    ));

    let stdout = output_stdout(run_cmd_on(&dir, "2026-03-09", &["goal", "expire"]));
    assert!(stdout.contains("No goals expired."));

    let stdout = output_stdout(run_cmd_on(&dir, "2026-03-20", &["goal", "expire"]));
    let expected = format!("Goal ID: {missed} status auto-updated from active to failed");
    assert!(stdout.contains(&expected));

    let goal = json_output(&dir, &["goal", "show", &hit, "--json"]);
    assert_eq!(goal["status"], "completed");
    let active = json_output(&dir, &["goal", "list", "--json"]);
    assert_eq!(active.as_array().expect("array").len(), 1);
}

#[test]
fn second_ladder_build_appends_after_existing_tasks() {
    let dir = TempDir::new().expect("temp dir");
    let goal_arg = add_goal(&dir, "Pipeline").to_string();
    output_stdout(run_cmd(
        &dir,
        &[
            "ladder", "build", "--goal", &goal_arg, "--task", "A", "--task", "B",
        ],
    ));
    let extra = add_task(&dir, "C").to_string();
    output_stdout(run_cmd(
        &dir,
        &[
            "ladder", "build", "--goal", &goal_arg, "--link", &extra, "--task", "D",
        ],
    ));

    let ladder = json_output(&dir, &["ladder", "show", &goal_arg, "--json"]);
    assert_eq!(ladder_titles(&ladder), vec!["A", "B", "C", "D"]);
    assert_eq!(ladder["tasks"][3]["ladder_position"], 4);
}

#[test]
fn new_goal_fields_need_new_goal() {
    let dir = TempDir::new().expect("temp dir");
    let goal_arg = add_goal(&dir, "Pipeline").to_string();
    let stderr = output_stderr_failure(run_cmd(
        &dir,
        &[
            "ladder", "build", "--goal", &goal_arg, "--target", "5", "--task", "A",
        ],
    ));
    assert!(stderr.contains("--new-goal"), "stderr: {stderr}");

    let stderr = output_stderr_failure(run_cmd(
        &dir,
        &[
            "goal",
            "add",
            "Demos",
            "--target",
            "4",
            "--unit",
            "leads",
            "--custom-unit",
            "demos",
            "--period",
            "weekly",
        ],
    ));
    assert!(stderr.contains("only applies to the custom unit"), "stderr: {stderr}");
}
