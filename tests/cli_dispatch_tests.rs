use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_datacron")
}

fn write_csv(path: &Path, rows: &[&str]) {
    fs::write(path, rows.join("\n") + "\n").expect("fixture should be written");
}

/// Two-member guild in a CSV directory plus a config pointing at it.
fn guild_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path();
    write_csv(
        &root.join("roster.csv"),
        &[
            "Name,Ally Code,GP,GP Heroes,GP Ships",
            "Alice,123456789,40000,25000,15000",
            "Bob,111,50000,30000,20000",
        ],
    );
    write_csv(
        &root.join("heroes.csv"),
        &[
            "Unit,Base ID,Tags,2*,3*,4*,5*,6*,7*,Alice,Bob",
            "Rey,REY,Light Side Jedi,,,,,,,7* G12 L85 P29000,7* G13 L85 P34000",
            "Kylo Ren,KYLORENUNMASKED,Dark Side Sith,,,,,,,7* G13 L85 P33000,",
        ],
    );
    write_csv(
        &root.join("ships.csv"),
        &["Unit,Base ID,Tags,2*,3*,4*,5*,6*,7*,Alice,Bob"],
    );
    write_csv(&root.join("events.csv"), &["Light Side", "Rey", "Finn"]);
    fs::write(
        root.join("datacron.yaml"),
        format!(
            "data_source: swgoh_help\nevent: Light Side\ncharacter_tag: jedi\nrequired_hero_gp: 30000\ntables: {}\n",
            root.display()
        ),
    )
    .expect("config should be written");
    dir
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(bin())
        .arg("--config")
        .arg(dir.join("datacron.yaml"))
        .args(args)
        .env_remove("DATACRON_TABLES")
        .env_remove("DATACRON_EVENT")
        .env_remove("DATACRON_TAG")
        .env_remove("DATACRON_DATA_SOURCE")
        .output()
        .expect("datacron should run")
}

#[test]
fn snapshot_command_prints_report_rows() {
    let dir = guild_dir();
    let output = run(dir.path(), &["snapshot", "--name", "Bob"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "GP\t50000",
            "GP Heroes\t30000",
            "GP Ships\t20000",
            "Light Side 7* P30000+\t1",
            "jedi 7* P30000+\t1",
            "Rey\t7* G13 L85 P34000",
            "Finn\tn/a",
        ]
    );
}

#[test]
fn snapshot_command_emits_json_and_writes_csv() {
    let dir = guild_dir();
    let out = dir.path().join("snapshot.csv");
    let output = run(
        dir.path(),
        &["snapshot", "--ally-code", "123-456-789", "--json", "--out", out.to_str().expect("utf-8 path")],
    );

    assert_eq!(output.status.code(), Some(0));
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("snapshot should emit json");
    assert_eq!(payload["player"], "Alice");
    assert_eq!(payload["count_filtered"], 0);
    assert_eq!(payload["summary"][0]["value"], 40000);

    let written = fs::read_to_string(&out).expect("csv sink output");
    assert!(written.starts_with("GP,40000\n"));
    assert!(written.contains("Rey,7* G12 L85 P29000"));
}

#[test]
fn snapshot_for_unknown_member_alerts() {
    let dir = guild_dir();
    let output = run(dir.path(), &["snapshot", "--name", "Nobody"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: Failed to retrieve player's data."));
}

#[test]
fn tables_override_comes_from_environment() {
    let dir = guild_dir();
    let empty = tempfile::tempdir().expect("tempdir");
    let output = Command::new(bin())
        .arg("--config")
        .arg(dir.path().join("datacron.yaml"))
        .args(["snapshot", "--name", "Bob"])
        .env("DATACRON_TABLES", empty.path())
        .output()
        .expect("datacron should run");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load tables"));
}

#[test]
fn rollup_command_prints_owner_counts() {
    let dir = guild_dir();
    let output = run(dir.path(), &["rollup"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "Unit\t2*\t3*\t4*\t5*\t6*\t7*");
    assert!(lines.contains(&"Rey\t2\t2\t2\t2\t2\t2"));
    assert!(lines.contains(&"Kylo Ren\t1\t1\t1\t1\t1\t1"));
}

#[test]
fn validate_command_passes_on_clean_tables() {
    let dir = guild_dir();
    let output = run(dir.path(), &["validate"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("validation passed"));
}

#[test]
fn unknown_command_is_usage_error() {
    let output = Command::new(bin())
        .arg("explode")
        .output()
        .expect("datacron should run");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_explicit_config_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = Command::new(bin())
        .arg("--config")
        .arg(dir.path().join("absent.yaml"))
        .arg("validate")
        .output()
        .expect("datacron should run");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config error"));
}
