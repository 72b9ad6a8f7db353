use assert_cmd::Command;
use predicates::str::contains;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

fn procflow(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("procflow").expect("procflow binary");
    cmd.arg("--root").arg(root);
    cmd
}

const BUDGET_FLOW: &str = "budget\n6\n1\nBudget\nMonthly plan\n4\nIncome\n4\nExpenses\n5\n-\n2\n3\n9\n2\nreport\nSummary\nIncome only\n10\n";

#[test]
fn builds_lists_and_shows_a_flow() {
    let dir = tempfile::tempdir().expect("tempdir");
    procflow(dir.path())
        .arg("new")
        .write_stdin(BUDGET_FLOW)
        .assert()
        .success()
        .stdout(contains("Flow 'budget' saved to"));

    let stored = fs::read_to_string(dir.path().join("flows/budget.txt")).expect("flow file");
    assert_eq!(
        stored,
        "budget\n6\nTitleStep\nBudget\nMonthly plan\nNumberInputStep\nIncome\nNumberInputStep\nExpenses\nCalculusStep\n- 2 3\nOutputStep\n2\nreport\nSummary\nIncome only\nEndStep\n"
    );

    procflow(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(contains("1. budget"));

    procflow(dir.path())
        .args(["show", "budget"])
        .assert()
        .success()
        .stdout(contains("4. CalculusStep\n   - 2 3\n"));
}

#[test]
fn run_records_skips_errors_and_persists_analytics() {
    let dir = tempfile::tempdir().expect("tempdir");
    procflow(dir.path())
        .arg("new")
        .write_stdin(BUDGET_FLOW)
        .assert()
        .success();

    // income 100, expenses 0 is never read because step 3 is skipped
    procflow(dir.path())
        .args(["run", "budget", "--skip", "3"])
        .write_stdin("100\n")
        .assert()
        .success()
        .stdout(contains("Error executing step"))
        .stdout(contains("Times completed: 5"));

    let report = fs::read_to_string(dir.path().join("files/report.txt")).expect("report");
    assert!(report.contains("Information from step 2: 100"));

    let output = procflow(dir.path())
        .args(["analytics", "budget", "--json"])
        .output()
        .expect("analytics");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["times_started"], 6);
    assert_eq!(json["times_completed"], 5);
    assert_eq!(json["slots"][2]["skips"], 1);
    assert_eq!(json["slots"][3]["errors"], 1);
}

#[test]
fn prompted_run_reads_signals_from_stdin() {
    let dir = tempfile::tempdir().expect("tempdir");
    procflow(dir.path())
        .arg("new")
        .write_stdin("greet\n2\n3\nYour name\n10\n")
        .assert()
        .success();

    procflow(dir.path())
        .args(["run", "greet"])
        .write_stdin("\nAda\ns\n")
        .assert()
        .success()
        .stdout(contains("Give me a text: "))
        .stdout(contains("Step skipped!"))
        .stdout(contains("Times completed: 1"));
}

#[test]
fn missing_and_deleted_flows_are_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    procflow(dir.path())
        .args(["show", "ghost"])
        .assert()
        .success()
        .stdout(contains("Flow 'ghost' not found."));

    procflow(dir.path())
        .arg("new")
        .write_stdin("brief\n1\n10\n")
        .assert()
        .success();
    procflow(dir.path())
        .args(["delete", "brief"])
        .assert()
        .success()
        .stdout(contains("Flow 'brief' has been successfully deleted."));
    procflow(dir.path())
        .args(["run", "brief", "--yes"])
        .assert()
        .success()
        .stdout(contains("Flow 'brief' not found."));
}

#[test]
fn corrupt_flow_fails_with_format_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("flows")).expect("mkdir");
    fs::write(
        dir.path().join("flows/broken.txt"),
        "broken\n2\nCalculusStep\n+ 1 2\n",
    )
    .expect("write");

    procflow(dir.path())
        .args(["show", "broken"])
        .assert()
        .failure()
        .stderr(contains("CalculusStep references step 1 but only 0 steps precede it"));
}
