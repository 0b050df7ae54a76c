//! End-to-end tests driving the `occ` binary.
//!
//! Writes a stop-data CSV and a scenario file into a temp directory, runs the
//! binary against them and checks stdout and the exported tables.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn occ_binary() -> String {
    env!("CARGO_BIN_EXE_occ").to_string()
}

const STOPS: &str = "\
PatID,InRoomTS,OutRoomTS,PatType,Weight
1,2024-01-01 00:30,2024-01-01 01:15,ART,1
2,2024-01-01 00:30,2024-01-01 01:15,IVT,2
3,12/31/2023 23:45,01/01/2024 00:30,ART,1
4,2024-01-01T03:30:00,,IVT,1
";

/// Writes stops and a scenario file; returns the scenario path.
fn write_scenario(temp: &Path, extra: &str) -> std::path::PathBuf {
    let stops = temp.join("stops.csv");
    std::fs::write(&stops, STOPS).unwrap();

    let scenario = temp.join("scenario.toml");
    let contents = format!(
        r#"
scenario_name = "e2e"
stop_data_csv = "{stops}"
cat_field = "PatType"
start_analysis = "2024-01-01 00:00"
end_analysis = "2024-01-01 04:00"
bin_size_minutes = 60
output_path = "{out}"
{extra}
"#,
        stops = stops.display(),
        out = temp.join("out").display(),
    );
    std::fs::write(&scenario, contents).unwrap();
    scenario
}

fn occ(temp: &Path, scenario: &Path, args: &[&str]) -> Output {
    Command::new(occ_binary())
        .env("HOME", temp)
        .env("XDG_CONFIG_HOME", temp.join(".config"))
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(scenario)
        .args(args)
        .output()
        .expect("failed to run occ")
}

#[test]
fn run_exports_tables_and_prints_digest() {
    let temp = TempDir::new().unwrap();
    let scenario = write_scenario(
        temp.path(),
        r#"
missing_exit = "end_of_analysis"
occ_weight_field = "Weight"
"#,
    );

    let output = occ(temp.path(), &scenario, &["run"]);
    assert!(
        output.status.success(),
        "occ run should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("scenario e2e: 4 stays, 4 bins of 60 minutes"));
    // IVT: weighted stay 2 plus stay 4 held open until the window end
    assert!(stdout.contains("IVT: arrivals 2, departures 2, peak occupancy 1.50"));

    let out = temp.path().join("out");
    let ivt = std::fs::read_to_string(out.join("e2e_bydatetime_IVT.csv")).unwrap();
    let lines: Vec<_> = ivt.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(
        lines[1],
        "2024-01-01 00:00:00,1.000000,0.000000,1.000000,0,Mon,0,0"
    );
    assert_eq!(
        lines[4],
        "2024-01-01 03:00:00,1.000000,1.000000,0.500000,0,Mon,3,3"
    );

    for metric in ["occupancy", "arrivals", "departures"] {
        assert!(out.join(format!("e2e_{metric}_nonstationary.csv")).exists());
        assert!(out.join(format!("e2e_{metric}_stationary.csv")).exists());
    }
}

#[test]
fn dropped_exits_and_excluded_categories() {
    let temp = TempDir::new().unwrap();
    let scenario = write_scenario(temp.path(), r#"cats_to_exclude = ["ART"]"#);

    let output = occ(temp.path(), &scenario, &["classify"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        stdout,
        "IVT: inner 1, left 0, right 0, outer 0, backwards 0, none 0\n\
         total: inner 1, left 0, right 0, outer 0, backwards 0, none 0\n"
    );
}

#[test]
fn environment_overrides_scenario_file() {
    let temp = TempDir::new().unwrap();
    let scenario = write_scenario(temp.path(), "");

    let output = Command::new(occ_binary())
        .env("HOME", temp.path())
        .env("XDG_CONFIG_HOME", temp.path().join(".config"))
        .env("OCC_BIN_SIZE_MINUTES", "30")
        .arg("--config")
        .arg(&scenario)
        .arg("run")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("scenario e2e: 3 stays, 8 bins of 30 minutes"));
}

#[test]
fn invalid_scenario_fails_with_context() {
    let temp = TempDir::new().unwrap();
    let scenario = write_scenario(temp.path(), r#"edge_bins = "partial""#);

    let output = occ(temp.path(), &scenario, &["run"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid scenario configuration"), "{stderr}");
    assert!(!temp.path().join("out").exists());
}
