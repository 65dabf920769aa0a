// End-to-end tests of the permis binary.
//
// Each test builds a small data directory in a tempdir and runs the real
// binary against it.
//
// Run with: cargo test -p permis-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const HEADER: &str = "Code de la commune du lieu des travaux;Année de dépôt de la DAU;\
Dénomination d'un demandeur avéré en tant que personne morale;\
Numéro SIREN d'un demandeur avéré en tant que personne morale;\
Numéro SIRET d'un demandeur avéré en tant que personne morale;\
Numéro d'enregistrement de la DAU;Localité du terrain";

fn permis(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_permis"));
    cmd.current_dir(dir);
    cmd.env_remove("PERMIS_CONFIG");
    cmd.env_remove("PERMIS_DATA_DIR");
    cmd.env_remove("RUST_LOG");
    cmd.arg("--config").arg(dir.join("permis.toml"));
    cmd
}

fn setup(dir: &Path) {
    let data = dir.join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(
        dir.join("permis.toml"),
        r#"
data_dir = "data"
communes_file = "communes.csv"

[[sources]]
project_type = "housing"
file = "logements.csv"

[[sources]]
project_type = "demolition"
file = "demolir.csv"

[[sources]]
project_type = "land_development"
file = "amenager.csv"
"#,
    )
    .unwrap();
    fs::write(data.join("communes.csv"), "Commune,Code INSEE\nTOULOUSE,31555\nBLAGNAC,31069\n").unwrap();
    fs::write(
        data.join("logements.csv"),
        format!(
            "{HEADER}\n\
             31555;2021;LP PROMOTION BOREAL;401234567;40123456700018;PC 1;TOULOUSE\n\
             31069;2022;NEXITY IMMOBILIER;572015246;;PC 2;BLAGNAC\n\
             31003;2022;HORS PERIMETRE;;;PC 3;AUSSONNE\n\
             31555;n/a;SANS ANNEE;;;PC 4;TOULOUSE\n"
        ),
    )
    .unwrap();
    fs::write(
        data.join("demolir.csv"),
        format!("{HEADER}\n31555;2020;COGEDIM;054500814;;PD 1;TOULOUSE\n"),
    )
    .unwrap();
    // amenager.csv intentionally absent
    fs::write(data.join("Data PC - NEXITY.csv"), "SIREN\n572 015 246\n").unwrap();
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn json(out: &Output) -> serde_json::Value {
    serde_json::from_str(stdout(out).trim())
        .unwrap_or_else(|e| panic!("stdout must be one JSON value: {e}\n{}", stdout(out)))
}

// ===========================================================================
// load
// ===========================================================================

#[test]
fn load_reports_sources() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let out = permis(dir.path()).args(["load", "--json"]).output().unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let v = json(&out);
    assert_eq!(v["records"], 3);
    assert_eq!(v["communes"], 2);
    assert_eq!(v["groups"], 1);

    let sources = v["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 3);
    assert_eq!(sources[0]["status"]["kind"], "loaded");
    assert_eq!(sources[0]["status"]["log"]["rows_outside_communes"], 1);
    assert_eq!(sources[0]["status"]["log"]["rows_invalid_year"], 1);
    assert_eq!(sources[2]["status"]["kind"], "missing");
}

#[test]
fn load_text_output() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let out = permis(dir.path()).arg("load").output().unwrap();
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("amenager.csv  missing"));
    assert!(text.contains("3 records, 2 communes, 1 groups"));
}

// ===========================================================================
// search
// ===========================================================================

#[test]
fn search_name_writes_csv() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let out = permis(dir.path()).args(["search", "name", "lp-promotion"]).output().unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("project_type;permit_number;"));
    assert!(lines[1].starts_with("Logements;PC 1;2021;31555;LP PROMOTION BOREAL;401234567;"));
}

#[test]
fn search_group_combines_siren_and_keyword() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let out = permis(dir.path()).args(["search", "group", "NEXITY", "--json"]).output().unwrap();
    assert!(out.status.success());
    let v = json(&out);
    assert_eq!(v["status"], "results");
    assert_eq!(v["count"], 1);
    assert_eq!(v["records"][0]["applicant_siren"], "572015246");
}

#[test]
fn short_query_is_no_search() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let out = permis(dir.path()).args(["search", "siren", "4"]).output().unwrap();
    assert!(out.status.success());
    assert!(stdout(&out).is_empty());
    assert!(stderr(&out).contains("no search entered (siren queries"));

    let out = permis(dir.path()).args(["search", "name", "--"]).output().unwrap();
    assert!(out.status.success());
    assert!(stdout(&out).is_empty());
    assert!(stderr(&out).contains("no search entered (name queries"));

    let out = permis(dir.path()).args(["search", "name", "x", "--json"]).output().unwrap();
    assert_eq!(json(&out)["status"], "no_query");
}

#[test]
fn empty_result_is_not_no_search() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let out = permis(dir.path()).args(["search", "name", "bouygues", "--json"]).output().unwrap();
    assert!(out.status.success());
    let v = json(&out);
    assert_eq!(v["status"], "results");
    assert_eq!(v["count"], 0);
}

#[test]
fn search_all_to_file() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());
    let target = dir.path().join("export.csv");

    let out = permis(dir.path())
        .args(["search", "all", "-o"])
        .arg(&target)
        .output()
        .unwrap();
    assert!(out.status.success());
    let content = fs::read_to_string(&target).unwrap();
    assert_eq!(content.lines().count(), 4);
    assert!(content.lines().nth(3).unwrap().starts_with("Démolition;PD 1;2020;"));
}

#[test]
fn group_search_requires_a_name() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let out = permis(dir.path()).args(["search", "group"]).output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("permis groups"));
}

// ===========================================================================
// groups, stats, validate
// ===========================================================================

#[test]
fn groups_lists_files() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let out = permis(dir.path()).arg("groups").output().unwrap();
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), "NEXITY\t1 SIREN");
}

#[test]
fn stats_json() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let out = permis(dir.path()).args(["stats", "--threshold", "1", "--json"]).output().unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let v = json(&out);
    assert_eq!(v["summary"]["records"], 3);
    assert_eq!(v["summary"]["first_year"], 2020);
    assert_eq!(v["summary"]["last_year"], 2022);
    assert_eq!(v["by_project_type"][0]["count"], 2);
    assert_eq!(v["top_applicants"].as_array().unwrap().len(), 3);
    assert_eq!(v["top_localities"][0]["label"], "TOULOUSE");
}

#[test]
fn validate_reports_missing_source() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());

    let out = permis(dir.path()).args(["validate", "--json"]).output().unwrap();
    assert!(out.status.success());
    let v = json(&out);
    assert_eq!(v["valid"], true);
    assert_eq!(v["sources"][0]["exists"], true);
    assert_eq!(v["sources"][2]["exists"], false);
    assert_eq!(v["communes_file"]["exists"], true);
}

// ===========================================================================
// Exit codes
// ===========================================================================

#[test]
fn invalid_config_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("permis.toml"), "[year_range]\nmin = 2030\nmax = 2000\n").unwrap();

    let out = permis(dir.path()).arg("load").output().unwrap();
    assert_eq!(out.status.code(), Some(5));
    assert!(stderr(&out).contains("year_range"));
}

#[test]
fn missing_config_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let out = permis(dir.path()).arg("load").output().unwrap();
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn undecodable_source_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());
    fs::write(dir.path().join("data/demolir.csv"), [0xFFu8, 0x81, 0x9D]).unwrap();

    let out = permis(dir.path()).arg("load").output().unwrap();
    assert_eq!(out.status.code(), Some(11));
    assert!(stderr(&out).contains("neither UTF-8 nor Windows-1252"));
}

#[test]
fn data_dir_override() {
    let dir = tempfile::tempdir().unwrap();
    setup(dir.path());
    fs::rename(dir.path().join("data"), dir.path().join("elsewhere")).unwrap();

    let out = permis(dir.path())
        .args(["load", "--json", "--data-dir", "elsewhere"])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(json(&out)["records"], 3);
}
