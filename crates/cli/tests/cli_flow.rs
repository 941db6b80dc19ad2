use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn setup(strategy: &str) -> TempDir {
    let temp = tempdir().unwrap();
    fs::write(
        temp.path().join("mapmark.toml"),
        format!(
            r#"
            [features]
            strategy = "{strategy}"

            [storage]
            data_dir = "data"

            [recommend]
            delay_ms = 0
            "#
        ),
    )
    .unwrap();
    temp
}

#[allow(deprecated)]
fn mapmark(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("mapmark").expect("binary");
    cmd.current_dir(workdir)
        .env_remove("MAPMARK_CONFIG")
        .env_remove("MAPMARK_DATA_DIR")
        .env_remove("MAPMARK_STRATEGY")
        .env_remove("MAPMARK_PERSISTENCE")
        .env("MAPMARK_DELAY_MS", "0")
        .arg("--config")
        .arg(workdir.join("mapmark.toml"));
    cmd
}

fn run_json(workdir: &Path, args: &[&str]) -> Value {
    let output = mapmark(workdir).args(args).output().expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn add_list_remove_persists_between_runs() {
    let temp = setup("keyword");
    let root = temp.path();

    let first = run_json(root, &["add", "--lat=40.70", "--lng=-74.00", "--json"]);
    assert_eq!(first["name"], "NYC Location 1");

    let second = run_json(
        root,
        &["add", "--lat=40.75", "--lng=-73.98", "--name", "Bryant Park", "-d", "*lawn*", "--json"],
    );
    assert_eq!(second["description"], "*lawn*");
    assert!(root.join("data/markers.json").is_file());

    let listed = run_json(root, &["list", "--json"]);
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["NYC Location 1", "Bryant Park"]);

    let first_id = first["id"].as_str().unwrap();
    mapmark(root)
        .args(["remove", first_id])
        .assert()
        .success()
        .stdout(contains("Removed"));

    let listed = run_json(root, &["list", "--json"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["name"], "Bryant Park");
}

#[test]
fn ask_adds_keyword_suggestion() {
    let temp = setup("keyword");
    let root = temp.path();
    run_json(root, &["add", "--lat=40.70", "--lng=-74.00", "--name", "Home", "--json"]);

    let outcome = run_json(root, &["ask", "I want food", "--json"]);
    assert_eq!(
        outcome["recommendation"]["candidates"][0]["name"],
        "The Culinary Corner"
    );
    assert_eq!(outcome["added"]["name"], "The Culinary Corner");

    let listed = run_json(root, &["list", "--json"]);
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[test]
fn ask_without_match_adds_nothing() {
    let temp = setup("keyword");
    let root = temp.path();

    let outcome = run_json(root, &["ask", "xyz", "--json"]);
    assert!(outcome["added"].is_null());
    assert!(outcome["recommendation"]["candidates"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[test]
fn similar_uses_vector_index() {
    let temp = setup("similarity");
    let root = temp.path();

    let park = run_json(
        root,
        &["add", "--lat=40.75", "--lng=-73.98", "--name", "Bryant Park", "-d", "trees lawn", "--json"],
    );
    run_json(
        root,
        &["add", "--lat=40.78", "--lng=-73.96", "--name", "Central Park", "-d", "trees lake", "--json"],
    );
    assert!(root.join("data/vectors.json").is_file());

    let similar = run_json(root, &["similar", park["id"].as_str().unwrap(), "--json"]);
    let rows = similar.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Central Park");
}

#[test]
fn marker_removed_under_keyword_strategy_stays_gone() {
    let temp = setup("similarity");
    let root = temp.path();

    let park = run_json(
        root,
        &["add", "--lat=40.75", "--lng=-73.98", "--name", "Bryant Park", "-d", "trees lawn", "--json"],
    );
    let gone = run_json(
        root,
        &["add", "--lat=40.78", "--lng=-73.96", "--name", "Central Park", "-d", "trees lake", "--json"],
    );

    mapmark(root)
        .args(["--strategy", "keyword", "remove", gone["id"].as_str().unwrap()])
        .assert()
        .success();

    let similar = run_json(root, &["similar", park["id"].as_str().unwrap(), "--json"]);
    assert!(similar.as_array().unwrap().is_empty());

    mapmark(root)
        .arg("reindex")
        .assert()
        .success()
        .stdout(contains("Reindexed 1 markers, pruned 1 stale vectors"));
}

#[test]
fn similar_requires_similarity_strategy() {
    let temp = setup("keyword");
    mapmark(temp.path())
        .args(["similar", "1"])
        .assert()
        .failure()
        .stderr(contains("Similarity search is not enabled"));
}

#[test]
fn image_is_inlined_as_data_uri() {
    let temp = setup("keyword");
    let root = temp.path();
    let image = root.join("dot.png");
    fs::write(&image, b"abc").unwrap();

    let marker = run_json(
        root,
        &["add", "--lat=1", "--lng=2", "--image", image.to_str().unwrap(), "--json"],
    );
    assert_eq!(
        marker["description"],
        "![dot.png](data:image/png;base64,YWJj)\n"
    );
}

#[test]
fn chat_reads_stdin_lines() {
    let temp = setup("keyword");
    mapmark(temp.path())
        .arg("--no-persist")
        .arg("chat")
        .write_stdin("looking for a park\n\n/quit\n")
        .assert()
        .success()
        .stdout(contains("Greenview Park"))
        .stdout(contains("Added"));
}
