use predicates::prelude::*;

#[test]
fn missing_config_is_a_hard_stop() {
    let temp = tempfile::TempDir::new().unwrap();
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bookcrawl");
    cmd.current_dir(temp.path())
        .args(["generate-pages"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("load config"));
}

#[test]
fn empty_config_is_a_hard_stop() {
    let temp = tempfile::TempDir::new().unwrap();
    let config = temp.path().join("bookcrawl.yaml");
    std::fs::write(&config, "\n").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bookcrawl");
    cmd.arg("--config")
        .arg(&config)
        .args(["generate-pages"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no sections"));
}

#[test]
fn invalid_range_writes_an_empty_page_list() {
    let temp = tempfile::TempDir::new().unwrap();
    let data = temp.path().join("data");
    let config = temp.path().join("bookcrawl.yaml");
    std::fs::write(
        &config,
        format!("app:\n  data_dir: {}\n", data.display()),
    )
    .unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bookcrawl");
    cmd.arg("--config")
        .arg(&config)
        .args(["generate-pages", "--from", "5", "--to", "5"])
        .assert()
        .success();

    assert_eq!(
        std::fs::read_to_string(data.join("book_pages.txt")).unwrap(),
        ""
    );
}

#[test]
fn unreachable_store_is_a_hard_stop() {
    let temp = tempfile::TempDir::new().unwrap();
    let config = temp.path().join("bookcrawl.yaml");
    let blocker = temp.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();
    std::fs::write(
        &config,
        format!(
            "app:\n  data_dir: {}\nstore:\n  database_url: sqlite://{}\n",
            temp.path().join("data").display(),
            blocker.join("books.db").display(),
        ),
    )
    .unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bookcrawl");
    cmd.arg("--config")
        .arg(&config)
        .args(["download-resources"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("open book store"));
}

#[test]
fn rust_log_debug_emits_parsed_cli() {
    let temp = tempfile::TempDir::new().unwrap();
    let config = temp.path().join("bookcrawl.yaml");
    std::fs::write(
        &config,
        format!("app:\n  data_dir: {}\n", temp.path().join("data").display()),
    )
    .unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bookcrawl");
    cmd.env("RUST_LOG", "debug")
        .arg("--config")
        .arg(&config)
        .args(["generate-pages", "--from", "1", "--to", "2"])
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
}
