#![allow(deprecated)] // cargo_bin is deprecated but still functional

use assert_cmd::Command;
use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::net::TcpListener;
use tempfile::TempDir;

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// `splicectl` isolated from the user's config file and environment.
fn splicectl(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("splicectl").unwrap();
    cmd.env("SPLICE_CLIENT_CONFIG", temp.path().join("client.toml"))
        .env_remove("SPLICECTL_SERVER")
        .env_remove("SPLICECTL_CHUNK_SIZE")
        .env_remove("SPLICECTL_PARALLELISM");
    cmd
}

fn hex_of_len(len: usize) -> impl Predicate<str> {
    predicates::str::is_match(format!("^[0-9a-f]{{{len}}}  ")).unwrap()
}

#[test]
fn fingerprint_prints_digest_and_size() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("data.bin");
    fs::write(&file, vec![7u8; 3000]).unwrap();

    splicectl(&temp)
        .arg("fingerprint")
        .arg(&file)
        .assert()
        .success()
        .stdout(hex_of_len(64))
        .stdout(contains("  3000  "));

    splicectl(&temp)
        .args(["fingerprint", "--algorithm", "md5"])
        .arg(&file)
        .assert()
        .success()
        .stdout(hex_of_len(32));
}

#[test]
fn algorithm_flag_accepts_every_spelling_of_sha256() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("data.bin");
    fs::write(&file, b"spelled differently").unwrap();

    let digest = |algorithm: &str| {
        let out = splicectl(&temp)
            .args(["fingerprint", "--algorithm", algorithm])
            .arg(&file)
            .output()
            .unwrap();
        assert!(out.status.success(), "--algorithm {algorithm} was rejected");
        String::from_utf8(out.stdout).unwrap()
    };
    let expected = digest("sha256");
    assert_eq!(digest("sha-256"), expected);
    assert_eq!(digest("SHA-256"), expected);

    splicectl(&temp)
        .args(["fingerprint", "--algorithm", "crc32"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(contains("unknown digest algorithm"));
}

#[test]
fn fingerprint_is_stable_across_runs() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("data.bin");
    fs::write(&file, b"the same bytes every time").unwrap();

    let run = || {
        let out = splicectl(&temp)
            .arg("fingerprint")
            .arg(&file)
            .output()
            .unwrap();
        String::from_utf8(out.stdout).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn fingerprint_of_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    splicectl(&temp)
        .arg("fingerprint")
        .arg(temp.path().join("missing.bin"))
        .assert()
        .failure()
        .stderr(contains("missing.bin"));
}

#[test]
fn config_show_layers_file_env_and_flags() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("client.toml"),
        "server = \"http://from-file:1\"\nchunk_size = 131072\n",
    )
    .unwrap();

    splicectl(&temp)
        .env("SPLICECTL_PARALLELISM", "3")
        .args(["config", "show", "--server", "http://from-flag:2"])
        .assert()
        .success()
        .stdout(contains("server = \"http://from-flag:2\""))
        .stdout(contains("chunk_size = 131072"))
        .stdout(contains("parallelism = 3"));
}

#[test]
fn config_init_writes_file_once() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("client.toml");

    splicectl(&temp)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(contains("Wrote"));
    let contents = fs::read_to_string(&path).unwrap();
    let value: toml::Value = toml::from_str(&contents).unwrap();
    assert_eq!(
        value.get("chunk_size").and_then(|v| v.as_integer()),
        Some(1024 * 1024)
    );

    splicectl(&temp)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(contains("already exists"));
}

#[test]
fn push_rejects_chunk_size_out_of_range() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("data.bin");
    fs::write(&file, b"abc").unwrap();

    splicectl(&temp)
        .args(["push", "--chunk-size", "10"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(contains("invalid client configuration"));
}

#[test]
fn push_resumes_and_merges_against_server() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("movie.mp4");
    // Three 64 KiB chunks; the server already has chunk 1
    fs::write(&file, vec![1u8; 3 * 64 * 1024]).unwrap();

    let resume = server.mock(|when, then| {
        when.method(GET).path("/upload/chunks");
        then.status(200)
            .json_body(serde_json::json!({"success": true, "data": [1]}));
    });
    let upload0 = server.mock(|when, then| {
        when.method(POST).path("/upload").query_param("index", "0");
        then.status(200)
            .json_body(serde_json::json!({"code": 200, "success": true, "message": "ok"}));
    });
    let upload1 = server.mock(|when, then| {
        when.method(POST).path("/upload").query_param("index", "1");
        then.status(200)
            .json_body(serde_json::json!({"code": 200, "success": true, "message": "ok"}));
    });
    let upload2 = server.mock(|when, then| {
        when.method(POST).path("/upload").query_param("index", "2");
        then.status(200)
            .json_body(serde_json::json!({"code": 200, "success": true, "message": "ok"}));
    });
    let merge = server.mock(|when, then| {
        when.method(POST)
            .path("/upload/merge")
            .body_contains("\"fileName\":\"movie.mp4\"")
            .body_contains("\"total\":3");
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "message": "merged",
            "url": "/assets/abc-movie.mp4"
        }));
    });

    splicectl(&temp)
        .args(["push", "--chunk-size", "65536", "--server"])
        .arg(server.base_url())
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("/assets/abc-movie.mp4"))
        .stderr(contains("1/3 chunks already on server"));

    resume.assert_hits(1);
    upload0.assert_hits(1);
    upload1.assert_hits(0);
    upload2.assert_hits(1);
    merge.assert_hits(1);
}

#[test]
fn push_reports_failing_chunk_index() {
    if !can_bind_localhost() {
        eprintln!("Skipping httpmock tests: cannot bind to localhost");
        return;
    }

    let server = MockServer::start();
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("data.bin");
    fs::write(&file, vec![2u8; 2 * 64 * 1024]).unwrap();

    server.mock(|when, then| {
        when.method(GET).path("/upload/chunks");
        then.status(200)
            .json_body(serde_json::json!({"success": true, "data": []}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/upload").query_param("index", "0");
        then.status(200)
            .json_body(serde_json::json!({"code": 200, "success": true, "message": "ok"}));
    });
    server.mock(|when, then| {
        when.method(POST).path("/upload").query_param("index", "1");
        then.status(400).json_body(serde_json::json!({
            "success": false,
            "message": "bad chunk",
            "error": "invalid_chunk_request"
        }));
    });
    let merge = server.mock(|when, then| {
        when.method(POST).path("/upload/merge");
        then.status(200);
    });

    splicectl(&temp)
        .args(["push", "--quiet", "--chunk-size", "65536", "--server"])
        .arg(server.base_url())
        .arg(&file)
        .assert()
        .failure()
        .stderr(contains("chunk 1").and(contains("bad chunk")));

    merge.assert_hits(0);
}
