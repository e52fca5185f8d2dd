use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn vta_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_vta"))
}

/// Creates a course tree and a config pointing at it; returns the config path.
fn setup_test_env(endpoint: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let content = root.join("content");
    fs::create_dir_all(content.join("week1")).unwrap();
    fs::write(
        content.join("week1/setup.md"),
        "# Setup\n\nInstall **Python 3.12** and create a virtual environment.",
    )
    .unwrap();
    fs::write(
        content.join("grading.md"),
        "# Grading\n\nGraded assignments are due on Sunday at midnight.",
    )
    .unwrap();

    fs::write(
        root.join("forum_context.txt"),
        "\n--- GA1 deadline ---\n\nalice: Is GA1 due Sunday?\nbob: Yes.",
    )
    .unwrap();

    let config_content = format!(
        r#"[server]
bind = "127.0.0.1:0"

[context]
course_path = "{root}/course_context.txt"
forum_path = "{root}/forum_context.txt"

[completion]
endpoint = "{endpoint}"
timeout_secs = 5
api_key_env = "VTA_INTEGRATION_TOKEN"

[collectors.course]
root = "{root}/content"
"#,
        root = root.display(),
        endpoint = endpoint,
    );

    let config_path = root.join("vta.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_vta(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = vta_binary();
    let workdir = config_path.parent().unwrap();
    let output = Command::new(&binary)
        .current_dir(workdir)
        .env("VTA_INTEGRATION_TOKEN", "integration-token")
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run vta binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_collect_course_writes_corpus() {
    let (tmp, config_path) = setup_test_env("http://127.0.0.1:9/unused");

    let (stdout, stderr, success) = run_vta(&config_path, &["collect", "course"]);
    assert!(success, "collect failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("collected 2 course files"));

    let corpus = fs::read_to_string(tmp.path().join("course_context.txt")).unwrap();
    let grading = corpus.find("grading.md ---").unwrap();
    let setup = corpus.find("setup.md ---").unwrap();
    assert!(grading < setup, "files should be in path order");
    assert!(corpus.contains("due on Sunday at midnight"));
    assert!(!corpus.contains("<p>"));
}

#[test]
fn test_prompt_uses_both_corpora() {
    let (_tmp, config_path) = setup_test_env("http://127.0.0.1:9/unused");

    run_vta(&config_path, &["collect", "course"]);
    let (stdout, stderr, success) = run_vta(&config_path, &["prompt", "When is GA1 due?"]);
    assert!(success, "prompt failed: stderr={}", stderr);
    assert!(stdout.contains("virtual environment"));
    assert!(stdout.contains("alice: Is GA1 due Sunday?"));
    assert!(stdout.contains("When is GA1 due?"));
}

#[test]
fn test_prompt_without_course_corpus_fails() {
    let (_tmp, config_path) = setup_test_env("http://127.0.0.1:9/unused");

    let (_, stderr, success) = run_vta(&config_path, &["prompt", "anything"]);
    assert!(!success);
    assert!(stderr.contains("course_context.txt"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (tmp, _) = setup_test_env("http://127.0.0.1:9/unused");
    let bad = tmp.path().join("bad.toml");
    fs::write(&bad, "[context]\ncourse_max_chars = 0\n").unwrap();

    let (_, stderr, success) = run_vta(&bad, &["prompt", "q"]);
    assert!(!success);
    assert!(stderr.contains("course_max_chars"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ask_normalizes_fenced_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer integration-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "```json\n{\"answer\": \"Sunday at midnight.\", \"links\": [\"https://forum.example/t/ga1/1\"]}\n```"
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = format!("{}/v1/chat/completions", server.uri());
    let (_tmp, config_path) = setup_test_env(&endpoint);

    let (stdout, stderr, success) = tokio::task::spawn_blocking(move || {
        run_vta(&config_path, &["collect", "course"]);
        run_vta(&config_path, &["ask", "When is GA1 due?"])
    })
    .await
    .unwrap();
    assert!(success, "ask failed: stderr={}", stderr);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["answer"], "Sunday at midnight.");
    assert_eq!(json["links"][0]["url"], "https://forum.example/t/ga1/1");
    assert_eq!(json["links"][0]["text"], "Related discussion");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_ask_upstream_error_prints_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let endpoint = format!("{}/v1/chat/completions", server.uri());
    let (_tmp, config_path) = setup_test_env(&endpoint);

    let (stdout, _, success) = tokio::task::spawn_blocking(move || {
        run_vta(&config_path, &["collect", "course"]);
        run_vta(&config_path, &["ask", "anything"])
    })
    .await
    .unwrap();
    assert!(success);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["answer"], "There was an error generating a response.");
    assert_eq!(json["links"], serde_json::json!([]));
}
