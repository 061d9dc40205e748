use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;
use wayfare_cli::commands::{config, submit};
use wayfare_core::config::LoadOptions;

#[test]
fn config_reports_env_source_and_redacts_api_key() {
    with_env(
        &[
            ("WAYFARE_LEADS_ENDPOINT", "https://leads.example.com/api"),
            ("WAYFARE_LEADS_API_KEY", "wf-live-0123456789"),
            ("WAYFARE_LOG_LEVEL", "warn"),
        ],
        || {
            let result = config::run(LoadOptions::default());
            assert_eq!(result.exit_code, 0, "expected config inspection success");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "config");
            assert_eq!(payload["status"], "ok");

            let message = payload["message"].as_str().unwrap_or_default();
            let endpoint_line = "- leads.endpoint = https://leads.example.com/api \
                                 (source: env (WAYFARE_LEADS_ENDPOINT))";
            let api_key_line = "- leads.api_key = wf-l*** (source: env (WAYFARE_LEADS_API_KEY))";
            assert!(message.contains(endpoint_line), "unexpected config output: {message}");
            assert!(message.contains(api_key_line));
            assert!(message.contains("- logging.level = warn (source: env (WAYFARE_LOG_LEVEL))"));
            assert!(message.contains("- client.locale = pt-BR (source: default)"));
            assert!(!message.contains("0123456789"));
        },
    );
}

#[test]
fn config_reports_file_source() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let path = write_file(
            dir.path(),
            "wayfare.toml",
            "[client]\nsource = \"wayfare-landing\"\n",
        );

        let result = config::run(options_with_file(path.clone()));
        let payload = parse_payload(&result.output);
        let message = payload["message"].as_str().unwrap_or_default();

        assert!(message.contains(&format!(
            "- client.source = wayfare-landing (source: file ({}))",
            path.display()
        )));
    });
}

#[test]
fn config_returns_validation_failure_for_bad_endpoint() {
    with_env(&[("WAYFARE_LEADS_ENDPOINT", "leads.example.com")], || {
        let result = config::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn submit_dry_run_prints_payload_without_sending() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let answers = write_answers(dir.path(), &complete_answers());

        let result = submit::run(LoadOptions::default(), &answers, true);
        assert_eq!(result.exit_code, 0, "expected dry run success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "submit");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["services"], json!(["flight", "hotel"]));
        assert_eq!(payload["data"]["serviceData"]["hotel"]["nights"], 4);
        assert_eq!(payload["data"]["flexibleDates"], true);
        assert_eq!(payload["data"]["metadata"]["attempt"], 1);
        assert_eq!(payload["data"]["metadata"]["mode"], "guided");
    });
}

#[test]
fn submit_reports_blocked_step_and_missing_fields() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let mut answers = complete_answers();
        answers["personal"]["email"] = json!("ana.example.com");
        let answers = write_answers(dir.path(), &answers);

        let result = submit::run(LoadOptions::default(), &answers, true);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "validation_blocked");
        assert_eq!(payload["data"]["step"], "personal");
        assert_eq!(payload["data"]["missingFields"], json!(["email"]));
    });
}

#[test]
fn submit_rejects_unreadable_answers() {
    with_env(&[], || {
        let dir = TempDir::new().expect("temp dir");
        let path = write_file(dir.path(), "answers.json", "{ \"services\": [\"cruise\"] }");

        let result = submit::run(LoadOptions::default(), &path, true);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
        assert!(payload["message"].as_str().unwrap_or_default().contains("answers.json"));
    });
}

#[test]
fn submit_posts_lead_to_configured_endpoint() {
    let fake = FakeEndpoint::start();
    let endpoint = fake.url("/leads");

    with_env(&[("WAYFARE_LEADS_ENDPOINT", endpoint.as_str())], || {
        let dir = TempDir::new().expect("temp dir");
        let answers = write_answers(dir.path(), &complete_answers());

        let result = submit::run(LoadOptions::default(), &answers, false);
        assert_eq!(result.exit_code, 0, "expected submission success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["leadId"], "CRM-100");
    });

    let received = fake.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["email"], "ana@example.com");
    assert_eq!(received[0]["metadata"]["source"], "wayfare-web");
}

#[test]
fn submit_surfaces_endpoint_rejection_reason() {
    let fake = FakeEndpoint::start();
    let endpoint = fake.url("/reject");

    with_env(&[("WAYFARE_LEADS_ENDPOINT", endpoint.as_str())], || {
        let dir = TempDir::new().expect("temp dir");
        let answers = write_answers(dir.path(), &complete_answers());

        let result = submit::run(LoadOptions::default(), &answers, false);
        assert_eq!(result.exit_code, 4);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "submission_rejected");
        assert_eq!(payload["message"], "Telefone inválido");
        assert_eq!(payload["data"]["retryable"], true);
    });
}

/// Leads endpoint served from its own runtime, so the command under test can
/// build and block on a runtime of its own.
struct FakeEndpoint {
    _runtime: tokio::runtime::Runtime,
    address: std::net::SocketAddr,
    received: Arc<Mutex<Vec<Value>>>,
}

impl FakeEndpoint {
    fn start() -> Self {
        async fn accept(
            State(received): State<Arc<Mutex<Vec<Value>>>>,
            Json(body): Json<Value>,
        ) -> Json<Value> {
            received.lock().expect("received lock").push(body);
            Json(json!({ "success": true, "id": "CRM-100" }))
        }

        async fn reject() -> (StatusCode, Json<Value>) {
            let body = json!({ "success": false, "message": "Telefone inválido" });
            (StatusCode::BAD_REQUEST, Json(body))
        }

        let runtime = tokio::runtime::Runtime::new().expect("fake endpoint runtime");
        let received = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route("/leads", post(accept))
            .route("/reject", post(reject))
            .with_state(Arc::clone(&received));

        let listener = runtime
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .expect("bind fake endpoint");
        let address = listener.local_addr().expect("fake endpoint address");
        runtime.spawn(async move {
            axum::serve(listener, router).await.expect("fake endpoint serves");
        });

        Self { _runtime: runtime, address, received }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.address)
    }

    fn received(&self) -> Vec<Value> {
        self.received.lock().expect("received lock").clone()
    }
}

fn complete_answers() -> Value {
    json!({
        "services": ["hotel", "flight"],
        "personal": {
            "name": "Ana Souza",
            "email": "ana@example.com",
            "phone": "+5581999990000",
            "origin_city": "Recife"
        },
        "service_data": {
            "flight": { "from": "REC", "to": "LIS", "adults": 2 },
            "hotel": { "city": "Lisboa", "nights": 4 }
        },
        "shared": { "budget": "premium", "notes": "honeymoon", "flexible_dates": true }
    })
}

fn write_answers(dir: &Path, answers: &Value) -> PathBuf {
    write_file(dir, "answers.json", &answers.to_string())
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write test file");
    path
}

fn options_with_file(path: PathBuf) -> LoadOptions {
    LoadOptions { config_path: Some(path), require_file: true, ..LoadOptions::default() }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    let keys = [
        "WAYFARE_LEADS_ENDPOINT",
        "WAYFARE_LEADS_API_KEY",
        "WAYFARE_LEADS_TIMEOUT_SECS",
        "WAYFARE_CLIENT_SOURCE",
        "WAYFARE_CLIENT_CHANNEL",
        "WAYFARE_CLIENT_LOCALE",
        "WAYFARE_CLIENT_USER_AGENT",
        "WAYFARE_LOGGING_LEVEL",
        "WAYFARE_LOGGING_FORMAT",
        "WAYFARE_LOG_LEVEL",
        "WAYFARE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
