//! Test harness: a fake Cloudflare rulesets API plus the provisioner's own
//! router, both served on ephemeral local ports.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use waf_provisioner::cloudflare::CloudflareClient;
use waf_provisioner::{server, ApiToken, CredentialResolver, Provisioner};

pub const CUSTOM_PHASE: &str = "http_request_firewall_custom";

/// Recorded remote request: method, raw (still percent-encoded) path, bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seen {
    pub method: &'static str,
    pub path: String,
    pub token: String,
}

#[derive(Default)]
pub struct FakeCloudflare {
    /// zone -> [(ruleset id, phase)]
    zones: HashMap<String, Vec<(String, String)>>,
    /// ruleset id -> rules
    rules: Mutex<HashMap<String, Vec<Value>>>,
    /// descriptions whose create returns a success=false envelope
    reject_create: HashSet<String>,
    /// rule ids whose delete returns a success=false envelope
    reject_delete: HashSet<String>,
    /// rule ids whose delete returns HTTP 500
    error_delete: HashSet<String>,
    seen: Mutex<Vec<Seen>>,
    next_id: Mutex<u32>,
}

impl FakeCloudflare {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zone(mut self, zone: &str, ruleset_id: &str) -> Self {
        self.zones.insert(
            zone.into(),
            vec![
                ("managed-rs".into(), "http_request_firewall_managed".into()),
                (ruleset_id.into(), CUSTOM_PHASE.into()),
            ],
        );
        self
    }

    pub fn zone_without_custom_ruleset(mut self, zone: &str) -> Self {
        self.zones.insert(
            zone.into(),
            vec![("managed-rs".into(), "http_request_firewall_managed".into())],
        );
        self
    }

    pub fn reject_create(mut self, description: &str) -> Self {
        self.reject_create.insert(description.into());
        self
    }

    pub fn reject_delete(mut self, rule_id: &str) -> Self {
        self.reject_delete.insert(rule_id.into());
        self
    }

    pub fn error_delete(mut self, rule_id: &str) -> Self {
        self.error_delete.insert(rule_id.into());
        self
    }

    pub fn seed_rule(&self, ruleset_id: &str, id: &str, description: &str) {
        self.rules
            .lock()
            .unwrap()
            .entry(ruleset_id.into())
            .or_default()
            .push(json!({
                "id": id,
                "action": "block",
                "description": description,
                "expression": "(ip.src eq 192.0.2.1)",
                "enabled": true,
                "version": "1"
            }));
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Seen> {
        self.seen()
            .into_iter()
            .filter(|s| s.method == "POST" || s.method == "DELETE")
            .collect()
    }

    pub fn rule_count(&self, ruleset_id: &str) -> usize {
        self.rules
            .lock()
            .unwrap()
            .get(ruleset_id)
            .map_or(0, Vec::len)
    }

    fn record(&self, method: &'static str, uri: &Uri, headers: &HeaderMap) {
        let path = uri.path().to_string();
        let token = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or_default()
            .to_string();
        self.seen.lock().unwrap().push(Seen {
            method,
            path,
            token,
        });
    }
}

type Fake = Arc<FakeCloudflare>;

fn ok(result: Value) -> Response {
    Json(json!({"success": true, "errors": [], "messages": [], "result": result})).into_response()
}

fn rejected(message: &str) -> Response {
    Json(json!({
        "success": false,
        "errors": [{"code": 20120, "message": message}],
        "messages": [],
        "result": null
    }))
    .into_response()
}

async fn list_rulesets(
    State(fake): State<Fake>,
    Path(zone): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    fake.record("GET", &uri, &headers);
    match fake.zones.get(&zone) {
        Some(rulesets) => ok(Value::Array(
            rulesets
                .iter()
                .map(|(id, phase)| json!({"id": id, "name": id, "kind": "zone", "phase": phase}))
                .collect(),
        )),
        None => (
            StatusCode::NOT_FOUND,
            r#"{"success":false,"errors":[{"code":7003,"message":"Could not route"}]}"#,
        )
            .into_response(),
    }
}

async fn get_ruleset(
    State(fake): State<Fake>,
    Path((_zone, ruleset)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    fake.record("GET", &uri, &headers);
    let rules = fake
        .rules
        .lock()
        .unwrap()
        .get(&ruleset)
        .cloned()
        .unwrap_or_default();
    ok(json!({"id": ruleset, "phase": CUSTOM_PHASE, "rules": rules}))
}

async fn create_rule(
    State(fake): State<Fake>,
    Path((_zone, ruleset)): Path<(String, String)>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    fake.record("POST", &uri, &headers);
    let description = body["description"].as_str().unwrap_or_default().to_string();
    if fake.reject_create.contains(&description) {
        return rejected("filter parsing error");
    }
    let id = {
        let mut next = fake.next_id.lock().unwrap();
        *next += 1;
        format!("created-{next}")
    };
    let mut rule = body;
    rule["id"] = json!(id);
    fake.rules
        .lock()
        .unwrap()
        .entry(ruleset.clone())
        .or_default()
        .push(rule);
    ok(json!({"id": ruleset}))
}

async fn delete_rule(
    State(fake): State<Fake>,
    Path((_zone, ruleset, rule)): Path<(String, String, String)>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    fake.record("DELETE", &uri, &headers);
    if fake.error_delete.contains(&rule) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    if fake.reject_delete.contains(&rule) {
        return rejected("rule not found");
    }
    if let Some(rules) = fake.rules.lock().unwrap().get_mut(&ruleset) {
        rules.retain(|r| r["id"] != rule.as_str());
    }
    ok(json!({"id": ruleset}))
}

async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub struct TestApp {
    pub url: String,
    pub fake: Fake,
    pub http: reqwest::Client,
}

impl TestApp {
    /// Start the fake Cloudflare API and the provisioner in front of it.
    pub async fn start(fake: FakeCloudflare, configured_token: Option<&str>) -> Self {
        let fake = Arc::new(fake);
        let cf_router = Router::new()
            .route("/zones/:zone/rulesets", get(list_rulesets))
            .route("/zones/:zone/rulesets/:ruleset", get(get_ruleset))
            .route("/zones/:zone/rulesets/:ruleset/rules", post(create_rule))
            .route(
                "/zones/:zone/rulesets/:ruleset/rules/:rule",
                axum::routing::delete(delete_rule),
            )
            .with_state(fake.clone());
        let cf_url = spawn(cf_router).await;

        let client = CloudflareClient::with_client(reqwest::Client::new(), &cf_url);
        let credentials = CredentialResolver::new(configured_token.and_then(ApiToken::new));
        let provisioner = Arc::new(Provisioner::new(Arc::new(client), credentials));
        let url = spawn(server::router(provisioner)).await;

        Self {
            url,
            fake,
            http: reqwest::Client::new(),
        }
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .http
            .post(format!("{}{}", self.url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
        let body = response.json::<Value>().await.unwrap();
        (status, body)
    }
}

pub fn rule(description: &str) -> Value {
    json!({
        "action": "block",
        "description": description,
        "expression": format!("(http.request.uri.path contains \"/{description}\")")
    })
}
