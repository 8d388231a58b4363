// storage-server/tests/api_flow.rs
// HTTP 集成测试: 通过 oneshot 驱动完整的 Router (内存 redb + 模拟 CRM)

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use storage_server::crm::{MockOrderApi, OrderApi};
use storage_server::{Config, RecordStore, ServerState, build_app};
use tower::ServiceExt;

struct TestApp {
    app: Router,
    state: ServerState,
    api: Arc<MockOrderApi>,
}

impl TestApp {
    fn new(orders: Vec<Value>) -> Self {
        let store = RecordStore::open_in_memory().unwrap();
        let api = Arc::new(MockOrderApi::with_orders(orders));
        let config = Config::with_overrides("./unused", 0);
        let state = ServerState::new(config, store, Some(api.clone() as Arc<dyn OrderApi>));
        state
            .auth
            .seed_default_users("admin-pass", "user-pass")
            .unwrap();
        let app = build_app(&state).with_state(state.clone());
        Self { app, state, api }
    }

    /// Token straight from the JWT service (skips the login delay)
    fn token(&self, username: &str, role: &str, permissions: &[&str]) -> String {
        let permissions: Vec<String> = permissions.iter().map(|p| p.to_string()).collect();
        self.state
            .jwt_service()
            .generate_token(username, role, &permissions)
            .unwrap()
    }

    fn admin(&self) -> String {
        self.token("admin", "admin", &["all"])
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, bytes) = self.raw(request).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn raw(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }
}

fn paid_order(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "number": format!("{id}A"),
        "status": status,
        "payments": {"p1": {"status": "paid"}},
        "firstName": "Ivan",
        "lastName": "Petrov",
        "items": [{"offer": {"name": "Tire A"}, "quantity": 2}]
    })
}

fn walk_in(name: &str) -> Value {
    json!({
        "fields": {
            "full_name": name,
            "phone": "+79001234567",
            "car_brand": "Lada",
            "parameters": "Nokian Hakkapeliitta 8",
            "size": "4 шт.",
            "storage_location": "Бекетова 3а.к15"
        }
    })
}

/// Import the orders and return the id of the first mirrored record
async fn sync_first_record(app: &TestApp) -> String {
    let admin = app.admin();
    let (status, report) = app
        .send(Method::POST, "/api/retailcrm/sync", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["inserted"], 1);

    let (_, orders) = app
        .send(Method::GET, "/api/retailcrm/orders", Some(&admin), None)
        .await;
    orders[0]["record_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new(vec![]);
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["crm_enabled"], true);
}

#[tokio::test]
async fn test_requests_without_valid_token_are_rejected() {
    let app = TestApp::new(vec![]);

    let (status, body) = app
        .send(Method::GET, "/api/storage-records", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1001);

    let (status, _) = app
        .send(Method::GET, "/api/storage-records", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::new(vec![]);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "user", "password": "user-pass"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["permissions"], json!(["store", "view"]));
    let token = body["token"].as_str().unwrap().to_string();

    let (status, me) = app
        .send(Method::GET, "/api/auth/me", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "user");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "user", "password": "wrong"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1002);
}

#[tokio::test]
async fn test_permissions_are_enforced_per_operation() {
    let app = TestApp::new(vec![]);
    let clerk = app.token("user", "user", &["store", "view"]);

    let (status, _) = app
        .send(Method::POST, "/api/storage-records", Some(&clerk), Some(walk_in("Анна")))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(Method::GET, "/api/storage-records/search?q=anna", Some(&clerk), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2001);

    let (status, _) = app
        .send(
            Method::DELETE,
            "/api/storage-records/bulk",
            Some(&clerk),
            Some(json!({"record_ids": ["x"]})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::GET, "/api/users", Some(&clerk), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // 登录即可读取表单结构，修改需要 form_management
    let (status, schema) = app
        .send(Method::GET, "/api/form-config", Some(&clerk), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send(Method::PUT, "/api/form-config", Some(&clerk), Some(schema))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_walk_in_records_get_increasing_numbers() {
    let app = TestApp::new(vec![]);
    let clerk = app.token("user", "user", &["store", "view"]);

    let mut numbers = Vec::new();
    for name in ["Анна", "Борис", "Вера"] {
        let (status, record) = app
            .send(Method::POST, "/api/storage-records", Some(&clerk), Some(walk_in(name)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["status"], "in_storage");
        assert_eq!(record["created_by"], "user");
        numbers.push(record["sequence_number"].as_u64().unwrap());
    }
    assert_eq!(numbers, vec![1, 2, 3]);

    let (_, list) = app
        .send(Method::GET, "/api/storage-records", Some(&clerk), None)
        .await;
    let listed: Vec<u64> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["sequence_number"].as_u64().unwrap())
        .collect();
    assert_eq!(listed, vec![3, 2, 1]);
}

#[tokio::test]
async fn test_walk_in_validation_names_missing_field() {
    let app = TestApp::new(vec![]);
    let clerk = app.token("user", "user", &["store", "view"]);

    let mut payload = walk_in("Анна");
    payload["fields"]["phone"] = json!("");
    let (status, body) = app
        .send(Method::POST, "/api/storage-records", Some(&clerk), Some(payload))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 2);
    assert_eq!(body["details"]["field"], "phone");
}

#[tokio::test]
async fn test_crm_sync_skips_malformed_order() {
    let app = TestApp::new(vec![
        json!({"id": "B1", "status": "in-stock", "items": "four tires"}),
        paid_order("X1", "in-stock"),
    ]);
    let admin = app.admin();

    let (status, report) = app
        .send(Method::POST, "/api/retailcrm/sync", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["fetched"], 2);
    assert_eq!(report["skipped"], 1);
    assert_eq!(report["inserted"], 1);
}

#[tokio::test]
async fn test_crm_sync_is_idempotent_and_maps_orders() {
    let app = TestApp::new(vec![
        paid_order("X1", "in-stock"),
        paid_order("X2", "cancelled"),
    ]);
    let admin = app.admin();

    let (status, first) = app
        .send(Method::POST, "/api/retailcrm/sync", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["fetched"], 2);
    assert_eq!(first["filtered_out"], 1);
    assert_eq!(first["inserted"], 1);

    let (_, second) = app
        .send(Method::POST, "/api/retailcrm/sync", Some(&admin), None)
        .await;
    assert_eq!(second["inserted"], 0);
    assert_eq!(second["duplicates"], 1);

    let (_, orders) = app
        .send(Method::GET, "/api/retailcrm/orders", Some(&admin), None)
        .await;
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["status"], "new");
    assert_eq!(orders[0]["fields"]["full_name"], "Ivan Petrov");
    assert_eq!(orders[0]["fields"]["size"], "2 шт.");
    assert_eq!(orders[0]["created_by"], "retailcrm");
    assert_eq!(orders[0]["status_mismatch"], false);

    let (_, status) = app
        .send(Method::GET, "/api/retailcrm/status", Some(&admin), None)
        .await;
    assert_eq!(status["last_sync_orders"], 0);
    assert_eq!(status["sync_in_progress"], false);
    assert!(status["last_sync_at"].is_number());
}

#[tokio::test]
async fn test_take_and_release_push_status() {
    let app = TestApp::new(vec![paid_order("X1", "in-stock")]);
    let record_id = sync_first_record(&app).await;
    let admin = app.admin();

    let (status, taken) = app
        .send(
            Method::PUT,
            &format!("/api/storage-records/{record_id}/take"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(taken["record"]["status"], "in_storage");
    assert_eq!(taken["push"]["result"], "pushed");

    // take 只允许 New
    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/storage-records/{record_id}/take"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 4002);

    let (status, released) = app
        .send(
            Method::PUT,
            &format!("/api/storage-records/{record_id}/release"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(released["record"]["status"], "released");
    assert_eq!(released["record"]["released_by"], "admin");

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/storage-records/{record_id}/release"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    assert_eq!(
        app.api.pushes(),
        vec![
            ("X1A".to_string(), "на хранении".to_string()),
            ("X1A".to_string(), "выдан клиенту".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_failed_pushes_are_capped_at_three() {
    let app = TestApp::new(vec![paid_order("X1", "in-stock")]);
    let record_id = sync_first_record(&app).await;
    let admin = app.admin();
    app.api.set_fail_pushes(true);

    let (status, taken) = app
        .send(
            Method::PUT,
            &format!("/api/storage-records/{record_id}/take"),
            Some(&admin),
            None,
        )
        .await;
    // 推送失败不影响本地状态转换
    assert_eq!(status, StatusCode::OK);
    assert_eq!(taken["record"]["status"], "in_storage");
    assert_eq!(taken["push"]["result"], "failed");
    assert_eq!(taken["record"]["status_mismatch"], true);

    let mut results = Vec::new();
    for _ in 0..3 {
        let (status, retried) = app
            .send(
                Method::POST,
                &format!("/api/storage-records/{record_id}/retry-sync"),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        results.push(retried["push"]["result"].as_str().unwrap().to_string());
    }
    assert_eq!(results, vec!["failed", "failed", "exhausted"]);
    assert_eq!(app.api.pushes().len(), 3);
}

#[tokio::test]
async fn test_retry_sync_rejects_walk_in_records() {
    let app = TestApp::new(vec![]);
    let admin = app.admin();

    let (_, record) = app
        .send(Method::POST, "/api/storage-records", Some(&admin), Some(walk_in("Анна")))
        .await;
    let record_id = record["record_id"].as_str().unwrap();

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/storage-records/{record_id}/retry-sync"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 4006);
}

#[tokio::test]
async fn test_unknown_record_is_404() {
    let app = TestApp::new(vec![]);
    let admin = app.admin();
    let (status, body) = app
        .send(Method::GET, "/api/storage-records/nope", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4001);
}

#[tokio::test]
async fn test_search_finds_only_in_storage_records() {
    let app = TestApp::new(vec![paid_order("X1", "in-stock")]);
    sync_first_record(&app).await;
    let admin = app.admin();

    app.send(Method::POST, "/api/storage-records", Some(&admin), Some(walk_in("Ivan Sidorov")))
        .await;

    let (status, found) = app
        .send(Method::GET, "/api/storage-records/search?q=ivan", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let found = found.as_array().unwrap();
    // CRM 记录仍为 New，不参与出库搜索
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["fields"]["full_name"], "Ivan Sidorov");
}

#[tokio::test]
async fn test_bulk_delete() {
    let app = TestApp::new(vec![]);
    let admin = app.admin();

    let mut ids = Vec::new();
    for name in ["Анна", "Борис"] {
        let (_, record) = app
            .send(Method::POST, "/api/storage-records", Some(&admin), Some(walk_in(name)))
            .await;
        ids.push(record["record_id"].as_str().unwrap().to_string());
    }
    ids.push("missing".to_string());

    let (status, body) = app
        .send(
            Method::DELETE,
            "/api/storage-records/bulk",
            Some(&admin),
            Some(json!({"record_ids": ids})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_count"], 2);

    let (_, list) = app
        .send(Method::GET, "/api/storage-records", Some(&admin), None)
        .await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_receipt_and_csv_export() {
    let app = TestApp::new(vec![]);
    let admin = app.admin();
    let (_, record) = app
        .send(Method::POST, "/api/storage-records", Some(&admin), Some(walk_in("Анна Смирнова")))
        .await;
    let record_id = record["record_id"].as_str().unwrap();

    let request = Request::get(format!("/api/storage-records/{record_id}/receipt"))
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.raw(request).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("Анна Смирнова"));
    assert!(text.contains("номер акта 1"));

    let request = Request::get("/api/storage-records/export")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.raw(request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with(b"\xEF\xBB\xBF"));
    let text = String::from_utf8(body[3..].to_vec()).unwrap();
    assert!(text.contains("Анна Смирнова"));
}

#[tokio::test]
async fn test_csv_import_goes_through_validation() {
    let app = TestApp::new(vec![]);
    let admin = app.admin();

    let csv = "full_name,phone,car_brand,parameters,size,storage_location\n\
               Анна,+7900,Lada,Nokian,4 шт.,Бекетова 3а.к15\n\
               Борис,,Kia,Nordman,2 шт.,Бекетова 3а.к15\n";
    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"import.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {csv}\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::post("/api/storage-records/import")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, bytes) = app.raw(request).await;
    assert_eq!(status, StatusCode::OK);

    let summary: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(summary["imported"], 1);
    assert_eq!(summary["skipped"][0][0], 2);
}

#[tokio::test]
async fn test_user_management() {
    let app = TestApp::new(vec![]);
    let admin = app.admin();

    let (status, created) = app
        .send(
            Method::POST,
            "/api/users",
            Some(&admin),
            Some(json!({"username": "olga", "password": "secret-pass", "permissions": ["release", "view"]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["permissions"], json!(["release", "view"]));

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/users/olga",
            Some(&admin),
            Some(json!({"permissions": ["view"]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(Method::DELETE, "/api/users/admin", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2005);

    let (status, _) = app
        .send(Method::DELETE, "/api/users/olga", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, users) = app
        .send(Method::GET, "/api/users", Some(&admin), None)
        .await;
    let names: Vec<&str> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["admin", "user"]);
}
