use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use secreto_api::{AppState, AppStateInner, auth::ensure_admin, router};
use secreto_core::{DrawStrategy, MemoryStore, Store};
use secreto_db::Database;

const SECRET: &str = "test-secret";
const ADMIN_PHONE: &str = "5550000";
const PASSWORD: &str = "secreto1";

struct TestApp {
    router: Router,
    admin_token: String,
}

struct User {
    id: String,
    name: String,
    token: String,
}

impl TestApp {
    async fn with_store(store: Arc<dyn Store>) -> Self {
        let state: AppState = Arc::new(AppStateInner::new(
            store,
            DrawStrategy::Cycle,
            SECRET.to_string(),
        ));
        ensure_admin(&state, "Admin".into(), ADMIN_PHONE.into(), PASSWORD.into())
            .await
            .unwrap();

        let mut app = TestApp {
            router: router(state),
            admin_token: String::new(),
        };
        let (status, body) = app
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "phone": ADMIN_PHONE, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user"]["isAdmin"], true);
        app.admin_token = body["data"]["token"].as_str().unwrap().to_string();
        app
    }

    async fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new())).await
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

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn admin(&self, method: Method, uri: &str) -> (StatusCode, Value) {
        self.send(method, uri, Some(&self.admin_token), None).await
    }

    async fn register(&self, name: &str, phone: &str) -> User {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "nombreCompleto": name,
                    "numeroTelefono": phone,
                    "contrasena": PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        User {
            id: body["data"]["user"]["id"].as_str().unwrap().to_string(),
            name: name.to_string(),
            token: body["data"]["token"].as_str().unwrap().to_string(),
        }
    }

    async fn get_as(&self, user: &User, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(&user.token), None).await
    }
}

fn survey_for(user: &User, color: &str) -> Value {
    json!({
        "userId": user.id,
        "gustosActuales": "Leer novelas",
        "colorFavorito": color,
        "tipoRegalo": "Libros",
        "quiereProbar": "Escalada",
        "tallaRopa": "M",
    })
}

#[tokio::test]
async fn health_is_served_at_root_and_under_api() {
    let app = TestApp::new().await;
    for uri in ["/health", "/api/health"] {
        let (status, body) = app.send(Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}

#[tokio::test]
async fn register_and_login() {
    let app = TestApp::new().await;
    let ana = app.register("Ana Pérez", "555-0001").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "numeroTelefono": "555 0001", "contrasena": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["id"], ana.id.as_str());
    assert_eq!(body["data"]["user"]["phone"], "5550001");
    assert_eq!(body["data"]["user"]["surveyCompleted"], false);

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "phone": "5550001", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn web_client_bodies_and_routes_are_accepted() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({
                "nombreCompleto": "Ana Perez",
                "numeroTelefono": "3001234567",
                "contrasena": "secreto1",
                "esAdmin": false,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["user"]["isAdmin"], false);

    // Asking for admin rights at registration is ignored.
    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "nombreCompleto": "Beto Ruiz",
                "numeroTelefono": "3007654321",
                "contrasena": "secreto1",
                "esAdmin": true,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["user"]["isAdmin"], false);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({ "numeroTelefono": "3001234567", "contrasena": "secreto1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["user"]["name"], "Ana Perez");
}

#[tokio::test]
async fn register_rejects_duplicates_and_bad_input() {
    let app = TestApp::new().await;
    app.register("Ana Pérez", "5550001").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "name": "Otra Ana", "phone": "555-0001", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "name": "Beto", "phone": "5550002", "password": "123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = app
        .send(Method::POST, "/auth/register", None, Some(json!({ "name": "Beto" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = TestApp::new().await;
    let ana = app.register("Ana Pérez", "5550001").await;

    let (status, body) = app.send(Method::GET, "/participants", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .send(Method::GET, "/participants", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let uri = format!("/mi-amigo-secreto/{}", ana.id);
    let (status, _) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_participants() {
    let app = TestApp::new().await;
    let ana = app.register("Ana Pérez", "5550001").await;
    app.register("Beto Ruiz", "5550002").await;

    for (method, uri) in [
        (Method::GET, "/participants"),
        (Method::POST, "/sorteo"),
        (Method::DELETE, "/sorteo/reset"),
    ] {
        let (status, body) = app.send(method, uri, Some(&ana.token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(body["error"], "forbidden");
    }
}

#[tokio::test]
async fn participant_listing_excludes_admin_and_reports_status() {
    let app = TestApp::new().await;
    let ana = app.register("Ana Pérez", "5550001").await;
    app.register("Beto Ruiz", "5550002").await;

    let (status, _) = app
        .send(Method::POST, "/encuesta", Some(&ana.token), Some(survey_for(&ana, "Azul")))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.admin(Method::GET, "/participantes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 2);
    assert_eq!(body["sorteo"]["estado"], "pendiente");
    assert!(body["sorteo"].get("id").is_none());

    let rows = body["data"].as_array().unwrap();
    assert!(rows.iter().all(|p| p["isAdmin"] == false));
    let ana_row = rows.iter().find(|p| p["id"] == ana.id.as_str()).unwrap();
    assert_eq!(ana_row["surveyCompleted"], true);
}

#[tokio::test]
async fn full_draw_gives_everyone_one_distinct_recipient() {
    let app = TestApp::new().await;
    let users = vec![
        app.register("Ana Pérez", "5550001").await,
        app.register("Beto Ruiz", "5550002").await,
        app.register("Carla Díaz", "5550003").await,
        app.register("Dario Gil", "5550004").await,
    ];

    let (status, body) = app.admin(Method::POST, "/sorteo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 4);
    assert_eq!(body["sorteo"]["estado"], "completado");
    assert_eq!(body["sorteo"]["totalParticipantes"], 4);
    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r["tieneAmigoSecreto"] == true));
    // The draw response never reveals who got whom.
    assert!(results.iter().all(|r| r.get("amigoSecreto").is_none()));

    let mut recipients = HashSet::new();
    for user in &users {
        let (status, body) = app
            .get_as(user, &format!("/api/mi-amigo-secreto/{}", user.id))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["tuNombre"], user.name.as_str());
        let recipient = body["data"]["amigoSecreto"]["id"].as_str().unwrap().to_string();
        assert_ne!(recipient, user.id);
        assert!(users.iter().any(|u| u.id == recipient));
        recipients.insert(recipient);
    }
    assert_eq!(recipients.len(), users.len());

    let (status, body) = app.admin(Method::GET, "/participants").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sorteo"]["estado"], "completado");
    assert!(body["sorteo"]["id"].is_string());
    assert!(body["sorteo"]["fecha"].is_string());
}

#[tokio::test]
async fn participants_only_see_their_own_assignment() {
    let app = TestApp::new().await;
    let ana = app.register("Ana Pérez", "5550001").await;
    let beto = app.register("Beto Ruiz", "5550002").await;
    app.admin(Method::POST, "/sorteo").await;

    for uri in [
        format!("/mi-amigo-secreto/{}", beto.id),
        format!("/encuesta/verificar/{}", beto.id),
        format!("/encuesta/amigo-secreto/{}", beto.id),
    ] {
        let (status, body) = app.get_as(&ana, &uri).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(body["success"], false);
    }

    let (status, _) = app
        .send(Method::POST, "/encuesta", Some(&ana.token), Some(survey_for(&beto, "Rojo")))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn lookup_before_draw_is_not_found() {
    let app = TestApp::new().await;
    let ana = app.register("Ana Pérez", "5550001").await;

    let (status, body) = app
        .get_as(&ana, &format!("/mi-amigo-secreto/{}", ana.id))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn draw_needs_two_participants() {
    let app = TestApp::new().await;
    let (status, body) = app.admin(Method::POST, "/sorteo").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_participants");

    app.register("Ana Pérez", "5550001").await;
    let (status, body) = app.admin(Method::POST, "/sorteo").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_participants");

    let (_, body) = app.admin(Method::GET, "/participants").await;
    assert_eq!(body["sorteo"]["estado"], "pendiente");
}

#[tokio::test]
async fn redraw_is_rejected_until_reset() {
    let app = TestApp::new().await;
    let ana = app.register("Ana Pérez", "5550001").await;
    app.register("Beto Ruiz", "5550002").await;
    app.register("Carla Díaz", "5550003").await;

    let (status, _) = app.admin(Method::POST, "/sorteo").await;
    assert_eq!(status, StatusCode::OK);
    let (_, before) = app
        .get_as(&ana, &format!("/mi-amigo-secreto/{}", ana.id))
        .await;

    let (status, body) = app.admin(Method::POST, "/sorteo").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "draw_already_completed");

    let (_, after) = app
        .get_as(&ana, &format!("/mi-amigo-secreto/{}", ana.id))
        .await;
    assert_eq!(before, after);

    let (status, body) = app.admin(Method::DELETE, "/sorteo/reset").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["participantesLimpiados"], 3);
    assert_eq!(body["data"]["sorteosEliminados"], 1);

    let (status, _) = app
        .get_as(&ana, &format!("/mi-amigo-secreto/{}", ana.id))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.admin(Method::DELETE, "/api/sorteo/reset").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["participantesLimpiados"], 0);
    assert_eq!(body["data"]["sorteosEliminados"], 0);

    let (status, _) = app.admin(Method::POST, "/sorteo").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn survey_flow_reaches_the_assigned_giver() {
    let app = TestApp::new().await;
    let ana = app.register("Ana Pérez", "5550001").await;
    let beto = app.register("Beto Ruiz", "5550002").await;

    let (status, body) = app
        .get_as(&ana, &format!("/encuesta/verificar/{}", ana.id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["completada"], false);
    assert!(body["data"].get("respuestas").is_none());

    let mut incomplete = survey_for(&ana, "Verde");
    incomplete["tallaRopa"] = json!("   ");
    let (status, body) = app
        .send(Method::POST, "/encuesta", Some(&ana.token), Some(incomplete))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let mut missing = survey_for(&ana, "Verde");
    missing.as_object_mut().unwrap().remove("colorFavorito");
    let (status, _) = app
        .send(Method::POST, "/encuesta", Some(&ana.token), Some(missing))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(Method::POST, "/encuesta", Some(&ana.token), Some(survey_for(&ana, "Verde")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["userId"], ana.id.as_str());
    assert_eq!(body["data"]["colorFavorito"], "Verde");

    // Resubmission replaces the answers.
    let (status, _) = app
        .send(Method::POST, "/encuesta", Some(&ana.token), Some(survey_for(&ana, "Negro")))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .get_as(&ana, &format!("/encuesta/verificar/{}", ana.id))
        .await;
    assert_eq!(body["data"]["completada"], true);
    assert_eq!(body["data"]["respuestas"]["colorFavorito"], "Negro");
    assert!(body["data"]["fechaCompletada"].is_string());

    // No draw yet: nobody can see anyone's survey.
    let (status, _) = app
        .get_as(&beto, &format!("/encuesta/amigo-secreto/{}", beto.id))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // With two participants the draw is a swap, so Beto gives to Ana.
    app.admin(Method::POST, "/sorteo").await;
    let (status, body) = app
        .get_as(&beto, &format!("/encuesta/amigo-secreto/{}", beto.id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["nombreCompleto"], "Ana Pérez");
    assert_eq!(body["data"]["colorFavorito"], "Negro");
    assert_eq!(body["data"]["tallaRopa"], "M");

    // Beto never answered, so Ana has nothing to read yet.
    let (status, body) = app
        .get_as(&ana, &format!("/encuesta/amigo-secreto/{}", ana.id))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn deactivated_participant_cannot_log_in_or_join_draws() {
    let app = TestApp::new().await;
    let ana = app.register("Ana Pérez", "5550001").await;
    app.register("Beto Ruiz", "5550002").await;
    app.register("Carla Díaz", "5550003").await;

    let (status, body) = app
        .admin(Method::DELETE, &format!("/participants/{}", ana.id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["active"], false);

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "phone": "5550001", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The token issued before deactivation no longer works.
    let (status, _) = app
        .send(Method::POST, "/encuesta", Some(&ana.token), Some(survey_for(&ana, "Azul")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .get_as(&ana, &format!("/encuesta/verificar/{}", ana.id))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.admin(Method::POST, "/sorteo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);

    let (status, body) = app
        .admin(
            Method::DELETE,
            "/participants/00000000-0000-0000-0000-000000000000",
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn sqlite_store_serves_the_same_flow() {
    let db = Database::open_in_memory().unwrap();
    let app = TestApp::with_store(Arc::new(db)).await;
    let users = vec![
        app.register("Ana Pérez", "5550001").await,
        app.register("Beto Ruiz", "5550002").await,
        app.register("Carla Díaz", "5550003").await,
    ];

    let (status, body) = app.admin(Method::POST, "/sorteo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);

    let mut recipients = HashSet::new();
    for user in &users {
        let (status, body) = app
            .get_as(user, &format!("/mi-amigo-secreto/{}", user.id))
            .await;
        assert_eq!(status, StatusCode::OK);
        let recipient = body["data"]["amigoSecreto"]["id"].as_str().unwrap().to_string();
        assert_ne!(recipient, user.id);
        recipients.insert(recipient);
    }
    assert_eq!(recipients.len(), 3);

    let (status, body) = app.admin(Method::DELETE, "/sorteo/reset").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["participantesLimpiados"], 3);
    assert_eq!(body["data"]["sorteosEliminados"], 1);
}
