use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderValue, Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use refugio_api::{
    AdoptionRequest, BackendApi, Id, IssuedToken, LoginRequest, RefugioError, RegistrationRequest,
    Resource, Role, SecretStore,
};
use refugio_auth::{Claims, CodecOptions, CredentialCodec};
use refugio_server::{AppState, router};
use serde_json::{Value, json};
use tower::ServiceExt;

const SECRET: &str = "integration-secret";

const CONFIG: &str = r#"
environment = "development"

[server]
bind = "127.0.0.1:0"

[backend]
base_url = "http://backend.invalid"
request_timeout_ms = 1000

[auth]
secret_ref = "JWT_SECRET"
leeway_seconds = 0

[cookie]
name = "auth"
max_age_seconds = 604800
"#;

struct OnlySecret;

impl SecretStore for OnlySecret {
    fn get(&self, secret_ref: &str) -> Result<String, RefugioError> {
        if secret_ref == "JWT_SECRET" {
            Ok(SECRET.to_string())
        } else {
            Err(RefugioError::NotFound(secret_ref.to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Call {
    endpoint: String,
    token: Option<String>,
    body: Value,
}

/// In-process backend recording every call it receives.
#[derive(Default)]
struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    /// Token handed out by `usuario-validar-contra`; `None` refuses the login.
    login_token: Option<String>,
    failing: BTreeSet<String>,
    down: bool,
}

impl FakeBackend {
    fn record(&self, endpoint: String, token: Option<&str>, body: Value) -> Result<(), RefugioError> {
        self.calls.lock().unwrap().push(Call {
            endpoint: endpoint.clone(),
            token: token.map(str::to_string),
            body,
        });
        if self.down || self.failing.contains(&endpoint) {
            return Err(RefugioError::UpstreamUnavailable(endpoint));
        }
        Ok(())
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl BackendApi for FakeBackend {
    async fn login(&self, request: &LoginRequest) -> Result<IssuedToken, RefugioError> {
        self.record(
            "usuario-validar-contra".to_string(),
            None,
            serde_json::to_value(request).unwrap(),
        )?;
        self.login_token
            .clone()
            .map(|access| IssuedToken {
                access,
                refresh: None,
            })
            .ok_or_else(|| RefugioError::Unauthenticated("bad password".to_string()))
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<(), RefugioError> {
        self.record(
            "usuario-create".to_string(),
            None,
            serde_json::to_value(request).unwrap(),
        )
    }

    async fn list(&self, token: &str, resource: Resource) -> Result<Vec<Value>, RefugioError> {
        self.record(resource.list_endpoint(), Some(token), Value::Null)?;
        Ok(match resource {
            Resource::Animal => vec![
                json!({"id": 1, "nombre": "Toby", "tipo": "perro", "raza": "mestizo", "edad": 3, "estado": "espera_de_adopcion"}),
                json!({"id": 2, "nombre": "Mishi", "tipo": "gato", "raza": "siamés", "edad": 2, "estado": "adoptado"}),
            ],
            Resource::Adopcion => vec![
                json!({"id": 10, "animal_nombre": "Toby", "adoptante_nombre": "Ana", "estado": "en_proceso"}),
            ],
            Resource::Adoptantes => vec![
                json!({"id": 20, "nombre": "Ana", "apellido": "Pérez", "correo": "ana@x.org", "estado": "activo"}),
            ],
            Resource::Voluntarios => vec![
                json!({"id": 30, "nombre": "Luis", "apellido": "Gómez", "correo": "luis@x.org", "estado": "activo"}),
            ],
        })
    }

    async fn create(&self, token: &str, resource: Resource, body: &Value) -> Result<(), RefugioError> {
        self.record(resource.create_endpoint(), Some(token), body.clone())
    }

    async fn update(
        &self,
        token: &str,
        resource: Resource,
        id: &Id,
        body: &Value,
    ) -> Result<(), RefugioError> {
        self.record(resource.update_endpoint(id), Some(token), body.clone())
    }

    async fn delete(&self, token: &str, resource: Resource, id: &Id) -> Result<(), RefugioError> {
        self.record(resource.delete_endpoint(id), Some(token), Value::Null)
    }

    async fn request_adoption(
        &self,
        token: &str,
        request: &AdoptionRequest,
    ) -> Result<(), RefugioError> {
        self.record(
            "adopcion-creacion-edicion-animal".to_string(),
            Some(token),
            serde_json::to_value(request).unwrap(),
        )
    }
}

fn codec() -> CredentialCodec {
    CredentialCodec::new(SECRET, CodecOptions::default()).unwrap()
}

fn token_for(role: Role) -> String {
    codec()
        .issue(7_i64, role, Duration::from_secs(600))
        .unwrap()
}

fn expired_token(role: Role) -> String {
    codec().sign(&Claims::new(7_i64, role, -60)).unwrap()
}

fn forged_token(role: Role) -> String {
    CredentialCodec::new("someone-else", CodecOptions::default())
        .unwrap()
        .issue(7_i64, role, Duration::from_secs(600))
        .unwrap()
}

fn app_with(backend: Arc<FakeBackend>) -> Router {
    let settings = refugio_core::load_settings_from_str(CONFIG, &OnlySecret).unwrap();
    router(AppState::new(&settings, backend).unwrap())
}

fn app() -> (Router, Arc<FakeBackend>) {
    let backend = Arc::new(FakeBackend::default());
    (app_with(backend.clone()), backend)
}

fn request(method: &str, path: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = cookie {
        builder = builder.header(header::COOKIE, format!("auth={token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    resp.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(resp: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

fn location(resp: &Response<Body>) -> Option<&str> {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

fn assert_redirect(resp: &Response<Body>, target: &str) {
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT, "expected redirect to {target}");
    assert_eq!(location(resp), Some(target));
}

// --- gateway ---------------------------------------------------------------

#[tokio::test]
async fn anonymous_requests_to_protected_paths_go_to_login() {
    let (app, backend) = app();
    for path in [
        "/administrador",
        "/administrador/animal",
        "/voluntario",
        "/voluntario/dashboard",
        "/adoptante",
        "/adoptante/list",
    ] {
        let resp = send(&app, request("GET", path, None, None)).await;
        assert_redirect(&resp, "/login");
    }
    let resp = send(&app, request("POST", "/adoptante/animales/1/adoptar", None, None)).await;
    assert_redirect(&resp, "/login");
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn bad_credentials_are_treated_as_anonymous() {
    let (app, _) = app();
    let garbage = "not-a-jwt".to_string();
    for token in [garbage, expired_token(Role::Adoptante), forged_token(Role::Adoptante)] {
        let resp = send(&app, request("GET", "/adoptante", Some(&token), None)).await;
        assert_redirect(&resp, "/login");
    }
}

#[tokio::test]
async fn public_and_login_paths_pass_through_for_anyone() {
    let (app, _) = app();
    let expired = expired_token(Role::Voluntario);
    for cookie in [None, Some(expired.as_str()), Some("garbage")] {
        let resp = send(&app, request("GET", "/", cookie, None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(location(&resp).is_none());

        let resp = send(&app, request("GET", "/login", cookie, None)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, request("GET", "/login/register", cookie, None)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, request("GET", "/sobre-nosotros", cookie, None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn wrong_role_is_sent_to_its_own_home() {
    let (app, _) = app();
    for caller in Role::ALL {
        let token = token_for(caller);
        for target in Role::ALL.into_iter().filter(|r| *r != caller) {
            let path = format!("{}/dashboard", target.home_route());
            let resp = send(&app, request("GET", &path, Some(&token), None)).await;
            assert_redirect(&resp, caller.home_route());
        }
    }

    let resp = send(
        &app,
        request("GET", "/voluntario/dashboard", Some(&token_for(Role::Administrador)), None),
    )
    .await;
    assert_redirect(&resp, "/administrador");
}

#[tokio::test]
async fn signed_in_users_can_still_reach_login_pages() {
    let (app, _) = app();
    for role in Role::ALL {
        let token = token_for(role);
        for path in ["/login", "/login/register"] {
            let resp = send(&app, request("GET", path, Some(&token), None)).await;
            assert_eq!(resp.status(), StatusCode::OK, "{role} on {path}");
        }
    }
}

#[tokio::test]
async fn misspelled_admin_path_is_not_a_partition() {
    let (app, _) = app();
    let resp = send(&app, request("GET", "/adminitrador", None, None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn undecodable_session_cookie_counts_as_anonymous() {
    let (app, _) = app();
    let bad = HeaderValue::from_bytes(b"auth=\xffabc").unwrap();

    let mut req = request("GET", "/administrador", None, None);
    req.headers_mut().insert(header::COOKIE, bad.clone());
    assert_redirect(&send(&app, req).await, "/login");

    let mut req = request("GET", "/", None, None);
    req.headers_mut().insert(header::COOKIE, bad.clone());
    assert_eq!(send(&app, req).await.status(), StatusCode::OK);

    let mut req = request("GET", "/login", None, None);
    req.headers_mut().insert(header::COOKIE, bad);
    assert_eq!(send(&app, req).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn non_ascii_cookie_beside_the_session_keeps_the_caller_signed_in() {
    let (app, _) = app();
    let cookies = format!("auth={}; theme=café", token_for(Role::Administrador));
    let mut req = request("GET", "/administrador", None, None);
    req.headers_mut().insert(
        header::COOKIE,
        HeaderValue::from_bytes(cookies.as_bytes()).unwrap(),
    );
    assert_eq!(send(&app, req).await.status(), StatusCode::OK);
}

// --- relay -----------------------------------------------------------------

fn set_cookie_values(resp: &Response<Body>) -> Vec<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn set_token_then_get_token_round_trips() {
    let (app, _) = app();
    let token = token_for(Role::Voluntario);

    let resp = send(
        &app,
        request("POST", "/api/set-token", None, Some(json!({"data": {"access": token}}))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookies = set_cookie_values(&resp);
    assert_eq!(cookies.len(), 1);
    let cookie = &cookies[0];
    assert!(cookie.starts_with(&format!("auth={token}")));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(!cookie.contains("Secure"));
    let set = body_json(resp).await;
    assert_eq!(set, json!({"user_id": 7, "rol": "voluntario"}));

    let stored = cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix("auth="))
        .unwrap();
    let resp = send(&app, request("POST", "/api/get-token", Some(stored), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let got = body_json(resp).await;
    assert_eq!(got["user_id"], set["user_id"]);
    assert_eq!(got["role"], set["rol"]);
    assert_eq!(got["token"], token);
}

#[tokio::test]
async fn set_token_rejects_forged_and_expired_tokens() {
    let (app, _) = app();
    for token in [forged_token(Role::Administrador), expired_token(Role::Administrador)] {
        let resp = send(
            &app,
            request("POST", "/api/set-token", None, Some(json!({"data": {"access": token}}))),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookie_values(&resp).is_empty());
        let body = body_json(resp).await;
        assert_eq!(body, json!({"error": "unauthenticated"}));
    }
}

#[tokio::test]
async fn set_token_without_a_token_is_unauthenticated() {
    let (app, _) = app();
    for body in [json!({}), json!({"data": {}}), json!({"data": {"access": ""}})] {
        let resp = send(&app, request("POST", "/api/set-token", None, Some(body))).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(set_cookie_values(&resp).is_empty());
    }
    let resp = send(&app, request("POST", "/api/set-token", None, None)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn get_token_with_tampered_cookie_leaks_nothing() {
    let (app, _) = app();
    let token = token_for(Role::Adoptante);
    let (head, _sig) = token.rsplit_once('.').unwrap();
    let tampered = format!("{head}.AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA");

    for cookie in [Some(tampered.as_str()), None] {
        let resp = send(&app, request("POST", "/api/get-token", cookie, None)).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), Some("/login"));
        assert!(body_bytes(resp).await.is_empty());
    }
}

// --- login / register ------------------------------------------------------

#[tokio::test]
async fn login_sets_the_cookie_and_points_at_home() {
    let backend = Arc::new(FakeBackend {
        login_token: Some(token_for(Role::Adoptante)),
        ..FakeBackend::default()
    });
    let app = app_with(backend.clone());

    let resp = send(
        &app,
        request(
            "POST",
            "/api/login",
            None,
            Some(json!({"correo": "ana@x.org", "contra": "secreto123"})),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(set_cookie_values(&resp).len(), 1);
    assert_eq!(
        body_json(resp).await,
        json!({"user_id": 7, "rol": "adoptante", "redirect": "/adoptante"})
    );
    assert_eq!(backend.calls()[0].endpoint, "usuario-validar-contra");
}

#[tokio::test]
async fn login_input_is_checked_before_the_backend() {
    let (app, backend) = app();
    let resp = send(
        &app,
        request("POST", "/api/login", None, Some(json!({"correo": "ana", "contra": "123"}))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["fields"]["correo"].is_string());
    assert!(body["fields"]["contra"].is_string());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn refused_login_is_generic() {
    let (app, _) = app();
    let resp = send(
        &app,
        request(
            "POST",
            "/api/login",
            None,
            Some(json!({"correo": "ana@x.org", "contra": "equivocada"})),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie_values(&resp).is_empty());
    assert_eq!(body_json(resp).await, json!({"error": "Invalid email or password"}));
}

#[tokio::test]
async fn login_with_backend_down_is_bad_gateway() {
    let app = app_with(Arc::new(FakeBackend {
        down: true,
        ..FakeBackend::default()
    }));
    let resp = send(
        &app,
        request(
            "POST",
            "/api/login",
            None,
            Some(json!({"correo": "ana@x.org", "contra": "secreto123"})),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn login_token_signed_with_another_secret_is_not_stored() {
    let app = app_with(Arc::new(FakeBackend {
        login_token: Some(forged_token(Role::Administrador)),
        ..FakeBackend::default()
    }));
    let resp = send(
        &app,
        request(
            "POST",
            "/api/login",
            None,
            Some(json!({"correo": "ana@x.org", "contra": "secreto123"})),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert!(set_cookie_values(&resp).is_empty());
}

#[tokio::test]
async fn register_creates_the_account() {
    let (app, backend) = app();
    let resp = send(
        &app,
        request(
            "POST",
            "/api/register",
            None,
            Some(json!({
                "correo": "luis@x.org",
                "nombre": "Luis",
                "apellido": "Gómez",
                "rol": "voluntario",
                "contra": "clave-larga-1"
            })),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await, json!({"redirect": "/login"}));

    let calls = backend.calls();
    assert_eq!(calls[0].endpoint, "usuario-create");
    assert_eq!(calls[0].body["estado"], "activo");
}

#[tokio::test]
async fn register_refuses_administrators_and_weak_passwords() {
    let (app, backend) = app();
    let resp = send(
        &app,
        request(
            "POST",
            "/api/register",
            None,
            Some(json!({
                "correo": "luis@x.org",
                "nombre": "Luis",
                "apellido": "Gómez",
                "rol": "administrador",
                "contra": "corta"
            })),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["fields"]["rol"].is_string());
    assert!(body["fields"]["contra"].is_string());
    assert!(backend.calls().is_empty());
}

// --- pages -----------------------------------------------------------------

#[tokio::test]
async fn admin_page_loads_every_section_with_the_bearer_token() {
    let (app, backend) = app();
    let token = token_for(Role::Administrador);
    let resp = send(&app, request("GET", "/administrador", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let page = body_json(resp).await;
    assert_eq!(page["animales"].as_array().unwrap().len(), 2);
    assert_eq!(page["adopciones"][0]["estado"], "en_proceso");
    assert_eq!(page["adoptantes"][0]["nombre"], "Ana");
    assert_eq!(page["voluntarios"][0]["nombre"], "Luis");
    assert_eq!(page["unavailable"], json!([]));

    let calls = backend.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().all(|c| c.token.as_deref() == Some(token.as_str())));
}

#[tokio::test]
async fn failed_section_is_empty_and_the_page_still_renders() {
    let backend = Arc::new(FakeBackend {
        failing: ["adopcion-list".to_string()].into_iter().collect(),
        ..FakeBackend::default()
    });
    let app = app_with(backend);
    let token = token_for(Role::Voluntario);

    let resp = send(&app, request("GET", "/voluntario", Some(&token), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page = body_json(resp).await;
    assert_eq!(page["adopciones"], json!([]));
    assert_eq!(page["animales"].as_array().unwrap().len(), 2);
    assert_eq!(page["unavailable"], json!(["adopciones"]));
}

#[tokio::test]
async fn adopter_sees_which_animals_can_be_adopted() {
    let (app, _) = app();
    let token = token_for(Role::Adoptante);
    let page = body_json(send(&app, request("GET", "/adoptante", Some(&token), None)).await).await;

    let animales = page["animales"].as_array().unwrap();
    assert_eq!(animales[0]["nombre"], "Toby");
    assert_eq!(animales[0]["adoptable"], true);
    assert!(animales[0]["avatar"].as_str().unwrap().contains("photo-1558788353"));
    assert_eq!(animales[1]["adoptable"], false);
}

#[tokio::test]
async fn adoption_request_uses_the_verified_caller() {
    let (app, backend) = app();
    let token = token_for(Role::Adoptante);
    let resp = send(
        &app,
        request("POST", "/adoptante/animales/1/adoptar", Some(&token), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let call = backend.calls().pop().unwrap();
    assert_eq!(call.endpoint, "adopcion-creacion-edicion-animal");
    assert_eq!(
        call.body,
        json!({"animal": 1, "adoptante": 7, "estado": "en_proceso"})
    );
}

#[tokio::test]
async fn volunteer_finalizes_an_adoption() {
    let (app, backend) = app();
    let token = token_for(Role::Voluntario);
    let resp = send(
        &app,
        request("POST", "/voluntario/adopciones/10/finalizar", Some(&token), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let call = backend.calls().pop().unwrap();
    assert_eq!(call.endpoint, "adopcion-update/10");
    assert_eq!(call.body, json!({"estado": "finalizado", "voluntario": 7}));
}

#[tokio::test]
async fn admin_actions_map_onto_backend_endpoints() {
    let (app, backend) = app();
    let token = token_for(Role::Administrador);

    let resp = send(
        &app,
        request(
            "POST",
            "/administrador/animal",
            Some(&token),
            Some(json!({"nombre": "Nube", "tipo": "gato"})),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(
        &app,
        request(
            "POST",
            "/administrador/voluntarios/30",
            Some(&token),
            Some(json!({"estado": "inactivo"})),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(
        &app,
        request("POST", "/administrador/adoptantes/20/delete", Some(&token), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let endpoints: Vec<String> = backend.calls().into_iter().map(|c| c.endpoint).collect();
    assert_eq!(
        endpoints,
        ["animal-create", "usuario-update/30", "adoptantes-delete/20"]
    );
}

#[tokio::test]
async fn admin_action_errors() {
    let token = token_for(Role::Administrador);

    let (app, backend) = app();
    let resp = send(
        &app,
        request("POST", "/administrador/mascotas", Some(&token), Some(json!({}))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(
        &app,
        request("POST", "/administrador/animal", Some(&token), Some(json!([1, 2]))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(backend.calls().is_empty());

    let app = app_with(Arc::new(FakeBackend {
        down: true,
        ..FakeBackend::default()
    }));
    let resp = send(
        &app,
        request("POST", "/administrador/animal/1/delete", Some(&token), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(resp).await,
        json!({"error": "Something went wrong. Please try again later."})
    );
}
