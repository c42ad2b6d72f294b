use std::{collections::HashMap, sync::Arc, time::Instant};

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

/// The two storage backends the service exposes under separate prefixes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Sql,
    Redis,
}

impl Backend {
    pub fn label(self) -> &'static str {
        match self {
            Backend::Sql => "sql",
            Backend::Redis => "redis",
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Backend::Sql => "/api",
            Backend::Redis => "/api-redis",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub token_jti: Option<String>,
    pub backend: String,
    pub created_at: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TokenType {
    Access,
    Refresh,
}

struct Account {
    user: User,
    password: String,
}

struct IssuedToken {
    user_id: i64,
    kind: TokenType,
    jti: String,
    revoked: bool,
}

/// In-memory state behind the router.
#[derive(Default)]
pub struct Store {
    accounts: Vec<Account>,
    tokens: HashMap<String, IssuedToken>,
    audit: Vec<AuditRecord>,
    database_down: bool,
    redis_down: bool,
}

impl Store {
    pub fn set_database_up(&mut self, up: bool) {
        self.database_down = !up;
    }

    pub fn set_redis_up(&mut self, up: bool) {
        self.redis_down = !up;
    }

    /// Mark a user inactive. Returns false if no such user exists.
    pub fn deactivate(&mut self, username: &str) -> bool {
        match self.accounts.iter_mut().find(|a| a.user.username == username) {
            Some(account) => {
                account.user.is_active = false;
                true
            }
            None => false,
        }
    }

    pub fn audit_records(&self) -> &[AuditRecord] {
        &self.audit
    }

    fn backend_up(&self, backend: Backend) -> bool {
        match backend {
            Backend::Sql => !self.database_down,
            Backend::Redis => !self.redis_down,
        }
    }

    fn user_by_id(&self, id: i64) -> Option<&User> {
        self.accounts.iter().map(|a| &a.user).find(|u| u.id == id)
    }

    fn authenticate(&self, username: &str, password: &str) -> Result<User, ApiFailure> {
        let account = self
            .accounts
            .iter()
            .find(|a| a.user.username == username && a.password == password)
            .ok_or(INVALID_CREDENTIALS)?;
        if !account.user.is_active {
            return Err(USER_INACTIVE);
        }
        Ok(account.user.clone())
    }

    fn issue(&mut self, user_id: i64, kind: TokenType) -> String {
        let jti = Uuid::new_v4().simple().to_string();
        let token = match kind {
            TokenType::Access => format!("access.{jti}"),
            TokenType::Refresh => format!("refresh.{jti}"),
        };
        self.tokens.insert(
            token.clone(),
            IssuedToken {
                user_id,
                kind,
                jti,
                revoked: false,
            },
        );
        token
    }

    /// Resolve a bearer token of the given kind to its user id.
    fn verify(&self, token: &str, kind: TokenType) -> Result<i64, ApiFailure> {
        let issued = self.tokens.get(token).ok_or(INVALID_TOKEN)?;
        if issued.kind != kind {
            return Err(INVALID_TOKEN);
        }
        if issued.revoked {
            return Err(TOKEN_REVOKED);
        }
        Ok(issued.user_id)
    }

    fn revoke(&mut self, token: &str) -> Option<String> {
        let issued = self.tokens.get_mut(token)?;
        issued.revoked = true;
        Some(issued.jti.clone())
    }

    fn revoke_all(&mut self, user_id: i64) {
        for issued in self.tokens.values_mut().filter(|t| t.user_id == user_id) {
            issued.revoked = true;
        }
    }

    fn record(&mut self, user_id: i64, action: &str, token_jti: Option<String>, backend: Backend) {
        let id = self.audit.len() as i64 + 1;
        self.audit.push(AuditRecord {
            id,
            user_id,
            action: action.to_string(),
            token_jti,
            backend: backend.label().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        });
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Error response in the service's `{message, error}` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub message: &'static str,
    pub code: &'static str,
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "message": self.message, "error": self.code })),
        )
            .into_response()
    }
}

const fn failure(status: StatusCode, message: &'static str, code: &'static str) -> ApiFailure {
    ApiFailure {
        status,
        message,
        code,
    }
}

const MISSING_FIELDS: ApiFailure = failure(
    StatusCode::BAD_REQUEST,
    "username and password are required",
    "missing_fields",
);
const MISSING_REGISTRATION_FIELDS: ApiFailure = failure(
    StatusCode::BAD_REQUEST,
    "username, email and password are required",
    "missing_fields",
);
const INVALID_USERNAME: ApiFailure = failure(
    StatusCode::BAD_REQUEST,
    "username must be at least 3 characters",
    "invalid_username",
);
const INVALID_PASSWORD: ApiFailure = failure(
    StatusCode::BAD_REQUEST,
    "password must be at least 6 characters",
    "invalid_password",
);
const USERNAME_EXISTS: ApiFailure = failure(StatusCode::CONFLICT, "username already in use", "username_exists");
const EMAIL_EXISTS: ApiFailure = failure(StatusCode::CONFLICT, "email already in use", "email_exists");
const INVALID_CREDENTIALS: ApiFailure = failure(
    StatusCode::UNAUTHORIZED,
    "invalid credentials",
    "invalid_credentials",
);
const USER_INACTIVE: ApiFailure = failure(StatusCode::UNAUTHORIZED, "user is inactive", "user_inactive");
const INVALID_USER: ApiFailure = failure(
    StatusCode::UNAUTHORIZED,
    "user is invalid or inactive",
    "invalid_user",
);
const AUTHORIZATION_REQUIRED: ApiFailure = failure(
    StatusCode::UNAUTHORIZED,
    "authorization token required",
    "authorization_required",
);
const INVALID_TOKEN: ApiFailure = failure(StatusCode::UNAUTHORIZED, "invalid token", "invalid_token");
const TOKEN_REVOKED: ApiFailure = failure(StatusCode::UNAUTHORIZED, "token has been revoked", "token_revoked");
const USER_NOT_FOUND: ApiFailure = failure(StatusCode::NOT_FOUND, "user not found", "user_not_found");
const INTERNAL_ERROR: ApiFailure = failure(
    StatusCode::INTERNAL_SERVER_ERROR,
    "internal server error",
    "internal_error",
);

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

pub fn app() -> Router {
    app_with_store(Db::default())
}

/// Router over a caller-provided store, so tests can inspect or flip state.
pub fn app_with_store(db: Db) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/register", post(register))
        .route("/api/profile", get(profile))
        .route("/api/performance/compare", post(compare));
    let router = session_routes(router, Backend::Sql);
    session_routes(router, Backend::Redis).with_state(db)
}

/// Login, refresh, logout, logout-all and audit-log exist once per backend.
fn session_routes(router: Router<Db>, backend: Backend) -> Router<Db> {
    let prefix = backend.prefix();
    router
        .route(
            &format!("{prefix}/login"),
            post(
                move |State(db): State<Db>, payload: Result<Json<LoginInput>, JsonRejection>| {
                    login(db, backend, payload)
                },
            ),
        )
        .route(
            &format!("{prefix}/refresh"),
            post(move |State(db): State<Db>, headers: HeaderMap| refresh(db, backend, headers)),
        )
        .route(
            &format!("{prefix}/logout"),
            post(move |State(db): State<Db>, headers: HeaderMap| logout(db, backend, headers)),
        )
        .route(
            &format!("{prefix}/logout-all"),
            post(move |State(db): State<Db>, headers: HeaderMap| logout_all(db, backend, headers)),
        )
        .route(
            &format!("{prefix}/audit-log"),
            get(
                move |State(db): State<Db>, headers: HeaderMap, Query(query): Query<AuditQuery>| {
                    audit_log(db, backend, headers, query)
                },
            ),
        )
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_store(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_store(db)).await
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiFailure> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or(AUTHORIZATION_REQUIRED)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn elapsed_ms(started: Instant) -> f64 {
    round2(started.elapsed().as_secs_f64() * 1000.0)
}

/// Summary of one comparison run. Negative differences mean Redis was faster.
pub fn performance_analysis(sql_ms: f64, redis_ms: f64) -> Value {
    let difference = redis_ms - sql_ms;
    let percentage = if sql_ms > 0.0 {
        difference / sql_ms * 100.0
    } else {
        0.0
    };
    let redis_faster = redis_ms < sql_ms;
    json!({
        "faster_system": if redis_faster { "redis" } else { "sql" },
        "time_difference_ms": round2(difference),
        "percentage_difference": round2(percentage),
        "redis_advantage": format!(
            "redis is {:.1}% {} than sql",
            percentage.abs(),
            if redis_faster { "faster" } else { "slower" }
        ),
    })
}

async fn index() -> Json<Value> {
    Json(json!({
        "message": "JWT Auth System API",
        "version": "1.0",
        "endpoints": {
            "health": "/api/health",
            "register": "/api/register",
            "login_sql": "/api/login",
            "login_redis": "/api-redis/login",
            "compare": "/api/performance/compare"
        }
    }))
}

async fn health(State(db): State<Db>) -> (StatusCode, Json<Value>) {
    let store = db.read().await;
    let connection = |up: bool| if up { "connected" } else { "disconnected" };
    let database_up = store.backend_up(Backend::Sql);
    let redis_up = store.backend_up(Backend::Redis);
    let healthy = database_up && redis_up;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if healthy { "healthy" } else { "unhealthy" },
            "database": connection(database_up),
            "redis": connection(redis_up),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

async fn register(
    State(db): State<Db>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiFailure> {
    let input = payload.map(|Json(i)| i).unwrap_or_default();
    let username = input.username.trim().to_string();
    let email = input.email.trim().to_lowercase();
    if username.is_empty() || email.is_empty() || input.password.is_empty() {
        return Err(MISSING_REGISTRATION_FIELDS);
    }
    if username.chars().count() < 3 {
        return Err(INVALID_USERNAME);
    }
    if input.password.chars().count() < 6 {
        return Err(INVALID_PASSWORD);
    }

    let mut store = db.write().await;
    if !store.backend_up(Backend::Sql) {
        return Err(INTERNAL_ERROR);
    }
    if store.accounts.iter().any(|a| a.user.username == username) {
        return Err(USERNAME_EXISTS);
    }
    if store.accounts.iter().any(|a| a.user.email == email) {
        return Err(EMAIL_EXISTS);
    }

    let user = User {
        id: store.accounts.len() as i64 + 1,
        username,
        email,
        is_active: true,
    };
    store.accounts.push(Account {
        user: user.clone(),
        password: input.password,
    });
    info!(username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "user registered", "user": user })),
    ))
}

async fn login(
    db: Db,
    backend: Backend,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<Value>, ApiFailure> {
    let started = Instant::now();
    let input = payload.map(|Json(i)| i).unwrap_or_default();
    let username = input.username.trim();
    if username.is_empty() || input.password.is_empty() {
        return Err(MISSING_FIELDS);
    }

    let mut store = db.write().await;
    if !store.backend_up(backend) {
        return Err(INTERNAL_ERROR);
    }
    let user = store.authenticate(username, &input.password)?;
    let access_token = store.issue(user.id, TokenType::Access);
    let refresh_token = store.issue(user.id, TokenType::Refresh);
    store.record(user.id, "login", None, backend);

    let response_time_ms = elapsed_ms(started);
    info!(username = %user.username, backend = backend.label(), response_time_ms, "login");
    Ok(Json(json!({
        "message": format!("login successful ({})", backend.label()),
        "access_token": access_token,
        "refresh_token": refresh_token,
        "user": user,
        "response_time_ms": response_time_ms,
    })))
}

async fn refresh(db: Db, backend: Backend, headers: HeaderMap) -> Result<Json<Value>, ApiFailure> {
    let started = Instant::now();
    let token = bearer_token(&headers)?;
    let mut store = db.write().await;
    let user_id = store.verify(token, TokenType::Refresh)?;
    if !store.user_by_id(user_id).is_some_and(|u| u.is_active) {
        return Err(INVALID_USER);
    }

    let access_token = store.issue(user_id, TokenType::Access);
    store.record(user_id, "refresh", None, backend);
    info!(user_id, backend = backend.label(), "token refreshed");

    let mut body = json!({
        "message": "token refreshed",
        "access_token": access_token,
    });
    if backend == Backend::Redis {
        body["response_time_ms"] = json!(elapsed_ms(started));
    }
    Ok(Json(body))
}

async fn logout(db: Db, backend: Backend, headers: HeaderMap) -> Result<Json<Value>, ApiFailure> {
    let started = Instant::now();
    let token = bearer_token(&headers)?;
    let mut store = db.write().await;
    let user_id = store.verify(token, TokenType::Access)?;
    let jti = store.revoke(token);
    store.record(user_id, "logout", jti, backend);
    info!(user_id, backend = backend.label(), "logout");

    let mut body = json!({ "message": "logout successful" });
    if backend == Backend::Redis {
        body["response_time_ms"] = json!(elapsed_ms(started));
    }
    Ok(Json(body))
}

async fn logout_all(db: Db, backend: Backend, headers: HeaderMap) -> Result<Json<Value>, ApiFailure> {
    let started = Instant::now();
    let token = bearer_token(&headers)?;
    let mut store = db.write().await;
    let user_id = store.verify(token, TokenType::Access)?;
    store.revoke_all(user_id);
    store.record(user_id, "revoke", None, backend);
    info!(user_id, backend = backend.label(), "all sessions closed");

    let mut body = json!({ "message": "all sessions closed" });
    if backend == Backend::Redis {
        body["response_time_ms"] = json!(elapsed_ms(started));
    }
    Ok(Json(body))
}

async fn profile(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Value>, ApiFailure> {
    let token = bearer_token(&headers)?;
    let store = db.read().await;
    let user_id = store.verify(token, TokenType::Access)?;
    let user = store.user_by_id(user_id).ok_or(USER_NOT_FOUND)?;
    Ok(Json(json!({ "user": user })))
}

async fn audit_log(
    db: Db,
    backend: Backend,
    headers: HeaderMap,
    query: AuditQuery,
) -> Result<Json<Value>, ApiFailure> {
    let started = Instant::now();
    let token = bearer_token(&headers)?;
    let store = db.read().await;
    let user_id = store.verify(token, TokenType::Access)?;
    let entries: Vec<&AuditRecord> = store
        .audit
        .iter()
        .rev()
        .filter(|r| r.user_id == user_id && r.backend == backend.label())
        .take(query.limit.unwrap_or(50))
        .collect();

    let mut body = json!({ "audit_log": entries });
    if backend == Backend::Redis {
        body["response_time_ms"] = json!(elapsed_ms(started));
    }
    Ok(Json(body))
}

async fn compare(
    State(db): State<Db>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<Value>, ApiFailure> {
    let input = payload.map(|Json(i)| i).unwrap_or_default();
    let username = input.username.trim();
    if username.is_empty() || input.password.is_empty() {
        return Err(MISSING_FIELDS);
    }

    let mut store = db.write().await;
    let user = store
        .authenticate(username, &input.password)
        .map_err(|_| INVALID_CREDENTIALS)?;

    let mut comparison = serde_json::Map::new();
    let mut timings = Vec::with_capacity(2);
    for backend in [Backend::Sql, Backend::Redis] {
        let started = Instant::now();
        let entry = if store.backend_up(backend) {
            let access_token = store.issue(user.id, TokenType::Access);
            let refresh_token = store.issue(user.id, TokenType::Refresh);
            store.record(user.id, "login", None, backend);
            let elapsed = elapsed_ms(started);
            timings.push(elapsed);
            json!({
                "success": true,
                "response_time_ms": elapsed,
                "access_token": access_token,
                "refresh_token": refresh_token,
            })
        } else {
            json!({
                "success": false,
                "error": format!("{} backend unavailable", backend.label()),
                "response_time_ms": 0,
            })
        };
        comparison.insert(backend.label().to_string(), entry);
    }

    let mut body = json!({ "user": user, "comparison": comparison });
    if let [sql_ms, redis_ms] = timings.as_slice() {
        body["performance_analysis"] = performance_analysis(*sql_ms, *redis_ms);
    }
    info!(username = %user.username, "performance comparison");
    Ok(Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn analysis_prefers_redis_when_faster() {
        let analysis = performance_analysis(50.0, 10.0);
        assert_eq!(analysis["faster_system"], "redis");
        assert_eq!(analysis["time_difference_ms"], -40.0);
        assert_eq!(analysis["percentage_difference"], -80.0);
        assert_eq!(analysis["redis_advantage"], "redis is 80.0% faster than sql");
    }

    #[test]
    fn analysis_handles_zero_sql_time() {
        let analysis = performance_analysis(0.0, 2.5);
        assert_eq!(analysis["faster_system"], "sql");
        assert_eq!(analysis["percentage_difference"], 0.0);
    }

    #[test]
    fn round2_rounds_half_away_from_zero() {
        assert_eq!(round2(1.005_1), 1.01);
        assert_eq!(round2(12.344), 12.34);
    }

    #[test]
    fn bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Err(AUTHORIZATION_REQUIRED));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), Err(AUTHORIZATION_REQUIRED));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Ok("abc"));
    }

    #[test]
    fn store_rejects_wrong_token_kind_and_revoked_tokens() {
        let mut store = Store::default();
        let access = store.issue(1, TokenType::Access);
        let refresh = store.issue(1, TokenType::Refresh);

        assert_eq!(store.verify(&access, TokenType::Access), Ok(1));
        assert_eq!(store.verify(&refresh, TokenType::Access), Err(INVALID_TOKEN));

        store.revoke(&access);
        assert_eq!(store.verify(&access, TokenType::Access), Err(TOKEN_REVOKED));

        store.revoke_all(1);
        assert_eq!(store.verify(&refresh, TokenType::Refresh), Err(TOKEN_REVOKED));
    }

    #[test]
    fn login_input_tolerates_missing_fields() {
        let input: LoginInput = serde_json::from_str(r#"{"username":"bob"}"#).unwrap();
        assert_eq!(input.username, "bob");
        assert!(input.password.is_empty());
    }
}
