use reqwest::Method;
use serde_json::{Map, Value, json};
use tracing::{info, warn};
use validator::Validate;

use super::log_failure;
use crate::envelope::{ApiResponse, normalize_ack, respond};
use crate::error::CONFIGURATION_ERROR;
use crate::http_client::{ApiPath, HttpClient, RequestOptions};
use crate::models::{Credentials, Registration, UserRole};
use crate::session::{Session, SessionUser};

/// Сообщение успешной регистрации, если сервер своего не прислал.
pub const REGISTRATION_SUCCEEDED: &str = "registration successful";
const LOGIN_FAILED: &str = "login failed";

#[derive(Debug, Clone)]
/// Вход и регистрация администратора.
pub struct AuthService {
    http: HttpClient,
}

impl AuthService {
    /// Создаёт сервис поверх HTTP-клиента.
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Выполняет вход. Запрос анонимный: токен не прикладывается, 401 не сбрасывает сессию.
    ///
    /// Сессия здесь не сохраняется, этим занимается хранилище авторизации.
    pub async fn login(&self, credentials: &Credentials) -> ApiResponse<Session> {
        if let Err(err) = credentials.validate() {
            warn!(error = %err, "login rejected locally");
            return ApiResponse::error("username and password are required");
        }

        let body = json!({
            "username": credentials.username,
            "password": credentials.password,
        });
        let options = RequestOptions::with_body(body).anonymous();
        let result = self
            .http
            .request(Method::POST, &ApiPath::new("auth/login"), options)
            .await;

        let response = respond(result, parse_login);
        log_failure("auth.login", &response);
        if response.is_success() {
            info!(username = %credentials.username, "login succeeded");
        }
        response
    }

    /// Регистрирует администратора: роль всегда `admin`, что бы ни пришло в данных.
    pub async fn register(&self, registration: &Registration) -> ApiResponse<Value> {
        if let Err(err) = registration.validate() {
            return ApiResponse::error(format!("invalid registration data: {err}"));
        }

        let mut body = match serde_json::to_value(registration) {
            Ok(Value::Object(body)) => body,
            _ => return ApiResponse::error(CONFIGURATION_ERROR),
        };
        body.insert("role".to_string(), json!(UserRole::Admin));

        let result = self
            .http
            .request(
                Method::POST,
                &ApiPath::new("auth/register"),
                RequestOptions::with_body(Value::Object(body)),
            )
            .await;
        let response = respond(result, normalize_ack).with_default_message(REGISTRATION_SUCCEEDED);
        log_failure("auth.register", &response);
        response
    }
}

fn take_string(object: &mut Map<String, Value>, key: &str) -> Option<String> {
    match object.remove(key) {
        Some(Value::String(value)) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

/// Токен берётся из `data.token` или `token`, пользователь из `data.user` или `user`.
/// Без любого из них вход не считается успешным.
fn parse_login(payload: Value) -> ApiResponse<Session> {
    let Value::Object(mut object) = payload else {
        return ApiResponse::error(LOGIN_FAILED);
    };
    let message = object
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);
    if object.get("status").and_then(Value::as_str) != Some("success") {
        return ApiResponse::error(message.unwrap_or_else(|| LOGIN_FAILED.to_string()));
    }

    let mut data = match object.remove("data") {
        Some(Value::Object(data)) => data,
        _ => Map::new(),
    };
    let Some(token) = take_string(&mut data, "token").or_else(|| take_string(&mut object, "token"))
    else {
        return ApiResponse::error(message.unwrap_or_else(|| LOGIN_FAILED.to_string()));
    };

    let Some(raw_user) = data.remove("user").or_else(|| object.remove("user")) else {
        warn!("login response carries no user");
        return ApiResponse::error(message.unwrap_or_else(|| LOGIN_FAILED.to_string()));
    };
    let user = match serde_json::from_value::<SessionUser>(raw_user) {
        Ok(user) => user,
        Err(err) => {
            warn!(error = %err, "login response carries a malformed user");
            return ApiResponse::error(LOGIN_FAILED);
        }
    };

    ApiResponse::Success {
        data: Session { token, user },
        message,
    }
}
