//! Сервисы ресурсов: по одному методу на операцию backend.
//!
//! Методы не возвращают `Err` и не паникуют: любая ошибка (сервер, транспорт,
//! пустой идентификатор) приходит как [`ApiResponse::Error`].

mod auth;
mod parents;
mod posts;
mod statistics;
mod teachers;
mod users;

pub use auth::{AuthService, REGISTRATION_SUCCEEDED};
pub use parents::ParentService;
pub use posts::PostService;
pub use statistics::{StatisticsQuery, StatisticsService};
pub use teachers::TeacherService;
pub use users::UserService;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::envelope::{
    ApiResponse, ListPage, QueryParams, normalize_ack, normalize_entity, normalize_list, respond,
    require_id,
};
use crate::error::CONFIGURATION_ERROR;
use crate::http_client::{ApiPath, HttpClient, RequestOptions};

/// Путь `<base>/<id>`, если идентификатор не пустой.
fn id_path(base: &str, id: &str) -> Option<ApiPath> {
    require_id(id).ok().map(|id| ApiPath::new(base).segment(id))
}

fn log_failure<T>(operation: &str, response: &ApiResponse<T>) {
    if let ApiResponse::Error { message } = response {
        warn!(operation, message = %message, "service call failed");
    }
}

async fn fetch_list<T: DeserializeOwned>(
    http: &HttpClient,
    operation: &str,
    path: ApiPath,
    query: QueryParams,
    list_key: &str,
) -> ApiResponse<ListPage<T>> {
    let result = http
        .request(Method::GET, &path, RequestOptions::with_query(query.clone()))
        .await;
    let response = respond(result, |payload| normalize_list(payload, list_key, &query));
    log_failure(operation, &response);
    response
}

async fn fetch_entity<T: DeserializeOwned>(
    http: &HttpClient,
    operation: &str,
    path: ApiPath,
    entity_key: &str,
) -> ApiResponse<T> {
    let result = http
        .request(Method::GET, &path, RequestOptions::default())
        .await;
    let response = respond(result, |payload| normalize_entity(payload, entity_key));
    log_failure(operation, &response);
    response
}

async fn send_command(
    http: &HttpClient,
    operation: &str,
    method: Method,
    path: ApiPath,
    body: Option<Value>,
) -> ApiResponse<Value> {
    let options = RequestOptions {
        body,
        ..RequestOptions::default()
    };
    let result = http.request(method, &path, options).await;
    let response = respond(result, normalize_ack);
    log_failure(operation, &response);
    response
}

/// Команда с телом из сериализуемой структуры.
async fn send_json<B: Serialize>(
    http: &HttpClient,
    operation: &str,
    method: Method,
    path: ApiPath,
    body: &B,
) -> ApiResponse<Value> {
    match serde_json::to_value(body) {
        Ok(body) => send_command(http, operation, method, path, Some(body)).await,
        Err(err) => {
            warn!(operation, error = %err, "request body is not serializable");
            ApiResponse::error(CONFIGURATION_ERROR)
        }
    }
}
