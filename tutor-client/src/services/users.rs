use reqwest::Method;
use serde_json::{Map, Value, json};

use super::{fetch_entity, fetch_list, id_path, send_command};
use crate::envelope::{ApiResponse, INVALID_ID, ListPage};
use crate::filters::{ListFilters, UserFilters};
use crate::http_client::{ApiPath, HttpClient};
use crate::models::{AccountStatus, User, UserRole};

const USERS: &str = "admin/users";

#[derive(Debug, Clone)]
/// Сервис пользователей (`admin/users`).
pub struct UserService {
    http: HttpClient,
}

impl UserService {
    /// Создаёт сервис поверх HTTP-клиента.
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Страница пользователей. Backend может вернуть голый массив.
    pub async fn list(&self, filters: &UserFilters) -> ApiResponse<ListPage<User>> {
        fetch_list(&self.http, "users.list", ApiPath::new(USERS), filters.to_query(), "users").await
    }

    /// Все пользователи без пагинации (`all=true`).
    pub async fn list_all(&self, filters: &UserFilters) -> ApiResponse<ListPage<User>> {
        let query = filters.criteria().with("all", true);
        fetch_list(&self.http, "users.list_all", ApiPath::new(USERS), query, "users").await
    }

    /// Страница пользователей через `admin/users/limit`.
    pub async fn list_paginated(&self, filters: &UserFilters) -> ApiResponse<ListPage<User>> {
        let path = ApiPath::new(USERS).segment("limit");
        fetch_list(&self.http, "users.list_paginated", path, filters.to_query(), "users").await
    }

    /// Пользователь по идентификатору.
    pub async fn get(&self, id: &str) -> ApiResponse<User> {
        let Some(path) = id_path(USERS, id) else {
            return ApiResponse::error(INVALID_ID);
        };
        fetch_entity(&self.http, "users.get", path, "user").await
    }

    /// Частичное обновление полей пользователя.
    pub async fn update(&self, id: &str, patch: Map<String, Value>) -> ApiResponse<Value> {
        let Some(path) = id_path(USERS, id) else {
            return ApiResponse::error(INVALID_ID);
        };
        send_command(&self.http, "users.update", Method::PATCH, path, Some(Value::Object(patch)))
            .await
    }

    /// Удаляет пользователя. Пустой ответ (204) считается успехом.
    pub async fn delete(&self, id: &str) -> ApiResponse<Value> {
        let Some(path) = id_path(USERS, id) else {
            return ApiResponse::error(INVALID_ID);
        };
        send_command(&self.http, "users.delete", Method::DELETE, path, None).await
    }

    /// Меняет статус учётной записи.
    pub async fn update_status(&self, id: &str, status: AccountStatus) -> ApiResponse<Value> {
        let Some(path) = id_path(USERS, id) else {
            return ApiResponse::error(INVALID_ID);
        };
        let body = json!({ "status": status });
        send_command(
            &self.http,
            "users.update_status",
            Method::PATCH,
            path.segment("status"),
            Some(body),
        )
        .await
    }

    /// Меняет роль.
    pub async fn update_role(&self, id: &str, role: UserRole) -> ApiResponse<Value> {
        let Some(path) = id_path(USERS, id) else {
            return ApiResponse::error(INVALID_ID);
        };
        let body = json!({ "role": role });
        send_command(
            &self.http,
            "users.update_role",
            Method::PATCH,
            path.segment("role"),
            Some(body),
        )
        .await
    }
}
