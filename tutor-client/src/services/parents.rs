use reqwest::Method;
use serde_json::{Value, json};

use super::{fetch_entity, fetch_list, id_path, log_failure, send_command};
use crate::envelope::{ApiResponse, INVALID_ID, ListPage, QueryParams, normalize_object, respond};
use crate::filters::{ListFilters, ParentFilters};
use crate::http_client::{ApiPath, HttpClient, RequestOptions};
use crate::models::{AccountStatus, Parent, Period, StatisticsSnapshot};

const PARENTS: &str = "admin/parents";

#[derive(Debug, Clone)]
/// Сервис родителей (`admin/parents`).
pub struct ParentService {
    http: HttpClient,
}

impl ParentService {
    /// Создаёт сервис поверх HTTP-клиента.
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Все родители по критериям, без пагинации.
    pub async fn list(&self, filters: &ParentFilters) -> ApiResponse<ListPage<Parent>> {
        fetch_list(&self.http, "parents.list", ApiPath::new(PARENTS), filters.criteria(), "parents")
            .await
    }

    /// Страница родителей через `admin/parents/limit`.
    pub async fn list_paginated(&self, filters: &ParentFilters) -> ApiResponse<ListPage<Parent>> {
        let path = ApiPath::new(PARENTS).segment("limit");
        fetch_list(&self.http, "parents.list_paginated", path, filters.to_query(), "parents").await
    }

    /// Родитель по идентификатору.
    pub async fn get(&self, id: &str) -> ApiResponse<Parent> {
        let Some(path) = id_path(PARENTS, id) else {
            return ApiResponse::error(INVALID_ID);
        };
        fetch_entity(&self.http, "parents.get", path, "parent").await
    }

    /// Родители из города.
    pub async fn by_city(&self, city: &str) -> ApiResponse<ListPage<Parent>> {
        let Some(path) = id_path(&format!("{PARENTS}/city"), city) else {
            return ApiResponse::error(INVALID_ID);
        };
        fetch_list(&self.http, "parents.by_city", path, QueryParams::new(), "parents").await
    }

    /// Меняет статус родителя.
    pub async fn update_status(&self, id: &str, status: AccountStatus) -> ApiResponse<Value> {
        let Some(path) = id_path(PARENTS, id) else {
            return ApiResponse::error(INVALID_ID);
        };
        let body = json!({ "status": status });
        send_command(
            &self.http,
            "parents.update_status",
            Method::PATCH,
            path.segment("status"),
            Some(body),
        )
        .await
    }

    /// Агрегированная статистика по родителям.
    pub async fn statistics(&self) -> ApiResponse<StatisticsSnapshot> {
        let path = ApiPath::new(PARENTS).segment("statistics");
        let result = self
            .http
            .request(Method::GET, &path, RequestOptions::default())
            .await;
        let response = respond(result, normalize_object)
            .map(|object| StatisticsSnapshot::from_object(&object, Period::default(), None));
        log_failure("parents.statistics", &response);
        response
    }
}
