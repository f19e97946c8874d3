use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::{fetch_entity, fetch_list, id_path, send_json};
use crate::envelope::{ApiResponse, INVALID_ID, ListPage};
use crate::filters::{ListFilters, TeacherFilters};
use crate::http_client::{ApiPath, HttpClient};
use crate::models::{AccountStatus, Teacher};

const TUTORS: &str = "admin/tutors";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyBody<'a> {
    verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    verification_note: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody<'a> {
    status: AccountStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_note: Option<&'a str>,
}

#[derive(Debug, Clone)]
/// Сервис преподавателей. В API они называются `tutors`.
pub struct TeacherService {
    http: HttpClient,
}

impl TeacherService {
    /// Создаёт сервис поверх HTTP-клиента.
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Все преподаватели по критериям, без пагинации.
    pub async fn list(&self, filters: &TeacherFilters) -> ApiResponse<ListPage<Teacher>> {
        fetch_list(&self.http, "teachers.list", ApiPath::new(TUTORS), filters.criteria(), "tutors")
            .await
    }

    /// Страница преподавателей через `admin/tutors/limit`.
    pub async fn list_paginated(&self, filters: &TeacherFilters) -> ApiResponse<ListPage<Teacher>> {
        let path = ApiPath::new(TUTORS).segment("limit");
        fetch_list(&self.http, "teachers.list_paginated", path, filters.to_query(), "tutors").await
    }

    /// Преподаватель по идентификатору (`tutorId` или `_id`).
    pub async fn get(&self, id: &str) -> ApiResponse<Teacher> {
        let Some(path) = id_path(TUTORS, id) else {
            return ApiResponse::error(INVALID_ID);
        };
        fetch_entity(&self.http, "teachers.get", path, "tutor").await
    }

    /// Преподаватели из города.
    pub async fn by_city(
        &self,
        city: &str,
        filters: &TeacherFilters,
    ) -> ApiResponse<ListPage<Teacher>> {
        let Some(path) = id_path(&format!("{TUTORS}/city"), city) else {
            return ApiResponse::error(INVALID_ID);
        };
        let mut query = filters.criteria();
        query.set("city", None::<String>);
        fetch_list(&self.http, "teachers.by_city", path, query, "tutors").await
    }

    /// Подтверждает или снимает проверку документов.
    pub async fn verify(
        &self,
        id: &str,
        verified: bool,
        note: Option<&str>,
    ) -> ApiResponse<Value> {
        let Some(path) = id_path(TUTORS, id) else {
            return ApiResponse::error(INVALID_ID);
        };
        let body = VerifyBody {
            verified,
            verification_note: note,
        };
        send_json(
            &self.http,
            "teachers.verify",
            Method::PATCH,
            path.segment("verify"),
            &body,
        )
        .await
    }

    /// Меняет статус преподавателя с комментарием.
    pub async fn update_status(
        &self,
        id: &str,
        status: AccountStatus,
        note: Option<&str>,
    ) -> ApiResponse<Value> {
        let Some(path) = id_path(TUTORS, id) else {
            return ApiResponse::error(INVALID_ID);
        };
        let body = StatusBody {
            status,
            status_note: note,
        };
        send_json(
            &self.http,
            "teachers.update_status",
            Method::PATCH,
            path.segment("status"),
            &body,
        )
        .await
    }
}
