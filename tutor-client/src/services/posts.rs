use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::{fetch_entity, fetch_list, id_path, send_command, send_json};
use crate::envelope::{ApiResponse, INVALID_ID, ListPage, QueryParams, looks_like_storage_id};
use crate::filters::{ListFilters, PostFilters};
use crate::http_client::{ApiPath, HttpClient};
use crate::models::{Post, PostStatus};

const POSTS: &str = "admin/posts";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewBody<'a> {
    status: PostStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    review_note: Option<&'a str>,
}

/// Посты адресуются по `requestId`. Идентификатор хранилища не переводится,
/// только отмечается в логе.
fn annotate_post_id(operation: &str, id: &str) {
    if looks_like_storage_id(id.trim()) {
        warn!(
            operation,
            id,
            "post id looks like a storage id; posts are addressed by requestId"
        );
    }
}

#[derive(Debug, Clone)]
/// Сервис постов (`admin/posts`).
pub struct PostService {
    http: HttpClient,
}

impl PostService {
    /// Создаёт сервис поверх HTTP-клиента.
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Страница постов. Сортировка `newest/oldest` уходит как `sort=createdAt&sortOrder=desc|asc`.
    pub async fn list_paginated(&self, filters: &PostFilters) -> ApiResponse<ListPage<Post>> {
        fetch_list(
            &self.http,
            "posts.list_paginated",
            ApiPath::new(POSTS),
            filters.to_query(),
            "posts",
        )
        .await
    }

    /// Все посты, без параметров.
    pub async fn list_all(&self) -> ApiResponse<ListPage<Post>> {
        fetch_list(&self.http, "posts.list_all", ApiPath::new(POSTS), QueryParams::new(), "posts")
            .await
    }

    /// Пост по `requestId`.
    pub async fn get(&self, id: &str) -> ApiResponse<Post> {
        annotate_post_id("posts.get", id);
        let Some(path) = id_path(POSTS, id) else {
            return ApiResponse::error(INVALID_ID);
        };
        fetch_entity(&self.http, "posts.get", path, "post").await
    }

    /// Модерация поста.
    pub async fn update_status(
        &self,
        id: &str,
        status: PostStatus,
        note: Option<&str>,
    ) -> ApiResponse<Value> {
        annotate_post_id("posts.update_status", id);
        let Some(path) = id_path(POSTS, id) else {
            return ApiResponse::error(INVALID_ID);
        };
        let body = ReviewBody {
            status,
            review_note: note,
        };
        send_json(
            &self.http,
            "posts.update_status",
            Method::PATCH,
            path.segment("status"),
            &body,
        )
        .await
    }

    /// Удаляет пост.
    pub async fn delete(&self, id: &str) -> ApiResponse<Value> {
        annotate_post_id("posts.delete", id);
        let Some(path) = id_path(POSTS, id) else {
            return ApiResponse::error(INVALID_ID);
        };
        send_command(&self.http, "posts.delete", Method::DELETE, path, None).await
    }

    /// Все посты из города (`all=true`).
    pub async fn by_city(&self, city: &str, filters: &PostFilters) -> ApiResponse<ListPage<Post>> {
        let Some(path) = id_path(&format!("{POSTS}/city"), city) else {
            return ApiResponse::error(INVALID_ID);
        };
        let query = filters
            .criteria()
            .with("city", None::<String>)
            .with("all", true);
        fetch_list(&self.http, "posts.by_city", path, query, "posts").await
    }
}
