use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;

use super::{FetchStrategy, ListItem, ListState, ListStatistics, ListStore};
use crate::envelope::{ApiResponse, ListPage};
use crate::filters::PostFilters;
use crate::models::{Pagination, Post, PostStatus, SortOrder};
use crate::services::PostService;

impl ListItem for Post {
    type Filters = PostFilters;

    fn passes(&self, filters: &PostFilters) -> bool {
        filters.matches(self)
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn sort_order(filters: &PostFilters) -> Option<SortOrder> {
        Some(filters.sort)
    }
}

#[derive(Debug, Clone)]
/// Хранилище постов.
pub struct PostStore {
    list: ListStore<Post>,
    service: PostService,
}

impl PostStore {
    /// Создаёт хранилище с выбранной стратегией загрузки.
    pub fn new(service: PostService, strategy: FetchStrategy) -> Self {
        Self {
            list: ListStore::new(strategy),
            service,
        }
    }

    /// Стратегия загрузки.
    pub fn strategy(&self) -> FetchStrategy {
        self.list.strategy()
    }

    /// Копия состояния.
    pub fn snapshot(&self) -> ListState<Post> {
        self.list.snapshot()
    }

    /// Подписка на изменения.
    pub fn subscribe(&self) -> watch::Receiver<ListState<Post>> {
        self.list.subscribe()
    }

    /// Загружает страницу с серверной сортировкой или все посты.
    pub async fn fetch(&self) -> ApiResponse<ListPage<Post>> {
        self.list.begin();
        let response = match self.list.strategy() {
            FetchStrategy::ServerPaginated => {
                let filters = self.list.filters();
                self.service.list_paginated(&filters).await
            }
            FetchStrategy::FullSet => self.service.list_all().await,
        };
        self.list
            .settle(response, |state, page| self.list.apply_page(state, page))
    }

    /// Загружает пост по `requestId` и делает его открытой записью.
    pub async fn get(&self, id: &str) -> ApiResponse<Post> {
        self.list.begin();
        let response = self.service.get(id).await;
        self.list
            .settle(response, |state, post| state.current = Some(post.clone()))
    }

    /// Посты из города.
    ///
    /// В режиме полного набора загружает список один раз и выставляет фильтр города,
    /// в серверном режиме запрашивает `admin/posts/city/{city}?all=true`.
    pub async fn by_city(&self, city: &str) -> ApiResponse<ListPage<Post>> {
        match self.list.strategy() {
            FetchStrategy::FullSet => {
                if self.list.is_empty() {
                    let loaded = self.fetch().await;
                    if let ApiResponse::Error { message } = loaded {
                        return ApiResponse::error(message);
                    }
                }
                let filters = self
                    .list
                    .update_filters(|filters| filters.city = Some(city.to_string()));
                let items = self.list.filtered_items();
                let pagination = Pagination::new(filters.page, filters.limit, items.len() as u64);
                ApiResponse::success(ListPage { items, pagination })
            }
            FetchStrategy::ServerPaginated => {
                self.list.begin();
                let filters = self.list.filters();
                let response = self.service.by_city(city, &filters).await;
                self.list
                    .settle(response, |state, page| self.list.apply_page(state, page))
            }
        }
    }

    /// Модерирует пост. Локально меняются `status`, `reviewNote` и `reviewedAt`.
    pub async fn review(
        &self,
        id: &str,
        status: PostStatus,
        note: Option<&str>,
    ) -> ApiResponse<Value> {
        self.list.begin();
        let response = self.service.update_status(id, status, note).await;
        let note = note.map(str::to_string);
        self.list.settle(response, |state, _| {
            let now = Utc::now();
            ListStore::patch_matching(state, id, |post| {
                post.status = status.to_string();
                post.review_note = note.clone();
                post.reviewed_at = Some(now);
            });
        })
    }

    /// Удаляет пост.
    pub async fn delete(&self, id: &str) -> ApiResponse<Value> {
        self.list.begin();
        let response = self.service.delete(id).await;
        self.list
            .settle(response, |state, _| ListStore::remove_matching(state, id))
    }

    /// Меняет фильтры.
    pub fn update_filters(&self, update: impl FnOnce(&mut PostFilters)) -> PostFilters {
        self.list.update_filters(update)
    }

    /// Сбрасывает фильтры.
    pub fn reset_filters(&self) {
        self.list.reset_filters();
    }

    /// Переходит на страницу.
    pub fn change_page(&self, page: u32) -> bool {
        self.list.change_page(page)
    }

    /// Отфильтрованный и отсортированный набор. `published` соответствует `approved`.
    pub fn filtered_items(&self) -> Vec<Post> {
        self.list.filtered_items()
    }

    /// Текущая страница.
    pub fn paginated_items(&self) -> Vec<Post> {
        self.list.paginated_items()
    }

    /// Счётчики по статусам модерации.
    pub fn statistics(&self) -> ListStatistics {
        self.list.statistics(&["pending", "approved", "rejected"])
    }
}
