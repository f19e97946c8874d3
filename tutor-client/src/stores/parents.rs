use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;

use super::{FetchStrategy, ListItem, ListState, ListStatistics, ListStore};
use crate::envelope::{ApiResponse, ListPage};
use crate::filters::ParentFilters;
use crate::models::{AccountStatus, Parent, StatisticsSnapshot};
use crate::services::ParentService;

impl ListItem for Parent {
    type Filters = ParentFilters;

    fn passes(&self, filters: &ParentFilters) -> bool {
        filters.matches(self)
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

#[derive(Debug, Clone)]
/// Хранилище родителей.
pub struct ParentStore {
    list: ListStore<Parent>,
    service: ParentService,
    server_statistics: Arc<watch::Sender<Option<StatisticsSnapshot>>>,
}

impl ParentStore {
    /// Создаёт хранилище с выбранной стратегией загрузки.
    pub fn new(service: ParentService, strategy: FetchStrategy) -> Self {
        let (server_statistics, _) = watch::channel(None);
        Self {
            list: ListStore::new(strategy),
            service,
            server_statistics: Arc::new(server_statistics),
        }
    }

    /// Стратегия загрузки.
    pub fn strategy(&self) -> FetchStrategy {
        self.list.strategy()
    }

    /// Копия состояния.
    pub fn snapshot(&self) -> ListState<Parent> {
        self.list.snapshot()
    }

    /// Подписка на изменения.
    pub fn subscribe(&self) -> watch::Receiver<ListState<Parent>> {
        self.list.subscribe()
    }

    /// Загружает страницу (`admin/parents/limit`) или весь набор.
    pub async fn fetch(&self) -> ApiResponse<ListPage<Parent>> {
        self.list.begin();
        let filters = self.list.filters();
        let response = match self.list.strategy() {
            FetchStrategy::ServerPaginated => self.service.list_paginated(&filters).await,
            FetchStrategy::FullSet => self.service.list(&filters).await,
        };
        self.list
            .settle(response, |state, page| self.list.apply_page(state, page))
    }

    /// Загружает родителя и делает его открытой записью.
    pub async fn get(&self, id: &str) -> ApiResponse<Parent> {
        self.list.begin();
        let response = self.service.get(id).await;
        self.list
            .settle(response, |state, parent| state.current = Some(parent.clone()))
    }

    /// Заменяет список родителями из города.
    pub async fn by_city(&self, city: &str) -> ApiResponse<ListPage<Parent>> {
        self.list.begin();
        let response = self.service.by_city(city).await;
        self.list
            .settle(response, |state, page| self.list.apply_page(state, page))
    }

    /// Меняет статус родителя.
    pub async fn update_status(&self, id: &str, status: AccountStatus) -> ApiResponse<Value> {
        self.list.begin();
        let response = self.service.update_status(id, status).await;
        self.list.settle(response, |state, _| {
            ListStore::patch_matching(state, id, |parent| parent.status = status.to_string());
        })
    }

    /// Загружает агрегированную статистику с сервера.
    pub async fn fetch_statistics(&self) -> ApiResponse<StatisticsSnapshot> {
        self.list.begin();
        let response = self.service.statistics().await;
        if let Some(snapshot) = response.data() {
            self.server_statistics.send_replace(Some(snapshot.clone()));
        }
        self.list.settle(response, |_, _| {})
    }

    /// Последняя статистика с сервера.
    pub fn server_statistics(&self) -> Option<StatisticsSnapshot> {
        self.server_statistics.borrow().clone()
    }

    /// Меняет фильтры.
    pub fn update_filters(&self, update: impl FnOnce(&mut ParentFilters)) -> ParentFilters {
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

    /// Отфильтрованный набор.
    pub fn filtered_items(&self) -> Vec<Parent> {
        self.list.filtered_items()
    }

    /// Текущая страница.
    pub fn paginated_items(&self) -> Vec<Parent> {
        self.list.paginated_items()
    }

    /// Счётчики по статусам в памяти.
    pub fn statistics(&self) -> ListStatistics {
        self.list.statistics(&["active", "inactive", "suspended"])
    }
}
