use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::watch;

use super::{FetchStrategy, ListItem, ListState, ListStatistics, ListStore, merge_fields};
use crate::envelope::{ApiResponse, ListPage};
use crate::filters::UserFilters;
use crate::models::{AccountStatus, User, UserRole};
use crate::services::UserService;

impl ListItem for User {
    type Filters = UserFilters;

    fn passes(&self, filters: &UserFilters) -> bool {
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
/// Хранилище пользователей.
pub struct UserStore {
    list: ListStore<User>,
    service: UserService,
}

impl UserStore {
    /// Создаёт хранилище с выбранной стратегией загрузки.
    pub fn new(service: UserService, strategy: FetchStrategy) -> Self {
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
    pub fn snapshot(&self) -> ListState<User> {
        self.list.snapshot()
    }

    /// Подписка на изменения.
    pub fn subscribe(&self) -> watch::Receiver<ListState<User>> {
        self.list.subscribe()
    }

    /// Загружает страницу (`admin/users/limit`) или весь набор (`all=true`).
    pub async fn fetch(&self) -> ApiResponse<ListPage<User>> {
        self.list.begin();
        let filters = self.list.filters();
        let response = match self.list.strategy() {
            FetchStrategy::ServerPaginated => self.service.list_paginated(&filters).await,
            FetchStrategy::FullSet => self.service.list_all(&filters).await,
        };
        self.list
            .settle(response, |state, page| self.list.apply_page(state, page))
    }

    /// Загружает пользователя и делает его открытой записью.
    pub async fn get(&self, id: &str) -> ApiResponse<User> {
        self.list.begin();
        let response = self.service.get(id).await;
        self.list.settle(response, |state, user| state.current = Some(user.clone()))
    }

    /// Частично обновляет пользователя и накладывает те же поля локально.
    pub async fn update(&self, id: &str, patch: Map<String, Value>) -> ApiResponse<Value> {
        self.list.begin();
        let response = self.service.update(id, patch.clone()).await;
        self.list.settle(response, |state, _| {
            ListStore::patch_matching(state, id, |user| merge_fields(user, &patch));
        })
    }

    /// Меняет статус.
    pub async fn update_status(&self, id: &str, status: AccountStatus) -> ApiResponse<Value> {
        self.list.begin();
        let response = self.service.update_status(id, status).await;
        self.list.settle(response, |state, _| {
            ListStore::patch_matching(state, id, |user| user.status = status.to_string());
        })
    }

    /// Меняет роль.
    pub async fn update_role(&self, id: &str, role: UserRole) -> ApiResponse<Value> {
        self.list.begin();
        let response = self.service.update_role(id, role).await;
        self.list.settle(response, |state, _| {
            ListStore::patch_matching(state, id, |user| user.role = role.to_string());
        })
    }

    /// Удаляет пользователя.
    pub async fn delete(&self, id: &str) -> ApiResponse<Value> {
        self.list.begin();
        let response = self.service.delete(id).await;
        self.list
            .settle(response, |state, _| ListStore::remove_matching(state, id))
    }

    /// Меняет фильтры.
    pub fn update_filters(&self, update: impl FnOnce(&mut UserFilters)) -> UserFilters {
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
    pub fn filtered_items(&self) -> Vec<User> {
        self.list.filtered_items()
    }

    /// Текущая страница.
    pub fn paginated_items(&self) -> Vec<User> {
        self.list.paginated_items()
    }

    /// Счётчики по статусам и ролям.
    pub fn statistics(&self) -> ListStatistics {
        let mut statistics = self.list.statistics(&["active", "inactive", "suspended"]);
        statistics.by_role = self.list.with_items(|users| {
            let mut by_role = ["parent", "teacher", "admin"]
                .into_iter()
                .map(|role| (role.to_string(), 0))
                .collect::<std::collections::BTreeMap<_, _>>();
            for user in users {
                *by_role.entry(user.role.clone()).or_default() += 1;
            }
            by_role
        });
        statistics
    }
}
