use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use super::{FetchStrategy, ListItem, ListState, ListStatistics, ListStore};
use crate::envelope::{ApiResponse, ListPage};
use crate::filters::TeacherFilters;
use crate::models::{AccountStatus, Pagination, SortOrder, Teacher};
use crate::services::TeacherService;

impl ListItem for Teacher {
    type Filters = TeacherFilters;

    fn passes(&self, filters: &TeacherFilters) -> bool {
        filters.matches(self)
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn sort_order(filters: &TeacherFilters) -> Option<SortOrder> {
        Some(filters.sort)
    }
}

#[derive(Debug, Clone)]
/// Хранилище преподавателей.
pub struct TeacherStore {
    list: ListStore<Teacher>,
    service: TeacherService,
}

impl TeacherStore {
    /// Создаёт хранилище с выбранной стратегией загрузки.
    pub fn new(service: TeacherService, strategy: FetchStrategy) -> Self {
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
    pub fn snapshot(&self) -> ListState<Teacher> {
        self.list.snapshot()
    }

    /// Подписка на изменения.
    pub fn subscribe(&self) -> watch::Receiver<ListState<Teacher>> {
        self.list.subscribe()
    }

    /// Загружает страницу (`admin/tutors/limit`) или весь набор (`admin/tutors`).
    pub async fn fetch(&self) -> ApiResponse<ListPage<Teacher>> {
        self.list.begin();
        let filters = self.list.filters();
        let response = match self.list.strategy() {
            FetchStrategy::ServerPaginated => self.service.list_paginated(&filters).await,
            FetchStrategy::FullSet => self.service.list(&filters).await,
        };
        self.list
            .settle(response, |state, page| self.list.apply_page(state, page))
    }

    /// Преподаватель по `tutorId` или `_id`.
    ///
    /// Сначала ищет в загруженном списке и в открытой записи, затем идёт на сервер.
    /// Полный набор пополняется результатом, а серверная страница остаётся как есть:
    /// ответ попадает только в `current`.
    pub async fn get_by_id(&self, id: &str) -> ApiResponse<Teacher> {
        if let Some(cached) = self.list.find(id) {
            debug!(id, "teacher served from loaded list");
            return ApiResponse::success(cached);
        }

        self.list.begin();
        let response = self.service.get(id).await;
        let strategy = self.list.strategy();
        self.list.settle(response, |state, teacher| {
            if strategy == FetchStrategy::FullSet {
                ListStore::upsert(state, teacher);
            }
            state.current = Some(teacher.clone());
        })
    }

    /// Преподаватели из города.
    ///
    /// В режиме полного набора загружает список один раз и выставляет фильтр города,
    /// в серверном режиме запрашивает `admin/tutors/city/{city}`.
    pub async fn by_city(&self, city: &str) -> ApiResponse<ListPage<Teacher>> {
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

    /// Подтверждает или снимает проверку документов.
    ///
    /// После ответа сервера меняются только совпавшие записи: `verified`,
    /// `verificationNote` и `verifiedAt` (текущее время или пусто).
    pub async fn verify(&self, id: &str, verified: bool, note: Option<&str>) -> ApiResponse<Value> {
        self.list.begin();
        let response = self.service.verify(id, verified, note).await;
        let note = note.map(str::to_string);
        self.list.settle(response, |state, _| {
            let now = Utc::now();
            ListStore::patch_matching(state, id, |teacher| {
                teacher.verified = verified;
                teacher.verification_note = note.clone();
                teacher.verified_at = verified.then_some(now);
            });
        })
    }

    /// Меняет статус преподавателя с комментарием.
    pub async fn update_status(
        &self,
        id: &str,
        status: AccountStatus,
        note: Option<&str>,
    ) -> ApiResponse<Value> {
        self.list.begin();
        let response = self.service.update_status(id, status, note).await;
        let note = note.map(str::to_string);
        self.list.settle(response, |state, _| {
            let now = Utc::now();
            ListStore::patch_matching(state, id, |teacher| {
                teacher.status = status.to_string();
                teacher.status_note = note.clone();
                teacher.status_updated_at = Some(now);
            });
        })
    }

    /// Меняет фильтры.
    pub fn update_filters(&self, update: impl FnOnce(&mut TeacherFilters)) -> TeacherFilters {
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

    /// Отфильтрованный и отсортированный набор.
    pub fn filtered_items(&self) -> Vec<Teacher> {
        self.list.filtered_items()
    }

    /// Текущая страница.
    pub fn paginated_items(&self) -> Vec<Teacher> {
        self.list.paginated_items()
    }

    /// Счётчики по статусам и проверке документов.
    pub fn statistics(&self) -> ListStatistics {
        let mut statistics = self.list.statistics(&["active", "inactive", "suspended"]);
        let verified = self
            .list
            .with_items(|teachers| teachers.iter().filter(|t| t.verified).count());
        statistics.verified = Some(verified);
        statistics.unverified = Some(statistics.total - verified);
        statistics
    }
}
