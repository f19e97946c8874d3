//! Хранилища состояния поверх сервисов.
//!
//! Каждое хранилище держит своё состояние в `tokio::sync::watch`: подписчики
//! получают изменения, а `snapshot()` отдаёт копию текущего состояния.
//! Действия ставят `loading`, сбрасывают `error`, вызывают сервис и только
//! после ответа сервера меняют локальные данные.

mod auth;
mod parents;
mod posts;
mod statistics;
mod teachers;
mod users;

pub use auth::{AuthState, AuthStore};
pub use parents::ParentStore;
pub use posts::PostStore;
pub use statistics::{Metric, StatisticsState, StatisticsStore};
pub use teachers::TeacherStore;
pub use users::UserStore;

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::warn;

use crate::envelope::{ApiResponse, ListPage};
use crate::filters::ListFilters;
use crate::models::{Identified, Pagination, SortOrder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Откуда берутся элементы списка.
pub enum FetchStrategy {
    /// Сервер отдаёт готовую страницу, локально ничего не фильтруется.
    #[default]
    ServerPaginated,
    /// Загружается весь набор, фильтрация и пагинация выполняются локально.
    FullSet,
}

/// Элемент списка, который умеет проверять себя по фильтрам хранилища.
pub trait ListItem: Identified + Debug + Clone + Send + Sync + 'static {
    /// Фильтры списка.
    type Filters: ListFilters;

    /// Проходит ли элемент фильтр.
    fn passes(&self, filters: &Self::Filters) -> bool;
    /// Статус в терминах хранилища.
    fn status(&self) -> &str;
    /// Дата создания для сортировки.
    fn created_at(&self) -> Option<DateTime<Utc>>;

    /// Сортировка, заданная фильтрами.
    fn sort_order(_filters: &Self::Filters) -> Option<SortOrder> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Состояние списка.
pub struct ListState<T: ListItem> {
    /// Страница с сервера или весь набор, в зависимости от [`FetchStrategy`].
    pub items: Vec<T>,
    /// Открытая запись.
    pub current: Option<T>,
    /// Идёт ли действие.
    pub loading: bool,
    /// Ошибка последнего действия.
    pub error: Option<String>,
    /// Фильтры.
    pub filters: T::Filters,
    /// Пагинация.
    pub pagination: Pagination,
}

impl<T: ListItem> Default for ListState<T> {
    fn default() -> Self {
        let filters = T::Filters::default();
        let pagination = Pagination::new(filters.page(), filters.limit(), 0);
        Self {
            items: Vec::new(),
            current: None,
            loading: false,
            error: None,
            filters,
            pagination,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Счётчики по набору в памяти.
pub struct ListStatistics {
    /// Всего элементов.
    pub total: usize,
    /// По статусу.
    pub by_status: BTreeMap<String, usize>,
    /// По роли (только пользователи).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub by_role: BTreeMap<String, usize>,
    /// Подтверждённых (только преподаватели).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<usize>,
    /// Неподтверждённых (только преподаватели).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unverified: Option<usize>,
}

impl ListStatistics {
    fn count_statuses<T: ListItem>(items: &[T], known: &[&str]) -> Self {
        let mut by_status: BTreeMap<String, usize> =
            known.iter().map(|status| (status.to_string(), 0)).collect();
        for item in items {
            *by_status.entry(item.status().to_string()).or_default() += 1;
        }
        Self {
            total: items.len(),
            by_status,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
/// Общая часть списочных хранилищ.
pub(crate) struct ListStore<T: ListItem> {
    state: Arc<watch::Sender<ListState<T>>>,
    strategy: FetchStrategy,
}

impl<T: ListItem> Clone for ListStore<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            strategy: self.strategy,
        }
    }
}

impl<T: ListItem> ListStore<T> {
    pub(crate) fn new(strategy: FetchStrategy) -> Self {
        let (state, _) = watch::channel(ListState::default());
        Self {
            state: Arc::new(state),
            strategy,
        }
    }

    pub(crate) fn strategy(&self) -> FetchStrategy {
        self.strategy
    }

    pub(crate) fn snapshot(&self) -> ListState<T> {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ListState<T>> {
        self.state.subscribe()
    }

    pub(crate) fn filters(&self) -> T::Filters {
        self.state.borrow().filters.clone()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.state.borrow().items.is_empty()
    }

    /// Начало действия.
    pub(crate) fn begin(&self) {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
    }

    /// Завершение действия: `loading` сбрасывается всегда, ошибка записывается в `error`,
    /// успешные данные передаются в `apply`.
    pub(crate) fn settle<R>(
        &self,
        response: ApiResponse<R>,
        apply: impl FnOnce(&mut ListState<T>, &R),
    ) -> ApiResponse<R> {
        self.state.send_modify(|state| {
            state.loading = false;
            match &response {
                ApiResponse::Success { data, .. } => apply(state, data),
                ApiResponse::Error { message } => state.error = Some(message.clone()),
            }
        });
        response
    }

    /// Кладёт загруженный список в состояние согласно стратегии.
    ///
    /// Если сервер проигнорировал `limit` и прислал больше элементов, чем
    /// помещается на страницу, страница вырезается локально.
    pub(crate) fn apply_page(&self, state: &mut ListState<T>, page: &ListPage<T>) {
        let (page_number, limit) = (state.filters.page(), state.filters.limit());
        let received = page.items.len() as u64;
        match self.strategy {
            FetchStrategy::ServerPaginated if received > u64::from(limit.max(1)) => {
                state.items = page_slice(&page.items, page_number, limit);
                let total = page.pagination.total.max(received);
                state.pagination = Pagination::new(page_number, limit, total);
            }
            FetchStrategy::ServerPaginated => {
                state.items = page.items.clone();
                state.pagination = page.pagination;
            }
            FetchStrategy::FullSet => {
                state.items = page.items.clone();
                state.pagination = Pagination::new(page_number, limit, received);
            }
        }
    }

    /// Объединяет фильтры. Если поменялось что-то кроме страницы, страница сбрасывается на 1.
    pub(crate) fn update_filters(&self, update: impl FnOnce(&mut T::Filters)) -> T::Filters {
        self.state.send_modify(|state| {
            let before = state.filters.clone();
            update(&mut state.filters);
            if !state.filters.same_criteria(&before) {
                state.filters.set_page(1);
            }
            sync_pagination(state);
        });
        self.filters()
    }

    pub(crate) fn reset_filters(&self) {
        self.state.send_modify(|state| {
            state.filters = T::Filters::default();
            sync_pagination(state);
        });
    }

    /// Переходит на страницу. Номера меньше 1 игнорируются.
    pub(crate) fn change_page(&self, page: u32) -> bool {
        if page < 1 {
            return false;
        }
        self.state.send_modify(|state| {
            state.filters.set_page(page);
            sync_pagination(state);
        });
        true
    }

    /// Отфильтрованный и отсортированный набор (только для [`FetchStrategy::FullSet`]).
    pub(crate) fn filtered_items(&self) -> Vec<T> {
        let state = self.state.borrow();
        if self.strategy == FetchStrategy::ServerPaginated {
            return state.items.clone();
        }

        let mut items: Vec<T> = state
            .items
            .iter()
            .filter(|item| item.passes(&state.filters))
            .cloned()
            .collect();
        match T::sort_order(&state.filters) {
            Some(SortOrder::Newest) => items.sort_by(|a, b| b.created_at().cmp(&a.created_at())),
            Some(SortOrder::Oldest) => items.sort_by_key(|item| item.created_at()),
            None => {}
        }
        items
    }

    /// Текущая страница отфильтрованного набора.
    ///
    /// В режиме [`FetchStrategy::FullSet`] чтение пересчитывает `pagination.total/pages`.
    pub(crate) fn paginated_items(&self) -> Vec<T> {
        let filtered = self.filtered_items();
        let filters = self.filters();
        if self.strategy == FetchStrategy::ServerPaginated {
            return filtered
                .into_iter()
                .take(filters.limit().max(1) as usize)
                .collect();
        }

        let page = page_slice(&filtered, filters.page(), filters.limit());

        let total = filtered.len() as u64;
        self.state.send_if_modified(|state| {
            let updated = Pagination::new(state.filters.page(), state.filters.limit(), total);
            if state.pagination == updated {
                return false;
            }
            state.pagination = updated;
            true
        });
        page
    }

    pub(crate) fn statistics(&self, known_statuses: &[&str]) -> ListStatistics {
        ListStatistics::count_statuses(&self.state.borrow().items, known_statuses)
    }

    pub(crate) fn with_items<R>(&self, read: impl FnOnce(&[T]) -> R) -> R {
        read(&self.state.borrow().items)
    }

    /// Запись из списка или открытая запись.
    pub(crate) fn find(&self, id: &str) -> Option<T> {
        let state = self.state.borrow();
        state
            .items
            .iter()
            .chain(state.current.iter())
            .find(|item| item.matches_id(id))
            .cloned()
    }

    /// Вставляет элемент или заменяет найденный по любому из идентификаторов.
    pub(crate) fn upsert(state: &mut ListState<T>, item: &T) {
        let position = state.items.iter().position(|existing| {
            item.resource_id().is_some_and(|id| existing.matches_id(id))
                || item.storage_id().is_some_and(|id| existing.matches_id(id))
        });
        match position {
            Some(index) => state.items[index] = item.clone(),
            None => state.items.push(item.clone()),
        }
    }

    /// Применяет `patch` к записям списка и к открытой записи, совпадающим с `id`.
    pub(crate) fn patch_matching(
        state: &mut ListState<T>,
        id: &str,
        patch: impl Fn(&mut T),
    ) -> usize {
        let mut patched = 0;
        for item in state.items.iter_mut().filter(|item| item.matches_id(id)) {
            patch(item);
            patched += 1;
        }
        if let Some(current) = state.current.as_mut().filter(|current| current.matches_id(id)) {
            patch(current);
        }
        patched
    }

    /// Удаляет записи, совпадающие с `id`.
    pub(crate) fn remove_matching(state: &mut ListState<T>, id: &str) {
        let before = state.items.len();
        state.items.retain(|item| !item.matches_id(id));
        let removed = (before - state.items.len()) as u64;
        if state.current.as_ref().is_some_and(|current| current.matches_id(id)) {
            state.current = None;
        }
        let total = state.pagination.total.saturating_sub(removed);
        state.pagination = state.pagination.with_total(total);
    }
}

/// Страница `page` (с 1) размером `limit` из набора.
fn page_slice<T: Clone>(items: &[T], page: u32, limit: u32) -> Vec<T> {
    let limit = limit.max(1) as usize;
    let start = (page.max(1) as usize - 1).saturating_mul(limit);
    items.iter().skip(start).take(limit).cloned().collect()
}

fn sync_pagination<T: ListItem>(state: &mut ListState<T>) {
    state.pagination = Pagination::new(
        state.filters.page(),
        state.filters.limit(),
        state.pagination.total,
    );
}

/// Накладывает поля `patch` на сущность через её JSON-представление.
pub(crate) fn merge_fields<T>(item: &mut T, patch: &Map<String, Value>)
where
    T: Serialize + DeserializeOwned,
{
    let merged = match serde_json::to_value(&*item) {
        Ok(Value::Object(mut object)) => {
            for (key, value) in patch {
                object.insert(key.clone(), value.clone());
            }
            serde_json::from_value::<T>(Value::Object(object))
        }
        Ok(_) => return,
        Err(err) => Err(err),
    };
    match merged {
        Ok(updated) => *item = updated,
        Err(err) => warn!(error = %err, "local patch does not fit the entity, keeping old copy"),
    }
}
