use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::warn;

use crate::envelope::ApiResponse;
use crate::models::{MatchStatistics, Period, StatisticsSnapshot, User, UserStatistics};
use crate::services::{StatisticsQuery, StatisticsService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Показатель статистики.
pub enum Metric {
    /// Пользователи.
    Users,
    /// Преподаватели.
    Tutors,
    /// Посты.
    Posts,
    /// Подборы.
    Matches,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Users => "users",
            Self::Tutors => "tutors",
            Self::Posts => "posts",
            Self::Matches => "matches",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Состояние панели статистики.
pub struct StatisticsState {
    /// Пользователи.
    pub users: Option<StatisticsSnapshot>,
    /// Преподаватели.
    pub tutors: Option<StatisticsSnapshot>,
    /// Посты.
    pub posts: Option<StatisticsSnapshot>,
    /// Подборы.
    pub matches: Option<StatisticsSnapshot>,
    /// Недавно зарегистрированные.
    pub recent_users: Vec<User>,
    /// Период и диапазон.
    pub filters: StatisticsQuery,
    /// Идёт ли загрузка.
    pub loading: bool,
    /// Первая ошибка последнего действия.
    pub error: Option<String>,
}

impl StatisticsState {
    fn slot(&mut self, metric: Metric) -> &mut Option<StatisticsSnapshot> {
        match metric {
            Metric::Users => &mut self.users,
            Metric::Tutors => &mut self.tutors,
            Metric::Posts => &mut self.posts,
            Metric::Matches => &mut self.matches,
        }
    }
}

#[derive(Debug, Clone)]
/// Хранилище статистики.
pub struct StatisticsStore {
    service: StatisticsService,
    state: Arc<watch::Sender<StatisticsState>>,
}

impl StatisticsStore {
    /// Создаёт хранилище с периодом «месяц».
    pub fn new(service: StatisticsService) -> Self {
        let (state, _) = watch::channel(StatisticsState::default());
        Self {
            service,
            state: Arc::new(state),
        }
    }

    /// Копия состояния.
    pub fn snapshot(&self) -> StatisticsState {
        self.state.borrow().clone()
    }

    /// Подписка на изменения.
    pub fn subscribe(&self) -> watch::Receiver<StatisticsState> {
        self.state.subscribe()
    }

    /// Меняет период; диапазон будет выведен заново при следующей загрузке.
    pub fn set_period(&self, period: Period) {
        self.state.send_modify(|state| state.filters = StatisticsQuery::for_period(period));
    }

    /// Задаёт явный диапазон. Перевёрнутый диапазон отклоняется.
    pub fn set_range(&self, start: NaiveDate, end: NaiveDate) -> Result<(), String> {
        if start > end {
            return Err(format!("start date {start} must not be after end date {end}"));
        }
        self.state.send_modify(|state| {
            state.filters.start_date = Some(start);
            state.filters.end_date = Some(end);
        });
        Ok(())
    }

    /// Запрос на `today`: недостающий диапазон выводится из периода.
    ///
    /// Выведенные даты в фильтры не записываются, иначе смена периода или дня
    /// продолжала бы использовать старый диапазон. Сохраняется только диапазон
    /// из [`Self::set_range`].
    fn prepare_query(&self, today: NaiveDate) -> Result<StatisticsQuery, String> {
        let mut query = self.state.borrow().filters;
        let (start, end) = query.resolve(today)?;
        query.start_date = Some(start);
        query.end_date = Some(end);
        Ok(query)
    }

    fn begin(&self) {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
    }

    fn fail<T>(&self, message: String) -> ApiResponse<T> {
        self.state.send_modify(|state| {
            state.loading = false;
            state.error = Some(message.clone());
        });
        ApiResponse::error(message)
    }

    /// Загружает все показатели и недавних пользователей параллельно.
    ///
    /// Каждый успешный ответ применяется независимо; при ошибках в `error`
    /// попадает первая из них, уже загруженное не откатывается.
    pub async fn fetch_all(&self) -> ApiResponse<StatisticsState> {
        self.begin();
        let query = match self.prepare_query(Utc::now().date_naive()) {
            Ok(query) => query,
            Err(message) => return self.fail(message),
        };

        let (users, tutors, posts, matches, recent) = tokio::join!(
            self.service.users(&query),
            self.service.tutors(&query),
            self.service.posts(&query),
            self.service.matches(&query),
            self.service.recent_users(),
        );

        let mut first_error: Option<String> = None;
        let mut keep = |response: ApiResponse<StatisticsSnapshot>| match response {
            ApiResponse::Success { data, .. } => Some(data),
            ApiResponse::Error { message } => {
                first_error.get_or_insert(message);
                None
            }
        };
        let snapshots = [
            (Metric::Users, keep(users)),
            (Metric::Tutors, keep(tutors)),
            (Metric::Posts, keep(posts)),
            (Metric::Matches, keep(matches)),
        ];
        let recent = match recent {
            ApiResponse::Success { data, .. } => Some(data),
            ApiResponse::Error { message } => {
                first_error.get_or_insert(message);
                None
            }
        };

        self.state.send_modify(|state| {
            for (metric, snapshot) in snapshots {
                if let Some(snapshot) = snapshot {
                    *state.slot(metric) = Some(snapshot);
                }
            }
            if let Some(recent) = recent {
                state.recent_users = recent;
            }
            state.loading = false;
            state.error = first_error.clone();
        });

        match first_error {
            Some(message) => {
                warn!(message = %message, "statistics loaded partially");
                ApiResponse::error(message)
            }
            None => ApiResponse::success(self.snapshot()),
        }
    }

    /// Загружает один показатель.
    pub async fn fetch(&self, metric: Metric) -> ApiResponse<StatisticsSnapshot> {
        self.begin();
        let query = match self.prepare_query(Utc::now().date_naive()) {
            Ok(query) => query,
            Err(message) => return self.fail(message),
        };

        let response = match metric {
            Metric::Users => self.service.users(&query).await,
            Metric::Tutors => self.service.tutors(&query).await,
            Metric::Posts => self.service.posts(&query).await,
            Metric::Matches => self.service.matches(&query).await,
        };

        self.state.send_modify(|state| {
            state.loading = false;
            match &response {
                ApiResponse::Success { data, .. } => *state.slot(metric) = Some(data.clone()),
                ApiResponse::Error { message } => state.error = Some(message.clone()),
            }
        });
        response
    }

    /// Загружает недавно зарегистрированных пользователей.
    pub async fn fetch_recent_users(&self) -> ApiResponse<Vec<User>> {
        self.begin();
        let response = self.service.recent_users().await;
        self.state.send_modify(|state| {
            state.loading = false;
            match &response {
                ApiResponse::Success { data, .. } => state.recent_users = data.clone(),
                ApiResponse::Error { message } => state.error = Some(message.clone()),
            }
        });
        response
    }

    /// Типизированная статистика пользователей (нули, пока не загружена).
    pub fn user_statistics(&self) -> UserStatistics {
        self.state
            .borrow()
            .users
            .as_ref()
            .map(UserStatistics::from)
            .unwrap_or_default()
    }

    /// Типизированная статистика подборов (нули, пока не загружена).
    pub fn match_statistics(&self) -> MatchStatistics {
        self.state
            .borrow()
            .matches
            .as_ref()
            .map(MatchStatistics::from)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::http_client::HttpClient;
    use crate::router::Navigator;
    use crate::session::SessionProvider;
    use crate::storage::MemoryStorage;

    fn store() -> StatisticsStore {
        let session = SessionProvider::new(Arc::new(MemoryStorage::new()));
        let http = HttpClient::new(
            ClientConfig::new("http://127.0.0.1:9/api"),
            session,
            Navigator::new(),
        )
        .expect("client builds");
        StatisticsStore::new(StatisticsService::new(http))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn derived_range_follows_period_and_day() {
        let store = store();
        store.set_period(Period::Month);
        let query = store.prepare_query(date(2024, 3, 31)).expect("month range");
        assert_eq!(query.start_date, Some(date(2024, 2, 29)));
        assert_eq!(store.snapshot().filters.start_date, None);

        store.set_period(Period::Week);
        let query = store.prepare_query(date(2024, 3, 31)).expect("week range");
        assert_eq!(query.start_date, Some(date(2024, 3, 24)));

        let query = store.prepare_query(date(2024, 4, 2)).expect("next day");
        assert_eq!(query.start_date, Some(date(2024, 3, 26)));
        assert_eq!(query.end_date, Some(date(2024, 4, 2)));
        assert_eq!(store.snapshot().filters.end_date, None);
    }

    #[test]
    fn explicit_range_is_kept_across_days() {
        let store = store();
        store
            .set_range(date(2024, 1, 1), date(2024, 1, 31))
            .expect("ordered range");
        let query = store.prepare_query(date(2024, 6, 1)).expect("explicit range");
        assert_eq!(query.start_date, Some(date(2024, 1, 1)));
        assert_eq!(query.end_date, Some(date(2024, 1, 31)));

        assert!(store.set_range(date(2024, 2, 1), date(2024, 1, 1)).is_err());
        assert_eq!(store.snapshot().filters.start_date, Some(date(2024, 1, 1)));
    }
}
