//! Клиентская библиотека административной консоли площадки репетиторов.
//!
//! Слои снизу вверх:
//! - [`HttpClient`] (`reqwest`): базовый URL, таймаут, bearer-токен, сброс сессии на 401;
//! - сервисы ресурсов ([`services`]): по методу на операцию REST API, результат
//!   всегда [`ApiResponse`];
//! - хранилища ([`stores`]): состояние в `tokio::sync::watch` и производные представления;
//! - [`RouteGuard`]/[`Router`]: пускают на защищённые маршруты только с токеном.
//!
//! [`AdminConsole`] собирает всё это поверх одного [`SessionProvider`].
#![warn(missing_docs)]

mod config;
mod envelope;
mod error;
mod filters;
mod http_client;
mod lenient;
mod models;
mod router;
mod session;
mod storage;

pub mod services;
pub mod stores;

pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use envelope::{
    ApiResponse, INVALID_ID, ListPage, ParamValue, QueryParams, UNEXPECTED_SHAPE,
    looks_like_storage_id, normalize_ack, normalize_entity, normalize_list, normalize_object,
};
pub use error::{
    CONFIGURATION_ERROR, ClientError, ClientResult, NO_RESPONSE, REQUEST_FAILED, StorageError,
    StorageResult,
};
pub use filters::{ListFilters, ParentFilters, PostFilters, TeacherFilters, UserFilters};
pub use http_client::{ApiPath, HttpClient, RequestOptions};
pub use models::{
    AccountStatus, Credentials, Identified, Location, MatchStatistics, Pagination, Parent, Period,
    Post, PostStatus, Registration, SortOrder, StatisticsSnapshot, Teacher, User, UserRole,
    UserStatistics,
};
pub use router::{GuardDecision, Navigator, Route, RouteGuard, Router};
pub use session::{Session, SessionProvider, SessionUser};
pub use storage::{FileStorage, KeyValueStore, MemoryStorage, TOKEN_KEY, USER_KEY};
pub use stores::{FetchStrategy, ListState, ListStatistics};

use std::sync::Arc;

use services::{
    AuthService, ParentService, PostService, StatisticsService, TeacherService, UserService,
};
use stores::{AuthStore, ParentStore, PostStore, StatisticsStore, TeacherStore, UserStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Стратегии загрузки списков по хранилищам.
pub struct Strategies {
    /// Пользователи.
    pub users: FetchStrategy,
    /// Родители.
    pub parents: FetchStrategy,
    /// Преподаватели.
    pub teachers: FetchStrategy,
    /// Посты.
    pub posts: FetchStrategy,
}

impl Default for Strategies {
    /// Пользователи и родители листаются сервером, преподаватели и посты
    /// загружаются целиком и фильтруются локально.
    fn default() -> Self {
        Self {
            users: FetchStrategy::ServerPaginated,
            parents: FetchStrategy::ServerPaginated,
            teachers: FetchStrategy::FullSet,
            posts: FetchStrategy::FullSet,
        }
    }
}

#[derive(Debug, Clone)]
/// Консоль администратора: HTTP-клиент, роутер и хранилища поверх одной сессии.
pub struct AdminConsole {
    http: HttpClient,
    router: Router,
    auth: AuthStore,
    users: UserStore,
    parents: ParentStore,
    teachers: TeacherStore,
    posts: PostStore,
    statistics: StatisticsStore,
}

impl AdminConsole {
    /// Собирает консоль со стратегиями по умолчанию.
    pub fn new(config: ClientConfig, storage: Arc<dyn KeyValueStore>) -> ClientResult<Self> {
        Self::with_strategies(config, storage, Strategies::default())
    }

    /// Собирает консоль с явными стратегиями загрузки.
    pub fn with_strategies(
        config: ClientConfig,
        storage: Arc<dyn KeyValueStore>,
        strategies: Strategies,
    ) -> ClientResult<Self> {
        let session = SessionProvider::new(storage);
        let navigator = Navigator::new();
        let http = HttpClient::new(config, session.clone(), navigator.clone())?;
        let router = Router::new(RouteGuard::new(session.clone()), navigator);

        Ok(Self {
            auth: AuthStore::new(AuthService::new(http.clone()), session),
            users: UserStore::new(UserService::new(http.clone()), strategies.users),
            parents: ParentStore::new(ParentService::new(http.clone()), strategies.parents),
            teachers: TeacherStore::new(TeacherService::new(http.clone()), strategies.teachers),
            posts: PostStore::new(PostService::new(http.clone()), strategies.posts),
            statistics: StatisticsStore::new(StatisticsService::new(http.clone())),
            router,
            http,
        })
    }

    /// HTTP-клиент.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Провайдер сессии.
    pub fn session(&self) -> &SessionProvider {
        self.http.session()
    }

    /// Роутер с гвардом.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Текущая цель навигации.
    pub fn navigator(&self) -> &Navigator {
        self.router.navigator()
    }

    /// Переходит по пути через гвард.
    pub fn navigate(&self, path: &str) -> Option<Route> {
        self.router.navigate(path)
    }

    /// Авторизация.
    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    /// Пользователи.
    pub fn users(&self) -> &UserStore {
        &self.users
    }

    /// Родители.
    pub fn parents(&self) -> &ParentStore {
        &self.parents
    }

    /// Преподаватели.
    pub fn teachers(&self) -> &TeacherStore {
        &self.teachers
    }

    /// Посты.
    pub fn posts(&self) -> &PostStore {
        &self.posts
    }

    /// Статистика.
    pub fn statistics(&self) -> &StatisticsStore {
        &self.statistics
    }
}
