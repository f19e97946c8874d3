//! Таблица маршрутов консоли и гвард, который пускает на защищённые маршруты
//! только при наличии токена.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::session::SessionProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Именованный маршрут консоли.
pub enum Route {
    /// `/`
    Dashboard,
    /// `/login`
    Login,
    /// `/register`
    Register,
    /// `/about`
    About,
    /// `/users`
    Users,
    /// `/users/:id`
    UserDetail {
        /// Идентификатор пользователя.
        id: String,
    },
    /// `/roles`
    Roles,
    /// `/teachers`
    Teachers,
    /// `/teachers/:id`
    TeacherDetail {
        /// Идентификатор преподавателя.
        id: String,
    },
    /// `/teachers/:id/verification`
    TeacherVerification {
        /// Идентификатор преподавателя.
        id: String,
    },
    /// `/posts`
    Posts,
    /// `/reports`
    Reports,
    /// `/system-settings`
    SystemSettings,
    /// `/data-statistics`
    DataStatistics,
}

impl Route {
    /// Имя маршрута.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Login => "login",
            Self::Register => "register",
            Self::About => "about",
            Self::Users => "users",
            Self::UserDetail { .. } => "user-detail",
            Self::Roles => "roles",
            Self::Teachers => "teachers",
            Self::TeacherDetail { .. } => "teacher-detail",
            Self::TeacherVerification { .. } => "teacher-verification",
            Self::Posts => "posts",
            Self::Reports => "reports",
            Self::SystemSettings => "system-settings",
            Self::DataStatistics => "data-statistics",
        }
    }

    /// Путь маршрута с подставленными параметрами.
    pub fn path(&self) -> String {
        match self {
            Self::Dashboard => "/".to_string(),
            Self::UserDetail { id } => format!("/users/{id}"),
            Self::TeacherDetail { id } => format!("/teachers/{id}"),
            Self::TeacherVerification { id } => format!("/teachers/{id}/verification"),
            other => format!("/{}", other.name()),
        }
    }

    /// Требуется ли токен для входа на маршрут.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Self::Login | Self::Register)
    }

    /// Разбирает путь. Query-строка и хвостовой `/` игнорируются.
    pub fn resolve(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let route = match segments.as_slice() {
            [] => Self::Dashboard,
            ["login"] => Self::Login,
            ["register"] => Self::Register,
            ["about"] => Self::About,
            ["users"] => Self::Users,
            ["users", id] => Self::UserDetail { id: id.to_string() },
            ["roles"] => Self::Roles,
            ["teachers"] => Self::Teachers,
            ["teachers", id] => Self::TeacherDetail { id: id.to_string() },
            ["teachers", id, "verification"] => Self::TeacherVerification { id: id.to_string() },
            ["posts"] => Self::Posts,
            ["reports"] => Self::Reports,
            ["system-settings"] => Self::SystemSettings,
            ["data-statistics"] => Self::DataStatistics,
            _ => return None,
        };
        Some(route)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.path())
    }
}

#[derive(Debug, Clone)]
/// Текущая цель навигации. HTTP-клиент переводит её на `login` при 401.
pub struct Navigator {
    target: Arc<watch::Sender<Option<Route>>>,
}

impl Navigator {
    /// Создаёт навигатор без цели.
    pub fn new() -> Self {
        let (target, _) = watch::channel(None);
        Self {
            target: Arc::new(target),
        }
    }

    /// Принудительно переходит на маршрут.
    pub fn redirect(&self, route: Route) {
        debug!(route = %route, "navigation target changed");
        self.target.send_replace(Some(route));
    }

    /// Последняя цель навигации.
    pub fn target(&self) -> Option<Route> {
        self.target.borrow().clone()
    }

    /// Подписка на смену цели навигации.
    pub fn subscribe(&self) -> watch::Receiver<Option<Route>> {
        self.target.subscribe()
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Решение гварда.
pub enum GuardDecision {
    /// Переход разрешён.
    Proceed,
    /// Нужно перейти на другой маршрут.
    Redirect(Route),
}

#[derive(Debug, Clone)]
/// Гвард маршрутов: смотрит только на наличие токена.
pub struct RouteGuard {
    session: SessionProvider,
}

impl RouteGuard {
    /// Создаёт гвард поверх провайдера сессии.
    pub fn new(session: SessionProvider) -> Self {
        Self { session }
    }

    /// Проверяет переход на маршрут.
    pub fn check(&self, to: &Route) -> GuardDecision {
        let authenticated = self.session.has_token();
        if to.requires_auth() && !authenticated {
            return GuardDecision::Redirect(Route::Login);
        }
        if matches!(to, Route::Login | Route::Register) && authenticated {
            return GuardDecision::Redirect(Route::Dashboard);
        }
        GuardDecision::Proceed
    }
}

#[derive(Debug, Clone)]
/// Роутер: разбирает путь, применяет гвард и записывает цель в навигатор.
pub struct Router {
    guard: RouteGuard,
    navigator: Navigator,
}

impl Router {
    /// Создаёт роутер.
    pub fn new(guard: RouteGuard, navigator: Navigator) -> Self {
        Self { guard, navigator }
    }

    /// Переходит по пути. Возвращает итоговый маршрут или `None`, если путь неизвестен.
    pub fn navigate(&self, path: &str) -> Option<Route> {
        let requested = Route::resolve(path)?;
        let route = match self.guard.check(&requested) {
            GuardDecision::Proceed => requested,
            GuardDecision::Redirect(route) => route,
        };
        self.navigator.redirect(route.clone());
        Some(route)
    }

    /// Навигатор роутера.
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStorage, TOKEN_KEY};

    fn guard_with_token(token: Option<&str>) -> RouteGuard {
        let storage = Arc::new(MemoryStorage::new());
        if let Some(token) = token {
            storage.set(TOKEN_KEY, token).expect("set");
        }
        RouteGuard::new(SessionProvider::new(storage))
    }

    #[test]
    fn resolve_covers_parameterized_routes() {
        assert_eq!(Route::resolve("/"), Some(Route::Dashboard));
        assert_eq!(
            Route::resolve("/teachers/T1/verification"),
            Some(Route::TeacherVerification { id: "T1".to_string() })
        );
        assert_eq!(
            Route::resolve("/users/42/?tab=posts"),
            Some(Route::UserDetail { id: "42".to_string() })
        );
        assert_eq!(Route::resolve("/unknown/page"), None);
    }

    #[test]
    fn path_round_trips_through_resolve() {
        let routes = [
            Route::Dashboard,
            Route::DataStatistics,
            Route::TeacherDetail { id: "T7".to_string() },
            Route::SystemSettings,
        ];
        for route in routes {
            assert_eq!(Route::resolve(&route.path()), Some(route.clone()));
        }
    }

    #[test]
    fn anonymous_user_is_sent_to_login() {
        let guard = guard_with_token(None);
        assert_eq!(guard.check(&Route::Posts), GuardDecision::Redirect(Route::Login));
        assert_eq!(guard.check(&Route::Register), GuardDecision::Proceed);
    }

    #[test]
    fn authenticated_user_skips_login_and_register() {
        let guard = guard_with_token(Some("T1"));
        assert_eq!(guard.check(&Route::Login), GuardDecision::Redirect(Route::Dashboard));
        assert_eq!(
            guard.check(&Route::Register),
            GuardDecision::Redirect(Route::Dashboard)
        );
        assert_eq!(guard.check(&Route::Reports), GuardDecision::Proceed);
    }

    #[test]
    fn router_records_guarded_target() {
        let router = Router::new(guard_with_token(None), Navigator::new());
        assert_eq!(router.navigate("/data-statistics"), Some(Route::Login));
        assert_eq!(router.navigator().target(), Some(Route::Login));
        assert_eq!(router.navigate("/nowhere"), None);
    }
}
