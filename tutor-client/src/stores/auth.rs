use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::envelope::ApiResponse;
use crate::models::{Credentials, Registration};
use crate::services::AuthService;
use crate::session::{Session, SessionProvider, SessionUser};

#[derive(Debug, Clone, PartialEq)]
/// Состояние авторизации.
pub enum AuthState {
    /// Сессии нет.
    Anonymous,
    /// Администратор вошёл.
    Authenticated {
        /// Bearer-токен.
        token: String,
        /// Пользователь.
        user: SessionUser,
    },
}

impl From<Option<Session>> for AuthState {
    fn from(session: Option<Session>) -> Self {
        match session {
            Some(Session { token, user }) => Self::Authenticated { token, user },
            None => Self::Anonymous,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Activity {
    loading: bool,
    error: Option<String>,
}

#[derive(Debug, Clone)]
/// Хранилище авторизации поверх [`SessionProvider`].
///
/// Сессия живёт в провайдере, поэтому сброс сессии HTTP-клиентом при 401
/// сразу виден здесь.
pub struct AuthStore {
    service: AuthService,
    session: SessionProvider,
    activity: Arc<watch::Sender<Activity>>,
}

impl AuthStore {
    /// Создаёт хранилище. Сессия уже восстановлена провайдером.
    pub fn new(service: AuthService, session: SessionProvider) -> Self {
        let (activity, _) = watch::channel(Activity::default());
        Self {
            service,
            session,
            activity: Arc::new(activity),
        }
    }

    /// Текущее состояние.
    pub fn state(&self) -> AuthState {
        self.session.current().into()
    }

    /// Подписка на смену сессии.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session.subscribe()
    }

    /// Вошёл ли администратор. Признак тот же, что у гварда маршрутов: токен в хранилище.
    pub fn is_logged_in(&self) -> bool {
        self.session.has_token()
    }

    /// Логин или пустая строка.
    pub fn username(&self) -> String {
        self.user_field(|user| user.username.clone())
    }

    /// Роль или пустая строка.
    pub fn role(&self) -> String {
        self.user_field(|user| user.role.clone())
    }

    /// Короткий идентификатор или пустая строка.
    pub fn custom_id(&self) -> String {
        self.user_field(|user| user.custom_id.clone().unwrap_or_default())
    }

    fn user_field(&self, read: impl FnOnce(&SessionUser) -> String) -> String {
        self.session
            .current()
            .map(|session| read(&session.user))
            .unwrap_or_default()
    }

    /// Идёт ли вход или регистрация.
    pub fn loading(&self) -> bool {
        self.activity.borrow().loading
    }

    /// Ошибка последнего входа или регистрации.
    pub fn error(&self) -> Option<String> {
        self.activity.borrow().error.clone()
    }

    fn begin(&self) {
        self.activity.send_replace(Activity {
            loading: true,
            error: None,
        });
    }

    fn finish<T>(&self, response: ApiResponse<T>) -> ApiResponse<T> {
        let error = match &response {
            ApiResponse::Error { message } => Some(message.clone()),
            ApiResponse::Success { .. } => None,
        };
        self.activity.send_replace(Activity {
            loading: false,
            error,
        });
        response
    }

    /// Вход. При успехе токен и пользователь сохраняются в хранилище и в памяти.
    pub async fn login(&self, credentials: &Credentials) -> ApiResponse<SessionUser> {
        self.begin();
        let response = match self.service.login(credentials).await {
            ApiResponse::Success { data, message } => {
                let mut session = data;
                if session.user.username.is_empty() {
                    session.user.username = credentials.username.clone();
                }
                let user = session.user.clone();
                match self.session.save(session) {
                    Ok(()) => ApiResponse::Success {
                        data: user,
                        message,
                    },
                    Err(err) => {
                        warn!(error = %err, "failed to persist session");
                        ApiResponse::error(format!("failed to persist session: {err}"))
                    }
                }
            }
            ApiResponse::Error { message } => ApiResponse::error(message),
        };
        self.finish(response)
    }

    /// Регистрация администратора.
    pub async fn register(&self, registration: &Registration) -> ApiResponse<Value> {
        self.begin();
        let response = self.service.register(registration).await;
        self.finish(response)
    }

    /// Выход: сессия удаляется из хранилища и из памяти.
    pub fn logout(&self) {
        if let Err(err) = self.session.clear() {
            warn!(error = %err, "failed to clear session storage");
        }
        info!("logged out");
    }
}
