use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::warn;

use crate::error::StorageResult;
use crate::storage::{KeyValueStore, TOKEN_KEY, USER_KEY};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Данные вошедшего администратора.
pub struct SessionUser {
    /// Идентификатор хранилища (`_id`).
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub storage_id: Option<String>,
    /// Виртуальный `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Логин.
    #[serde(default)]
    pub username: String,
    /// Роль.
    #[serde(default)]
    pub role: String,
    /// Короткий идентификатор для отображения.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
}

impl SessionUser {
    /// Идентификатор пользователя: `_id`, если он есть, иначе `id`.
    pub fn user_id(&self) -> Option<&str> {
        self.storage_id.as_deref().or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Сессия администратора: токен и пользователь.
pub struct Session {
    /// Bearer-токен.
    pub token: String,
    /// Пользователь.
    pub user: SessionUser,
}

fn parse_token(raw: &str) -> Option<String> {
    let token = raw.trim().to_string();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn parse_user(raw: &str) -> Option<SessionUser> {
    serde_json::from_str::<SessionUser>(raw).ok()
}

#[derive(Debug, Clone)]
/// Единственная точка доступа к сессии.
///
/// Передаётся HTTP-клиенту, гварду маршрутов и хранилищу авторизации явно.
/// Токен для запросов читается из долговременного хранилища, а состояние
/// в памяти восстанавливается при создании, только если там есть и токен, и пользователь.
pub struct SessionProvider {
    storage: Arc<dyn KeyValueStore>,
    state: Arc<watch::Sender<Option<Session>>>,
}

impl SessionProvider {
    /// Создаёт провайдер и восстанавливает сессию из хранилища.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let restored = Self::restore(storage.as_ref());
        let (state, _) = watch::channel(restored);
        Self {
            storage,
            state: Arc::new(state),
        }
    }

    fn restore(storage: &dyn KeyValueStore) -> Option<Session> {
        let token = Self::read(storage, TOKEN_KEY).and_then(|raw| parse_token(&raw))?;
        let user = Self::read(storage, USER_KEY).and_then(|raw| parse_user(&raw))?;
        Some(Session { token, user })
    }

    fn read(storage: &dyn KeyValueStore, key: &str) -> Option<String> {
        match storage.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "failed to read session storage");
                None
            }
        }
    }

    /// Токен из долговременного хранилища.
    pub fn token(&self) -> Option<String> {
        Self::read(self.storage.as_ref(), TOKEN_KEY).and_then(|raw| parse_token(&raw))
    }

    /// Есть ли токен в хранилище. Валидность токена не проверяется.
    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    /// Пользователь из хранилища.
    pub fn stored_user(&self) -> Option<SessionUser> {
        Self::read(self.storage.as_ref(), USER_KEY).and_then(|raw| parse_user(&raw))
    }

    /// Текущая сессия в памяти.
    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    /// Подписка на изменения сессии.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    /// Сохраняет сессию в хранилище и в памяти.
    pub fn save(&self, session: Session) -> StorageResult<()> {
        let user = serde_json::to_string(&session.user)?;
        self.storage.set(TOKEN_KEY, &session.token)?;
        self.storage.set(USER_KEY, &user)?;
        self.state.send_replace(Some(session));
        Ok(())
    }

    /// Удаляет сессию из хранилища и из памяти.
    ///
    /// Состояние в памяти сбрасывается, даже если хранилище вернуло ошибку.
    pub fn clear(&self) -> StorageResult<()> {
        let token = self.storage.remove(TOKEN_KEY);
        let user = self.storage.remove(USER_KEY);
        self.state.send_replace(None);
        token.and(user)
    }
}
