use serde_json::{Value, json};
use thiserror::Error;

/// Сообщение для ответа сервера с кодом ошибки без тела.
pub const REQUEST_FAILED: &str = "request failed";
/// Сообщение для запроса, на который сервер не ответил.
pub const NO_RESPONSE: &str = "network error, no response";
/// Сообщение для запроса, который не удалось собрать.
pub const CONFIGURATION_ERROR: &str = "request configuration error";

#[derive(Debug, Error)]
/// Ошибки транспортного уровня `tutor-client`.
pub enum ClientError {
    /// Сервер ответил кодом ошибки. `body` хранит тело ответа как есть.
    #[error("http status {status}")]
    Status {
        /// HTTP-код ответа.
        status: u16,
        /// Тело ответа (`null`, если тела нет).
        body: Value,
    },

    /// Запрос отправлен, но ответа нет (соединение, таймаут, обрыв тела).
    #[error("network error: {0}")]
    NoResponse(String),

    /// Запрос не удалось построить (URL, сериализация тела, builder).
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Результат транспортных операций `tutor-client`.
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::Configuration(err.to_string());
        }
        Self::NoResponse(err.to_string())
    }

    /// Код ответа сервера, если ошибка пришла от сервера.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Нормализованное тело ошибки в формате `{status: "error", message}`.
    ///
    /// Для ответа сервера возвращается его собственное тело, если это объект.
    pub fn payload(&self) -> Value {
        match self {
            Self::Status { body, .. } if body.is_object() => body.clone(),
            Self::Status { .. } => json!({ "status": "error", "message": REQUEST_FAILED }),
            Self::NoResponse(_) => json!({ "status": "error", "message": NO_RESPONSE }),
            Self::Configuration(_) => {
                json!({ "status": "error", "message": CONFIGURATION_ERROR })
            }
        }
    }

    /// Текст ошибки из нормализованного тела.
    pub fn message(&self) -> String {
        let payload = self.payload();
        payload
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| payload.get("error").and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| REQUEST_FAILED.to_string())
    }
}

#[derive(Debug, Error)]
/// Ошибки долговременного key-value хранилища.
pub enum StorageError {
    /// Ошибка файловой системы.
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// Содержимое хранилища повреждено или не сериализуется.
    #[error("storage format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Результат операций хранилища.
pub type StorageResult<T> = Result<T, StorageError>;
