use std::time::Duration;

/// Базовый URL API по умолчанию.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000/api";
/// Таймаут запроса по умолчанию.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
/// Параметры подключения к backend API.
pub struct ClientConfig {
    /// Базовый URL вместе с префиксом `/api`, например `http://127.0.0.1:3000/api`.
    pub base_url: String,
    /// Фиксированный таймаут одного запроса.
    pub timeout: Duration,
    /// Таймаут установки соединения.
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Создаёт конфигурацию с указанным базовым URL и таймаутами по умолчанию.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Переопределяет таймаут запроса.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
