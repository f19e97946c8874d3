use std::fmt;

use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::envelope::QueryParams;
use crate::error::{ClientError, ClientResult};
use crate::router::{Navigator, Route};
use crate::session::SessionProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Путь ресурса относительно базового URL.
///
/// Статическая часть задаётся строкой, динамические сегменты (идентификаторы,
/// города) добавляются через [`ApiPath::segment`] и кодируются при сборке URL.
pub struct ApiPath {
    segments: Vec<String>,
}

impl ApiPath {
    /// Создаёт путь из статической строки вида `admin/users`.
    pub fn new(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Добавляет сегмент как есть, без разбиения по `/`.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Сегменты пути.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for ApiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

#[derive(Debug, Clone, Default)]
/// Параметры одного запроса.
pub struct RequestOptions {
    /// Query-параметры (уже очищенные).
    pub query: QueryParams,
    /// JSON-тело.
    pub body: Option<Value>,
    /// Не прикладывать токен и не реагировать на 401 (вход).
    pub anonymous: bool,
}

impl RequestOptions {
    /// Запрос только с query-параметрами.
    pub fn with_query(query: QueryParams) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }

    /// Запрос с JSON-телом.
    pub fn with_body(body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::default()
        }
    }

    /// Помечает запрос как анонимный.
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

#[derive(Debug, Clone)]
/// HTTP-клиент admin API.
///
/// Подставляет bearer-токен из [`SessionProvider`], разворачивает транспортный
/// ответ до JSON-тела и сводит ошибки к [`ClientError`]. На 401 сбрасывает сессию
/// и переводит навигатор на `login`.
pub struct HttpClient {
    base_url: Url,
    client: Client,
    session: SessionProvider,
    navigator: Navigator,
}

impl HttpClient {
    /// Создаёт клиент. Ошибка, если базовый URL некорректен или reqwest не собрался.
    pub fn new(
        config: ClientConfig,
        session: SessionProvider,
        navigator: Navigator,
    ) -> ClientResult<Self> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|err| ClientError::Configuration(format!("invalid base url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Configuration(format!(
                "base url cannot have a path: {base_url}"
            )));
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ClientError::from_reqwest)?;

        Ok(Self {
            base_url,
            client,
            session,
            navigator,
        })
    }

    /// Базовый URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Провайдер сессии, которым пользуется клиент.
    pub fn session(&self) -> &SessionProvider {
        &self.session
    }

    /// Навигатор, который клиент переводит на `login` при 401.
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    fn endpoint(&self, path: &ApiPath) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Configuration("base url cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(path.segments());
        Ok(url)
    }

    /// Выполняет запрос и возвращает тело успешного ответа.
    ///
    /// Пустое тело возвращается как `null`, не-JSON тело как строка.
    pub async fn request(
        &self,
        method: Method,
        path: &ApiPath,
        options: RequestOptions,
    ) -> ClientResult<Value> {
        let url = self.endpoint(path)?;
        debug!(%method, %path, anonymous = options.anonymous, "sending request");

        let mut request = self.client.request(method.clone(), url);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }
        if !options.anonymous {
            if let Some(token) = self.session.token() {
                request = request.bearer_auth(token);
            }
        }

        let response = request.send().await.map_err(|err| {
            let err = ClientError::from_reqwest(err);
            warn!(%method, %path, error = %err, "request failed");
            err
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(ClientError::from_reqwest)?;
        let body = decode_body(&bytes);

        if status.is_success() {
            debug!(%method, %path, status = status.as_u16(), "request completed");
            return Ok(body);
        }

        if status == StatusCode::UNAUTHORIZED && !options.anonymous {
            self.expire_session();
        }
        warn!(%method, %path, status = status.as_u16(), "server returned error status");
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn expire_session(&self) {
        warn!("authorization failed, clearing session");
        if let Err(err) = self.session.clear() {
            warn!(error = %err, "failed to clear session storage");
        }
        self.navigator.redirect(Route::Login);
    }
}

fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;
    use std::sync::Arc;

    fn client(base_url: &str) -> ClientResult<HttpClient> {
        HttpClient::new(
            ClientConfig::new(base_url),
            SessionProvider::new(Arc::new(MemoryStorage::new())),
            Navigator::new(),
        )
    }

    #[test]
    fn endpoint_keeps_api_prefix_and_encodes_segments() {
        let client = client("http://localhost:3000/api/").expect("valid config");
        let path = ApiPath::new("/admin/posts/city/").segment("New York");
        let url = client.endpoint(&path).expect("valid url");
        assert_eq!(url.as_str(), "http://localhost:3000/api/admin/posts/city/New%20York");
    }

    #[test]
    fn dynamic_segment_slash_is_escaped() {
        let client = client("http://localhost:3000/api").expect("valid config");
        let url = client
            .endpoint(&ApiPath::new("admin/users").segment("a/b"))
            .expect("valid url");
        assert_eq!(url.path(), "/api/admin/users/a%2Fb");
    }

    #[test]
    fn invalid_base_url_is_configuration_error() {
        let err = client("not a url").expect_err("must fail");
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn decode_body_handles_empty_and_plain_text() {
        assert_eq!(decode_body(b""), Value::Null);
        assert_eq!(decode_body(b"  \n"), Value::Null);
        assert_eq!(decode_body(br#"{"status":"success"}"#), json!({ "status": "success" }));
        assert_eq!(decode_body(b"Bad Gateway"), json!("Bad Gateway"));
    }

    #[test]
    fn api_path_display() {
        let path = ApiPath::new("admin/tutors").segment("T1").segment("verify");
        assert_eq!(path.to_string(), "/admin/tutors/T1/verify");
    }
}
