//! Нормализация ответов backend.
//!
//! Backend отдаёт списки по-разному: голым массивом, конвертом
//! `{status, data}` (где `data` бывает массивом, объектом с ключом ресурса или
//! вложенным `data`) и просто объектом без `status`. Всё это сводится к
//! [`ApiResponse`] до того, как попадает в хранилища.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ClientError, ClientResult, REQUEST_FAILED};
use crate::models::Pagination;

/// Сообщение для пустого или непонятного ответа.
pub const UNEXPECTED_SHAPE: &str = "unexpected response shape";
/// Сообщение для пустого идентификатора.
pub const INVALID_ID: &str = "invalid id";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
/// Нормализованный результат операции: `{status: "success", data}` или
/// `{status: "error", message}`.
pub enum ApiResponse<T> {
    /// Операция выполнена.
    Success {
        /// Данные ответа.
        data: T,
        /// Сообщение сервера, если было.
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Операция не выполнена.
    Error {
        /// Текст ошибки.
        message: String,
    },
}

impl<T> ApiResponse<T> {
    /// Успешный результат без сообщения.
    pub fn success(data: T) -> Self {
        Self::Success {
            data,
            message: None,
        }
    }

    /// Ошибка с сообщением.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Ошибка транспорта, сведённая к сообщению.
    pub fn from_client_error(err: &ClientError) -> Self {
        Self::error(err.message())
    }

    /// Успешна ли операция.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Сообщение результата (для ошибки всегда есть).
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { message, .. } => message.as_deref(),
            Self::Error { message } => Some(message),
        }
    }

    /// Данные успешного результата.
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data, .. } => Some(data),
            Self::Error { .. } => None,
        }
    }

    /// Забирает данные успешного результата.
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Success { data, .. } => Some(data),
            Self::Error { .. } => None,
        }
    }

    /// Преобразует данные, сохраняя ошибку.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        match self {
            Self::Success { data, message } => ApiResponse::Success {
                data: f(data),
                message,
            },
            Self::Error { message } => ApiResponse::Error { message },
        }
    }

    /// Подставляет сообщение, если у успешного результата его нет.
    pub fn with_default_message(self, default: &str) -> Self {
        match self {
            Self::Success {
                data,
                message: None,
            } => Self::Success {
                data,
                message: Some(default.to_string()),
            },
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Страница списка вместе с пагинацией.
pub struct ListPage<T> {
    /// Элементы.
    pub items: Vec<T>,
    /// Пагинация (с сервера или вычисленная по длине списка).
    pub pagination: Pagination,
}

const NUMERIC_KEYS: [&str; 2] = ["page", "limit"];

#[derive(Debug, Clone, PartialEq, Eq)]
/// Значение query-параметра до очистки.
pub enum ParamValue {
    /// Параметр не задан.
    Absent,
    /// Строка.
    Text(String),
    /// Число.
    Number(u64),
    /// Флаг.
    Flag(bool),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Number(u64::from(value))
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
/// Очищенные query-параметры.
///
/// Пустые строки и незаданные значения в запрос не попадают, а `page` и `limit`
/// приводятся к числам.
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    /// Пустой набор параметров.
    pub fn new() -> Self {
        Self::default()
    }

    /// Устанавливает параметр. Текст обрезается по краям; пустое значение удаляет ключ.
    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) -> &mut Self {
        let value = match value.into() {
            ParamValue::Absent => None,
            ParamValue::Text(text) if text.trim().is_empty() => None,
            ParamValue::Text(text) if NUMERIC_KEYS.contains(&key) => {
                match text.trim().parse::<u64>() {
                    Ok(number) => Some(number.to_string()),
                    Err(_) => {
                        warn!(key, value = %text, "dropping non-numeric query parameter");
                        None
                    }
                }
            }
            ParamValue::Text(text) => Some(text.trim().to_string()),
            ParamValue::Number(number) => Some(number.to_string()),
            ParamValue::Flag(flag) => Some(flag.to_string()),
        };

        match value {
            Some(value) => {
                self.0.insert(key.to_string(), value);
            }
            None => {
                self.0.remove(key);
            }
        }
        self
    }

    /// Builder-вариант [`QueryParams::set`].
    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Собирает параметры из пар «ключ, сырое значение».
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ParamValue>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.set(key.as_ref(), value);
        }
        params
    }

    /// Значение параметра.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Числовое значение параметра.
    pub fn number(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|value| value.parse().ok())
    }

    /// Есть ли параметр.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Пуст ли набор.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Пары «ключ, значение» в порядке ключей.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn requested_pagination(&self, total: usize) -> Pagination {
        let page = self.number("page").unwrap_or(1);
        let limit = self.number("limit").unwrap_or(10);
        Pagination::new(
            u32::try_from(page).unwrap_or(u32::MAX),
            u32::try_from(limit).unwrap_or(u32::MAX),
            total as u64,
        )
    }
}

/// Сводит результат HTTP-клиента к [`ApiResponse`].
pub(crate) fn respond<T>(
    result: ClientResult<Value>,
    normalize: impl FnOnce(Value) -> ApiResponse<T>,
) -> ApiResponse<T> {
    match result {
        Ok(payload) => normalize(payload),
        Err(err) => ApiResponse::from_client_error(&err),
    }
}

/// Проверяет, что идентификатор не пустой.
pub(crate) fn require_id(id: &str) -> Result<&str, String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(INVALID_ID.to_string());
    }
    Ok(id)
}

/// Похож ли идентификатор на идентификатор хранилища (24 символа lowercase hex).
pub fn looks_like_storage_id(id: &str) -> bool {
    id.len() == 24 && id.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

fn error_message(object: &Map<String, Value>) -> Option<String> {
    let status = object.get("status").and_then(Value::as_str)?;
    if status != "error" && status != "fail" {
        return None;
    }
    let message = object
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or(REQUEST_FAILED);
    Some(message.to_string())
}

fn server_message(object: &Map<String, Value>) -> Option<String> {
    object
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn take_array(object: &mut Map<String, Value>, key: &str) -> Option<Vec<Value>> {
    match object.remove(key) {
        Some(Value::Array(items)) => Some(items),
        Some(other) => {
            object.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

fn locate_list(
    object: &mut Map<String, Value>,
    list_key: &str,
) -> Option<(Vec<Value>, Option<Value>)> {
    match object.remove("data") {
        Some(Value::Array(items)) => Some((items, None)),
        Some(Value::Object(mut data)) => {
            let pagination = data.remove("pagination");
            let items = take_array(&mut data, list_key).or_else(|| take_array(&mut data, "data"))?;
            Some((items, pagination))
        }
        Some(_) => None,
        None => take_array(object, list_key).map(|items| (items, None)),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|err| format!("malformed response: {err}"))
}

/// Нормализует ответ списочного endpoint.
///
/// `list_key`: ключ, под которым список может лежать внутри `data`
/// (`posts`, `tutors`, ...). Пагинация берётся с верхнего уровня или из
/// `data.pagination`, иначе вычисляется по длине списка и запрошенным `page/limit`.
pub fn normalize_list<T: DeserializeOwned>(
    payload: Value,
    list_key: &str,
    query: &QueryParams,
) -> ApiResponse<ListPage<T>> {
    let (items, pagination, message) = match payload {
        Value::Array(items) => (items, None, None),
        Value::Object(mut object) => {
            if let Some(message) = error_message(&object) {
                return ApiResponse::error(message);
            }
            let message = server_message(&object);
            let top = object.remove("pagination");
            match locate_list(&mut object, list_key) {
                Some((items, nested)) => (items, top.or(nested), message),
                None => return ApiResponse::error(UNEXPECTED_SHAPE),
            }
        }
        _ => return ApiResponse::error(UNEXPECTED_SHAPE),
    };

    let pagination = pagination
        .and_then(|raw| serde_json::from_value::<Pagination>(raw).ok())
        .map(|p| Pagination::new(p.page, p.limit, p.total))
        .unwrap_or_else(|| query.requested_pagination(items.len()));

    match decode::<Vec<T>>(Value::Array(items)) {
        Ok(items) => ApiResponse::Success {
            data: ListPage { items, pagination },
            message,
        },
        Err(message) => ApiResponse::error(message),
    }
}

/// Нормализует ответ с одной сущностью.
///
/// Сущность ищется в `data.<entity_key>`, в `data`, в `<entity_key>` или в самом объекте.
pub fn normalize_entity<T: DeserializeOwned>(payload: Value, entity_key: &str) -> ApiResponse<T> {
    let Value::Object(mut object) = payload else {
        return ApiResponse::error(UNEXPECTED_SHAPE);
    };
    if let Some(message) = error_message(&object) {
        return ApiResponse::error(message);
    }
    let message = server_message(&object);

    let entity = match object.remove("data") {
        Some(Value::Object(mut data)) => match data.remove(entity_key) {
            Some(entity @ Value::Object(_)) => entity,
            _ => Value::Object(data),
        },
        Some(Value::Null) | None => match object.remove(entity_key) {
            Some(entity @ Value::Object(_)) => entity,
            _ => {
                object.remove("status");
                object.remove("message");
                Value::Object(object)
            }
        },
        Some(_) => return ApiResponse::error(UNEXPECTED_SHAPE),
    };

    match decode::<T>(entity) {
        Ok(data) => ApiResponse::Success { data, message },
        Err(message) => ApiResponse::error(message),
    }
}

/// Нормализует ответ на изменение или удаление.
///
/// Пустое тело (например, 204) считается успехом.
pub fn normalize_ack(payload: Value) -> ApiResponse<Value> {
    match payload {
        Value::Null => ApiResponse::success(Value::Null),
        Value::Object(mut object) => {
            if let Some(message) = error_message(&object) {
                return ApiResponse::error(message);
            }
            let message = server_message(&object);
            let data = object.remove("data").unwrap_or(Value::Object(object));
            ApiResponse::Success { data, message }
        }
        other => ApiResponse::success(other),
    }
}

/// Нормализует ответ, данные которого нужны как объект (статистика).
///
/// Двойной конверт `{data: {data: {...}}}` разворачивается.
pub fn normalize_object(payload: Value) -> ApiResponse<Map<String, Value>> {
    let Value::Object(mut object) = payload else {
        return ApiResponse::error(UNEXPECTED_SHAPE);
    };
    if let Some(message) = error_message(&object) {
        return ApiResponse::error(message);
    }
    let message = server_message(&object);

    let data = match object.remove("data") {
        Some(Value::Object(mut data)) => match data.remove("data") {
            Some(Value::Object(inner)) => inner,
            Some(other) => {
                data.insert("data".to_string(), other);
                data
            }
            None => data,
        },
        Some(_) => return ApiResponse::error(UNEXPECTED_SHAPE),
        None => {
            object.remove("status");
            object.remove("message");
            object
        }
    };
    ApiResponse::Success { data, message }
}
