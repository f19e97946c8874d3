use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::lenient;

/// Сущность, которую backend адресует двумя идентификаторами:
/// прикладным (`userId`, `tutorId`, `requestId`, ...) и идентификатором хранилища (`_id`).
pub trait Identified {
    /// Прикладной идентификатор ресурса.
    fn resource_id(&self) -> Option<&str>;
    /// Идентификатор, назначенный хранилищем.
    fn storage_id(&self) -> Option<&str>;

    /// Совпадает ли сущность с `id` по любому из двух идентификаторов.
    fn matches_id(&self, id: &str) -> bool {
        self.resource_id() == Some(id) || self.storage_id() == Some(id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Адрес, как его отдаёт backend.
pub struct Location {
    /// Город.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub city: Option<String>,
    /// Район.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub district: Option<String>,
    /// Прочие поля адреса.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Пользователь платформы.
pub struct User {
    /// Идентификатор хранилища.
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub storage_id: Option<String>,
    /// Виртуальный `id`, который backend иногда отдаёт рядом с `_id`.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Прикладной идентификатор пользователя.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    /// Короткий идентификатор для отображения.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_id: Option<String>,
    /// Логин.
    #[serde(default, deserialize_with = "lenient::text")]
    pub username: String,
    /// Email.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,
    /// Телефон.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<String>,
    /// Роль: `parent`, `teacher` или `admin`.
    #[serde(default, deserialize_with = "lenient::text")]
    pub role: String,
    /// Статус: `active`, `inactive` или `suspended`.
    #[serde(default, deserialize_with = "lenient::text")]
    pub status: String,
    /// Дата регистрации.
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Поля, которые клиент не интерпретирует.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Identified for User {
    fn resource_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn storage_id(&self) -> Option<&str> {
        self.storage_id.as_deref().or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Профиль родителя.
pub struct Parent {
    /// Идентификатор хранилища.
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub storage_id: Option<String>,
    /// Виртуальный `id`, который backend иногда отдаёт рядом с `_id`.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Прикладной идентификатор родителя.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<String>,
    /// Связанный пользователь.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    /// Имя.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    /// Город (плоское поле, если backend его отдаёт).
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub city: Option<String>,
    /// Адрес.
    #[serde(
        default,
        deserialize_with = "lenient::location",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<Location>,
    /// Статус.
    #[serde(default, deserialize_with = "lenient::text")]
    pub status: String,
    /// Дата создания.
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Поля, которые клиент не интерпретирует.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Identified for Parent {
    fn resource_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    fn storage_id(&self) -> Option<&str> {
        self.storage_id.as_deref().or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Профиль преподавателя (`tutor` в API).
pub struct Teacher {
    /// Идентификатор хранилища.
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub storage_id: Option<String>,
    /// Виртуальный `id`, который backend иногда отдаёт рядом с `_id`.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Прикладной идентификатор преподавателя.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub tutor_id: Option<String>,
    /// Связанный пользователь.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    /// Имя.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    /// Город (плоское поле).
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub city: Option<String>,
    /// Адрес.
    #[serde(
        default,
        deserialize_with = "lenient::location",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<Location>,
    /// Статус.
    #[serde(default, deserialize_with = "lenient::text")]
    pub status: String,
    /// Пройдена ли проверка документов.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub verified: bool,
    /// Комментарий проверяющего.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub verification_note: Option<String>,
    /// Когда преподаватель был подтверждён.
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub verified_at: Option<DateTime<Utc>>,
    /// Комментарий к смене статуса.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_note: Option<String>,
    /// Когда статус менялся последний раз.
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_updated_at: Option<DateTime<Utc>>,
    /// Дата создания.
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Поля, которые клиент не интерпретирует.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Identified for Teacher {
    fn resource_id(&self) -> Option<&str> {
        self.tutor_id.as_deref()
    }

    fn storage_id(&self) -> Option<&str> {
        self.storage_id.as_deref().or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Заявка родителя на поиск преподавателя.
pub struct Post {
    /// Идентификатор хранилища. Backend по нему посты не адресует.
    #[serde(
        rename = "_id",
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub storage_id: Option<String>,
    /// Виртуальный `id`, который backend иногда отдаёт рядом с `_id`.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Стабильный прикладной идентификатор, которым адресуются посты.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub request_id: Option<String>,
    /// Заголовок.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    /// Предмет.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub subject: Option<String>,
    /// Адрес занятий.
    #[serde(
        default,
        deserialize_with = "lenient::location",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<Location>,
    /// Статус модерации в терминах хранилища: `pending`, `approved`, `rejected`.
    #[serde(default, deserialize_with = "lenient::text")]
    pub status: String,
    /// Комментарий модератора.
    #[serde(
        default,
        deserialize_with = "lenient::optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub review_note: Option<String>,
    /// Когда пост прошёл модерацию.
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Дата создания.
    #[serde(
        default,
        deserialize_with = "lenient::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Поля, которые клиент не интерпретирует.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Identified for Post {
    fn resource_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    fn storage_id(&self) -> Option<&str> {
        self.storage_id.as_deref().or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Параметры пагинации списка.
pub struct Pagination {
    /// Номер страницы, начиная с 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Размер страницы.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Общее количество элементов.
    #[serde(default)]
    pub total: u64,
    /// Количество страниц, `ceil(total / limit)`.
    #[serde(default, alias = "pageCount", alias = "totalPages")]
    pub pages: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

impl Pagination {
    /// Строит пагинацию и вычисляет `pages`. `limit` не бывает меньше 1.
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let limit = limit.max(1);
        let pages = total.div_ceil(u64::from(limit));
        Self {
            page: page.max(1),
            limit,
            total,
            pages: u32::try_from(pages).unwrap_or(u32::MAX),
        }
    }

    /// Пересчитывает `total` и `pages` для нового количества элементов.
    pub fn with_total(self, total: u64) -> Self {
        Self::new(self.page, self.limit, total)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(default_page(), default_limit(), 0)
    }
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $(
                #[doc = $value]
                $variant,
            )+
        }

        impl $name {
            /// Значение в том виде, в каком его ожидает backend.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                match raw.trim().to_ascii_lowercase().as_str() {
                    $($value => Ok(Self::$variant),)+
                    other => Err(format!(
                        "unknown {} '{other}'",
                        stringify!($name)
                    )),
                }
            }
        }
    };
}

string_enum! {
    /// Статус учётной записи.
    AccountStatus {
        Active => "active",
        Inactive => "inactive",
        Suspended => "suspended",
    }
}

string_enum! {
    /// Роль пользователя.
    UserRole {
        Parent => "parent",
        Teacher => "teacher",
        Admin => "admin",
    }
}

string_enum! {
    /// Статус модерации поста в терминах хранилища.
    PostStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

impl PostStatus {
    /// Переводит подпись из интерфейса в значение хранилища.
    ///
    /// В интерфейсе одобренный пост называется `published`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "published" => Some(Self::Approved),
            other => other.parse().ok(),
        }
    }
}

string_enum! {
    /// Порядок сортировки по дате создания.
    SortOrder {
        Newest => "newest",
        Oldest => "oldest",
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::Newest
    }
}

impl SortOrder {
    /// Направление сортировки для параметра `sortOrder`.
    pub fn direction(self) -> &'static str {
        match self {
            Self::Newest => "desc",
            Self::Oldest => "asc",
        }
    }
}

string_enum! {
    /// Период агрегирования статистики.
    Period {
        Day => "day",
        Week => "week",
        Month => "month",
        Year => "year",
    }
}

impl Default for Period {
    fn default() -> Self {
        Self::Month
    }
}

impl Period {
    /// Диапазон дат `[start, end]`, заканчивающийся в `today`.
    pub fn date_range(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = match self {
            Self::Day => Some(today),
            Self::Week => today.checked_sub_days(chrono::Days::new(7)),
            Self::Month => today.checked_sub_months(Months::new(1)),
            Self::Year => today.checked_sub_months(Months::new(12)),
        };
        (start.unwrap_or(today), today)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Снимок статистики: счётчики, временные ряды и диапазон, за который они посчитаны.
pub struct StatisticsSnapshot {
    /// Числовые показатели (`totalUsers`, `pendingMatches`, ...).
    pub counts: BTreeMap<String, i64>,
    /// Ряды по времени или по категориям (`monthlyStats`, `roleStats`, ...).
    pub series: BTreeMap<String, Vec<Value>>,
    /// Остальные поля ответа.
    pub details: Map<String, Value>,
    /// Период агрегирования.
    pub period: Period,
    /// Начало диапазона.
    pub start_date: Option<NaiveDate>,
    /// Конец диапазона.
    pub end_date: Option<NaiveDate>,
}

impl StatisticsSnapshot {
    /// Разбирает объект статистики: числа идут в `counts`, массивы в `series`.
    pub fn from_object(
        object: &Map<String, Value>,
        period: Period,
        range: Option<(NaiveDate, NaiveDate)>,
    ) -> Self {
        let mut snapshot = Self {
            period,
            start_date: range.map(|(start, _)| start),
            end_date: range.map(|(_, end)| end),
            ..Self::default()
        };

        for (key, value) in object {
            match value {
                Value::Number(number) => {
                    let count = number
                        .as_i64()
                        .or_else(|| number.as_f64().map(|v| v.round() as i64))
                        .unwrap_or_default();
                    snapshot.counts.insert(key.clone(), count);
                }
                Value::Array(items) => {
                    snapshot.series.insert(key.clone(), items.clone());
                }
                other => {
                    snapshot.details.insert(key.clone(), other.clone());
                }
            }
        }
        snapshot
    }

    /// Значение счётчика или 0.
    pub fn count(&self, key: &str) -> i64 {
        self.counts.get(key).copied().unwrap_or_default()
    }

    fn series_or_empty(&self, key: &str) -> Vec<Value> {
        self.series.get(key).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Статистика пользователей.
pub struct UserStatistics {
    /// Всего пользователей.
    pub total_users: i64,
    /// Активных пользователей.
    pub active_users: i64,
    /// Зарегистрировано сегодня.
    pub new_users_today: i64,
    /// Распределение по ролям.
    pub role_stats: Vec<Value>,
    /// Помесячная динамика.
    pub monthly_stats: Vec<Value>,
}

impl From<&StatisticsSnapshot> for UserStatistics {
    fn from(snapshot: &StatisticsSnapshot) -> Self {
        Self {
            total_users: snapshot.count("totalUsers"),
            active_users: snapshot.count("activeUsers"),
            new_users_today: snapshot.count("newUsersToday"),
            role_stats: snapshot.series_or_empty("roleStats"),
            monthly_stats: snapshot.series_or_empty("monthlyStats"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Статистика подборов преподаватель ↔ заявка.
pub struct MatchStatistics {
    /// Всего подборов.
    pub total_matches: i64,
    /// Завершённых.
    pub completed_matches: i64,
    /// Ожидающих ответа.
    pub pending_matches: i64,
    /// Принятых.
    pub accepted_matches: i64,
    /// Отклонённых.
    pub rejected_matches: i64,
    /// Отменённых.
    pub cancelled_matches: i64,
    /// Помесячная динамика.
    pub monthly_stats: Vec<Value>,
    /// Распределение по статусам.
    pub status_stats: Vec<Value>,
}

impl From<&StatisticsSnapshot> for MatchStatistics {
    fn from(snapshot: &StatisticsSnapshot) -> Self {
        Self {
            total_matches: snapshot.count("totalMatches"),
            completed_matches: snapshot.count("completedMatches"),
            pending_matches: snapshot.count("pendingMatches"),
            accepted_matches: snapshot.count("acceptedMatches"),
            rejected_matches: snapshot.count("rejectedMatches"),
            cancelled_matches: snapshot.count("cancelledMatches"),
            monthly_stats: snapshot.series_or_empty("monthlyStats"),
            status_stats: snapshot.series_or_empty("statusStats"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
/// Учётные данные для входа.
pub struct Credentials {
    /// Логин.
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    /// Пароль.
    #[validate(length(min = 1))]
    pub password: String,
}

impl Credentials {
    /// Создаёт учётные данные; логин обрезается по краям.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into().trim().to_string(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
/// Данные для регистрации администратора.
pub struct Registration {
    /// Логин.
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    /// Пароль.
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    /// Email, если backend его требует.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pagination_pages_is_ceil_of_total_over_limit() {
        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).pages, 2);
        assert_eq!(Pagination::new(3, 0, 5).limit, 1);
    }

    #[test]
    fn pagination_accepts_page_count_alias() {
        let parsed: Pagination =
            serde_json::from_value(json!({ "page": 2, "limit": 5, "total": 12, "pageCount": 3 }))
                .expect("must parse");
        assert_eq!(parsed.pages, 3);
        assert_eq!(parsed.page, 2);
    }

    #[test]
    fn teacher_matches_either_identifier() {
        let teacher: Teacher = serde_json::from_value(json!({
            "_id": "665f1c2b9a1e4b0012345678",
            "tutorId": "TUTOR_42",
            "verified": false
        }))
        .expect("must parse");
        assert!(teacher.matches_id("TUTOR_42"));
        assert!(teacher.matches_id("665f1c2b9a1e4b0012345678"));
        assert!(!teacher.matches_id("TUTOR_43"));
    }

    #[test]
    fn storage_and_virtual_ids_decode_side_by_side() {
        let teacher: Teacher = serde_json::from_value(json!({
            "_id": "665f1c2b9a1e4b0012345678",
            "id": "665f1c2b9a1e4b0012345678",
            "tutorId": "TUTOR_7"
        }))
        .expect("both ids are accepted");
        assert_eq!(teacher.storage_id(), Some("665f1c2b9a1e4b0012345678"));
        assert!(teacher.extra.is_empty());

        let user: User = serde_json::from_value(json!({ "id": "42", "userId": "USER_42" }))
            .expect("bare id is accepted");
        assert_eq!(user.storage_id(), Some("42"));
        assert!(user.matches_id("USER_42"));
    }

    #[test]
    fn null_and_malformed_fields_do_not_break_decoding() {
        let parents: Vec<Parent> = serde_json::from_value(json!([
            { "parentId": "PARENT_1", "status": null, "createdAt": null, "name": null },
            { "parentId": "PARENT_2", "status": "active", "createdAt": "not a date" },
            { "parentId": "PARENT_3", "location": "Hanoi", "createdAt": "2024-02-01T08:00:00Z" }
        ]))
        .expect("one bad field must not fail the whole list");

        assert_eq!(parents.len(), 3);
        assert_eq!(parents[0].status, "");
        assert!(parents[0].name.is_none());
        assert!(parents[1].created_at.is_none());
        assert_eq!(
            parents[2].location.as_ref().and_then(|l| l.city.as_deref()),
            Some("Hanoi")
        );
        assert!(parents[2].created_at.is_some());

        let teacher: Teacher =
            serde_json::from_value(json!({ "tutorId": "TUTOR_1", "verified": null, "role": 1 }))
                .expect("null flag is false");
        assert!(!teacher.verified);
    }

    #[test]
    fn unknown_fields_are_kept() {
        let post: Post = serde_json::from_value(json!({
            "requestId": "REQUEST_1",
            "status": "approved",
            "grade": "7"
        }))
        .expect("must parse");
        assert_eq!(post.extra.get("grade"), Some(&json!("7")));
    }

    #[test]
    fn post_status_label_published_is_approved() {
        assert_eq!(PostStatus::from_label("published"), Some(PostStatus::Approved));
        assert_eq!(PostStatus::from_label("Rejected"), Some(PostStatus::Rejected));
        assert_eq!(PostStatus::from_label("archived"), None);
    }

    #[test]
    fn period_ranges_end_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).expect("valid date");
        assert_eq!(Period::Day.date_range(today), (today, today));
        assert_eq!(
            Period::Week.date_range(today).0,
            NaiveDate::from_ymd_opt(2024, 3, 24).expect("valid date")
        );
        assert_eq!(
            Period::Month.date_range(today).0,
            NaiveDate::from_ymd_opt(2024, 2, 29).expect("valid date")
        );
        assert_eq!(
            Period::Year.date_range(today).0,
            NaiveDate::from_ymd_opt(2023, 3, 31).expect("valid date")
        );
    }

    #[test]
    fn snapshot_splits_counts_and_series() {
        let object = json!({
            "totalMatches": 12,
            "pendingMatches": 3,
            "monthlyStats": [{ "month": "2024-01", "count": 4 }],
            "label": "matches"
        });
        let snapshot = StatisticsSnapshot::from_object(
            object.as_object().expect("object"),
            Period::Month,
            None,
        );
        let typed = MatchStatistics::from(&snapshot);
        assert_eq!(typed.total_matches, 12);
        assert_eq!(typed.pending_matches, 3);
        assert_eq!(typed.cancelled_matches, 0);
        assert_eq!(typed.monthly_stats.len(), 1);
        assert_eq!(snapshot.details.get("label"), Some(&json!("matches")));
    }

    #[test]
    fn credentials_require_username_and_password() {
        assert!(Credentials::new("  ", "secret").validate().is_err());
        assert!(Credentials::new("admin", "").validate().is_err());
        assert!(Credentials::new("admin", "wrong").validate().is_ok());
    }
}
