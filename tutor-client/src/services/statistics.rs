use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde::Serialize;

use super::log_failure;
use crate::envelope::{ApiResponse, QueryParams, normalize_list, normalize_object, respond};
use crate::http_client::{ApiPath, HttpClient, RequestOptions};
use crate::models::{Period, StatisticsSnapshot, User};

const STATISTICS: &str = "admin/statistics";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
/// Период и диапазон дат для запроса статистики.
pub struct StatisticsQuery {
    /// Период агрегирования.
    pub period: Period,
    /// Начало диапазона.
    pub start_date: Option<NaiveDate>,
    /// Конец диапазона.
    pub end_date: Option<NaiveDate>,
}

impl StatisticsQuery {
    /// Запрос за период с диапазоном по умолчанию.
    pub fn for_period(period: Period) -> Self {
        Self {
            period,
            ..Self::default()
        }
    }

    /// Итоговый диапазон `[start, end]`.
    ///
    /// Недостающий конец равен `today`, недостающее начало выводится из периода.
    /// Перевёрнутый диапазон отклоняется.
    pub fn resolve(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), String> {
        let end = self.end_date.unwrap_or(today);
        let start = self
            .start_date
            .unwrap_or_else(|| self.period.date_range(end).0);
        if start > end {
            return Err(format!(
                "start date {start} must not be after end date {end}"
            ));
        }
        Ok((start, end))
    }

    fn to_query(self, (start, end): (NaiveDate, NaiveDate)) -> QueryParams {
        QueryParams::new()
            .with("period", self.period.as_str())
            .with("startDate", start.format(DATE_FORMAT).to_string())
            .with("endDate", end.format(DATE_FORMAT).to_string())
    }
}

#[derive(Debug, Clone)]
/// Сервис агрегированной статистики (`admin/statistics`).
pub struct StatisticsService {
    http: HttpClient,
}

impl StatisticsService {
    /// Создаёт сервис поверх HTTP-клиента.
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Статистика пользователей.
    pub async fn users(&self, query: &StatisticsQuery) -> ApiResponse<StatisticsSnapshot> {
        self.metric("users", query).await
    }

    /// Статистика преподавателей.
    pub async fn tutors(&self, query: &StatisticsQuery) -> ApiResponse<StatisticsSnapshot> {
        self.metric("tutors", query).await
    }

    /// Статистика постов.
    pub async fn posts(&self, query: &StatisticsQuery) -> ApiResponse<StatisticsSnapshot> {
        self.metric("posts", query).await
    }

    /// Статистика подборов.
    pub async fn matches(&self, query: &StatisticsQuery) -> ApiResponse<StatisticsSnapshot> {
        self.metric("matches", query).await
    }

    /// Недавно зарегистрированные пользователи.
    pub async fn recent_users(&self) -> ApiResponse<Vec<User>> {
        let path = ApiPath::new(STATISTICS).segment("recentUsers");
        let query = QueryParams::new();
        let result = self
            .http
            .request(Method::GET, &path, RequestOptions::default())
            .await;
        let response = respond(result, |payload| normalize_list::<User>(payload, "users", &query))
            .map(|page| page.items);
        log_failure("statistics.recent_users", &response);
        response
    }

    async fn metric(
        &self,
        metric: &str,
        query: &StatisticsQuery,
    ) -> ApiResponse<StatisticsSnapshot> {
        let range = match query.resolve(Utc::now().date_naive()) {
            Ok(range) => range,
            Err(message) => return ApiResponse::error(message),
        };

        let path = ApiPath::new(STATISTICS).segment(metric);
        let options = RequestOptions::with_query(query.to_query(range));
        let result = self.http.request(Method::GET, &path, options).await;
        let response = respond(result, normalize_object)
            .map(|object| StatisticsSnapshot::from_object(&object, query.period, Some(range)));
        log_failure(&format!("statistics.{metric}"), &response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn missing_range_is_derived_from_period() {
        let today = date(2024, 5, 15);
        let week = StatisticsQuery::for_period(Period::Week);
        assert_eq!(week.resolve(today), Ok((date(2024, 5, 8), today)));

        let year = StatisticsQuery::for_period(Period::Year);
        assert_eq!(year.resolve(today), Ok((date(2023, 5, 15), today)));
    }

    #[test]
    fn explicit_range_is_kept() {
        let query = StatisticsQuery {
            period: Period::Day,
            start_date: Some(date(2024, 1, 1)),
            end_date: Some(date(2024, 1, 31)),
        };
        assert_eq!(
            query.resolve(date(2024, 6, 1)),
            Ok((date(2024, 1, 1), date(2024, 1, 31)))
        );
    }

    #[test]
    fn reversed_range_is_rejected() {
        let query = StatisticsQuery {
            period: Period::Month,
            start_date: Some(date(2024, 2, 1)),
            end_date: Some(date(2024, 1, 1)),
        };
        assert!(query.resolve(date(2024, 6, 1)).is_err());
    }

    #[test]
    fn query_uses_iso_dates() {
        let query = StatisticsQuery::for_period(Period::Month);
        let params = query.to_query((date(2024, 2, 29), date(2024, 3, 29)));
        assert_eq!(params.get("period"), Some("month"));
        assert_eq!(params.get("startDate"), Some("2024-02-29"));
        assert_eq!(params.get("endDate"), Some("2024-03-29"));
    }
}
