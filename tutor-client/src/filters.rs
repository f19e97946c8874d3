//! Критерии отбора для списков.
//!
//! Одни и те же фильтры уходят на сервер как query-параметры и применяются
//! локально к полностью загруженному набору.

use crate::envelope::QueryParams;
use crate::models::{Parent, Post, PostStatus, SortOrder, Teacher, User};

/// Фильтры списка с пагинацией.
pub trait ListFilters: std::fmt::Debug + Clone + Default + PartialEq + Send + Sync + 'static {
    /// Текущая страница, начиная с 1.
    fn page(&self) -> u32;
    /// Размер страницы.
    fn limit(&self) -> u32;
    /// Устанавливает страницу.
    fn set_page(&mut self, page: u32);
    /// Критерии без `page/limit`.
    fn criteria(&self) -> QueryParams;

    /// Критерии вместе с `page/limit`.
    fn to_query(&self) -> QueryParams {
        self.criteria()
            .with("page", self.page())
            .with("limit", self.limit())
    }

    /// Совпадают ли фильтры без учёта страницы.
    fn same_criteria(&self, other: &Self) -> bool {
        let mut this = self.clone();
        this.set_page(other.page());
        this == *other
    }
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|value| value.to_lowercase().contains(&needle.to_lowercase()))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
/// Фильтры пользователей.
pub struct UserFilters {
    /// Страница.
    pub page: u32,
    /// Размер страницы.
    pub limit: u32,
    /// Роль: `parent`, `teacher`, `admin`.
    pub role: Option<String>,
    /// Статус учётной записи.
    pub status: Option<String>,
    /// Поиск по логину и email.
    pub search: Option<String>,
}

impl UserFilters {
    /// Проходит ли пользователь фильтр.
    pub fn matches(&self, user: &User) -> bool {
        if let Some(role) = non_empty(&self.role) {
            if user.role != role {
                return false;
            }
        }
        if let Some(status) = non_empty(&self.status) {
            if user.status != status {
                return false;
            }
        }
        match non_empty(&self.search) {
            Some(search) => {
                contains_ci(Some(&user.username), search)
                    || contains_ci(user.email.as_deref(), search)
            }
            None => true,
        }
    }
}

impl Default for UserFilters {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            role: None,
            status: None,
            search: None,
        }
    }
}

impl ListFilters for UserFilters {
    fn page(&self) -> u32 {
        self.page
    }

    fn limit(&self) -> u32 {
        self.limit
    }

    fn set_page(&mut self, page: u32) {
        self.page = page;
    }

    fn criteria(&self) -> QueryParams {
        QueryParams::new()
            .with("role", self.role.clone())
            .with("status", self.status.clone())
            .with("search", self.search.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Фильтры родителей.
pub struct ParentFilters {
    /// Страница.
    pub page: u32,
    /// Размер страницы.
    pub limit: u32,
    /// Статус.
    pub status: Option<String>,
    /// Город, подстрока без учёта регистра.
    pub city: Option<String>,
    /// Поиск по имени.
    pub search: Option<String>,
}

impl ParentFilters {
    /// Проходит ли родитель фильтр.
    pub fn matches(&self, parent: &Parent) -> bool {
        if let Some(status) = non_empty(&self.status) {
            if parent.status != status {
                return false;
            }
        }
        if let Some(city) = non_empty(&self.city) {
            let location_city = parent.location.as_ref().and_then(|l| l.city.as_deref());
            if !contains_ci(parent.city.as_deref(), city) && !contains_ci(location_city, city) {
                return false;
            }
        }
        match non_empty(&self.search) {
            Some(search) => contains_ci(parent.name.as_deref(), search),
            None => true,
        }
    }
}

impl Default for ParentFilters {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            status: None,
            city: None,
            search: None,
        }
    }
}

impl ListFilters for ParentFilters {
    fn page(&self) -> u32 {
        self.page
    }

    fn limit(&self) -> u32 {
        self.limit
    }

    fn set_page(&mut self, page: u32) {
        self.page = page;
    }

    fn criteria(&self) -> QueryParams {
        QueryParams::new()
            .with("status", self.status.clone())
            .with("city", self.city.clone())
            .with("search", self.search.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Фильтры преподавателей.
pub struct TeacherFilters {
    /// Страница.
    pub page: u32,
    /// Размер страницы.
    pub limit: u32,
    /// Статус.
    pub status: Option<String>,
    /// Пройдена ли проверка документов (`isVerified` в API).
    pub verified: Option<bool>,
    /// Город: ищется и в `city`, и в `location.city`.
    pub city: Option<String>,
    /// Поиск по имени.
    pub search: Option<String>,
    /// Сортировка по дате создания.
    pub sort: SortOrder,
}

impl TeacherFilters {
    /// Проходит ли преподаватель фильтр.
    pub fn matches(&self, teacher: &Teacher) -> bool {
        if let Some(status) = non_empty(&self.status) {
            if teacher.status != status {
                return false;
            }
        }
        if let Some(verified) = self.verified {
            if teacher.verified != verified {
                return false;
            }
        }
        if let Some(city) = non_empty(&self.city) {
            let location_city = teacher.location.as_ref().and_then(|l| l.city.as_deref());
            if !contains_ci(teacher.city.as_deref(), city) && !contains_ci(location_city, city) {
                return false;
            }
        }
        match non_empty(&self.search) {
            Some(search) => contains_ci(teacher.name.as_deref(), search),
            None => true,
        }
    }
}

impl Default for TeacherFilters {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            status: None,
            verified: None,
            city: None,
            search: None,
            sort: SortOrder::default(),
        }
    }
}

impl ListFilters for TeacherFilters {
    fn page(&self) -> u32 {
        self.page
    }

    fn limit(&self) -> u32 {
        self.limit
    }

    fn set_page(&mut self, page: u32) {
        self.page = page;
    }

    fn criteria(&self) -> QueryParams {
        QueryParams::new()
            .with("status", self.status.clone())
            .with("isVerified", self.verified)
            .with("city", self.city.clone())
            .with("search", self.search.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Фильтры постов.
pub struct PostFilters {
    /// Страница.
    pub page: u32,
    /// Размер страницы.
    pub limit: u32,
    /// Статус в терминах интерфейса: `pending`, `published`, `rejected`.
    pub status: Option<String>,
    /// Город занятий, подстрока без учёта регистра.
    pub city: Option<String>,
    /// Поиск по заголовку и предмету.
    pub search: Option<String>,
    /// Сортировка по дате создания.
    pub sort: SortOrder,
}

impl PostFilters {
    /// Статус в терминах хранилища (`published` → `approved`).
    pub fn stored_status(&self) -> Option<String> {
        let label = non_empty(&self.status)?;
        Some(
            PostStatus::from_label(label)
                .map(|status| status.as_str().to_string())
                .unwrap_or_else(|| label.to_string()),
        )
    }

    /// Проходит ли пост фильтр.
    pub fn matches(&self, post: &Post) -> bool {
        if let Some(status) = self.stored_status() {
            if post.status != status {
                return false;
            }
        }
        if let Some(city) = non_empty(&self.city) {
            let location_city = post.location.as_ref().and_then(|l| l.city.as_deref());
            if !contains_ci(location_city, city) {
                return false;
            }
        }
        match non_empty(&self.search) {
            Some(search) => {
                contains_ci(post.title.as_deref(), search)
                    || contains_ci(post.subject.as_deref(), search)
            }
            None => true,
        }
    }
}

impl Default for PostFilters {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 20,
            status: None,
            city: None,
            search: None,
            sort: SortOrder::default(),
        }
    }
}

impl ListFilters for PostFilters {
    fn page(&self) -> u32 {
        self.page
    }

    fn limit(&self) -> u32 {
        self.limit
    }

    fn set_page(&mut self, page: u32) {
        self.page = page;
    }

    fn criteria(&self) -> QueryParams {
        QueryParams::new()
            .with("status", self.status.clone())
            .with("city", self.city.clone())
            .with("search", self.search.clone())
            .with("sort", "createdAt")
            .with("sortOrder", self.sort.direction())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;

    #[test]
    fn empty_criteria_are_not_sent() {
        let filters = UserFilters {
            role: Some(String::new()),
            status: None,
            search: Some("ann".to_string()),
            ..UserFilters::default()
        };
        let query = filters.to_query();
        assert!(!query.contains("role"));
        assert!(!query.contains("status"));
        assert_eq!(query.get("search"), Some("ann"));
        assert_eq!(query.get("page"), Some("1"));
        assert_eq!(query.get("limit"), Some("10"));
    }

    #[test]
    fn whitespace_criteria_are_trimmed_or_dropped() {
        let filters = ParentFilters {
            status: Some("   ".to_string()),
            city: Some(" Hanoi ".to_string()),
            search: Some("\t".to_string()),
            ..ParentFilters::default()
        };
        let query = filters.to_query();
        assert!(!query.contains("status"));
        assert!(!query.contains("search"));
        assert_eq!(query.get("city"), Some("Hanoi"));

        let parent = Parent {
            city: Some("Hanoi".to_string()),
            ..Parent::default()
        };
        assert!(filters.matches(&parent));
    }

    #[test]
    fn post_sort_maps_to_created_at_order() {
        let newest = PostFilters::default().criteria();
        assert_eq!(newest.get("sort"), Some("createdAt"));
        assert_eq!(newest.get("sortOrder"), Some("desc"));

        let oldest = PostFilters {
            sort: SortOrder::Oldest,
            ..PostFilters::default()
        }
        .criteria();
        assert_eq!(oldest.get("sortOrder"), Some("asc"));
    }

    #[test]
    fn teacher_verified_flag_is_sent_as_is_verified() {
        let filters = TeacherFilters {
            verified: Some(false),
            ..TeacherFilters::default()
        };
        assert_eq!(filters.criteria().get("isVerified"), Some("false"));
    }

    #[test]
    fn same_criteria_ignores_page() {
        let first = PostFilters::default();
        let mut second = first.clone();
        second.page = 4;
        assert!(first.same_criteria(&second));

        second.city = Some("Shanghai".to_string());
        assert!(!first.same_criteria(&second));
    }

    #[test]
    fn teacher_city_checks_both_fields() {
        let filters = TeacherFilters {
            city: Some("bei".to_string()),
            ..TeacherFilters::default()
        };
        let flat = Teacher {
            city: Some("Beijing".to_string()),
            ..Teacher::default()
        };
        let nested = Teacher {
            location: Some(Location {
                city: Some("BEIJING".to_string()),
                ..Location::default()
            }),
            ..Teacher::default()
        };
        let elsewhere = Teacher {
            city: Some("Shanghai".to_string()),
            ..Teacher::default()
        };
        assert!(filters.matches(&flat));
        assert!(filters.matches(&nested));
        assert!(!filters.matches(&elsewhere));
    }

    #[test]
    fn published_label_filters_approved_posts() {
        let filters = PostFilters {
            status: Some("published".to_string()),
            ..PostFilters::default()
        };
        let approved = Post {
            status: "approved".to_string(),
            ..Post::default()
        };
        let pending = Post {
            status: "pending".to_string(),
            ..Post::default()
        };
        assert!(filters.matches(&approved));
        assert!(!filters.matches(&pending));
    }
}
