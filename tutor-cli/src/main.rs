use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use tutor_client::stores::Metric;
use tutor_client::{
    AccountStatus, AdminConsole, ApiResponse, Credentials, FileStorage, Pagination, Period,
    PostStatus, Registration, Route, SortOrder, UserRole,
};

mod logging;
mod settings;

use logging::init_logging;
use settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "tutor-cli", version, about = "CLI консоли администратора площадки репетиторов")]
struct Cli {
    /// Базовый URL API вместе с префиксом `/api`.
    #[arg(long, global = true)]
    server: Option<String>,

    /// Файл, в котором хранится сессия администратора.
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Вход администратора.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Выход: сессия удаляется.
    Logout,
    /// Регистрация администратора.
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        email: Option<String>,
    },
    /// Текущий администратор.
    Whoami,
    /// Пользователи.
    #[command(subcommand)]
    Users(UsersCommand),
    /// Родители.
    #[command(subcommand)]
    Parents(ParentsCommand),
    /// Преподаватели.
    #[command(subcommand)]
    Teachers(TeachersCommand),
    /// Посты.
    #[command(subcommand)]
    Posts(PostsCommand),
    /// Статистика за период.
    Stats {
        #[arg(long, default_value_t = Period::Month)]
        period: Period,
        /// Начало диапазона, `YYYY-MM-DD`.
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Конец диапазона, `YYYY-MM-DD`.
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Один показатель: users, tutors, posts или matches.
        #[arg(long, value_parser = parse_metric)]
        metric: Option<Metric>,
    },
    /// Проверка маршрута гвардом.
    Navigate {
        #[arg(long)]
        path: String,
    },
}

#[derive(Debug, Args)]
struct PageArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    search: Option<String>,
}

#[derive(Debug, Subcommand)]
enum UsersCommand {
    /// Страница пользователей.
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Пользователь по id.
    Get {
        #[arg(long)]
        id: String,
    },
    /// Смена статуса.
    Status {
        #[arg(long)]
        id: String,
        #[arg(long)]
        value: AccountStatus,
    },
    /// Смена роли.
    Role {
        #[arg(long)]
        id: String,
        #[arg(long)]
        value: UserRole,
    },
    /// Удаление.
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Debug, Subcommand)]
enum ParentsCommand {
    /// Страница родителей.
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        city: Option<String>,
    },
    /// Родитель по id.
    Get {
        #[arg(long)]
        id: String,
    },
    /// Родители из города.
    City {
        #[arg(long)]
        name: String,
    },
    /// Смена статуса.
    Status {
        #[arg(long)]
        id: String,
        #[arg(long)]
        value: AccountStatus,
    },
    /// Серверная статистика родителей.
    Stats,
}

#[derive(Debug, Subcommand)]
enum TeachersCommand {
    /// Страница преподавателей.
    List {
        #[command(flatten)]
        page: PageArgs,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        verified: Option<bool>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long, default_value_t = SortOrder::Newest)]
        sort: SortOrder,
    },
    /// Преподаватель по `tutorId` или `_id`.
    Get {
        #[arg(long)]
        id: String,
    },
    /// Преподаватели из города.
    City {
        #[arg(long)]
        name: String,
    },
    /// Подтверждение документов (`--revoke` снимает проверку).
    Verify {
        #[arg(long)]
        id: String,
        #[arg(long)]
        revoke: bool,
        #[arg(long)]
        note: Option<String>,
    },
    /// Смена статуса с комментарием.
    Status {
        #[arg(long)]
        id: String,
        #[arg(long)]
        value: AccountStatus,
        #[arg(long)]
        note: Option<String>,
    },
    /// Счётчики по загруженному списку.
    Stats,
}

#[derive(Debug, Subcommand)]
enum PostsCommand {
    /// Страница постов.
    List {
        #[command(flatten)]
        page: PageArgs,
        /// `pending`, `published` или `rejected`.
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long, default_value_t = SortOrder::Newest)]
        sort: SortOrder,
    },
    /// Пост по `requestId`.
    Get {
        #[arg(long)]
        id: String,
    },
    /// Посты из города.
    City {
        #[arg(long)]
        name: String,
    },
    /// Модерация.
    Review {
        #[arg(long)]
        id: String,
        #[arg(long)]
        status: PostStatus,
        #[arg(long)]
        note: Option<String>,
    },
    /// Удаление.
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Счётчики по загруженному списку.
    Stats,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Ошибка: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let settings = Settings::from_env()?.with_overrides(cli.server, cli.session_file);

    init_logging(&settings.log_level)?;
    debug!(
        api_url = %settings.api_url,
        session_file = %settings.session_file.display(),
        "settings loaded"
    );

    let storage = Arc::new(FileStorage::new(settings.session_file.clone()));
    let console = AdminConsole::new(settings.client_config(), storage)
        .context("не удалось настроить клиент API")?;

    match cli.command {
        Command::Login { username, password } => {
            let user = expect_data(
                &console,
                console.auth().login(&Credentials::new(username, password)).await,
            )?;
            print_json(&json!({ "message": "Вход выполнен", "user": user }))?;
        }
        Command::Logout => {
            console.auth().logout();
            println!("Сессия удалена");
        }
        Command::Register {
            username,
            password,
            email,
        } => {
            let registration = Registration {
                username,
                password,
                email,
            };
            let response = console.auth().register(&registration).await;
            let message = response.message().map(str::to_string);
            let data = expect_data(&console, response)?;
            print_json(&json!({ "message": message, "data": data }))?;
        }
        Command::Whoami => {
            let auth = console.auth();
            print_json(&json!({
                "loggedIn": auth.is_logged_in(),
                "username": auth.username(),
                "role": auth.role(),
                "customId": auth.custom_id(),
            }))?;
        }
        Command::Users(command) => run_users(&console, command).await?,
        Command::Parents(command) => run_parents(&console, command).await?,
        Command::Teachers(command) => run_teachers(&console, command).await?,
        Command::Posts(command) => run_posts(&console, command).await?,
        Command::Stats {
            period,
            from,
            to,
            metric,
        } => {
            let store = console.statistics();
            store.set_period(period);
            if let Some((start, end)) = stats_range(period, from, to, Utc::now().date_naive()) {
                store.set_range(start, end).map_err(|message| anyhow!(message))?;
            }
            match metric {
                Some(metric) => {
                    let snapshot = expect_data(&console, store.fetch(metric).await)?;
                    print_json(&snapshot)?;
                }
                None => {
                    let state = expect_data(&console, store.fetch_all().await)?;
                    print_json(&json!({
                        "state": state,
                        "users": store.user_statistics(),
                        "matches": store.match_statistics(),
                    }))?;
                }
            }
        }
        Command::Navigate { path } => {
            let route = console
                .navigate(&path)
                .ok_or_else(|| anyhow!("неизвестный маршрут: {path}"))?;
            println!("{route}");
        }
    }

    Ok(())
}

async fn run_users(console: &AdminConsole, command: UsersCommand) -> Result<()> {
    let store = console.users();
    match command {
        UsersCommand::List { page, role, status } => {
            store.update_filters(|filters| {
                filters.role = role;
                filters.status = status;
                filters.search = page.search;
                filters.limit = page.limit.unwrap_or(filters.limit);
            });
            store.change_page(page.page);
            expect_data(console, store.fetch().await)?;
            print_page(&store.paginated_items(), store.snapshot().pagination)
        }
        UsersCommand::Get { id } => print_json(&expect_data(console, store.get(&id).await)?),
        UsersCommand::Status { id, value } => {
            print_ack(console, store.update_status(&id, value).await)
        }
        UsersCommand::Role { id, value } => print_ack(console, store.update_role(&id, value).await),
        UsersCommand::Delete { id } => print_ack(console, store.delete(&id).await),
    }
}

async fn run_parents(console: &AdminConsole, command: ParentsCommand) -> Result<()> {
    let store = console.parents();
    match command {
        ParentsCommand::List { page, status, city } => {
            store.update_filters(|filters| {
                filters.status = status;
                filters.city = city;
                filters.search = page.search;
                filters.limit = page.limit.unwrap_or(filters.limit);
            });
            store.change_page(page.page);
            expect_data(console, store.fetch().await)?;
            print_page(&store.paginated_items(), store.snapshot().pagination)
        }
        ParentsCommand::Get { id } => print_json(&expect_data(console, store.get(&id).await)?),
        ParentsCommand::City { name } => {
            let page = expect_data(console, store.by_city(&name).await)?;
            print_page(&page.items, page.pagination)
        }
        ParentsCommand::Status { id, value } => {
            print_ack(console, store.update_status(&id, value).await)
        }
        ParentsCommand::Stats => {
            print_json(&expect_data(console, store.fetch_statistics().await)?)
        }
    }
}

async fn run_teachers(console: &AdminConsole, command: TeachersCommand) -> Result<()> {
    let store = console.teachers();
    match command {
        TeachersCommand::List {
            page,
            status,
            verified,
            city,
            sort,
        } => {
            store.update_filters(|filters| {
                filters.status = status;
                filters.verified = verified;
                filters.city = city;
                filters.sort = sort;
                filters.search = page.search;
                filters.limit = page.limit.unwrap_or(filters.limit);
            });
            store.change_page(page.page);
            expect_data(console, store.fetch().await)?;
            print_page(&store.paginated_items(), store.snapshot().pagination)
        }
        TeachersCommand::Get { id } => {
            print_json(&expect_data(console, store.get_by_id(&id).await)?)
        }
        TeachersCommand::City { name } => {
            let page = expect_data(console, store.by_city(&name).await)?;
            print_page(&page.items, page.pagination)
        }
        TeachersCommand::Verify { id, revoke, note } => {
            print_ack(console, store.verify(&id, !revoke, note.as_deref()).await)
        }
        TeachersCommand::Status { id, value, note } => {
            print_ack(console, store.update_status(&id, value, note.as_deref()).await)
        }
        TeachersCommand::Stats => {
            expect_data(console, store.fetch().await)?;
            print_json(&store.statistics())
        }
    }
}

async fn run_posts(console: &AdminConsole, command: PostsCommand) -> Result<()> {
    let store = console.posts();
    match command {
        PostsCommand::List {
            page,
            status,
            city,
            sort,
        } => {
            store.update_filters(|filters| {
                filters.status = status;
                filters.city = city;
                filters.sort = sort;
                filters.search = page.search;
                filters.limit = page.limit.unwrap_or(filters.limit);
            });
            store.change_page(page.page);
            expect_data(console, store.fetch().await)?;
            print_page(&store.paginated_items(), store.snapshot().pagination)
        }
        PostsCommand::Get { id } => print_json(&expect_data(console, store.get(&id).await)?),
        PostsCommand::City { name } => {
            let page = expect_data(console, store.by_city(&name).await)?;
            print_page(&page.items, page.pagination)
        }
        PostsCommand::Review { id, status, note } => {
            print_ack(console, store.review(&id, status, note.as_deref()).await)
        }
        PostsCommand::Delete { id } => print_ack(console, store.delete(&id).await),
        PostsCommand::Stats => {
            expect_data(console, store.fetch().await)?;
            print_json(&store.statistics())
        }
    }
}

/// Диапазон статистики из флагов. Без флагов диапазон выводится из периода.
fn stats_range(
    period: Period,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<(NaiveDate, NaiveDate)> {
    match (from, to) {
        (None, None) => None,
        (Some(start), end) => Some((start, end.unwrap_or(today))),
        (None, Some(end)) => Some((period.date_range(end).0, end)),
    }
}

fn parse_metric(raw: &str) -> Result<Metric, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "users" => Ok(Metric::Users),
        "tutors" | "teachers" => Ok(Metric::Tutors),
        "posts" => Ok(Metric::Posts),
        "matches" => Ok(Metric::Matches),
        other => Err(format!("unknown metric '{other}'")),
    }
}

fn expect_data<T>(console: &AdminConsole, response: ApiResponse<T>) -> Result<T> {
    match response {
        ApiResponse::Success { data, .. } => Ok(data),
        ApiResponse::Error { message } => {
            if console.navigator().target() == Some(Route::Login) {
                return Err(anyhow!(
                    "{message}; требуется авторизация: выполните `tutor-cli login ...`"
                ));
            }
            Err(anyhow!(message))
        }
    }
}

fn print_ack(console: &AdminConsole, response: ApiResponse<serde_json::Value>) -> Result<()> {
    let message = response.message().unwrap_or("ok").to_string();
    expect_data(console, response)?;
    println!("{message}");
    Ok(())
}

fn print_page<T: Serialize>(items: &[T], pagination: Pagination) -> Result<()> {
    print_json(&json!({ "items": items, "pagination": pagination }))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("не удалось сериализовать ответ")?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        raw.parse().expect("valid date")
    }

    #[test]
    fn stats_range_is_absent_without_flags() {
        assert_eq!(stats_range(Period::Week, None, None, date("2024-05-10")), None);
    }

    #[test]
    fn stats_range_end_defaults_to_today() {
        let range = stats_range(Period::Month, Some(date("2024-05-01")), None, date("2024-05-10"));
        assert_eq!(range, Some((date("2024-05-01"), date("2024-05-10"))));
    }

    #[test]
    fn stats_range_start_derives_from_period() {
        let range = stats_range(Period::Week, None, Some(date("2024-05-10")), date("2024-06-01"));
        assert_eq!(range, Some((date("2024-05-03"), date("2024-05-10"))));
    }

    #[test]
    fn metric_parser_accepts_teacher_alias() {
        assert_eq!(parse_metric("Teachers"), Ok(Metric::Tutors));
        assert!(parse_metric("revenue").is_err());
    }

    #[test]
    fn post_review_parses_status() {
        let cli = Cli::try_parse_from([
            "tutor-cli", "posts", "review", "--id", "REQ_1", "--status", "approved",
        ])
        .expect("valid args");
        match cli.command {
            Command::Posts(PostsCommand::Review { id, status, note }) => {
                assert_eq!(id, "REQ_1");
                assert_eq!(status, PostStatus::Approved);
                assert!(note.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tutor-cli", "whoami", "--server", "localhost:3000/api", "--session-file", "s.json",
        ])
        .expect("valid args");
        assert_eq!(cli.server.as_deref(), Some("localhost:3000/api"));
        assert_eq!(cli.session_file, Some(PathBuf::from("s.json")));
    }

    #[test]
    fn unknown_account_status_is_rejected() {
        let parsed = Cli::try_parse_from([
            "tutor-cli", "users", "status", "--id", "u1", "--value", "banned",
        ]);
        assert!(parsed.is_err());
    }
}
