use std::collections::BTreeMap;
use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StorageResult;

/// Ключ, под которым хранится токен администратора.
pub const TOKEN_KEY: &str = "admin_token";
/// Ключ, под которым хранится сериализованный пользователь.
pub const USER_KEY: &str = "admin_user";

/// Долговременное key-value хранилище строк.
///
/// Запись не синхронизируется между процессами: побеждает последняя.
pub trait KeyValueStore: Debug + Send + Sync {
    /// Возвращает значение по ключу.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    /// Записывает значение по ключу.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    /// Удаляет ключ. Отсутствующий ключ не считается ошибкой.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

#[derive(Debug, Default)]
/// Хранилище в памяти процесса (для тестов и одноразовых сессий).
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Создаёт пустое хранилище.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
        entries.remove(key);
        Ok(())
    }
}

#[derive(Debug)]
/// Хранилище в JSON-файле: объект `{ключ: значение}`.
///
/// Файл читается при каждом обращении, поэтому изменения другого процесса видны
/// сразу, но не защищены от гонок.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Создаёт хранилище поверх файла. Файл может ещё не существовать.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Путь к файлу хранилища.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err.into()),
                _ => Ok(()),
            };
        }

        let raw = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|err| err.into_inner());
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|err| err.into_inner());
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|err| err.into_inner());
        let mut entries = self.load()?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&entries)
    }
}
