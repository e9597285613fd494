//! 客户端持久化键值存储与访客身份
//!
//! 相当于浏览器的 localStorage：值一律是 JSON 字符串。

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use super::ClientError;

/// 访客 ID
pub const VISITOR_ID_KEY: &str = "portfolio_visitor_id";
/// 当前会话开始时间（毫秒）
pub const SESSION_START_KEY: &str = "portfolio_session_start";
/// 本地回退：访客列表
pub const VISITORS_KEY: &str = "portfolio_visitors";
/// 本地回退：页面浏览列表
pub const PAGE_VIEWS_KEY: &str = "portfolio_pageviews";
/// 本地回退：会话时长列表
pub const SESSION_DURATIONS_KEY: &str = "portfolio_sessionDurations";

/// 持久化键值存储
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    fn remove(&self, key: &str) -> Result<(), ClientError>;
}

/// 读取访客 ID，不存在时生成 UUID v4 并写回
///
/// 存储不可用（读或写失败）按不存在处理：每次调用都会得到新的 ID，从不报错。
pub fn get_or_create_visitor_id(store: &dyn KeyValueStore) -> String {
    match store.get(VISITOR_ID_KEY) {
        Ok(Some(id)) if !id.trim().is_empty() => return id,
        Ok(_) => {}
        Err(e) => warn!("Visitor id read failed, generating a new one: {}", e),
    }

    let id = Uuid::new_v4().to_string();
    if let Err(e) = store.set(VISITOR_ID_KEY, &id) {
        warn!("Visitor id could not be persisted: {}", e);
    } else {
        debug!("New visitor id: {}", id);
    }
    id
}

// ============ MemoryStore ============

/// 内存存储；`unavailable()` 模拟被禁用的 localStorage
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            unavailable: true,
        }
    }

    fn check(&self) -> Result<(), ClientError> {
        if self.unavailable {
            Err(ClientError::Storage("storage is unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        self.check()?;
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.check()?;
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.check()?;
        self.values.write().remove(key);
        Ok(())
    }
}

// ============ JsonFileStore ============

/// 单个 JSON 文件（对象，键 → 字符串值）
///
/// 每次操作都完整读写文件，进程内用互斥锁串行化。
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, ClientError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                ClientError::Storage(format!(
                    "corrupt store {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(values)?;
        // 写临时文件后 rename
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let _guard = self.lock.lock();
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());
        self.save(&values)
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let _guard = self.lock.lock();
        let mut values = self.load()?;
        if values.remove(key).is_some() {
            self.save(&values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_visitor_id_is_stable() {
        let store = MemoryStore::new();
        let first = get_or_create_visitor_id(&store);
        let second = get_or_create_visitor_id(&store);
        assert_eq!(first, second);
        assert!(Uuid::parse_str(&first).is_ok());
    }

    #[test]
    fn test_unavailable_store_yields_fresh_ids() {
        let store = MemoryStore::unavailable();
        let first = get_or_create_visitor_id(&store);
        let second = get_or_create_visitor_id(&store);
        assert_ne!(first, second);
    }

    #[test]
    fn test_json_file_store_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = JsonFileStore::new(&path);
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.remove("a").unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.get("a").unwrap(), None);
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_json_file_store_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(store.get("x").is_err());
        // 损坏时仍能拿到（临时）访客 ID
        assert!(!get_or_create_visitor_id(&store).is_empty());
    }
}
