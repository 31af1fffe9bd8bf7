//! Response cache collaborator: Redis-backed storage of serialized endpoint
//! responses, evicted by key patterns after any write.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::settings::RedisConfig;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] redis::RedisError),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Read a cached response body. Misses and backend failures both come
    /// back as `None`; a cache outage must only degrade reads.
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a response body under a key. Backend failures are logged and
    /// swallowed.
    async fn set(&self, key: &str, value: &str);

    /// Evict every key matching any of the glob patterns.
    async fn delete_by_patterns(&self, patterns: &[String]) -> Result<(), CacheError>;
}

pub struct RedisCache {
    connection: ConnectionManager,
    ttl_seconds: u64,
}

impl RedisCache {
    pub async fn connect(config: &RedisConfig) -> Result<Self, CacheError> {
        info!("Connecting to redis...");
        let client = Client::open(config.url.as_str())?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self {
            connection,
            ttl_seconds: config.cache_ttl_seconds,
        })
    }
}

#[async_trait]
impl ResponseCache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut connection = self.connection.clone();
        match connection.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(err) => {
                warn!("Cache read failed for {}: {}", key, err);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str) {
        let mut connection = self.connection.clone();
        if let Err(err) = connection
            .set_ex::<_, _, ()>(key, value, self.ttl_seconds)
            .await
        {
            warn!("Cache write failed for {}: {}", key, err);
        }
    }

    async fn delete_by_patterns(&self, patterns: &[String]) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        let mut keys: HashSet<String> = HashSet::new();
        for pattern in patterns {
            keys.extend(connection.keys::<_, Vec<String>>(pattern).await?);
        }
        if keys.is_empty() {
            return Ok(());
        }
        debug!("Evicting {} cached keys", keys.len());
        let keys: Vec<String> = keys.into_iter().collect();
        connection.del::<_, ()>(keys).await?;
        Ok(())
    }
}

/// Fire-and-forget eviction used by CRUD write paths: the data write has
/// already committed, so a failed eviction is only logged (TTL heals it).
pub async fn evict(cache: &dyn ResponseCache, patterns: &[String]) {
    if let Err(err) = cache.delete_by_patterns(patterns).await {
        warn!("Cache eviction failed: {}", err);
    }
}

/// Read-through caching of a serialized response body.
pub async fn cached<T, F>(
    cache: &dyn ResponseCache,
    key: &str,
    load: F,
) -> Result<T, crate::utils::ApiError>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
    F: std::future::Future<Output = Result<T, crate::utils::ApiError>>,
{
    if let Some(raw) = cache.get(key).await {
        if let Ok(value) = serde_json::from_str(&raw) {
            debug!("Cache hit: {}", key);
            return Ok(value);
        }
    }
    let value = load.await?;
    if let Ok(raw) = serde_json::to_string(&value) {
        cache.set(key, &raw).await;
    }
    Ok(value)
}

/// Cache key scheme and the per-entity invalidation pattern lists.
///
/// An entity's patterns cover its own subtree of keys, the list it appears
/// in, the ancestor detail keys that embed child counts, and the full tree
/// response.
pub mod keys {
    use uuid::Uuid;

    use crate::sync::diff::{EntityKind, EntityScope};

    pub fn menu_list() -> String {
        "menus:list".to_string()
    }

    pub fn menu_tree() -> String {
        "menus:tree".to_string()
    }

    pub fn menu_detail(menu_id: Uuid) -> String {
        format!("menu:{menu_id}")
    }

    pub fn submenu_list(menu_id: Uuid) -> String {
        format!("menu:{menu_id}:submenus:list")
    }

    pub fn submenu_detail(menu_id: Uuid, submenu_id: Uuid) -> String {
        format!("menu:{menu_id}:submenu:{submenu_id}")
    }

    pub fn dish_list(menu_id: Uuid, submenu_id: Uuid) -> String {
        format!("menu:{menu_id}:submenu:{submenu_id}:dishes:list")
    }

    pub fn dish_detail(menu_id: Uuid, submenu_id: Uuid, dish_id: Uuid) -> String {
        format!("menu:{menu_id}:submenu:{submenu_id}:dish:{dish_id}")
    }

    /// Stale-key patterns implied by an applied operation on an entity of
    /// the given kind within the given scope.
    pub fn patterns_for(entity: EntityKind, scope: &EntityScope) -> Vec<String> {
        match entity {
            EntityKind::Menu => menu_patterns(scope),
            EntityKind::Submenu => submenu_patterns(scope),
            EntityKind::Dish => dish_patterns(scope),
        }
    }

    pub fn menu_patterns(scope: &EntityScope) -> Vec<String> {
        let Some(menu_id) = scope.menu_id else {
            return Vec::new();
        };
        vec![
            menu_list(),
            menu_tree(),
            // Covers the detail key and every submenu/dish key beneath it.
            format!("menu:{menu_id}*"),
        ]
    }

    pub fn submenu_patterns(scope: &EntityScope) -> Vec<String> {
        let (Some(menu_id), Some(submenu_id)) = (scope.menu_id, scope.submenu_id) else {
            return Vec::new();
        };
        vec![
            menu_tree(),
            menu_detail(menu_id),
            submenu_list(menu_id),
            format!("menu:{menu_id}:submenu:{submenu_id}*"),
        ]
    }

    pub fn dish_patterns(scope: &EntityScope) -> Vec<String> {
        let (Some(menu_id), Some(submenu_id), Some(dish_id)) =
            (scope.menu_id, scope.submenu_id, scope.dish_id)
        else {
            return Vec::new();
        };
        vec![
            menu_tree(),
            menu_detail(menu_id),
            submenu_detail(menu_id, submenu_id),
            dish_list(menu_id, submenu_id),
            format!("menu:{menu_id}:submenu:{submenu_id}:dish:{dish_id}*"),
        ]
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording cache fake shared by the sync tests.

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingCache {
        /// One entry per `delete_by_patterns` call.
        pub evictions: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingCache {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn eviction_batches(&self) -> Vec<Vec<String>> {
            self.evictions.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ResponseCache for RecordingCache {
        async fn get(&self, _key: &str) -> Option<String> {
            None
        }

        async fn set(&self, _key: &str, _value: &str) {}

        async fn delete_by_patterns(&self, patterns: &[String]) -> Result<(), CacheError> {
            self.evictions.lock().unwrap().push(patterns.to_vec());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::keys;
    use crate::sync::diff::{EntityKind, EntityScope};
    use uuid::Uuid;

    #[test]
    fn menu_patterns_cover_lists_tree_and_subtree() {
        let m = Uuid::from_u128(1);
        let patterns = keys::patterns_for(EntityKind::Menu, &EntityScope::menu(m));
        assert_eq!(
            patterns,
            vec![
                "menus:list".to_string(),
                "menus:tree".to_string(),
                format!("menu:{m}*"),
            ]
        );
    }

    #[test]
    fn submenu_patterns_cover_parent_menu_summary() {
        let m = Uuid::from_u128(1);
        let s = Uuid::from_u128(2);
        let patterns = keys::patterns_for(EntityKind::Submenu, &EntityScope::submenu(m, s));
        assert!(patterns.contains(&format!("menu:{m}")));
        assert!(patterns.contains(&format!("menu:{m}:submenus:list")));
        assert!(patterns.contains(&format!("menu:{m}:submenu:{s}*")));
    }

    #[test]
    fn dish_patterns_cover_both_ancestor_summaries() {
        let m = Uuid::from_u128(1);
        let s = Uuid::from_u128(2);
        let d = Uuid::from_u128(3);
        let patterns = keys::patterns_for(EntityKind::Dish, &EntityScope::dish(m, s, d));
        assert!(patterns.contains(&format!("menu:{m}")));
        assert!(patterns.contains(&format!("menu:{m}:submenu:{s}")));
        assert!(patterns.contains(&format!("menu:{m}:submenu:{s}:dish:{d}*")));
    }

    #[test]
    fn incomplete_scope_yields_no_patterns() {
        let patterns = keys::patterns_for(EntityKind::Dish, &EntityScope::default());
        assert!(patterns.is_empty());
    }
}
