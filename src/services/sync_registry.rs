use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// 同步任务的键：(小写地址, chain_id)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyncKey {
    pub address: String,
    pub chain_id: u64,
}

impl SyncKey {
    pub fn new(address: &str, chain_id: u64) -> Self {
        Self {
            address: address.to_lowercase(),
            chain_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SyncStatus {
    /// 已登记，等待获取锁
    Pending,
    Running,
    Done { synced: usize },
    Failed { error: String },
}

impl SyncStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SyncStatus::Pending | SyncStatus::Running)
    }
}

/// 最多保留多少个已结束的同步状态
pub const DEFAULT_FINISHED_CAPACITY: usize = 1024;

#[derive(Default)]
struct Entry {
    status: Option<SyncStatus>,
    lock: Arc<Mutex<()>>,
    /// 结束顺序，越大越新；进行中为 None
    finished_seq: Option<u64>,
}

impl Entry {
    /// 已结束且没有任何人持有或等待锁
    fn is_idle(&self) -> bool {
        !self.status.as_ref().is_some_and(SyncStatus::is_active)
            && Arc::strong_count(&self.lock) == 1
    }
}

#[derive(Default)]
struct Entries {
    map: HashMap<SyncKey, Entry>,
    next_seq: u64,
}

/// 同步任务登记表
///
/// 每个键一把锁，同一时刻最多一个同步在跑；状态可查询。
/// 已结束的状态只保留最近 `finished_capacity` 个，更早的连同锁一起移除。
pub struct SyncRegistry {
    entries: Mutex<Entries>,
    finished_capacity: usize,
}

impl Default for SyncRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FINISHED_CAPACITY)
    }
}

impl SyncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(finished_capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::default()),
            finished_capacity,
        }
    }

    /// 该键的执行锁，持有期间其它同步等待
    pub async fn lock_for(&self, key: &SyncKey) -> Arc<Mutex<()>> {
        self.entries
            .lock()
            .await
            .map
            .entry(key.clone())
            .or_default()
            .lock
            .clone()
    }

    /// 没有进行中的同步时标记为 Pending 并返回 true；已有则返回 false
    pub async fn try_schedule(&self, key: &SyncKey) -> bool {
        let mut entries = self.entries.lock().await;
        let entry = entries.map.entry(key.clone()).or_default();
        if entry.status.as_ref().is_some_and(SyncStatus::is_active) {
            return false;
        }
        entry.status = Some(SyncStatus::Pending);
        entry.finished_seq = None;
        true
    }

    pub async fn set_status(&self, key: &SyncKey, status: SyncStatus) {
        tracing::debug!(
            address = key.address.as_str(),
            chain_id = key.chain_id,
            status = ?status,
            "sync status changed"
        );
        let mut entries = self.entries.lock().await;
        let finished = !status.is_active();
        let seq = entries.next_seq;
        let entry = entries.map.entry(key.clone()).or_default();
        entry.status = Some(status);
        if finished {
            entry.finished_seq = Some(seq);
            entries.next_seq += 1;
            self.evict(&mut entries);
        } else {
            entry.finished_seq = None;
        }
    }

    pub async fn status(&self, key: &SyncKey) -> Option<SyncStatus> {
        self.entries
            .lock()
            .await
            .map
            .get(key)
            .and_then(|e| e.status.clone())
    }

    /// 空闲条目超出容量时，从最早结束的开始移除
    fn evict(&self, entries: &mut Entries) {
        let mut idle: Vec<(u64, SyncKey)> = entries
            .map
            .iter()
            .filter(|(_, e)| e.is_idle())
            .map(|(k, e)| (e.finished_seq.unwrap_or_default(), k.clone()))
            .collect();
        if idle.len() <= self.finished_capacity {
            return;
        }
        idle.sort_unstable_by_key(|(seq, _)| *seq);
        let excess = idle.len() - self.finished_capacity;
        for (_, key) in idle.into_iter().take(excess) {
            entries.map.remove(&key);
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.map.len()
    }
}
