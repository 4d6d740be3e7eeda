use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::wire::{Name, QueryClass, QueryType, RRData, ResourceRecord};

/// A response cache shared between concurrently resolving requests.
pub type SharedCache = Arc<Cache>;

/// TTL-bounded cache of answer records, keyed by owner name and query type
///
/// Entries expire as a whole after the smallest TTL among their records.
/// Writers replace entries atomically behind the lock; the lock is never
/// held across an await point.
pub struct Cache {
    entries: RwLock<HashMap<(String, QueryType), Entry>>,
}

struct Entry {
    expires_at: SystemTime,
    records: Vec<ResourceRecord>,
}

impl Cache {
    pub fn new() -> Cache {
        Cache {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, name: &str, qtype: QueryType) -> Option<Vec<ResourceRecord>> {
        let entries = self.entries.read().unwrap();
        let entry = entries.get(&(name.to_owned(), qtype))?;
        if entry.expires_at <= SystemTime::now() {
            return None;
        }
        Some(entry.records.clone())
    }

    pub fn put(&self, name: &str, qtype: QueryType, records: Vec<ResourceRecord>) {
        let ttl = match records.iter().map(|record| record.ttl).min() {
            Some(ttl) => ttl,
            None => return,
        };
        let expires_at = SystemTime::now() + Duration::from_secs(u64::from(ttl));
        self.insert(name.to_owned(), qtype, records, expires_at);
    }

    fn insert(
        &self,
        name: String,
        qtype: QueryType,
        records: Vec<ResourceRecord>,
        expires_at: SystemTime,
    ) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            (name, qtype),
            Entry {
                expires_at,
                records,
            },
        );
    }

    /// Drops every expired entry.
    pub fn sweep(&self) {
        let now = SystemTime::now();
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        let dropped = before - entries.len();
        if dropped > 0 {
            debug!("swept {} expired cache entries", dropped);
        }
    }

    /// Spawns the periodic sweep task.
    pub fn start_sweeper(cache: &SharedCache, period: Duration) -> tokio::task::JoinHandle<()> {
        let cache = cache.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                cache.sweep();
            }
        })
    }

    /// Reloads a snapshot written by `save`, discarding entries that
    /// expired in the meantime. A missing file is an empty cache.
    pub fn load(&self, path: &Path) -> io::Result<()> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err),
        };
        let persisted: Vec<PersistedEntry> = serde_json::from_slice(&raw)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        let now = SystemTime::now();
        let mut loaded = 0;
        for entry in persisted {
            let expires_at = UNIX_EPOCH + Duration::from_secs(entry.expires_unix);
            if expires_at <= now {
                continue;
            }
            let qtype = match QueryType::parse(entry.qtype) {
                Ok(qtype) => qtype,
                Err(err) => {
                    warn!("skipping cache entry for {}: {}", entry.name, err);
                    continue;
                }
            };
            match entry
                .records
                .iter()
                .map(PersistedRecord::revive)
                .collect::<Result<Vec<_>, _>>()
            {
                Ok(records) => {
                    self.insert(entry.name, qtype, records, expires_at);
                    loaded += 1;
                }
                Err(err) => warn!("skipping cache entry for {}: {}", entry.name, err),
            }
        }
        debug!("loaded {} cache entries from {}", loaded, path.display());
        Ok(())
    }

    /// Writes the unexpired entries out as a JSON snapshot.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let now = SystemTime::now();
        let persisted: Vec<PersistedEntry> = {
            let entries = self.entries.read().unwrap();
            entries
                .iter()
                .filter(|(_, entry)| entry.expires_at > now)
                .map(|((name, qtype), entry)| PersistedEntry {
                    name: name.clone(),
                    qtype: *qtype as u16,
                    expires_unix: entry
                        .expires_at
                        .duration_since(UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_secs(),
                    records: entry.records.iter().map(PersistedRecord::from).collect(),
                })
                .collect()
        };
        let raw = serde_json::to_vec(&persisted)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        fs::write(path, raw)?;
        debug!("saved {} cache entries to {}", persisted.len(), path.display());
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    name: String,
    qtype: u16,
    expires_unix: u64,
    records: Vec<PersistedRecord>,
}

/// A record flattened to its textual forms for the snapshot file.
#[derive(Serialize, Deserialize)]
struct PersistedRecord {
    name: String,
    typ: u16,
    ttl: u32,
    data: String,
}

/// Error rebuilding a record from its snapshot form
#[derive(Debug, thiserror::Error)]
enum ReviveError {
    #[error("bad address text {0:?}")]
    BadAddress(String),
    #[error(transparent)]
    Wire(#[from] crate::wire::Error),
}

impl PersistedRecord {
    fn from(record: &ResourceRecord) -> PersistedRecord {
        PersistedRecord {
            name: record.name.to_string(),
            typ: record.data.typ() as u16,
            ttl: record.ttl,
            data: record.data.to_string(),
        }
    }

    fn revive(&self) -> Result<ResourceRecord, ReviveError> {
        let data = match QueryType::parse(self.typ)? {
            QueryType::A => RRData::A(
                self.data
                    .parse()
                    .map_err(|_| ReviveError::BadAddress(self.data.clone()))?,
            ),
            QueryType::AAAA => RRData::AAAA(
                self.data
                    .parse()
                    .map_err(|_| ReviveError::BadAddress(self.data.clone()))?,
            ),
            QueryType::NS => RRData::NS(Name::from_str(&self.data)?),
            QueryType::PTR => RRData::PTR(Name::from_str(&self.data)?),
        };
        Ok(ResourceRecord {
            name: Name::from_str(&self.name)?,
            cls: QueryClass::IN,
            ttl: self.ttl,
            data,
        })
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, SystemTime};

    use super::Cache;
    use crate::wire::{Name, QueryClass, QueryType, RRData, ResourceRecord};

    fn a_record(name: &str, ip: &str, ttl: u32) -> ResourceRecord {
        ResourceRecord {
            name: Name::from_str(name).unwrap(),
            cls: QueryClass::IN,
            ttl,
            data: RRData::A(ip.parse().unwrap()),
        }
    }

    #[test]
    fn get_returns_what_put_stored() {
        let cache = Cache::new();
        cache.put(
            "example.com",
            QueryType::A,
            vec![a_record("example.com", "93.184.216.34", 300)],
        );

        let records = cache.get("example.com", QueryType::A).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data.to_string(), "93.184.216.34");

        assert!(cache.get("example.com", QueryType::AAAA).is_none());
        assert!(cache.get("example.org", QueryType::A).is_none());
    }

    #[test]
    fn put_replaces_the_whole_entry() {
        let cache = Cache::new();
        cache.put(
            "example.com",
            QueryType::A,
            vec![
                a_record("example.com", "10.0.0.1", 300),
                a_record("example.com", "10.0.0.2", 300),
            ],
        );
        cache.put(
            "example.com",
            QueryType::A,
            vec![a_record("example.com", "10.0.0.3", 600)],
        );

        let records = cache.get("example.com", QueryType::A).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data.to_string(), "10.0.0.3");
        assert_eq!(cache.entries.read().unwrap().len(), 1);
    }

    #[test]
    fn expired_entries_are_not_served() {
        let cache = Cache::new();
        cache.insert(
            "example.com".to_owned(),
            QueryType::A,
            vec![a_record("example.com", "93.184.216.34", 0)],
            SystemTime::now() - Duration::from_secs(1),
        );
        assert!(cache.get("example.com", QueryType::A).is_none());
    }

    #[test]
    fn sweep_drops_only_expired_entries() {
        let cache = Cache::new();
        cache.insert(
            "old.example".to_owned(),
            QueryType::A,
            vec![a_record("old.example", "10.0.0.1", 0)],
            SystemTime::now() - Duration::from_secs(1),
        );
        cache.put(
            "fresh.example",
            QueryType::A,
            vec![a_record("fresh.example", "10.0.0.2", 300)],
        );

        cache.sweep();

        let entries = cache.entries.read().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key(&("fresh.example".to_owned(), QueryType::A)));
    }

    #[test]
    fn empty_record_sets_are_not_cached() {
        let cache = Cache::new();
        cache.put("example.com", QueryType::A, Vec::new());
        assert!(cache.entries.read().unwrap().is_empty());
    }

    #[test]
    fn snapshot_round_trip() {
        let path = std::env::temp_dir().join(format!("rdns-cache-test-{}.json", std::process::id()));

        let cache = Cache::new();
        cache.put(
            "example.com",
            QueryType::A,
            vec![a_record("example.com", "93.184.216.34", 300)],
        );
        cache.put(
            "ns.example.com",
            QueryType::NS,
            vec![ResourceRecord {
                name: Name::from_str("example.com").unwrap(),
                cls: QueryClass::IN,
                ttl: 600,
                data: RRData::NS(Name::from_str("ns.example.com").unwrap()),
            }],
        );
        cache.save(&path).unwrap();

        let reloaded = Cache::new();
        reloaded.load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let records = reloaded.get("example.com", QueryType::A).unwrap();
        assert_eq!(records[0].data.to_string(), "93.184.216.34");
        let records = reloaded.get("ns.example.com", QueryType::NS).unwrap();
        assert_eq!(records[0].data, RRData::NS(Name::from_str("ns.example.com").unwrap()));
    }
}
