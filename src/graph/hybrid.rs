//! The hybrid graph backend: redb for topology, SQLite for metadata.
//!
//! One relational database is shared by every tree; a logical `file_id`
//! discriminator isolates them, and every index and query leads with it.
//! Per-file databases are rejected by design. Node and edge payloads live
//! in a redb key-value store under composite keys; a bounded LRU keeps
//! the hot working set in memory regardless of file size.

use crate::graph::backend::GraphBackend;
use crate::graph::build::{connected_components, BuiltGraph, NodeSlot};
use crate::graph::node::{
    AuxNode, EdgeKind, FamilyNode, IndividualNode, InternalId, NodeKind,
};
use crate::graph::HybridConfig;
use crate::GedcomError;
use lru::LruCache;
use parking_lot::Mutex;
use redb::{Database, ReadableTable, TableDefinition};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::debug;

const NODES_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("nodes");
const EDGES_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("edges");

/// Edge rows carry no payload; presence of the key is the edge.
const EMPTY_VALUE: &[u8] = &[];

/// Nodes are committed in batches of this many per transaction.
const PERSIST_BATCH: usize = 512;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS nodes (
    file_id      TEXT NOT NULL,
    id           INTEGER NOT NULL,
    xref         TEXT NOT NULL,
    type         TEXT NOT NULL,
    name         TEXT,
    name_lower   TEXT,
    birth_date   INTEGER,
    birth_place  TEXT,
    sex          TEXT,
    has_children INTEGER NOT NULL DEFAULT 0,
    has_spouse   INTEGER NOT NULL DEFAULT 0,
    living       INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    PRIMARY KEY (file_id, id)
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_file_xref ON nodes(file_id, xref);
CREATE INDEX IF NOT EXISTS idx_nodes_file_type_id ON nodes(file_id, type, id);
CREATE INDEX IF NOT EXISTS idx_nodes_file_name_lower ON nodes(file_id, name_lower);
CREATE INDEX IF NOT EXISTS idx_nodes_file_birth ON nodes(file_id, birth_date);
CREATE TABLE IF NOT EXISTS xref_mapping (
    file_id TEXT NOT NULL,
    xref    TEXT NOT NULL,
    node_id INTEGER NOT NULL,
    PRIMARY KEY (file_id, xref)
);
CREATE TABLE IF NOT EXISTS components (
    file_id      TEXT NOT NULL,
    component_id INTEGER NOT NULL,
    node_id      INTEGER NOT NULL,
    PRIMARY KEY (file_id, component_id, node_id)
);
CREATE INDEX IF NOT EXISTS idx_components_file_node ON components(file_id, node_id);
";

/// Serialized node payload stored in the key-value engine.
#[derive(Serialize, Deserialize)]
enum NodePayload {
    Individual(IndividualNode),
    Family(FamilyNode),
    Aux(AuxNode),
}

impl NodePayload {
    fn from_slot(slot: &NodeSlot) -> NodePayload {
        match slot {
            NodeSlot::Individual(node) => NodePayload::Individual(node.as_ref().clone()),
            NodeSlot::Family(node) => NodePayload::Family(node.as_ref().clone()),
            NodeSlot::Aux(node) => NodePayload::Aux(node.as_ref().clone()),
        }
    }

    fn into_slot(self) -> NodeSlot {
        match self {
            NodePayload::Individual(node) => NodeSlot::Individual(Arc::new(node)),
            NodePayload::Family(node) => NodeSlot::Family(Arc::new(node)),
            NodePayload::Aux(node) => NodeSlot::Aux(Arc::new(node)),
        }
    }
}

/// A fixed-size round-robin pool of SQLite connections. Each worker takes
/// a connection for the duration of one transaction; prepared statements
/// are cached per connection.
pub(crate) struct ConnectionPool {
    connections: Vec<Mutex<Connection>>,
    next: std::sync::atomic::AtomicUsize,
}

impl ConnectionPool {
    fn open(path: &std::path::Path, size: usize) -> Result<Self, GedcomError> {
        let mut connections = Vec::with_capacity(size.max(1));
        for _ in 0..size.max(1) {
            let conn = Connection::open(path)?;
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA busy_timeout=5000;",
            )?;
            connections.push(Mutex::new(conn));
        }
        Ok(Self {
            connections,
            next: std::sync::atomic::AtomicUsize::new(0),
        })
    }

    fn get(&self) -> parking_lot::MutexGuard<'_, Connection> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        self.connections[index].lock()
    }
}

pub(crate) struct HybridBackend {
    kv: Database,
    pool: ConnectionPool,
    file_id: String,
    node_cache: Mutex<LruCache<InternalId, NodeSlot>>,
    xref_cache: Mutex<LruCache<String, (NodeKind, InternalId)>>,
    next_id: AtomicU32,
}

fn node_key(file_id: &str, kind: NodeKind, id: InternalId) -> Vec<u8> {
    let mut key = Vec::with_capacity(file_id.len() + 6);
    key.extend_from_slice(file_id.as_bytes());
    key.push(0);
    key.push(kind.code());
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn edge_key(file_id: &str, from: InternalId, to: InternalId, kind: EdgeKind) -> Vec<u8> {
    let mut key = Vec::with_capacity(file_id.len() + 10);
    key.extend_from_slice(file_id.as_bytes());
    key.push(0);
    key.extend_from_slice(&from.to_be_bytes());
    key.extend_from_slice(&to.to_be_bytes());
    key.push(kind.code());
    key
}

fn cache_capacity(requested: usize) -> NonZeroUsize {
    NonZeroUsize::new(requested.max(16)).unwrap_or_else(|| NonZeroUsize::new(16).unwrap())
}

impl HybridBackend {
    /// Persists a freshly built graph and returns a backend serving it.
    /// Any prior content under the same `file_id` is replaced.
    pub(crate) fn persist(built: &BuiltGraph, config: &HybridConfig) -> Result<Self, GedcomError> {
        let backend = Self::open_stores(config, built.slots.len() as InternalId)?;
        backend.write_kv(built)?;
        backend.write_sql(built)?;
        debug!(
            file_id = %config.file_id,
            nodes = built.slots.len(),
            "hybrid graph persisted"
        );
        Ok(backend)
    }

    /// Opens a previously persisted graph under `config.file_id`.
    pub(crate) fn open(config: &HybridConfig) -> Result<Self, GedcomError> {
        let backend = Self::open_stores(config, 0)?;
        let next_id: u32 = {
            let conn = backend.pool.get();
            conn.query_row(
                "SELECT COALESCE(MAX(id) + 1, 0) FROM nodes WHERE file_id = ?1",
                params![backend.file_id],
                |row| row.get(0),
            )?
        };
        backend.next_id.store(next_id, Ordering::Release);
        Ok(backend)
    }

    fn open_stores(config: &HybridConfig, next_id: InternalId) -> Result<Self, GedcomError> {
        let kv = Database::create(&config.kv_path).map_err(GedcomError::backend)?;
        // Make sure both tables exist even before the first persist.
        {
            let txn = kv.begin_write().map_err(GedcomError::backend)?;
            txn.open_table(NODES_TABLE).map_err(GedcomError::backend)?;
            txn.open_table(EDGES_TABLE).map_err(GedcomError::backend)?;
            txn.commit().map_err(GedcomError::backend)?;
        }

        let pool = ConnectionPool::open(&config.sqlite_path, config.pool_size)?;
        pool.get().execute_batch(SCHEMA)?;

        Ok(Self {
            kv,
            pool,
            file_id: config.file_id.clone(),
            node_cache: Mutex::new(LruCache::new(cache_capacity(config.node_cache_capacity))),
            xref_cache: Mutex::new(LruCache::new(cache_capacity(config.xref_cache_capacity))),
            next_id: AtomicU32::new(next_id),
        })
    }

    fn write_kv(&self, built: &BuiltGraph) -> Result<(), GedcomError> {
        for batch in built.slots.chunks(PERSIST_BATCH) {
            let txn = self.kv.begin_write().map_err(GedcomError::backend)?;
            {
                let mut nodes = txn.open_table(NODES_TABLE).map_err(GedcomError::backend)?;
                let mut edges = txn.open_table(EDGES_TABLE).map_err(GedcomError::backend)?;
                for slot in batch {
                    let (kind, id) = match slot {
                        NodeSlot::Individual(node) => (NodeKind::Individual, node.id),
                        NodeSlot::Family(node) => (NodeKind::Family, node.id),
                        NodeSlot::Aux(node) => (node.kind, node.id),
                    };
                    let payload = bincode::serialize(&NodePayload::from_slot(slot))
                        .map_err(GedcomError::backend)?;
                    nodes
                        .insert(
                            node_key(&self.file_id, kind, id).as_slice(),
                            payload.as_slice(),
                        )
                        .map_err(GedcomError::backend)?;

                    match slot {
                        NodeSlot::Individual(node) => {
                            for &family in &node.famc {
                                edges
                                    .insert(
                                        edge_key(&self.file_id, node.id, family, EdgeKind::Famc)
                                            .as_slice(),
                                        EMPTY_VALUE,
                                    )
                                    .map_err(GedcomError::backend)?;
                            }
                            for &family in &node.fams {
                                edges
                                    .insert(
                                        edge_key(&self.file_id, node.id, family, EdgeKind::Fams)
                                            .as_slice(),
                                        EMPTY_VALUE,
                                    )
                                    .map_err(GedcomError::backend)?;
                            }
                        }
                        NodeSlot::Family(node) => {
                            if let Some(husband) = node.husband {
                                edges
                                    .insert(
                                        edge_key(&self.file_id, node.id, husband, EdgeKind::Husb)
                                            .as_slice(),
                                        EMPTY_VALUE,
                                    )
                                    .map_err(GedcomError::backend)?;
                            }
                            if let Some(wife) = node.wife {
                                edges
                                    .insert(
                                        edge_key(&self.file_id, node.id, wife, EdgeKind::Wife)
                                            .as_slice(),
                                        EMPTY_VALUE,
                                    )
                                    .map_err(GedcomError::backend)?;
                            }
                            for &child in &node.children {
                                edges
                                    .insert(
                                        edge_key(&self.file_id, node.id, child, EdgeKind::Chil)
                                            .as_slice(),
                                        EMPTY_VALUE,
                                    )
                                    .map_err(GedcomError::backend)?;
                            }
                        }
                        NodeSlot::Aux(_) => {}
                    }
                }
            }
            txn.commit().map_err(GedcomError::backend)?;
        }
        Ok(())
    }

    fn write_sql(&self, built: &BuiltGraph) -> Result<(), GedcomError> {
        let components = connected_components(built);
        let now = chrono::Utc::now().to_rfc3339();

        let mut conn = self.pool.get();
        let txn = conn.transaction()?;
        txn.execute("DELETE FROM nodes WHERE file_id = ?1", params![self.file_id])?;
        txn.execute(
            "DELETE FROM xref_mapping WHERE file_id = ?1",
            params![self.file_id],
        )?;
        txn.execute(
            "DELETE FROM components WHERE file_id = ?1",
            params![self.file_id],
        )?;

        {
            let mut insert_node = txn.prepare_cached(
                "INSERT INTO nodes (file_id, id, xref, type, name, name_lower, birth_date, \
                 birth_place, sex, has_children, has_spouse, living, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            )?;
            let mut insert_xref = txn.prepare_cached(
                "INSERT INTO xref_mapping (file_id, xref, node_id) VALUES (?1, ?2, ?3)",
            )?;
            let mut insert_component = txn.prepare_cached(
                "INSERT INTO components (file_id, component_id, node_id) VALUES (?1, ?2, ?3)",
            )?;

            for slot in &built.slots {
                match slot {
                    NodeSlot::Individual(node) => {
                        insert_node.execute(params![
                            self.file_id,
                            node.id,
                            node.xref,
                            NodeKind::Individual.as_str(),
                            node.name,
                            node.name_lower,
                            node.birth_year,
                            node.birth_place,
                            node.sex.as_str(),
                            node.has_children,
                            node.has_spouse,
                            node.living,
                            now,
                        ])?;
                        insert_xref.execute(params![self.file_id, node.xref, node.id])?;
                        if let Some(component) = components.get(&node.id) {
                            insert_component.execute(params![self.file_id, component, node.id])?;
                        }
                    }
                    NodeSlot::Family(node) => {
                        insert_node.execute(params![
                            self.file_id,
                            node.id,
                            node.xref,
                            NodeKind::Family.as_str(),
                            Option::<String>::None,
                            Option::<String>::None,
                            node.marriage_year,
                            node.marriage_place,
                            Option::<String>::None,
                            !node.children.is_empty(),
                            node.husband.is_some() && node.wife.is_some(),
                            false,
                            now,
                        ])?;
                        insert_xref.execute(params![self.file_id, node.xref, node.id])?;
                    }
                    NodeSlot::Aux(node) => {
                        insert_node.execute(params![
                            self.file_id,
                            node.id,
                            node.xref,
                            node.kind.as_str(),
                            Option::<String>::None,
                            Option::<String>::None,
                            Option::<i32>::None,
                            Option::<String>::None,
                            Option::<String>::None,
                            false,
                            false,
                            false,
                            now,
                        ])?;
                        insert_xref.execute(params![self.file_id, node.xref, node.id])?;
                    }
                }
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Fetches a node by `(kind, id)` through the cache, loading and
    /// memoizing on miss.
    fn load(&self, kind: NodeKind, id: InternalId) -> Result<Option<NodeSlot>, GedcomError> {
        if let Some(slot) = self.node_cache.lock().get(&id) {
            if slot.kind() == kind {
                return Ok(Some(slot.clone()));
            }
            return Ok(None);
        }

        let txn = self.kv.begin_read().map_err(GedcomError::backend)?;
        let table = txn.open_table(NODES_TABLE).map_err(GedcomError::backend)?;
        let key = node_key(&self.file_id, kind, id);
        let Some(guard) = table.get(key.as_slice()).map_err(GedcomError::backend)? else {
            return Ok(None);
        };
        let payload: NodePayload =
            bincode::deserialize(guard.value()).map_err(GedcomError::backend)?;
        let slot = payload.into_slot();
        self.node_cache.lock().put(id, slot.clone());
        Ok(Some(slot))
    }

    fn kind_from_str(kind: &str) -> Option<NodeKind> {
        match kind {
            "INDI" => Some(NodeKind::Individual),
            "FAM" => Some(NodeKind::Family),
            "NOTE" => Some(NodeKind::Note),
            "SOUR" => Some(NodeKind::Source),
            "REPO" => Some(NodeKind::Repository),
            "EVEN" => Some(NodeKind::Event),
            _ => None,
        }
    }

    fn ids_of_type(&self, kind: NodeKind) -> Result<Vec<InternalId>, GedcomError> {
        let conn = self.pool.get();
        let mut stmt = conn.prepare_cached(
            "SELECT id FROM nodes WHERE file_id = ?1 AND type = ?2 ORDER BY id",
        )?;
        let ids = stmt
            .query_map(params![self.file_id, kind.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<InternalId>, _>>()?;
        Ok(ids)
    }

    fn upsert_sql_node(&self, slot: &NodeSlot) -> Result<(), GedcomError> {
        let now = chrono::Utc::now().to_rfc3339();
        let conn = self.pool.get();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO nodes (file_id, id, xref, type, name, name_lower, birth_date, \
             birth_place, sex, has_children, has_spouse, living, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13) \
             ON CONFLICT(file_id, id) DO UPDATE SET \
             name = excluded.name, name_lower = excluded.name_lower, \
             birth_date = excluded.birth_date, birth_place = excluded.birth_place, \
             sex = excluded.sex, has_children = excluded.has_children, \
             has_spouse = excluded.has_spouse, living = excluded.living, \
             updated_at = excluded.updated_at",
        )?;
        match slot {
            NodeSlot::Individual(node) => {
                stmt.execute(params![
                    self.file_id,
                    node.id,
                    node.xref,
                    NodeKind::Individual.as_str(),
                    node.name,
                    node.name_lower,
                    node.birth_year,
                    node.birth_place,
                    node.sex.as_str(),
                    node.has_children,
                    node.has_spouse,
                    node.living,
                    now,
                ])?;
            }
            NodeSlot::Family(node) => {
                stmt.execute(params![
                    self.file_id,
                    node.id,
                    node.xref,
                    NodeKind::Family.as_str(),
                    Option::<String>::None,
                    Option::<String>::None,
                    node.marriage_year,
                    node.marriage_place,
                    Option::<String>::None,
                    !node.children.is_empty(),
                    node.husband.is_some() && node.wife.is_some(),
                    false,
                    now,
                ])?;
            }
            NodeSlot::Aux(node) => {
                stmt.execute(params![
                    self.file_id,
                    node.id,
                    node.xref,
                    node.kind.as_str(),
                    Option::<String>::None,
                    Option::<String>::None,
                    Option::<i32>::None,
                    Option::<String>::None,
                    Option::<String>::None,
                    false,
                    false,
                    false,
                    now,
                ])?;
            }
        }
        let mut xref_stmt = conn.prepare_cached(
            "INSERT OR REPLACE INTO xref_mapping (file_id, xref, node_id) VALUES (?1, ?2, ?3)",
        )?;
        xref_stmt.execute(params![self.file_id, slot.xref(), match slot {
            NodeSlot::Individual(node) => node.id,
            NodeSlot::Family(node) => node.id,
            NodeSlot::Aux(node) => node.id,
        }])?;
        Ok(())
    }

    fn put_kv_node(&self, slot: &NodeSlot) -> Result<(), GedcomError> {
        let (kind, id) = match slot {
            NodeSlot::Individual(node) => (NodeKind::Individual, node.id),
            NodeSlot::Family(node) => (NodeKind::Family, node.id),
            NodeSlot::Aux(node) => (node.kind, node.id),
        };
        let payload =
            bincode::serialize(&NodePayload::from_slot(slot)).map_err(GedcomError::backend)?;
        let txn = self.kv.begin_write().map_err(GedcomError::backend)?;
        {
            let mut table = txn.open_table(NODES_TABLE).map_err(GedcomError::backend)?;
            table
                .insert(node_key(&self.file_id, kind, id).as_slice(), payload.as_slice())
                .map_err(GedcomError::backend)?;
        }
        txn.commit().map_err(GedcomError::backend)?;
        Ok(())
    }
}

impl GraphBackend for HybridBackend {
    fn individual(&self, id: InternalId) -> Result<Option<Arc<IndividualNode>>, GedcomError> {
        Ok(match self.load(NodeKind::Individual, id)? {
            Some(NodeSlot::Individual(node)) => Some(node),
            _ => None,
        })
    }

    fn family(&self, id: InternalId) -> Result<Option<Arc<FamilyNode>>, GedcomError> {
        Ok(match self.load(NodeKind::Family, id)? {
            Some(NodeSlot::Family(node)) => Some(node),
            _ => None,
        })
    }

    fn resolve_xref(&self, xref: &str) -> Result<Option<(NodeKind, InternalId)>, GedcomError> {
        if let Some(entry) = self.xref_cache.lock().get(xref) {
            return Ok(Some(*entry));
        }
        let resolved: Option<(String, InternalId)> = {
            let conn = self.pool.get();
            let mut stmt = conn.prepare_cached(
                "SELECT type, id FROM nodes WHERE file_id = ?1 AND xref = ?2",
            )?;
            stmt.query_row(params![self.file_id, xref], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?
        };
        match resolved {
            Some((kind, id)) => {
                let Some(kind) = Self::kind_from_str(&kind) else {
                    return Ok(None);
                };
                self.xref_cache.lock().put(xref.to_string(), (kind, id));
                Ok(Some((kind, id)))
            }
            None => Ok(None),
        }
    }

    fn xref_of(&self, id: InternalId) -> Result<Option<String>, GedcomError> {
        let conn = self.pool.get();
        let mut stmt =
            conn.prepare_cached("SELECT xref FROM nodes WHERE file_id = ?1 AND id = ?2")?;
        stmt.query_row(params![self.file_id, id], |row| row.get(0))
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other.into()),
            })
    }

    fn individual_ids(&self) -> Result<Vec<InternalId>, GedcomError> {
        self.ids_of_type(NodeKind::Individual)
    }

    fn family_ids(&self) -> Result<Vec<InternalId>, GedcomError> {
        self.ids_of_type(NodeKind::Family)
    }

    fn next_id(&self) -> Result<InternalId, GedcomError> {
        Ok(self.next_id.load(Ordering::Acquire))
    }

    fn insert_node(&self, slot: NodeSlot) -> Result<(), GedcomError> {
        let id = match &slot {
            NodeSlot::Individual(node) => node.id,
            NodeSlot::Family(node) => node.id,
            NodeSlot::Aux(node) => node.id,
        };
        let expected = self.next_id.load(Ordering::Acquire);
        if id != expected {
            return Err(GedcomError::InvariantViolation(format!(
                "Inserted node id {id} does not match next id {expected}"
            )));
        }
        self.put_kv_node(&slot)?;
        self.upsert_sql_node(&slot)?;
        self.node_cache.lock().put(id, slot);
        self.next_id.store(expected + 1, Ordering::Release);
        Ok(())
    }

    fn replace_node(&self, slot: NodeSlot) -> Result<(), GedcomError> {
        let id = match &slot {
            NodeSlot::Individual(node) => node.id,
            NodeSlot::Family(node) => node.id,
            NodeSlot::Aux(node) => node.id,
        };
        self.put_kv_node(&slot)?;
        self.upsert_sql_node(&slot)?;
        self.node_cache.lock().put(id, slot);
        Ok(())
    }
}
