//! Epigraph Storage Layer
//!
//! Implements the [`EvidenceStore`] trait on SQLite.
//!
//! # Architecture
//!
//! - One table per entity plus a `defeater_claims` link table
//! - Foreign keys with `ON DELETE CASCADE` as a backstop; referential
//!   integrity is also checked explicitly inside each write transaction
//! - Batch writes run in a single transaction
//!
//! # Examples
//!
//! ```no_run
//! use epigraph_store::SqliteStore;
//!
//! let store = SqliteStore::open(":memory:").unwrap();
//! // Store is now ready for graph operations
//! ```

#![warn(missing_docs)]

mod rows;

use epigraph_domain::traversal::{breadth_first, shortest_path};
use epigraph_domain::{
    health_score, now_millis, Claim, ClaimFilter, ClaimId, ClaimStatus, Contradiction, ContradictionFilter,
    ContradictionId, ContradictionResolution, ContradictionStatus, DefeaterFilter, DefeaterId, EdgeFilter,
    EdgeId, EvidenceEdge, EvidenceGraph, EvidenceStore, ExtendedDefeater, GraphStats, PredictionOutcome,
    SignalStrength, TraversalResult,
};
use rows::{
    claim_from_row, contradiction_from_row, edge_from_row, millis_to_sql, outcome_from_row, query_defeaters, write_claim,
    write_contradiction, write_defeater, write_edge, CLAIM_COLUMNS, CONTRADICTION_COLUMNS, DEFEATER_COLUMNS,
    EDGE_COLUMNS, OUTCOME_COLUMNS,
};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Data operation attempted before `initialize()` or after `close()`
    #[error("Store is not initialized")]
    NotInitialized,

    /// A write referenced a claim that does not exist
    #[error("Referential integrity violation: {0}")]
    ReferentialIntegrity(String),

    /// A contradiction was resolved without a resolution
    #[error("Resolution required")]
    ResolutionRequired,

    /// Update target not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON column encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// SQLite-based implementation of [`EvidenceStore`]
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own
/// `SqliteStore`, and there should be one writer per database file.
pub struct SqliteStore {
    path: PathBuf,
    conn: Option<Connection>,
}

impl SqliteStore {
    /// Create an unopened store for the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing). No file
    /// is touched until [`EvidenceStore::initialize`] runs.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            conn: None,
        }
    }

    /// Create and initialize a store
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use epigraph_store::SqliteStore;
    ///
    /// let store = SqliteStore::open("epigraph.db").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let mut store = Self::new(path);
        store.initialize()?;
        Ok(store)
    }

    /// Database path this store was created with
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn.as_ref().ok_or(StoreError::NotInitialized)
    }

    fn conn_mut(&mut self) -> Result<&mut Connection, StoreError> {
        self.conn.as_mut().ok_or(StoreError::NotInitialized)
    }

    fn query_claims(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Claim>, StoreError> {
        let mut stmt = self.conn()?.prepare(sql)?;
        let claims = stmt.query_map(params, claim_from_row)?.collect::<Result<Vec<_>, _>>()?;
        Ok(claims)
    }

    fn query_edges(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<EvidenceEdge>, StoreError> {
        let mut stmt = self.conn()?.prepare(sql)?;
        let edges = stmt.query_map(params, edge_from_row)?.collect::<Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    fn query_contradictions(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<Contradiction>, StoreError> {
        let mut stmt = self.conn()?.prepare(sql)?;
        let contradictions = stmt
            .query_map(params, contradiction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(contradictions)
    }

    fn count(&self, sql: &str) -> Result<usize, StoreError> {
        let n: i64 = self.conn()?.query_row(sql, [], |row| row.get(0))?;
        Ok(n.max(0) as usize)
    }
}

impl EvidenceStore for SqliteStore {
    type Error = StoreError;

    fn initialize(&mut self) -> Result<(), Self::Error> {
        if self.conn.is_none() {
            self.conn = Some(Connection::open(&self.path)?);
        }
        self.conn()?.execute_batch(include_str!("schema.sql"))?;
        info!(path = %self.path.display(), "Evidence store initialized");
        Ok(())
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, e)| StoreError::Database(e))?;
            info!(path = %self.path.display(), "Evidence store closed");
        }
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.conn.is_some()
    }

    fn upsert_claim(&mut self, claim: &Claim) -> Result<(), Self::Error> {
        write_claim(self.conn()?, claim)?;
        debug!(claim_id = %claim.id, status = claim.status.as_str(), "Upserted claim");
        Ok(())
    }

    fn upsert_claims(&mut self, claims: &[Claim]) -> Result<(), Self::Error> {
        let tx = self.conn_mut()?.transaction()?;
        for claim in claims {
            write_claim(&tx, claim)?;
        }
        tx.commit()?;
        debug!(count = claims.len(), "Upserted claim batch");
        Ok(())
    }

    fn get_claim(&self, id: &ClaimId) -> Result<Option<Claim>, Self::Error> {
        let sql = format!("SELECT {} FROM claims WHERE id = ?1", CLAIM_COLUMNS);
        let claim = self
            .conn()?
            .query_row(&sql, params![id.as_str()], claim_from_row)
            .optional()?;
        Ok(claim)
    }

    fn delete_claim(&mut self, id: &ClaimId) -> Result<bool, Self::Error> {
        let tx = self.conn_mut()?.transaction()?;
        let removed = tx.execute("DELETE FROM claims WHERE id = ?1", params![id.as_str()])?;
        // Defeaters whose last affected claim went with the cascade
        let orphaned = tx.execute(
            "DELETE FROM defeaters WHERE id NOT IN (SELECT defeater_id FROM defeater_claims)",
            [],
        )?;
        tx.commit()?;
        if removed > 0 {
            info!(claim_id = %id, orphaned_defeaters = orphaned, "Deleted claim");
        }
        Ok(removed > 0)
    }

    fn get_claims(&self, filter: &ClaimFilter) -> Result<Vec<Claim>, Self::Error> {
        let mut sql = format!("SELECT {} FROM claims WHERE 1=1", CLAIM_COLUMNS);
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(claim_type) = filter.claim_type {
            sql.push_str(" AND claim_type = ?");
            params.push(Box::new(claim_type.as_str()));
        }

        if let Some(subject_id) = &filter.subject_id {
            sql.push_str(" AND subject_id = ?");
            params.push(Box::new(subject_id.clone()));
        }

        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(min_strength) = filter.min_strength {
            sql.push_str(" AND overall >= ?");
            params.push(Box::new(min_strength));
        }

        sql.push_str(" ORDER BY created_at, id");

        if filter.limit.is_some() || filter.offset.is_some() {
            // SQLite needs a LIMIT before OFFSET; -1 means no limit
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(Box::new(filter.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))));
            params.push(Box::new(i64::try_from(filter.offset.unwrap_or(0)).unwrap_or(i64::MAX)));
        }

        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        self.query_claims(&sql, &param_refs)
    }

    fn update_claim_status(&mut self, id: &ClaimId, status: ClaimStatus) -> Result<(), Self::Error> {
        let changed = self.conn()?.execute(
            "UPDATE claims SET status = ?2 WHERE id = ?1",
            params![id.as_str(), status.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("claim {}", id)));
        }
        debug!(claim_id = %id, status = status.as_str(), "Updated claim status");
        Ok(())
    }

    fn update_claim_signal_strength(&mut self, id: &ClaimId, strength: &SignalStrength) -> Result<(), Self::Error> {
        let mut strength = *strength;
        strength.recompute();
        strength.validate().map_err(StoreError::InvalidData)?;

        let changed = self.conn()?.execute(
            "UPDATE claims SET retrieval = ?2, structural = ?3, semantic = ?4, test_execution = ?5,
                 recency = ?6, overall = ?7
             WHERE id = ?1",
            params![
                id.as_str(),
                strength.retrieval,
                strength.structural,
                strength.semantic,
                strength.test_execution,
                strength.recency,
                strength.overall,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("claim {}", id)));
        }
        debug!(claim_id = %id, overall = strength.overall, "Updated claim signal strength");
        Ok(())
    }

    fn upsert_edge(&mut self, edge: &EvidenceEdge) -> Result<(), Self::Error> {
        let tx = self.conn_mut()?.transaction()?;
        write_edge(&tx, edge)?;
        tx.commit()?;
        Ok(())
    }

    fn upsert_edges(&mut self, edges: &[EvidenceEdge]) -> Result<(), Self::Error> {
        let tx = self.conn_mut()?.transaction()?;
        for edge in edges {
            write_edge(&tx, edge)?;
        }
        tx.commit()?;
        debug!(count = edges.len(), "Upserted edge batch");
        Ok(())
    }

    fn get_edge(&self, id: &EdgeId) -> Result<Option<EvidenceEdge>, Self::Error> {
        let sql = format!("SELECT {} FROM edges WHERE id = ?1", EDGE_COLUMNS);
        let edge = self
            .conn()?
            .query_row(&sql, params![id.as_str()], edge_from_row)
            .optional()?;
        Ok(edge)
    }

    fn get_edges_from(&self, id: &ClaimId) -> Result<Vec<EvidenceEdge>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM edges WHERE from_claim_id = ?1 ORDER BY created_at, id",
            EDGE_COLUMNS
        );
        self.query_edges(&sql, params![id.as_str()])
    }

    fn get_edges_to(&self, id: &ClaimId) -> Result<Vec<EvidenceEdge>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM edges WHERE to_claim_id = ?1 ORDER BY created_at, id",
            EDGE_COLUMNS
        );
        self.query_edges(&sql, params![id.as_str()])
    }

    fn delete_edge(&mut self, id: &EdgeId) -> Result<bool, Self::Error> {
        let removed = self
            .conn()?
            .execute("DELETE FROM edges WHERE id = ?1", params![id.as_str()])?;
        Ok(removed > 0)
    }

    fn delete_edges_for_claim(&mut self, id: &ClaimId) -> Result<usize, Self::Error> {
        let removed = self.conn()?.execute(
            "DELETE FROM edges WHERE from_claim_id = ?1 OR to_claim_id = ?1",
            params![id.as_str()],
        )?;
        debug!(claim_id = %id, removed, "Deleted edges for claim");
        Ok(removed)
    }

    fn get_edges(&self, filter: &EdgeFilter) -> Result<Vec<EvidenceEdge>, Self::Error> {
        let mut sql = format!("SELECT {} FROM edges WHERE 1=1", EDGE_COLUMNS);
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(edge_type) = filter.edge_type {
            sql.push_str(" AND edge_type = ?");
            params.push(Box::new(edge_type.as_str()));
        }

        if let Some(min_strength) = filter.min_strength {
            sql.push_str(" AND strength >= ?");
            params.push(Box::new(min_strength));
        }

        sql.push_str(" ORDER BY created_at, id");
        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        self.query_edges(&sql, &param_refs)
    }

    fn upsert_defeater(&mut self, defeater: &ExtendedDefeater) -> Result<(), Self::Error> {
        let tx = self.conn_mut()?.transaction()?;
        write_defeater(&tx, defeater)?;
        tx.commit()?;
        debug!(defeater_id = %defeater.id, defeater_type = defeater.defeater_type.as_str(), "Upserted defeater");
        Ok(())
    }

    fn upsert_defeaters(&mut self, defeaters: &[ExtendedDefeater]) -> Result<(), Self::Error> {
        let tx = self.conn_mut()?.transaction()?;
        for defeater in defeaters {
            write_defeater(&tx, defeater)?;
        }
        tx.commit()?;
        debug!(count = defeaters.len(), "Upserted defeater batch");
        Ok(())
    }

    fn get_defeater(&self, id: &DefeaterId) -> Result<Option<ExtendedDefeater>, Self::Error> {
        let sql = format!("SELECT {} FROM defeaters WHERE id = ?1", DEFEATER_COLUMNS);
        Ok(query_defeaters(self.conn()?, &sql, params![id.as_str()])?.into_iter().next())
    }

    fn activate_defeater(&mut self, id: &DefeaterId) -> Result<bool, Self::Error> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE defeaters SET status = 'active', activated_at = ?2 WHERE id = ?1 AND status = 'pending'",
            params![id.as_str(), millis_to_sql(now_millis())?],
        )?;
        if changed == 0 {
            let exists = conn
                .query_row("SELECT 1 FROM defeaters WHERE id = ?1", params![id.as_str()], |_| Ok(()))
                .optional()?;
            if exists.is_none() {
                return Err(StoreError::NotFound(format!("defeater {}", id)));
            }
            return Ok(false);
        }
        debug!(defeater_id = %id, "Activated defeater");
        Ok(true)
    }

    fn resolve_defeater(&mut self, id: &DefeaterId) -> Result<bool, Self::Error> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE defeaters SET status = 'resolved' WHERE id = ?1 AND status != 'resolved'",
            params![id.as_str()],
        )?;
        if changed == 0 {
            let exists = conn
                .query_row("SELECT 1 FROM defeaters WHERE id = ?1", params![id.as_str()], |_| Ok(()))
                .optional()?;
            if exists.is_none() {
                return Err(StoreError::NotFound(format!("defeater {}", id)));
            }
            return Ok(false);
        }
        debug!(defeater_id = %id, "Resolved defeater");
        Ok(true)
    }

    fn get_active_defeaters(&self) -> Result<Vec<ExtendedDefeater>, Self::Error> {
        self.get_defeaters(&DefeaterFilter {
            status: Some(epigraph_domain::DefeaterStatus::Active),
            ..Default::default()
        })
    }

    fn get_defeaters_for_claim(&self, id: &ClaimId) -> Result<Vec<ExtendedDefeater>, Self::Error> {
        let columns: Vec<String> = DEFEATER_COLUMNS.split(", ").map(|c| format!("d.{}", c)).collect();
        let sql = format!(
            "SELECT {} FROM defeaters d JOIN defeater_claims dc ON dc.defeater_id = d.id
             WHERE dc.claim_id = ?1 ORDER BY d.detected_at, d.id",
            columns.join(", ")
        );
        query_defeaters(self.conn()?, &sql, params![id.as_str()])
    }

    fn get_defeaters(&self, filter: &DefeaterFilter) -> Result<Vec<ExtendedDefeater>, Self::Error> {
        let mut sql = format!("SELECT {} FROM defeaters WHERE 1=1", DEFEATER_COLUMNS);
        let mut params: Vec<&dyn ToSql> = Vec::new();
        let severity = filter.severity.map(|s| s.as_str());
        let status = filter.status.map(|s| s.as_str());
        let defeater_type = filter.defeater_type.map(|t| t.as_str());

        if let Some(severity) = &severity {
            sql.push_str(" AND severity = ?");
            params.push(severity);
        }
        if let Some(status) = &status {
            sql.push_str(" AND status = ?");
            params.push(status);
        }
        if let Some(defeater_type) = &defeater_type {
            sql.push_str(" AND defeater_type = ?");
            params.push(defeater_type);
        }

        sql.push_str(" ORDER BY detected_at, id");
        query_defeaters(self.conn()?, &sql, &params)
    }

    fn upsert_contradiction(&mut self, contradiction: &Contradiction) -> Result<(), Self::Error> {
        let tx = self.conn_mut()?.transaction()?;
        write_contradiction(&tx, contradiction)?;
        tx.commit()?;
        debug!(
            contradiction_id = %contradiction.id,
            severity = contradiction.severity.as_str(),
            "Upserted contradiction"
        );
        Ok(())
    }

    fn get_contradiction(&self, id: &ContradictionId) -> Result<Option<Contradiction>, Self::Error> {
        let sql = format!("SELECT {} FROM contradictions WHERE id = ?1", CONTRADICTION_COLUMNS);
        let contradiction = self
            .conn()?
            .query_row(&sql, params![id.as_str()], contradiction_from_row)
            .optional()?;
        Ok(contradiction)
    }

    fn resolve_contradiction(
        &mut self,
        id: &ContradictionId,
        resolution: Option<ContradictionResolution>,
    ) -> Result<(), Self::Error> {
        let resolution = resolution.ok_or(StoreError::ResolutionRequired)?;
        resolution.validate().map_err(StoreError::InvalidData)?;

        let tx = self.conn_mut()?.transaction()?;
        let sql = format!("SELECT {} FROM contradictions WHERE id = ?1", CONTRADICTION_COLUMNS);
        let mut contradiction = tx
            .query_row(&sql, params![id.as_str()], contradiction_from_row)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("contradiction {}", id)))?;

        contradiction.status = ContradictionStatus::Resolved;
        contradiction.resolution = Some(resolution);
        write_contradiction(&tx, &contradiction)?;
        tx.commit()?;
        info!(contradiction_id = %id, "Resolved contradiction");
        Ok(())
    }

    fn get_unresolved_contradictions(&self) -> Result<Vec<Contradiction>, Self::Error> {
        self.get_contradictions(&ContradictionFilter {
            status: Some(ContradictionStatus::Unresolved),
            ..Default::default()
        })
    }

    fn get_contradictions_for_claim(&self, id: &ClaimId) -> Result<Vec<Contradiction>, Self::Error> {
        let sql = format!(
            "SELECT {} FROM contradictions WHERE claim_a = ?1 OR claim_b = ?1 ORDER BY detected_at, id",
            CONTRADICTION_COLUMNS
        );
        self.query_contradictions(&sql, params![id.as_str()])
    }

    fn get_contradictions(&self, filter: &ContradictionFilter) -> Result<Vec<Contradiction>, Self::Error> {
        let mut sql = format!("SELECT {} FROM contradictions WHERE 1=1", CONTRADICTION_COLUMNS);
        let mut params: Vec<&dyn ToSql> = Vec::new();
        let severity = filter.severity.map(|s| s.as_str());
        let status = filter.status.map(|s| s.as_str());

        if let Some(severity) = &severity {
            sql.push_str(" AND severity = ?");
            params.push(severity);
        }
        if let Some(status) = &status {
            sql.push_str(" AND status = ?");
            params.push(status);
        }

        sql.push_str(" ORDER BY detected_at, id");
        self.query_contradictions(&sql, &params)
    }

    fn traverse_from(&self, start: &ClaimId, max_depth: usize) -> Result<TraversalResult, Self::Error> {
        if self.get_claim(start)?.is_none() {
            return Ok(TraversalResult::default());
        }
        let reach = breadth_first(start, max_depth, |id| self.get_edges_from(id))?;

        let mut claims = Vec::with_capacity(reach.visited.len());
        for id in &reach.visited {
            if let Some(claim) = self.get_claim(id)? {
                claims.push(claim);
            }
        }
        Ok(TraversalResult {
            claims,
            edges: reach.edges,
            depth_reached: reach.depth_reached,
        })
    }

    fn find_path(&self, from: &ClaimId, to: &ClaimId) -> Result<Vec<EvidenceEdge>, Self::Error> {
        shortest_path(from, to, |id| self.get_edges_from(id))
    }

    fn get_full_graph(&self, scope: Option<&ClaimFilter>) -> Result<EvidenceGraph, Self::Error> {
        let claims = self.get_claims(&scope.cloned().unwrap_or_default())?;
        let edges = self.get_edges(&EdgeFilter::default())?;
        let health = health_score(&self.get_graph_stats()?);
        // EvidenceGraph::new keeps only edges with both endpoints in scope
        Ok(EvidenceGraph::new(claims, edges, health, now_millis()))
    }

    fn save_full_graph(&mut self, graph: &EvidenceGraph) -> Result<(), Self::Error> {
        let tx = self.conn_mut()?.transaction()?;
        for claim in graph.claims.values() {
            write_claim(&tx, claim)?;
        }
        for edge in &graph.edges {
            write_edge(&tx, edge)?;
        }
        tx.commit()?;
        info!(
            claims = graph.claims.len(),
            edges = graph.edges.len(),
            "Saved evidence graph snapshot"
        );
        Ok(())
    }

    fn get_graph_stats(&self) -> Result<GraphStats, Self::Error> {
        let conn = self.conn()?;
        let (claim_count, mean): (i64, Option<f64>) =
            conn.query_row("SELECT COUNT(*), AVG(overall) FROM claims", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;

        let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM claims GROUP BY status")?;
        let mut stats = GraphStats {
            claim_count: claim_count.max(0) as usize,
            mean_signal_strength: mean.unwrap_or(0.0),
            edge_count: self.count("SELECT COUNT(*) FROM edges")?,
            active_defeater_count: self.count("SELECT COUNT(*) FROM defeaters WHERE status = 'active'")?,
            unresolved_contradiction_count: self
                .count("SELECT COUNT(*) FROM contradictions WHERE status = 'unresolved'")?,
            ..Default::default()
        };

        let by_status = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        for (status, n) in by_status {
            let n = n.max(0) as usize;
            match ClaimStatus::parse(&status) {
                Some(ClaimStatus::Active) => stats.active_claim_count = n,
                Some(ClaimStatus::Stale) => stats.stale_claim_count = n,
                Some(ClaimStatus::Defeated) => stats.defeated_claim_count = n,
                Some(ClaimStatus::Contradicted) => stats.contradicted_claim_count = n,
                None => return Err(StoreError::InvalidData(format!("Unknown claim status '{}'", status))),
            }
        }
        Ok(stats)
    }

    fn record_outcome(&mut self, outcome: &PredictionOutcome) -> Result<(), Self::Error> {
        if !(0.0..=1.0).contains(&outcome.predicted_confidence) {
            return Err(StoreError::InvalidData(format!(
                "Predicted confidence {} is outside [0.0, 1.0]",
                outcome.predicted_confidence
            )));
        }
        self.conn()?.execute(
            "INSERT INTO outcomes (claim_id, subject_id, predicted_confidence, outcome, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                outcome.claim_id.as_str(),
                &outcome.subject_id,
                outcome.predicted_confidence,
                outcome.outcome,
                millis_to_sql(outcome.recorded_at)?,
            ],
        )?;
        debug!(claim_id = %outcome.claim_id, outcome = outcome.outcome, "Recorded prediction outcome");
        Ok(())
    }

    fn get_outcomes(&self, subject_id: Option<&str>) -> Result<Vec<PredictionOutcome>, Self::Error> {
        let conn = self.conn()?;
        let outcomes = match subject_id {
            Some(subject) => {
                let sql = format!(
                    "SELECT {} FROM outcomes WHERE subject_id = ?1 ORDER BY recorded_at, id",
                    OUTCOME_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![subject], outcome_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!("SELECT {} FROM outcomes ORDER BY recorded_at, id", OUTCOME_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], outcome_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epigraph_domain::{ClaimSource, ClaimSubject, ClaimType, SourceKind, SubjectKind};

    fn claim(id: &str) -> Claim {
        Claim::new(
            id.into(),
            format!("{} returns a Result", id),
            ClaimType::Behavioral,
            ClaimSubject::new(SubjectKind::Function, format!("src/lib.rs:{}", id), id),
            ClaimSource::new(SourceKind::StaticAnalysis, "analyzer"),
            SignalStrength::uniform(0.7),
            1_000,
        )
    }

    #[test]
    fn test_new_store_is_not_initialized() {
        let store = SqliteStore::new(":memory:");
        assert!(!store.is_initialized());
        assert!(matches!(store.get_claim(&"a".into()), Err(StoreError::NotInitialized)));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let mut store = SqliteStore::open(":memory:").unwrap();
        store.upsert_claim(&claim("a")).unwrap();
        store.initialize().unwrap();
        assert!(store.get_claim(&"a".into()).unwrap().is_some());
    }

    #[test]
    fn test_stored_overall_matches_components() {
        let mut store = SqliteStore::open(":memory:").unwrap();
        store.upsert_claim(&claim("a")).unwrap();
        let overall: f64 = store
            .conn()
            .unwrap()
            .query_row("SELECT overall FROM claims WHERE id = 'a'", [], |row| row.get(0))
            .unwrap();
        assert!((overall - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_corrupt_enum_column_is_reported() {
        let mut store = SqliteStore::open(":memory:").unwrap();
        store.upsert_claim(&claim("a")).unwrap();
        store
            .conn()
            .unwrap()
            .execute("UPDATE claims SET status = 'bogus' WHERE id = 'a'", [])
            .unwrap();
        assert!(store.get_claim(&"a".into()).is_err());
    }

    #[test]
    fn test_timestamp_beyond_i64_is_rejected() {
        let mut store = SqliteStore::open(":memory:").unwrap();
        let mut late = claim("a");
        late.created_at = u64::MAX;
        assert!(matches!(store.upsert_claim(&late), Err(StoreError::InvalidData(_))));
        assert!(store.get_claim(&"a".into()).unwrap().is_none());

        late.created_at = i64::MAX as u64;
        store.upsert_claim(&late).unwrap();
        assert_eq!(store.get_claim(&"a".into()).unwrap().unwrap().created_at, i64::MAX as u64);
    }

    #[test]
    fn test_negative_timestamp_column_is_reported() {
        let mut store = SqliteStore::open(":memory:").unwrap();
        store.upsert_claim(&claim("a")).unwrap();
        store
            .conn()
            .unwrap()
            .execute("UPDATE claims SET created_at = -5 WHERE id = 'a'", [])
            .unwrap();
        assert!(store.get_claim(&"a".into()).is_err());
    }
}
