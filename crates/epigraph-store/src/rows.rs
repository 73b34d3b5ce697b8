//! Row codecs: domain values to SQLite rows and back
//!
//! Enum columns are stored as their `as_str()` names. Unknown names surface as
//! `FromSqlConversionFailure` so a corrupted row fails loudly instead of being
//! silently coerced.

use crate::StoreError;
use epigraph_domain::{
    Claim, ClaimId, ClaimSource, ClaimStatus, ClaimSubject, ClaimType, Contradiction,
    ContradictionResolution, ContradictionSeverity, ContradictionStatus, ContradictionType,
    DefeaterId, DefeaterSeverity, DefeaterStatus, DefeaterType, EdgeType, EvidenceEdge,
    ExtendedDefeater, PredictionOutcome, Remediation, SignalStrength, SourceKind, SubjectKind,
    SubjectLocation,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;

pub(crate) const CLAIM_COLUMNS: &str = "id, proposition, claim_type, subject_kind, subject_id, subject_name, \
     subject_file, subject_start_line, subject_end_line, source_kind, source_id, source_version, status, \
     retrieval, structural, semantic, test_execution, recency, overall, created_at";

pub(crate) const EDGE_COLUMNS: &str = "id, from_claim_id, to_claim_id, edge_type, strength, created_at, metadata";

pub(crate) const DEFEATER_COLUMNS: &str = "id, defeater_type, description, severity, confidence_reduction, \
     auto_resolvable, resolution_action, status, activated_at, evidence, detected_at";

pub(crate) const CONTRADICTION_COLUMNS: &str =
    "id, claim_a, claim_b, contradiction_type, explanation, severity, status, resolution, detected_at";

pub(crate) const OUTCOME_COLUMNS: &str = "claim_id, subject_id, predicted_confidence, outcome, recorded_at";

/// Parse an enum column, reporting the column on failure
fn enum_column<T>(row: &Row, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(StoreError::InvalidData(format!("Unknown value '{}'", raw))),
        )
    })
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Timestamp column to ms since epoch; negative values are corrupt
fn millis_from_sql(idx: usize, raw: i64) -> rusqlite::Result<u64> {
    u64::try_from(raw).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            Box::new(StoreError::InvalidData(format!("Negative timestamp {}", raw))),
        )
    })
}

fn millis(row: &Row, idx: usize) -> rusqlite::Result<u64> {
    millis_from_sql(idx, row.get(idx)?)
}

/// ms since epoch to the signed column type SQLite stores
pub(crate) fn millis_to_sql(millis: u64) -> Result<i64, StoreError> {
    i64::try_from(millis).map_err(|_| StoreError::InvalidData(format!("Timestamp {} exceeds i64::MAX", millis)))
}

// Claims

pub(crate) fn claim_from_row(row: &Row) -> rusqlite::Result<Claim> {
    let file: Option<String> = row.get(6)?;
    let location = file.map(|file| -> rusqlite::Result<SubjectLocation> {
        Ok(SubjectLocation {
            file,
            start_line: row.get(7)?,
            end_line: row.get(8)?,
        })
    });

    Ok(Claim {
        id: ClaimId::from(row.get::<_, String>(0)?),
        proposition: row.get(1)?,
        claim_type: enum_column(row, 2, ClaimType::parse)?,
        subject: ClaimSubject {
            kind: enum_column(row, 3, SubjectKind::parse)?,
            id: row.get(4)?,
            name: row.get(5)?,
            location: location.transpose()?,
        },
        source: ClaimSource {
            kind: enum_column(row, 9, SourceKind::parse)?,
            id: row.get(10)?,
            version: row.get(11)?,
        },
        status: enum_column(row, 12, ClaimStatus::parse)?,
        // overall is derived; the stored copy only serves the index
        signal_strength: SignalStrength::new(row.get(13)?, row.get(14)?, row.get(15)?, row.get(16)?, row.get(17)?),
        created_at: millis(row, 19)?,
    })
}

pub(crate) fn write_claim(conn: &Connection, claim: &Claim) -> Result<(), StoreError> {
    claim.validate().map_err(StoreError::InvalidData)?;
    let location = claim.subject.location.as_ref();
    let s = &claim.signal_strength;

    conn.execute(
        "INSERT INTO claims (id, proposition, claim_type, subject_kind, subject_id, subject_name,
             subject_file, subject_start_line, subject_end_line, source_kind, source_id, source_version, status,
             retrieval, structural, semantic, test_execution, recency, overall, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
         ON CONFLICT(id) DO UPDATE SET
             proposition = excluded.proposition, claim_type = excluded.claim_type,
             subject_kind = excluded.subject_kind, subject_id = excluded.subject_id,
             subject_name = excluded.subject_name, subject_file = excluded.subject_file,
             subject_start_line = excluded.subject_start_line, subject_end_line = excluded.subject_end_line,
             source_kind = excluded.source_kind, source_id = excluded.source_id,
             source_version = excluded.source_version, status = excluded.status,
             retrieval = excluded.retrieval, structural = excluded.structural, semantic = excluded.semantic,
             test_execution = excluded.test_execution, recency = excluded.recency, overall = excluded.overall,
             created_at = excluded.created_at",
        params![
            claim.id.as_str(),
            &claim.proposition,
            claim.claim_type.as_str(),
            claim.subject.kind.as_str(),
            &claim.subject.id,
            &claim.subject.name,
            location.map(|l| l.file.as_str()),
            location.and_then(|l| l.start_line),
            location.and_then(|l| l.end_line),
            claim.source.kind.as_str(),
            &claim.source.id,
            claim.source.version.as_deref(),
            claim.status.as_str(),
            s.retrieval,
            s.structural,
            s.semantic,
            s.test_execution,
            s.recency,
            s.overall,
            millis_to_sql(claim.created_at)?,
        ],
    )?;
    Ok(())
}

pub(crate) fn claim_exists(conn: &Connection, id: &ClaimId) -> Result<bool, StoreError> {
    let found = conn
        .query_row("SELECT 1 FROM claims WHERE id = ?1", params![id.as_str()], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Fail with `ReferentialIntegrity` unless the claim exists
pub(crate) fn require_claim(conn: &Connection, id: &ClaimId, referrer: &str) -> Result<(), StoreError> {
    if claim_exists(conn, id)? {
        Ok(())
    } else {
        Err(StoreError::ReferentialIntegrity(format!(
            "{} references missing claim {}",
            referrer, id
        )))
    }
}

// Edges

pub(crate) fn edge_from_row(row: &Row) -> rusqlite::Result<EvidenceEdge> {
    let metadata: BTreeMap<String, String> = json_column(row, 6)?;
    Ok(EvidenceEdge {
        id: row.get::<_, String>(0)?.into(),
        from_claim_id: row.get::<_, String>(1)?.into(),
        to_claim_id: row.get::<_, String>(2)?.into(),
        edge_type: enum_column(row, 3, EdgeType::parse)?,
        strength: row.get(4)?,
        created_at: millis(row, 5)?,
        metadata,
    })
}

pub(crate) fn write_edge(conn: &Connection, edge: &EvidenceEdge) -> Result<(), StoreError> {
    edge.validate().map_err(StoreError::InvalidData)?;
    let referrer = format!("Edge {}", edge.id);
    require_claim(conn, &edge.from_claim_id, &referrer)?;
    require_claim(conn, &edge.to_claim_id, &referrer)?;

    conn.execute(
        "INSERT INTO edges (id, from_claim_id, to_claim_id, edge_type, strength, created_at, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
             from_claim_id = excluded.from_claim_id, to_claim_id = excluded.to_claim_id,
             edge_type = excluded.edge_type, strength = excluded.strength,
             created_at = excluded.created_at, metadata = excluded.metadata",
        params![
            edge.id.as_str(),
            edge.from_claim_id.as_str(),
            edge.to_claim_id.as_str(),
            edge.edge_type.as_str(),
            edge.strength,
            millis_to_sql(edge.created_at)?,
            serde_json::to_string(&edge.metadata)?,
        ],
    )?;
    Ok(())
}

// Defeaters

/// Defeater row without its affected claims; see [`load_affected`]
pub(crate) fn defeater_from_row(row: &Row) -> rusqlite::Result<ExtendedDefeater> {
    let action: Option<String> = row.get(6)?;
    let resolution_action = match action {
        Some(_) => Some(enum_column(row, 6, Remediation::parse)?),
        None => None,
    };
    Ok(ExtendedDefeater {
        id: DefeaterId::from(row.get::<_, String>(0)?),
        defeater_type: enum_column(row, 1, DefeaterType::parse)?,
        description: row.get(2)?,
        severity: enum_column(row, 3, DefeaterSeverity::parse)?,
        affected_claim_ids: Vec::new(),
        confidence_reduction: row.get(4)?,
        auto_resolvable: row.get(5)?,
        resolution_action,
        status: enum_column(row, 7, DefeaterStatus::parse)?,
        activated_at: row
            .get::<_, Option<i64>>(8)?
            .map(|t| millis_from_sql(8, t))
            .transpose()?,
        evidence: row.get(9)?,
        detected_at: millis(row, 10)?,
    })
}

pub(crate) fn load_affected(conn: &Connection, defeater: &mut ExtendedDefeater) -> Result<(), StoreError> {
    let mut stmt =
        conn.prepare_cached("SELECT claim_id FROM defeater_claims WHERE defeater_id = ?1 ORDER BY position")?;
    defeater.affected_claim_ids = stmt
        .query_map(params![defeater.id.as_str()], |row| row.get::<_, String>(0))?
        .map(|r| r.map(ClaimId::from))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(())
}

/// Run a defeater query and attach affected claims to every row
pub(crate) fn query_defeaters(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<ExtendedDefeater>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let mut defeaters = stmt
        .query_map(params, defeater_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for defeater in &mut defeaters {
        load_affected(conn, defeater)?;
    }
    Ok(defeaters)
}

pub(crate) fn write_defeater(conn: &Connection, defeater: &ExtendedDefeater) -> Result<(), StoreError> {
    defeater.validate().map_err(StoreError::InvalidData)?;
    let referrer = format!("Defeater {}", defeater.id);
    for claim_id in &defeater.affected_claim_ids {
        require_claim(conn, claim_id, &referrer)?;
    }

    conn.execute(
        "INSERT INTO defeaters (id, defeater_type, description, severity, confidence_reduction,
             auto_resolvable, resolution_action, status, activated_at, evidence, detected_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(id) DO UPDATE SET
             defeater_type = excluded.defeater_type, description = excluded.description,
             severity = excluded.severity, confidence_reduction = excluded.confidence_reduction,
             auto_resolvable = excluded.auto_resolvable, resolution_action = excluded.resolution_action,
             status = excluded.status, activated_at = excluded.activated_at,
             evidence = excluded.evidence, detected_at = excluded.detected_at",
        params![
            defeater.id.as_str(),
            defeater.defeater_type.as_str(),
            &defeater.description,
            defeater.severity.as_str(),
            defeater.confidence_reduction,
            defeater.auto_resolvable,
            defeater.resolution_action.map(|a| a.as_str()),
            defeater.status.as_str(),
            defeater.activated_at.map(millis_to_sql).transpose()?,
            &defeater.evidence,
            millis_to_sql(defeater.detected_at)?,
        ],
    )?;

    conn.execute(
        "DELETE FROM defeater_claims WHERE defeater_id = ?1",
        params![defeater.id.as_str()],
    )?;
    let mut link = conn.prepare_cached(
        "INSERT OR IGNORE INTO defeater_claims (defeater_id, claim_id, position) VALUES (?1, ?2, ?3)",
    )?;
    for (position, claim_id) in defeater.affected_claim_ids.iter().enumerate() {
        link.execute(params![defeater.id.as_str(), claim_id.as_str(), position as i64])?;
    }
    Ok(())
}

// Contradictions

pub(crate) fn contradiction_from_row(row: &Row) -> rusqlite::Result<Contradiction> {
    let resolution: Option<String> = row.get(7)?;
    let resolution = match resolution {
        Some(raw) => Some(
            serde_json::from_str::<ContradictionResolution>(&raw)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?,
        ),
        None => None,
    };
    Ok(Contradiction {
        id: row.get::<_, String>(0)?.into(),
        claim_a: row.get::<_, String>(1)?.into(),
        claim_b: row.get::<_, String>(2)?.into(),
        contradiction_type: enum_column(row, 3, ContradictionType::parse)?,
        explanation: row.get(4)?,
        severity: enum_column(row, 5, ContradictionSeverity::parse)?,
        status: enum_column(row, 6, ContradictionStatus::parse)?,
        resolution,
        detected_at: millis(row, 8)?,
    })
}

pub(crate) fn write_contradiction(conn: &Connection, contradiction: &Contradiction) -> Result<(), StoreError> {
    match contradiction.validate() {
        Ok(()) => {}
        Err(_) if contradiction.status == ContradictionStatus::Resolved && contradiction.resolution.is_none() => {
            return Err(StoreError::ResolutionRequired)
        }
        Err(reason) => return Err(StoreError::InvalidData(reason)),
    }
    let referrer = format!("Contradiction {}", contradiction.id);
    require_claim(conn, &contradiction.claim_a, &referrer)?;
    require_claim(conn, &contradiction.claim_b, &referrer)?;

    let resolution = contradiction
        .resolution
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO contradictions (id, claim_a, claim_b, contradiction_type, explanation, severity,
             status, resolution, detected_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
             claim_a = excluded.claim_a, claim_b = excluded.claim_b,
             contradiction_type = excluded.contradiction_type, explanation = excluded.explanation,
             severity = excluded.severity, status = excluded.status,
             resolution = excluded.resolution, detected_at = excluded.detected_at",
        params![
            contradiction.id.as_str(),
            contradiction.claim_a.as_str(),
            contradiction.claim_b.as_str(),
            contradiction.contradiction_type.as_str(),
            &contradiction.explanation,
            contradiction.severity.as_str(),
            contradiction.status.as_str(),
            resolution,
            millis_to_sql(contradiction.detected_at)?,
        ],
    )?;
    Ok(())
}

// Outcomes

pub(crate) fn outcome_from_row(row: &Row) -> rusqlite::Result<PredictionOutcome> {
    Ok(PredictionOutcome {
        claim_id: row.get::<_, String>(0)?.into(),
        subject_id: row.get(1)?,
        predicted_confidence: row.get(2)?,
        outcome: row.get(3)?,
        recorded_at: millis(row, 4)?,
    })
}
