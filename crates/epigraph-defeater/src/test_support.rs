//! Shared fixtures for unit tests

use epigraph_domain::{
    Claim, ClaimSource, ClaimSubject, ClaimType, EvidenceStore, SignalStrength, SourceKind, SubjectKind,
};
use epigraph_store::SqliteStore;

pub const DAY_MS: u64 = 86_400_000;
pub const NOW: u64 = 1_700_000_000_000;

pub fn store() -> SqliteStore {
    SqliteStore::open(":memory:").unwrap()
}

pub fn claim(id: &str, subject: &str, file: &str) -> Claim {
    Claim::new(
        id.into(),
        format!("{} validates its input", subject),
        ClaimType::Behavioral,
        ClaimSubject::new(SubjectKind::Function, subject, subject).with_location(file, Some(1), Some(20)),
        ClaimSource::new(SourceKind::Llm, "openai:gpt-4o"),
        SignalStrength::uniform(0.8),
        NOW - DAY_MS,
    )
}

pub fn seed(store: &mut SqliteStore, claims: &[Claim]) {
    store.upsert_claims(claims).unwrap();
}
