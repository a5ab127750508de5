//! Knowledge base storage, vector search and chat analytics.

use crate::Database;
use crate::models::{ChatAnalytics, DOCUMENT_COLUMNS, document_from_row, now_ts, uuid_at};
use crate::queries::OptionalExt;
use anyhow::{Result, anyhow};
use nguma_types::models::{KnowledgeDocument, KnowledgeMatch};
use uuid::Uuid;

/// Cosine similarity of two vectors. Mismatched lengths and zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(anyhow!("Embedding blob length {} is not a multiple of 4", bytes.len()));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Partial analytics write; `None` fields keep their stored value.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnalyticsUpdate {
    pub ai_answered: Option<bool>,
    pub escalated_to_admin: Option<bool>,
    pub first_response_time_seconds: Option<i64>,
}

impl Database {
    // -- Knowledge base --

    pub fn insert_document(
        &self,
        title: &str,
        content: &str,
        category: Option<&str>,
    ) -> Result<KnowledgeDocument> {
        self.with_conn(|conn| {
            let id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO knowledge_base (id, title, content, category, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, title, content, category, now_ts()],
            )?;
            conn.query_row(
                &format!("SELECT {} FROM knowledge_base WHERE id = ?1", DOCUMENT_COLUMNS),
                [&id],
                document_from_row,
            )
            .map_err(Into::into)
        })
    }

    pub fn get_document(&self, id: Uuid) -> Result<Option<KnowledgeDocument>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM knowledge_base WHERE id = ?1", DOCUMENT_COLUMNS),
                [id.to_string()],
                document_from_row,
            )
            .optional()
        })
    }

    pub fn set_document_active(&self, id: Uuid, active: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE knowledge_base SET is_active = ?1 WHERE id = ?2",
                rusqlite::params![active, id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Returns false when no document has this id.
    pub fn set_embedding(&self, id: Uuid, embedding: &[f32]) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE knowledge_base SET embedding = ?1 WHERE id = ?2",
                rusqlite::params![encode_embedding(embedding), id.to_string()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Active documents that still need an embedding, oldest first.
    pub fn documents_missing_embedding(&self, limit: usize) -> Result<Vec<KnowledgeDocument>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM knowledge_base
                 WHERE is_active = 1 AND embedding IS NULL
                 ORDER BY created_at ASC
                 LIMIT ?1",
                DOCUMENT_COLUMNS
            ))?;
            let rows = stmt
                .query_map([limit as i64], document_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_missing_embeddings(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM knowledge_base WHERE is_active = 1 AND embedding IS NULL",
                [],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
    }

    /// Top `count` active documents whose cosine similarity to `query` is at
    /// least `threshold`, best first.
    pub fn match_documents(
        &self,
        query: &[f32],
        threshold: f32,
        count: usize,
    ) -> Result<Vec<KnowledgeMatch>> {
        let candidates = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, content, embedding FROM knowledge_base
                 WHERE is_active = 1 AND embedding IS NOT NULL",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        uuid_at(row, 0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let mut matches = Vec::new();
        for (id, title, content, blob) in candidates {
            let embedding = decode_embedding(&blob)?;
            let similarity = cosine_similarity(query, &embedding);
            if similarity >= threshold {
                matches.push(KnowledgeMatch { id, title, content, similarity });
            }
        }

        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(count);
        Ok(matches)
    }

    // -- Analytics --

    pub fn upsert_analytics(&self, conversation_id: Uuid, update: AnalyticsUpdate) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_analytics
                    (conversation_id, ai_answered, escalated_to_admin, first_response_time_seconds, updated_at)
                 VALUES (?1, COALESCE(?2, 0), COALESCE(?3, 0), ?4, ?5)
                 ON CONFLICT(conversation_id) DO UPDATE SET
                    ai_answered = COALESCE(?2, ai_answered),
                    escalated_to_admin = COALESCE(?3, escalated_to_admin),
                    first_response_time_seconds = COALESCE(first_response_time_seconds, ?4),
                    updated_at = ?5",
                rusqlite::params![
                    conversation_id.to_string(),
                    update.ai_answered,
                    update.escalated_to_admin,
                    update.first_response_time_seconds,
                    now_ts(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_analytics(&self, conversation_id: Uuid) -> Result<Option<ChatAnalytics>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT conversation_id, ai_answered, escalated_to_admin, first_response_time_seconds
                 FROM chat_analytics WHERE conversation_id = ?1",
                [conversation_id.to_string()],
                |row| {
                    Ok(ChatAnalytics {
                        conversation_id: row.get(0)?,
                        ai_answered: row.get(1)?,
                        escalated_to_admin: row.get(2)?,
                        first_response_time_seconds: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn embedding_blob_is_little_endian_f32() {
        let blob = encode_embedding(&[1.0, -0.5]);
        assert_eq!(blob.len(), 8);
        assert_eq!(&blob[..4], &1.0f32.to_le_bytes());
        assert_eq!(decode_embedding(&blob).unwrap(), vec![1.0, -0.5]);
        assert!(decode_embedding(&[0, 1, 2]).is_err());
    }

    #[test]
    fn match_documents_ranks_and_filters() {
        let db = Database::open_in_memory().unwrap();
        let close = db.insert_document("Retraits", "Délais de retrait", None).unwrap();
        let medium = db.insert_document("Dépôts", "Moyens de dépôt", None).unwrap();
        let far = db.insert_document("Contrats", "Durée des contrats", None).unwrap();
        let inactive = db.insert_document("Ancien", "Obsolète", None).unwrap();

        db.set_embedding(close.id, &[1.0, 0.0, 0.0]).unwrap();
        db.set_embedding(medium.id, &[0.8, 0.6, 0.0]).unwrap();
        db.set_embedding(far.id, &[0.0, 0.0, 1.0]).unwrap();
        db.set_embedding(inactive.id, &[1.0, 0.0, 0.0]).unwrap();
        db.set_document_active(inactive.id, false).unwrap();

        let matches = db.match_documents(&[1.0, 0.0, 0.0], 0.5, 3).unwrap();
        let ids: Vec<_> = matches.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![close.id, medium.id]);
        assert!(matches[0].similarity > matches[1].similarity);

        let top_one = db.match_documents(&[1.0, 0.0, 0.0], 0.5, 1).unwrap();
        assert_eq!(top_one.len(), 1);
    }

    #[test]
    fn missing_embeddings_shrink_after_backfill() {
        let db = Database::open_in_memory().unwrap();
        let doc = db.insert_document("FAQ", "Contenu", Some("general")).unwrap();
        assert!(!doc.has_embedding);
        assert_eq!(db.count_missing_embeddings().unwrap(), 1);

        assert!(db.set_embedding(doc.id, &[0.1, 0.2]).unwrap());
        assert_eq!(db.count_missing_embeddings().unwrap(), 0);
        assert!(db.get_document(doc.id).unwrap().unwrap().has_embedding);
        assert!(!db.set_embedding(Uuid::new_v4(), &[0.1]).unwrap());
    }

    #[test]
    fn analytics_upsert_merges_flags() {
        let db = Database::open_in_memory().unwrap();
        let conv = Uuid::new_v4();

        db.upsert_analytics(
            conv,
            AnalyticsUpdate {
                escalated_to_admin: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        db.upsert_analytics(
            conv,
            AnalyticsUpdate {
                ai_answered: Some(true),
                first_response_time_seconds: Some(4),
                ..Default::default()
            },
        )
        .unwrap();

        let row = db.get_analytics(conv).unwrap().unwrap();
        assert!(row.ai_answered);
        assert!(row.escalated_to_admin);
        assert_eq!(row.first_response_time_seconds, Some(4));
    }
}
