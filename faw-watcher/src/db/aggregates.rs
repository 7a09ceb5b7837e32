//! Running affect aggregate persistence
//!
//! One row per conversation: valence/arousal SUMS, scored-frame count, and
//! JSON-encoded per-frame history arrays in call order. Upsert semantics:
//! a missing row is created as `{v, a, 1, [v], [a]}`; a present row gets its
//! sums and count bumped and the histories appended.

use crate::models::AffectAggregate;
use faw_common::{Error, Result};
use sqlx::{Row, SqlitePool};

/// Upsert one scored frame into the conversation's running aggregate.
///
/// Per-conversation keys are disjoint across sessions; SQLite serializes
/// conflicting writes to the same key.
pub async fn update_aggregate(
    pool: &SqlitePool,
    conversation_id: &str,
    valence: f64,
    arousal: f64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO affect_aggregates (
            conversation_id, valence, arousal, count, valence_all, arousal_all
        ) VALUES (?, ?, ?, 1, json_array(?), json_array(?))
        ON CONFLICT(conversation_id) DO UPDATE SET
            valence = valence + excluded.valence,
            arousal = arousal + excluded.arousal,
            count = count + 1,
            valence_all = json_insert(valence_all, '$[#]', excluded.valence),
            arousal_all = json_insert(arousal_all, '$[#]', excluded.arousal)
        "#,
    )
    .bind(conversation_id)
    .bind(valence)
    .bind(arousal)
    .bind(valence)
    .bind(arousal)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a conversation's running aggregate, if any frames have scored.
pub async fn load_aggregate(
    pool: &SqlitePool,
    conversation_id: &str,
) -> Result<Option<AffectAggregate>> {
    let row = sqlx::query(
        r#"
        SELECT conversation_id, valence, arousal, count, valence_all, arousal_all
        FROM affect_aggregates
        WHERE conversation_id = ?
        "#,
    )
    .bind(conversation_id)
    .fetch_optional(pool)
    .await?;

    match row {
        None => Ok(None),
        Some(row) => {
            let valence_all: String = row.get("valence_all");
            let arousal_all: String = row.get("arousal_all");
            Ok(Some(AffectAggregate {
                conversation_id: row.get("conversation_id"),
                valence: row.get("valence"),
                arousal: row.get("arousal"),
                count: row.get("count"),
                valence_all: serde_json::from_str(&valence_all).map_err(|e| {
                    Error::Internal(format!("corrupt valence history: {}", e))
                })?,
                arousal_all: serde_json::from_str(&arousal_all).map_err(|e| {
                    Error::Internal(format!("corrupt arousal history: {}", e))
                })?,
            }))
        }
    }
}
