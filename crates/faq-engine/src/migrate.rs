use anyhow::Result;
use sqlx::SqlitePool;

/// Create the questions and queries tables. Idempotent — safe to run on
/// every startup.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Curated corpus. feature_vector is NOT NULL: insertion without a
    // vector is rejected before it ever reaches the store.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            id TEXT PRIMARY KEY,
            text TEXT NOT NULL,
            category TEXT,
            answer TEXT NOT NULL,
            feature_vector BLOB NOT NULL,
            keyword_1 TEXT,
            keyword_2 TEXT,
            keyword_3 TEXT,
            dedup_hash TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_questions_category ON questions(category)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_questions_dedup_hash ON questions(dedup_hash)")
        .execute(pool)
        .await?;

    // Append-only query log.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queries (
            id TEXT PRIMARY KEY,
            chat TEXT NOT NULL,
            morphs_json TEXT NOT NULL DEFAULT '[]',
            matched_question TEXT,
            category TEXT,
            answer TEXT NOT NULL,
            jaccard_similarity REAL,
            manhattan_similarity REAL,
            measurement TEXT NOT NULL,
            added_time INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_queries_added_time ON queries(added_time)")
        .execute(pool)
        .await?;

    Ok(())
}
