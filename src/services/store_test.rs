use super::*;
use sqlx::postgres::PgPoolOptions;

async fn live_repo() -> PgMessageRepo {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required for live-db-tests");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect");
    sqlx::migrate!("src/db/migrations")
        .run(&pool)
        .await
        .expect("migrate");
    PgMessageRepo::new(pool)
}

#[tokio::test]
async fn insert_then_recent_returns_newest_first() {
    let repo = live_repo().await;
    let base = crate::frame::now_ms() + 1_000_000;

    let older = repo
        .insert(Uuid::new_v4(), &NewMessage::from_form("", "older", base))
        .await
        .expect("insert older");
    let newer = repo
        .insert(Uuid::new_v4(), &NewMessage::from_form("Ada", "newer", base + 1))
        .await
        .expect("insert newer");

    let rows = repo.recent(2).await.expect("recent");
    assert_eq!(rows[0], newer);
    assert_eq!(rows[1], older);
    assert_eq!(rows[1].name, None);
}
