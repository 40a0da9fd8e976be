//! Lifecycle tests driving the post repository and upload store together,
//! the way the HTTP handlers do.

use std::sync::Arc;

use inkpost::db;
use inkpost::error::AppError;
use inkpost::posts::{Category, PostFields, PostRepository, SqlitePostRepository};
use inkpost::state::DbPool;
use inkpost::uploads::UploadStore;
use rusqlite::params;
use tempfile::TempDir;

struct Fixture {
    pool: DbPool,
    repo: SqlitePostRepository,
    uploads: Arc<UploadStore>,
    _tmp: TempDir,
}

fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let pool = db::create_pool(&tmp.path().join("test.db")).unwrap();
    db::run_migrations(&pool).unwrap();

    let conn = pool.get().unwrap();
    for (id, name) in [("u1", "alice"), ("u2", "bob")] {
        conn.execute(
            "INSERT INTO users (id, username, email, password_hash) VALUES (?1, ?2, ?2 || '@example.com', 'h')",
            params![id, name],
        )
        .unwrap();
    }
    drop(conn);

    let uploads = Arc::new(UploadStore::new(tmp.path().join("uploads")).unwrap());
    Fixture {
        repo: SqlitePostRepository::new(pool.clone()),
        pool,
        uploads,
        _tmp: tmp,
    }
}

fn fields(title: &str) -> PostFields {
    PostFields::new(
        Some(title.into()),
        Some("Art".into()),
        Some("a description".into()),
        Some("a story".into()),
    )
    .unwrap()
}

fn post_count(pool: &DbPool, user: &str) -> i64 {
    let conn = pool.get().unwrap();
    conn.query_row(
        "SELECT posts FROM users WHERE id = ?1",
        params![user],
        |row| row.get(0),
    )
    .unwrap()
}

#[tokio::test]
async fn create_stores_file_and_row_together() {
    let f = fixture();

    let stored = f.uploads.save("pic.png", b"image-bytes").unwrap();
    let post = f.repo.create(&fields("T"), &stored, "u1").await.unwrap();

    assert_eq!(post.avatar, stored);
    assert!(f.uploads.exists(&post.avatar));
    assert_eq!(post_count(&f.pool, "u1"), 1);
}

#[tokio::test]
async fn two_uploads_with_same_name_do_not_collide() {
    let f = fixture();

    let a = f.uploads.save("pic.png", b"one").unwrap();
    let b = f.uploads.save("pic.png", b"two").unwrap();
    assert_ne!(a, b);

    f.repo.create(&fields("A"), &a, "u1").await.unwrap();
    f.repo.create(&fields("B"), &b, "u1").await.unwrap();
    assert_eq!(post_count(&f.pool, "u1"), 2);
}

#[tokio::test]
async fn replacing_avatar_removes_the_old_file() {
    let f = fixture();

    let old = f.uploads.save("pic.png", b"old").unwrap();
    let post = f.repo.create(&fields("T"), &old, "u1").await.unwrap();

    // What the edit handler does when a new file arrives
    let new = f.uploads.save("pic.png", b"new").unwrap();
    f.uploads.remove_best_effort(&post.avatar);
    let updated = f
        .repo
        .update(&post.id, &fields("T"), Some(&new))
        .await
        .unwrap();

    assert_eq!(updated.avatar, new);
    assert!(f.uploads.exists(&new));
    assert!(!f.uploads.exists(&old));
}

#[tokio::test]
async fn edit_without_file_preserves_avatar_on_disk_and_in_row() {
    let f = fixture();

    let stored = f.uploads.save("pic.png", b"bytes").unwrap();
    let post = f.repo.create(&fields("T"), &stored, "u1").await.unwrap();

    let updated = f.repo.update(&post.id, &fields("T2"), None).await.unwrap();

    assert_eq!(updated.avatar, stored);
    assert_eq!(f.uploads.read(&stored).unwrap(), b"bytes");
}

#[tokio::test]
async fn delete_removes_file_row_and_counter() {
    let f = fixture();

    let stored = f.uploads.save("pic.png", b"bytes").unwrap();
    let post = f.repo.create(&fields("T"), &stored, "u1").await.unwrap();

    // What the delete handler does
    f.uploads.remove(&post.avatar).unwrap();
    f.repo.delete(&post.id, &post.creator).await.unwrap();

    assert!(!f.uploads.exists(&stored));
    assert_eq!(post_count(&f.pool, "u1"), 0);
    assert!(matches!(
        f.repo.get(&post.id).await.unwrap_err(),
        AppError::NotFound
    ));
}

#[tokio::test]
async fn delete_tolerates_an_already_missing_file() {
    let f = fixture();

    let stored = f.uploads.save("pic.png", b"bytes").unwrap();
    let post = f.repo.create(&fields("T"), &stored, "u1").await.unwrap();

    // Someone cleaned the uploads directory behind our back
    std::fs::remove_file(f.uploads.root().join(&stored)).unwrap();

    f.uploads.remove(&post.avatar).unwrap();
    f.repo.delete(&post.id, &post.creator).await.unwrap();
    assert_eq!(post_count(&f.pool, "u1"), 0);
}

#[tokio::test]
async fn counters_track_per_creator() {
    let f = fixture();

    let a = f.uploads.save("a.png", b"a").unwrap();
    let b = f.uploads.save("b.png", b"b").unwrap();
    let c = f.uploads.save("c.png", b"c").unwrap();

    f.repo.create(&fields("A"), &a, "u1").await.unwrap();
    f.repo.create(&fields("B"), &b, "u1").await.unwrap();
    let bob = f.repo.create(&fields("C"), &c, "u2").await.unwrap();

    assert_eq!(post_count(&f.pool, "u1"), 2);
    assert_eq!(post_count(&f.pool, "u2"), 1);

    f.uploads.remove(&bob.avatar).unwrap();
    f.repo.delete(&bob.id, &bob.creator).await.unwrap();

    assert_eq!(post_count(&f.pool, "u1"), 2);
    assert_eq!(post_count(&f.pool, "u2"), 0);
}

#[tokio::test]
async fn category_listing_only_returns_that_category() {
    let f = fixture();

    let a = f.uploads.save("a.png", b"a").unwrap();
    let weather = PostFields::new(
        Some("W".into()),
        Some("Weather".into()),
        Some("d".into()),
        Some("s".into()),
    )
    .unwrap();
    f.repo.create(&weather, &a, "u1").await.unwrap();

    let b = f.uploads.save("b.png", b"b").unwrap();
    f.repo.create(&fields("Art post"), &b, "u1").await.unwrap();

    let posts = f.repo.list_by_category(Category::Weather).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "W");
}
