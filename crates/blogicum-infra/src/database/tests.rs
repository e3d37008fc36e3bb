use std::collections::BTreeMap;

use chrono::{TimeDelta, Utc};
use sea_orm::{DatabaseBackend, MockDatabase, QueryTrait, Value};
use uuid::Uuid;

use blogicum_core::domain::{Post, User};
use blogicum_core::error::RepoError;
use blogicum_core::pagination::PageRequest;
use blogicum_core::ports::{BaseRepository, CommentRepository, PostRepository, UserRepository};
use blogicum_core::visibility::PostFilter;

use crate::database::entity::{category, post, user};
use crate::database::postgres_repo::{
    PostgresCommentRepository, PostgresPostRepository, PostgresUserRepository, filtered_posts,
};

fn post_model(id: Uuid, author_id: Uuid) -> post::Model {
    let now = Utc::now();
    post::Model {
        id,
        author_id,
        title: "Test Post".to_owned(),
        text: "Test content".to_owned(),
        pub_date: (now - TimeDelta::days(1)).into(),
        is_published: true,
        category_id: None,
        location_id: None,
        image: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

#[tokio::test]
async fn test_find_post_by_id() {
    let post_id = Uuid::new_v4();
    let author_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![post_model(post_id, author_id)]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result: Option<Post> = repo.find_by_id(post_id).await.unwrap();

    let post = result.unwrap();
    assert_eq!(post.title, "Test Post");
    assert_eq!(post.id, post_id);
    assert_eq!(post.author_id, author_id);
    assert!(post.is_published);
}

fn user_model(id: Uuid, username: &str) -> user::Model {
    let now = Utc::now();
    user::Model {
        id,
        username: username.to_owned(),
        email: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        password_hash: "$argon2id$hash".to_owned(),
        created_at: now.into(),
        updated_at: now.into(),
    }
}

#[tokio::test]
async fn test_find_user_by_username() {
    let user_id = Uuid::new_v4();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![user_model(user_id, "testuser")]])
        .into_connection();

    let repo = PostgresUserRepository::new(db);

    let user: User = repo.find_by_username("testuser").await.unwrap().unwrap();
    assert_eq!(user.id, user_id);
    assert_eq!(user.password_hash, "$argon2id$hash");
}

#[tokio::test]
async fn test_list_hydrates_authors_categories_and_comment_counts() {
    let author_id = Uuid::new_v4();
    let category_id = Uuid::new_v4();
    let first_id = Uuid::new_v4();
    let second_id = Uuid::new_v4();

    let mut first = post_model(first_id, author_id);
    first.category_id = Some(category_id);
    let mut second = post_model(second_id, author_id);
    second.title = "Second Post".to_owned();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![BTreeMap::from([(
            "num_items",
            Value::BigInt(Some(2)),
        )])]])
        .append_query_results(vec![vec![first, second]])
        .append_query_results(vec![vec![user_model(author_id, "author")]])
        .append_query_results(vec![vec![category::Model {
            id: category_id,
            title: "Test Category".to_owned(),
            slug: "test-category".to_owned(),
            description: String::new(),
            is_published: true,
            created_at: Utc::now().into(),
        }]])
        .append_query_results(vec![vec![BTreeMap::from([
            ("comment_count", Value::BigInt(Some(3))),
            ("post_id", Value::from(first_id)),
        ])]])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let page = repo
        .list(&PostFilter::public(Utc::now()), PageRequest::new(1, 10))
        .await
        .unwrap();

    assert_eq!(page.total_items, 2);
    assert_eq!(page.items.len(), 2);

    let first = &page.items[0];
    assert_eq!(first.post.id, first_id);
    assert_eq!(first.author.username, "author");
    assert_eq!(first.category.as_ref().map(|c| c.slug.as_str()), Some("test-category"));
    assert!(first.location.is_none());
    assert_eq!(first.comment_count, 3);

    let second = &page.items[1];
    assert_eq!(second.post.title, "Second Post");
    assert!(second.category.is_none());
    assert_eq!(second.comment_count, 0);
}

#[tokio::test]
async fn test_find_listing_of_missing_post_is_none() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![Vec::<post::Model>::new()])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    assert!(repo.find_listing(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_missing_row_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results(vec![sea_orm::MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

    let repo = PostgresPostRepository::new(db);

    let result = BaseRepository::<Post, Uuid>::delete(&repo, Uuid::new_v4()).await;
    assert!(matches!(result, Err(RepoError::NotFound)));
}

#[tokio::test]
async fn test_count_comments_for_post() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![BTreeMap::from([(
            "num_items",
            Value::BigInt(Some(2)),
        )])]])
        .into_connection();

    let repo = PostgresCommentRepository::new(db);

    assert_eq!(repo.count_for_post(Uuid::new_v4()).await.unwrap(), 2);
}

#[test]
fn test_public_filter_sql_checks_all_three_conditions() {
    let sql = filtered_posts(&PostFilter::public(Utc::now()))
        .build(DatabaseBackend::Postgres)
        .to_string();

    assert!(sql.contains(r#"LEFT JOIN "categories""#));
    assert!(sql.contains(r#""posts"."is_published" = TRUE"#));
    assert!(sql.contains(r#""posts"."pub_date" <="#));
    assert!(sql.contains(r#""posts"."category_id" IS NULL"#));
    assert!(sql.contains(r#""categories"."is_published" = TRUE"#));
    assert!(sql.contains(r#"ORDER BY "posts"."pub_date" DESC"#));
}

#[test]
fn test_owner_profile_filter_sql_skips_visibility() {
    let author = Uuid::new_v4();
    let sql = filtered_posts(&PostFilter::for_profile(author, Some(author), Utc::now()))
        .build(DatabaseBackend::Postgres)
        .to_string();

    assert!(sql.contains(r#""posts"."author_id" ="#));
    assert!(!sql.contains("categories"));
    assert!(!sql.contains("is_published"));
}
