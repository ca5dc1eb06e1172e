mod common;

use common::TestApp;
use wordflow::{error::AppError, services::database::PageRequest};

#[tokio::test]
async fn unfollowing_without_following_is_rejected() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;

    let err = app
        .state
        .follow_service
        .unfollow_user(&alice.id, &bob.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn follow_rules() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;

    let err = app.state.follow_service.follow_user(&alice.id, &alice.id).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = app.state.follow_service.follow_user(&alice.id, "nobody").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    app.state.follow_service.follow_user(&alice.id, &bob.id).await.unwrap();
    let err = app.state.follow_service.follow_user(&alice.id, &bob.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let stats = app
        .state
        .follow_service
        .get_follow_stats(&bob.id, Some(&alice.id))
        .await
        .unwrap();
    assert_eq!(stats.followers_count, 1);
    assert_eq!(stats.following_count, 0);
    assert!(stats.is_following);
    assert!(!stats.is_followed_by);

    let followers = app
        .state
        .follow_service
        .get_followers(&bob.id, PageRequest::new(None, None, 20))
        .await
        .unwrap();
    assert_eq!(followers.total, 1);
    assert_eq!(followers.data[0].user_id, alice.id);

    app.state.follow_service.unfollow_user(&alice.id, &bob.id).await.unwrap();
    assert!(!app.state.follow_service.is_following(&alice.id, &bob.id).await.unwrap());
}

#[tokio::test]
async fn toggle_follow_flips_state() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;

    assert!(app.state.follow_service.toggle_follow(&alice.id, &bob.id).await.unwrap());
    assert!(!app.state.follow_service.toggle_follow(&alice.id, &bob.id).await.unwrap());
    assert!(app.state.follow_service.toggle_follow(&alice.id, &bob.id).await.unwrap());

    // 每次重新关注都会通知
    assert_eq!(app.notifications_of(&bob.id, "FOLLOW").await, 2);
}

#[tokio::test]
async fn bookmarks_are_idempotent_and_revivable() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let reader = app.user("reader").await;
    let article = app.published_article(&author, "Keep This").await;

    let first = app.state.bookmark_service.add_bookmark(&reader.id, &article.id).await.unwrap();
    let second = app.state.bookmark_service.add_bookmark(&reader.id, &article.id).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.settings.0["source"], "manual");
    // 重复添加有效书签不刷新时间
    assert_eq!(second.created_at, first.created_at);

    app.state
        .bookmark_service
        .remove_bookmark_for_article(&reader.id, &article.id)
        .await
        .unwrap();
    assert!(app.state.bookmark_service.list_bookmarks(&reader.id).await.unwrap().is_empty());

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let revived = app.state.bookmark_service.add_bookmark(&reader.id, &article.id).await.unwrap();
    assert_eq!(revived.id, first.id);
    assert!(revived.deleted_at.is_none());
    assert!(revived.created_at > first.created_at);
    assert_ne!(revived.settings.0["addedAt"], first.settings.0["addedAt"]);

    let listed = app.state.bookmark_service.list_bookmarks(&reader.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].article_title, "Keep This");
}

#[tokio::test]
async fn removing_someone_elses_bookmark_is_forbidden() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let reader = app.user("reader").await;
    let article = app.published_article(&author, "Mine").await;

    let bookmark = app.state.bookmark_service.add_bookmark(&reader.id, &article.id).await.unwrap();

    let err = app
        .state
        .bookmark_service
        .remove_bookmark(&author.id, &bookmark.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    let err = app
        .state
        .bookmark_service
        .add_bookmark(&reader.id, "missing-article")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    app.state.bookmark_service.remove_bookmark(&reader.id, &bookmark.id).await.unwrap();
    let err = app
        .state
        .bookmark_service
        .remove_bookmark(&reader.id, &bookmark.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn slugs_are_made_unique() {
    let app = TestApp::new().await;
    let author = app.user("author").await;

    let first = app.published_article(&author, "Same Title").await;
    let second = app.published_article(&author, "Same Title").await;

    assert_eq!(first.slug, "same-title");
    assert_eq!(second.slug, "same-title-2");

    let found = app
        .state
        .article_service
        .get_article_by_slug("same-title-2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, second.id);
}
