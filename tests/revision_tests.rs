mod common;

use common::TestApp;
use wordflow::{error::AppError, models::article::UpdateArticleRequest};

#[tokio::test]
async fn update_records_pre_edit_snapshot() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let article = app.published_article(&author, "Original Title").await;

    let updated = app
        .state
        .article_service
        .update_article(
            &article.id,
            &author.id,
            UpdateArticleRequest {
                title: Some("New Title".into()),
                change_log: Some("Retitle".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "New Title");
    assert_eq!(updated.slug, "new-title");

    let revisions = app
        .state
        .revision_service
        .list_revisions(&article.id, &author)
        .await
        .unwrap();
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].version, 1);
    assert_eq!(revisions[0].title, "Original Title");
    assert_eq!(revisions[0].change_log.as_deref(), Some("Retitle"));
}

#[tokio::test]
async fn status_only_update_skips_revision() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let article = app.draft_article(&author, "Quiet").await;

    app.state
        .article_service
        .update_article(
            &article.id,
            &author.id,
            UpdateArticleRequest {
                status: Some(wordflow::models::article::ArticleStatus::Published),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let revisions = app
        .state
        .revision_service
        .list_revisions(&article.id, &author)
        .await
        .unwrap();
    assert!(revisions.is_empty());
}

#[tokio::test]
async fn restores_add_two_revisions_each() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let article = app.published_article(&author, "v1").await;

    for title in ["v2", "v3"] {
        app.state
            .article_service
            .update_article(
                &article.id,
                &author.id,
                UpdateArticleRequest {
                    title: Some(title.into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let before = app
        .state
        .revision_service
        .list_revisions(&article.id, &author)
        .await
        .unwrap();
    assert_eq!(before.len(), 2);
    let oldest = before.iter().find(|r| r.version == 1).unwrap().clone();
    assert_eq!(oldest.title, "v1");

    let restores = 3;
    for _ in 0..restores {
        let outcome = app
            .state
            .revision_service
            .restore(&article.id, &oldest.id, &author)
            .await
            .unwrap();
        assert_eq!(outcome.article.title, "v1");
        assert_eq!(outcome.backup.change_log.as_deref(), Some("Auto-saved before restoration"));
        assert_eq!(outcome.restored.change_log.as_deref(), Some("Restored from revision 1"));
        assert_eq!(outcome.restored.version, outcome.backup.version + 1);
    }

    let after = app
        .state
        .revision_service
        .list_revisions(&article.id, &author)
        .await
        .unwrap();
    assert_eq!(after.len(), before.len() + 2 * restores);

    // 版本倒序、严格递减、无重复
    let versions: Vec<i64> = after.iter().map(|r| r.version).collect();
    assert!(versions.windows(2).all(|pair| pair[0] > pair[1]));
    assert_eq!(versions.first().copied(), Some(after.len() as i64));
}

#[tokio::test]
async fn revisions_are_private_to_author_and_admins() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let stranger = app.user("stranger").await;
    let admin = app.admin("admin").await;
    let article = app.published_article(&author, "Private History").await;

    let err = app
        .state
        .revision_service
        .list_revisions(&article.id, &stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    assert!(app
        .state
        .revision_service
        .list_revisions(&article.id, &admin)
        .await
        .is_ok());

    // 管理员可以查看但不能恢复
    let err = app
        .state
        .revision_service
        .restore(&article.id, "missing", &admin)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    let err = app
        .state
        .revision_service
        .restore(&article.id, "missing", &author)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
