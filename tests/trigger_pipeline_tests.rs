mod common;

use common::TestApp;
use wordflow::{
    models::{
        clap::Clap, comment::CreateCommentRequest, event::DomainEvent,
        read_history::RecordReadRequest,
    },
    services::TriggerService,
};

#[tokio::test]
async fn clap_updates_counters_and_notifies_owner() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let reader = app.user("reader").await;
    let article = app.published_article(&author, "Ownership in Practice").await;

    let result = app
        .state
        .article_service
        .toggle_clap(&article.id, &reader.id)
        .await
        .unwrap();

    assert!(result.clapped);
    assert_eq!(result.claps, 1);
    assert_eq!(app.reload_article(&article.id).await.clap_count, 1);
    assert_eq!(app.user_counter(&author.id, "total_claps").await, 1);
    assert_eq!(app.user_counter(&reader.id, "total_claps").await, 0);
    assert_eq!(app.notifications_of(&author.id, "CLAP").await, 1);
}

#[tokio::test]
async fn self_clap_does_not_notify() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let article = app.published_article(&author, "Talking to Myself").await;

    app.state
        .article_service
        .toggle_clap(&article.id, &author.id)
        .await
        .unwrap();

    assert_eq!(app.reload_article(&article.id).await.clap_count, 1);
    assert_eq!(app.notifications_of(&author.id, "CLAP").await, 0);
}

#[tokio::test]
async fn toggling_twice_restores_clap_count() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let reader = app.user("reader").await;
    let article = app.published_article(&author, "Round Trip").await;

    let first = app.state.article_service.toggle_clap(&article.id, &reader.id).await.unwrap();
    let second = app.state.article_service.toggle_clap(&article.id, &reader.id).await.unwrap();

    assert!(first.clapped);
    assert!(!second.clapped);
    assert_eq!(second.claps, 0);
    assert_eq!(app.reload_article(&article.id).await.clap_count, 0);

    // 再次鼓掌复用同一条记录
    let third = app.state.article_service.toggle_clap(&article.id, &reader.id).await.unwrap();
    assert!(third.clapped);
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM claps WHERE article_id = ?")
        .bind(&article.id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn cannot_clap_a_draft() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let reader = app.user("reader").await;
    let draft = app.draft_article(&author, "Not Yet").await;

    let err = app
        .state
        .article_service
        .toggle_clap(&draft.id, &reader.id)
        .await
        .unwrap_err();
    assert!(matches!(err, wordflow::error::AppError::BadRequest(_)));
}

#[tokio::test]
async fn comment_notifies_article_author_but_not_self() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let reader = app.user("reader").await;
    let article = app.published_article(&author, "Discuss").await;

    app.state
        .comment_service
        .create_comment(
            &article.id,
            &reader.id,
            CreateCommentRequest {
                parent_id: None,
                content: "Great read".into(),
            },
        )
        .await
        .unwrap();

    app.state
        .comment_service
        .create_comment(
            &article.id,
            &author.id,
            CreateCommentRequest {
                parent_id: None,
                content: "Thanks everyone".into(),
            },
        )
        .await
        .unwrap();

    assert_eq!(app.reload_article(&article.id).await.comment_count, 2);
    assert_eq!(app.notifications_of(&author.id, "COMMENT").await, 1);
}

#[tokio::test]
async fn author_reply_notifies_parent_comment_author() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let reader = app.user("reader").await;
    let article = app.published_article(&author, "Replies").await;

    let parent = app
        .state
        .comment_service
        .create_comment(
            &article.id,
            &reader.id,
            CreateCommentRequest {
                parent_id: None,
                content: "Question?".into(),
            },
        )
        .await
        .unwrap();

    app.state
        .comment_service
        .create_comment(
            &article.id,
            &author.id,
            CreateCommentRequest {
                parent_id: Some(parent.id.clone()),
                content: "Answer.".into(),
            },
        )
        .await
        .unwrap();

    assert_eq!(app.notifications_of(&reader.id, "REPLY").await, 1);
    // 作者回复自己的文章不产生 COMMENT 通知
    assert_eq!(app.notifications_of(&author.id, "COMMENT").await, 1);
}

#[tokio::test]
async fn reply_must_target_same_article() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let first = app.published_article(&author, "First").await;
    let second = app.published_article(&author, "Second").await;

    let parent = app
        .state
        .comment_service
        .create_comment(
            &first.id,
            &author.id,
            CreateCommentRequest {
                parent_id: None,
                content: "Top level".into(),
            },
        )
        .await
        .unwrap();

    let err = app
        .state
        .comment_service
        .create_comment(
            &second.id,
            &author.id,
            CreateCommentRequest {
                parent_id: Some(parent.id),
                content: "Wrong place".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, wordflow::error::AppError::BadRequest(_)));
}

#[tokio::test]
async fn reads_update_views_and_completion_once() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let reader = app.user("reader").await;
    let article = app.published_article(&author, "Long Form").await;

    let read = |read_time: i64, progress: f64, completed: bool| RecordReadRequest {
        read_time,
        progress,
        completed,
    };

    let first = app
        .state
        .reading_service
        .record_read(&reader.id, &article.id, read(40, 30.0, false))
        .await
        .unwrap();
    assert!(first.first_read);
    assert!(!first.newly_completed);

    let second = app
        .state
        .reading_service
        .record_read(&reader.id, &article.id, read(20, 100.0, true))
        .await
        .unwrap();
    assert!(!second.first_read);
    assert!(second.newly_completed);
    assert_eq!(second.history.read_time, 40);

    let third = app
        .state
        .reading_service
        .record_read(&reader.id, &article.id, read(90, 50.0, false))
        .await
        .unwrap();
    assert!(third.history.completed);
    assert!(!third.newly_completed);
    assert_eq!(third.history.read_time, 90);
    assert_eq!(third.history.progress, 100.0);

    let article = app.reload_article(&article.id).await;
    assert_eq!(article.view_count, 3);
    assert_eq!(article.read_count, 1);
    assert_eq!(app.user_counter(&reader.id, "total_reads").await, 1);

    let (total, unique, completion): (i64, i64, f64) = sqlx::query_as(
        "SELECT total_views, unique_views, completion_rate FROM article_analytics WHERE article_id = ?",
    )
    .bind(&article.id)
    .fetch_one(app.pool())
    .await
    .unwrap();
    assert_eq!(total, 3);
    assert_eq!(unique, 1);
    assert_eq!(completion, 100.0);
}

#[tokio::test]
async fn follow_notifies_followed_user() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;

    app.state.follow_service.follow_user(&alice.id, &bob.id).await.unwrap();

    assert_eq!(app.notifications_of(&bob.id, "FOLLOW").await, 1);
    assert_eq!(app.notifications_of(&alice.id, "FOLLOW").await, 0);
}

#[tokio::test]
async fn handlers_skip_deleted_articles() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let reader = app.user("reader").await;
    let article = app.published_article(&author, "Soon Gone").await;

    let clap = app
        .state
        .article_service
        .toggle_clap(&article.id, &reader.id)
        .await
        .unwrap();
    assert!(clap.clapped);

    app.state.article_service.delete_article(&article.id, &author.id).await.unwrap();

    // 直接分发一个指向已删除文章的事件，不应报错也不应产生通知
    let stored_clap = sqlx::query_as::<_, Clap>("SELECT * FROM claps WHERE article_id = ?")
        .bind(&article.id)
        .fetch_one(app.pool())
        .await
        .unwrap();
    let event = DomainEvent::ClapCreated { clap: stored_clap };
    let mut conn = app.pool().acquire().await.unwrap();
    let event_id = TriggerService::enqueue(&mut conn, &event).await.unwrap();
    drop(conn);

    app.state.trigger_service.dispatch(&event_id, &event).await;

    assert_eq!(app.reload_article(&article.id).await.clap_count, 1);
    assert_eq!(app.notifications_of(&author.id, "CLAP").await, 1);
}

#[tokio::test]
async fn events_are_dispatched_at_most_once() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let reader = app.user("reader").await;
    let article = app.published_article(&author, "Exactly Once").await;

    let event = DomainEvent::ReadRecorded {
        user_id: reader.id.clone(),
        article_id: article.id.clone(),
        first_read: true,
        newly_completed: false,
    };
    let mut conn = app.pool().acquire().await.unwrap();
    let event_id = TriggerService::enqueue(&mut conn, &event).await.unwrap();
    drop(conn);

    app.state.trigger_service.dispatch(&event_id, &event).await;
    app.state.trigger_service.dispatch(&event_id, &event).await;

    assert_eq!(app.reload_article(&article.id).await.view_count, 1);
}

#[tokio::test]
async fn pending_events_are_replayed() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let reader = app.user("reader").await;
    let article = app.published_article(&author, "Crash Safe").await;

    // 模拟提交后、分发前进程退出
    let event = DomainEvent::ReadRecorded {
        user_id: reader.id.clone(),
        article_id: article.id.clone(),
        first_read: true,
        newly_completed: true,
    };
    let mut conn = app.pool().acquire().await.unwrap();
    TriggerService::enqueue(&mut conn, &event).await.unwrap();
    drop(conn);

    let replayed = app.state.trigger_service.replay_pending().await.unwrap();
    assert_eq!(replayed, 1);
    assert_eq!(app.reload_article(&article.id).await.read_count, 1);

    // 已认领的事件不会再次补发
    assert_eq!(app.state.trigger_service.replay_pending().await.unwrap(), 0);
    assert_eq!(app.reload_article(&article.id).await.read_count, 1);
}

#[tokio::test]
async fn sequential_writes_never_hit_a_locked_database() {
    for round in 0..3 {
        let app = TestApp::new().await;
        let author = app.user("author").await;
        let reader = app.user("reader").await;

        for i in 0..15 {
            let article = if i % 2 == 0 {
                app.published_article(&author, &format!("Round {} entry {}", round, i)).await
            } else {
                let draft = app.draft_article(&author, &format!("Draft {} entry {}", round, i)).await;
                app.state
                    .article_service
                    .publish_article(&draft.id, &author.id)
                    .await
                    .unwrap()
            };

            app.user("reader").await;
            app.state.bookmark_service.add_bookmark(&reader.id, &article.id).await.unwrap();
            app.state.article_service.toggle_clap(&article.id, &reader.id).await.unwrap();
            app.state
                .reading_service
                .record_read(
                    &reader.id,
                    &article.id,
                    RecordReadRequest {
                        read_time: 60,
                        progress: 100.0,
                        completed: true,
                    },
                )
                .await
                .unwrap();
        }

        assert_eq!(app.user_counter(&author.id, "total_claps").await, 15);
        assert_eq!(app.user_counter(&reader.id, "total_reads").await, 15);
        assert_eq!(app.notifications_of(&author.id, "CLAP").await, 15);
    }
}

#[tokio::test]
async fn failing_side_effect_keeps_the_primary_write() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let reader = app.user("reader").await;
    let article = app.published_article(&author, "Resilient").await;

    // 通知表不可用时，鼓掌本身和计数器仍然生效
    sqlx::query("DROP TABLE notifications")
        .execute(app.pool())
        .await
        .unwrap();

    let result = app
        .state
        .article_service
        .toggle_clap(&article.id, &reader.id)
        .await
        .unwrap();

    assert!(result.clapped);
    assert_eq!(result.claps, 1);
    assert_eq!(app.reload_article(&article.id).await.clap_count, 1);
    assert_eq!(app.user_counter(&author.id, "total_claps").await, 1);
}

#[tokio::test]
async fn reads_on_someone_elses_draft_are_rejected() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let stranger = app.user("stranger").await;
    let draft = app.draft_article(&author, "Work in Progress").await;

    let request = || RecordReadRequest {
        read_time: 120,
        progress: 100.0,
        completed: true,
    };

    let err = app
        .state
        .reading_service
        .record_read(&stranger.id, &draft.id, request())
        .await
        .unwrap_err();
    assert!(matches!(err, wordflow::error::AppError::NotFound(_)));

    let article = app.reload_article(&draft.id).await;
    assert_eq!(article.view_count, 0);
    assert_eq!(article.read_count, 0);

    // 作者本人可以预览自己的草稿
    app.state
        .reading_service
        .record_read(&author.id, &draft.id, request())
        .await
        .unwrap();
    assert_eq!(app.reload_article(&draft.id).await.view_count, 1);
}

#[tokio::test]
async fn dispatched_events_are_pruned_but_pending_ones_kept() {
    let app = TestApp::new().await;
    let author = app.user("author").await;
    let reader = app.user("reader").await;
    let article = app.published_article(&author, "Housekeeping").await;

    app.state.article_service.toggle_clap(&article.id, &reader.id).await.unwrap();

    let pending = DomainEvent::ReadRecorded {
        user_id: reader.id.clone(),
        article_id: article.id.clone(),
        first_read: true,
        newly_completed: false,
    };
    let mut conn = app.pool().acquire().await.unwrap();
    let pending_id = TriggerService::enqueue(&mut conn, &pending).await.unwrap();
    drop(conn);

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let pruned = app
        .state
        .trigger_service
        .prune_dispatched(chrono::Duration::zero())
        .await
        .unwrap();
    // 发布文章与鼓掌两条
    assert_eq!(pruned, 2);

    let remaining: Vec<String> = sqlx::query_scalar("SELECT id FROM outbox_events")
        .fetch_all(app.pool())
        .await
        .unwrap();
    assert_eq!(remaining, vec![pending_id]);

    // 保留期内的事件不会被清理
    app.state.article_service.toggle_clap(&article.id, &reader.id).await.unwrap();
    let pruned = app
        .state
        .trigger_service
        .prune_dispatched(chrono::Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(pruned, 0);
}
