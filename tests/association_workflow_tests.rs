/// Draft-with-children workflow
///
/// A pending message is created first so recipients can reference its id
/// while the form is still being filled in.
/// Run with: cargo test --test association_workflow_tests
use chrono::{Duration, Utc};
use pendingdb::{
    Column, DataType, DependentAction, Filter, FindOptions, InMemoryStore, LifecycleConfig,
    ManualClock, PendingLifecycle, PersistOptions, Record, RecordStore, Result, StoreError,
    TableSchema, Visibility, attrs,
};
use std::sync::Arc;

async fn setup(
    recipients_action: DependentAction,
) -> Result<(Arc<InMemoryStore>, PendingLifecycle<InMemoryStore>, ManualClock)> {
    let clock = ManualClock::new(Utc::now());
    let store = Arc::new(InMemoryStore::with_clock(Arc::new(clock.clone())));

    store
        .create_table(
            TableSchema::new(
                "messages",
                vec![
                    Column::new("body", DataType::Text),
                    Column::new("as_new", DataType::Boolean).default_value(false),
                ],
            )
            .timestamps()
            .dependent("recipients", "message_id", recipients_action),
        )
        .await?;
    store
        .create_table(TableSchema::new(
            "recipients",
            vec![
                Column::new("message_id", DataType::Integer),
                Column::new("name", DataType::Text).not_null(),
            ],
        ))
        .await?;

    let lifecycle = PendingLifecycle::attach_with_clock(
        store.clone(),
        LifecycleConfig::new("messages").pending_column("as_new"),
        Arc::new(clock.clone()),
    )
    .await?;

    Ok((store, lifecycle, clock))
}

async fn add_recipient(store: &InMemoryStore, message: &Record, name: &str) -> Result<Record> {
    let message_id = message.id().map(|id| id.0 as i64);
    let mut recipient = store
        .construct("recipients", attrs! { "message_id" => message_id, "name" => name })
        .await?;
    store
        .persist(&mut recipient, PersistOptions::validated())
        .await?;
    Ok(recipient)
}

fn recipients_of(message: &Record) -> Filter {
    Filter::new().eq("message_id", message.id().unwrap().0 as i64)
}

#[tokio::test]
async fn test_children_attach_to_pending_parent() -> Result<()> {
    let (store, lifecycle, _) = setup(DependentAction::Destroy).await?;

    let mut message = lifecycle.create_pending(attrs! {}).await?;
    add_recipient(&store, &message, "alice").await?;
    add_recipient(&store, &message, "bob").await?;

    assert_eq!(store.count("recipients", &recipients_of(&message)).await?, 2);
    assert_eq!(lifecycle.count(Visibility::default(), &Filter::new()).await?, 0);

    message.set("body", "Lunch on friday?");
    lifecycle.update(&mut message).await?;

    assert!(!lifecycle.is_pending(&message));
    assert_eq!(lifecycle.count(Visibility::default(), &Filter::new()).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_abandoned_draft_takes_children_with_it() -> Result<()> {
    let (store, lifecycle, clock) = setup(DependentAction::Destroy).await?;

    let abandoned = lifecycle.create_pending(attrs! {}).await?;
    add_recipient(&store, &abandoned, "alice").await?;

    let mut sent = lifecycle.create_pending(attrs! {}).await?;
    add_recipient(&store, &sent, "carol").await?;
    sent.set("body", "hello");
    lifecycle.update(&mut sent).await?;

    clock.advance(Duration::weeks(1) + Duration::minutes(1));
    lifecycle.collect_garbage().await?;

    assert_eq!(store.count("recipients", &recipients_of(&abandoned)).await?, 0);
    assert_eq!(store.count("recipients", &recipients_of(&sent)).await?, 1);
    assert_eq!(lifecycle.count_including_pending(&Filter::new()).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_delete_aborts_sweep() -> Result<()> {
    let (store, lifecycle, clock) = setup(DependentAction::Restrict).await?;

    let blocked = lifecycle.create_pending(attrs! {}).await?;
    add_recipient(&store, &blocked, "alice").await?;
    lifecycle.create_pending(attrs! {}).await?;

    clock.advance(Duration::days(8));
    let err = lifecycle.collect_garbage().await.unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));

    // The blocked record has the lowest id, so the sweep stopped before the
    // second one.
    assert_eq!(lifecycle.count_including_pending(&Filter::new()).await?, 2);

    let children = store
        .query("recipients", &recipients_of(&blocked), &FindOptions::new())
        .await?;
    for child in &children {
        store.delete(child).await?;
    }
    lifecycle.collect_garbage().await?;
    assert_eq!(lifecycle.count_including_pending(&Filter::new()).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_sweep_skips_records_removed_by_cascade() -> Result<()> {
    let clock = ManualClock::new(Utc::now());
    let store = Arc::new(InMemoryStore::with_clock(Arc::new(clock.clone())));
    store
        .create_table(
            TableSchema::new(
                "threads",
                vec![
                    Column::new("parent_id", DataType::Integer),
                    Column::new("pending", DataType::Boolean).default_value(false),
                ],
            )
            .timestamps()
            .dependent("threads", "parent_id", DependentAction::Destroy),
        )
        .await?;
    let lifecycle = PendingLifecycle::attach_with_clock(
        store.clone(),
        LifecycleConfig::new("threads"),
        Arc::new(clock.clone()),
    )
    .await?;

    let parent = lifecycle.create_pending(attrs! {}).await?;
    let parent_id = parent.id().map(|id| id.0 as i64);
    let reply = lifecycle
        .create_pending(attrs! { "parent_id" => parent_id })
        .await?;
    assert!(reply.id() > parent.id());

    clock.advance(Duration::days(8));
    lifecycle.collect_garbage().await?;
    assert_eq!(lifecycle.count_including_pending(&Filter::new()).await?, 0);

    lifecycle.collect_garbage().await?;
    Ok(())
}
