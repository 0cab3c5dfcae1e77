// tests/remote_protocol.rs
//! Inventory pagination and batching, and the writer's chunking and skips.

mod common;

use clipsync::{
    group_by_source, AppendGroup, BatchPolicy, ContentBlock, InventoryFetcher, LogLevel,
    RemoteWriter, RetryPolicy, SourceKey, WriteStatus,
};
use common::{clip, data_source, Call, FakeNotion, RecordingSink};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

fn fetcher(repo: &std::sync::Arc<FakeNotion>, batch_size: usize) -> InventoryFetcher {
    InventoryFetcher::new(
        repo.clone(),
        BatchPolicy::new(batch_size, Duration::ZERO),
        RetryPolicy::none(),
    )
}

#[tokio::test]
async fn listing_follows_every_page_and_stops_at_the_last() {
    let repo = FakeNotion::new();
    for n in 0..250 {
        repo.add_page(&format!("Book {n}"), "Author", &[]);
    }

    let inventory = fetcher(&repo, 5).fetch_all(&data_source()).await.unwrap();

    assert_eq!(inventory.items.len(), 250);
    let unique: HashSet<SourceKey> = inventory.items.iter().map(|i| i.key()).collect();
    assert_eq!(unique.len(), 250);

    let listing: Vec<Option<String>> = repo
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::ListEntities { cursor } => Some(cursor),
            _ => None,
        })
        .collect();
    assert_eq!(
        listing,
        vec![None, Some("100".to_string()), Some("200".to_string())]
    );
}

#[tokio::test]
async fn page_content_is_read_to_completion_in_order() {
    let repo = FakeNotion::new();
    let contents: Vec<String> = (0..230).map(|n| format!("quote {n}")).collect();
    let mut blocks: Vec<ContentBlock> = contents.iter().map(ContentBlock::quote).collect();
    blocks.insert(
        50,
        ContentBlock::Other {
            kind: "paragraph".to_string(),
        },
    );
    let id = repo.add_raw_page(Some("Dune"), Some("Frank Herbert"), blocks);

    let inventory = fetcher(&repo, 5).fetch_all(&data_source()).await.unwrap();

    let item = &inventory.items[0];
    assert_eq!(item.id, Some(id.clone()));
    assert_eq!(item.contents, contents.into_iter().collect::<HashSet<_>>());
    let content_requests = repo
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::ListContent { page, .. } if *page == id))
        .count();
    assert_eq!(content_requests, 3);
}

#[tokio::test]
async fn content_reads_run_in_bounded_batches() {
    let repo = FakeNotion::new();
    for n in 0..12 {
        repo.add_page(&format!("Book {n}"), "Author", &["q"]);
    }

    let inventory = fetcher(&repo, 5).fetch_all(&data_source()).await.unwrap();

    assert_eq!(inventory.items.len(), 12);
    assert_eq!(repo.max_concurrent_reads(), 5);
}

#[tokio::test(start_paused = true)]
async fn batches_after_the_first_wait_for_the_delay() {
    let repo = FakeNotion::new();
    for n in 0..12 {
        repo.add_page(&format!("Book {n}"), "Author", &["q"]);
    }
    let delay = Duration::from_millis(200);
    let fetcher = InventoryFetcher::new(
        repo.clone(),
        BatchPolicy::new(5, delay),
        RetryPolicy::none(),
    );

    let start = Instant::now();
    let inventory = fetcher.fetch_all(&data_source()).await.unwrap();

    assert_eq!(inventory.items.len(), 12);
    // Three batches of 5, 5 and 2 pages: two pauses.
    assert_eq!(start.elapsed(), delay * 2);

    let offsets: Vec<Duration> = repo
        .content_read_starts()
        .into_iter()
        .map(|(_, at)| at - start)
        .collect();
    assert_eq!(offsets.len(), 12);
    assert!(offsets[..5].iter().all(|d| d.is_zero()));
    assert!(offsets[5..10].iter().all(|d| *d == delay));
    assert!(offsets[10..].iter().all(|d| *d == delay * 2));
}

#[tokio::test]
async fn pages_without_title_are_skipped() {
    let repo = FakeNotion::new();
    repo.add_raw_page(None, Some("Anon"), vec![ContentBlock::quote("x")]);
    repo.add_raw_page(Some("Emma"), None, vec![ContentBlock::quote("y")]);

    let inventory = fetcher(&repo, 5).fetch_all(&data_source()).await.unwrap();

    assert_eq!(inventory.skipped_inconsistent, 1);
    assert_eq!(inventory.items.len(), 1);
    assert_eq!(inventory.items[0].title, "Emma");
    assert_eq!(inventory.items[0].author, "");
}

#[tokio::test]
async fn one_unreadable_page_leaves_the_rest_of_the_inventory() {
    let repo = FakeNotion::new();
    repo.add_page("Dune", "Frank Herbert", &["a"]);
    let broken = repo.add_page("Emma", "Jane Austen", &["b"]);
    repo.add_page("Ulysses", "James Joyce", &["c"]);
    repo.make_unreadable(&broken);

    let inventory = fetcher(&repo, 2).fetch_all(&data_source()).await.unwrap();

    let titles: Vec<&str> = inventory.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Dune", "Ulysses"]);
    assert_eq!(inventory.unresolved.len(), 1);
    assert_eq!(inventory.unresolved[0].id, broken);
    assert_eq!(
        inventory.unresolved_keys(),
        HashSet::from([SourceKey::new("emma", "jane austen")])
    );
}

#[tokio::test]
async fn creating_250_clippings_appends_in_three_chunks() {
    let repo = FakeNotion::new();
    let sink = RecordingSink::new();
    let local: Vec<_> = (0..250)
        .map(|n| clip("Dune", "Frank Herbert", &format!("quote {n}")))
        .collect();
    let group = group_by_source(&local).remove(0);
    let ds = data_source();

    let writer = RemoteWriter::new(repo.as_ref(), &ds, sink.as_ref(), RetryPolicy::none());
    let id = writer.create(&group).await.unwrap();

    assert_eq!(repo.creates(), vec!["Dune"]);
    assert_eq!(repo.append_sizes(), vec![100, 100, 50]);
    let page = repo.page("Dune").unwrap();
    assert_eq!(page.id, id);
    assert_eq!(page.quotes().len(), 250);
    assert_eq!(page.quotes()[249], "quote 249");
}

#[tokio::test]
async fn append_groups_without_a_page_id_are_skipped() {
    let repo = FakeNotion::new();
    let existing = repo.add_page("Emma", "Jane Austen", &[]);
    let sink = RecordingSink::new();
    let ds = data_source();

    let groups = group_by_source(&[
        clip("Dune", "Frank Herbert", "a"),
        clip("Emma", "Jane Austen", "b"),
    ]);
    let appends = vec![
        AppendGroup {
            remote_id: None,
            group: groups[0].clone(),
        },
        AppendGroup {
            remote_id: Some(existing),
            group: groups[1].clone(),
        },
    ];

    let writer = RemoteWriter::new(repo.as_ref(), &ds, sink.as_ref(), RetryPolicy::none());
    let outcomes = writer.append_all(&appends).await;

    assert!(matches!(outcomes[0].status, WriteStatus::Skipped { .. }));
    assert!(outcomes[1].is_success());
    assert_eq!(repo.append_sizes(), vec![1]);
    assert_eq!(
        sink.messages(LogLevel::Warn),
        vec!["Skipping \"Dune\" as it does not have a remote page ID."]
    );
    assert!(sink.saw("Appended clippings to 1 of 2 existing items."));
}

#[tokio::test]
async fn an_empty_create_batch_says_so() {
    let repo = FakeNotion::new();
    let sink = RecordingSink::new();
    let ds = data_source();

    let writer = RemoteWriter::new(repo.as_ref(), &ds, sink.as_ref(), RetryPolicy::none());
    assert!(writer.create_all(&[]).await.is_empty());
    assert!(sink.saw("No new items to create."));
    assert!(repo.calls().is_empty());
}
