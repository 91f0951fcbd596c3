//! Refresh scheduling, staleness and cache upkeep

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{DecoHarness, EDITOR};
use jsdoc_deco::host::{EditorEvent, EditorId, InProcessHost, SimulatedEditor, TextEditor};
use jsdoc_deco::RefreshOutcome;

#[tokio::test]
async fn refreshing_an_unchanged_document_is_a_no_op() {
    let text = "const a = { /** hello */ x: 1 }; a.x";
    let harness = DecoHarness::open("/src/main.ts", "typescript", text).await;
    let revision = harness.sink.revision(EDITOR);
    let requests = harness.host.quickinfo_requests();

    let editor: Arc<dyn TextEditor> = harness.editor.clone();
    let controller = harness.extension.controller();
    assert_eq!(controller.refresh_now(editor.clone()).await, RefreshOutcome::Rendered(1));
    assert_eq!(controller.refresh_now(editor).await, RefreshOutcome::Rendered(1));

    assert_eq!(harness.sink.revision(EDITOR), revision);
    assert_eq!(harness.host.quickinfo_requests(), requests);
}

#[tokio::test(start_paused = true)]
async fn stale_fetch_results_are_discarded() {
    let host = Arc::new(InProcessHost::semantic().with_latency(Duration::from_millis(500)));
    let harness = DecoHarness::with_host(
        host,
        "/src/main.ts",
        "typescript",
        "const a = { /** one */ x: 1 }; a.x",
        None,
    )
    .await;
    assert_eq!(harness.sink.applied_texts(), vec!["one".to_string()]);

    // each version moves the member, so nothing is served from the cache
    harness.edit("const a = { /** two */ x: 1 };  a.x");
    // the reply for "two" is still on its way when the next edit lands
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(harness.host.quickinfo_requests(), 2);
    harness.edit("const a = { /** three */ x: 1 }; a.x");
    harness.settled().await;

    assert!(!harness.sink.applied_texts().contains(&"two".to_string()));
    assert_eq!(harness.shown(), vec![("a.x".to_string(), "three".to_string())]);
}

#[tokio::test]
async fn removed_access_is_pruned_from_the_cache() {
    let text = "const a = { /** hello */ x: 1, /** bye */ y: 2 };\na.x;\na.y;";
    let harness = DecoHarness::open("/src/main.ts", "typescript", text).await;
    let uri = harness.uri();
    assert_eq!(harness.extension.controller().cached_offsets(&uri).len(), 2);

    harness.edit("const a = { /** hello */ x: 1, /** bye */ y: 2 };\na.x;\n");
    harness.settled().await;

    let x_offset = text.find("a.x").unwrap() + 2;
    assert_eq!(harness.extension.controller().cached_offsets(&uri), vec![x_offset]);
    assert_eq!(harness.shown(), vec![("a.x".to_string(), "hello".to_string())]);
}

#[tokio::test]
async fn edited_documentation_at_the_same_offset_is_fetched_again() {
    let harness = DecoHarness::open(
        "/src/main.ts",
        "typescript",
        "const a = { /** one */ x: 1 }; a.x",
    )
    .await;
    assert_eq!(harness.shown(), vec![("a.x".to_string(), "one".to_string())]);

    harness.edit("const a = { /** two */ x: 1 }; a.x");
    harness.settled().await;

    assert_eq!(harness.host.quickinfo_requests(), 2);
    assert_eq!(harness.shown(), vec![("a.x".to_string(), "two".to_string())]);
}

#[tokio::test]
async fn const_turned_into_let_loses_its_decoration() {
    let harness = DecoHarness::open(
        "/src/main.ts",
        "typescript",
        "const a = { /** hello */ x: 1 }; a.x",
    )
    .await;
    assert_eq!(harness.shown().len(), 1);

    harness.edit("let   a = { /** hello */ x: 1 }; a.x");
    harness.settled().await;

    assert!(harness.shown().is_empty());
    assert!(harness.extension.controller().cached_offsets(&harness.uri()).is_empty());
}

#[tokio::test]
async fn deleted_comment_drops_the_cached_entry() {
    let harness = DecoHarness::open(
        "/src/main.ts",
        "typescript",
        "const a = { /** hello */ x: 1 }; a.x",
    )
    .await;

    harness.edit("const a = {              x: 1 }; a.x");
    harness.settled().await;

    assert!(harness.shown().is_empty());
    assert!(harness.extension.controller().cached_offsets(&harness.uri()).is_empty());
}

#[tokio::test]
async fn removing_every_access_empties_the_cache() {
    let harness = DecoHarness::open(
        "/src/main.ts",
        "typescript",
        "const a = { /** hello */ x: 1 }; a.x",
    )
    .await;
    harness.edit("const a = { /** hello */ x: 1 };");
    harness.settled().await;

    assert!(harness.extension.controller().cached_offsets(&harness.uri()).is_empty());
    assert!(harness.shown().is_empty());
}

#[tokio::test]
async fn offscreen_accesses_wait_until_scrolled_into_view() {
    let mut text = String::from("const a = { /** first */ x: 1, /** second */ y: 2 };\na.x;\n");
    text.push_str(&"\n".repeat(60));
    text.push_str("a.y;\n");
    let host = Arc::new(InProcessHost::semantic());
    let harness =
        DecoHarness::with_host(host, "/src/main.ts", "typescript", &text, Some((0, 20))).await;

    let uri = harness.uri();
    let y_offset = text.find("a.y").unwrap() + 2;
    assert_eq!(harness.host.quickinfo_requests(), 1);
    assert!(!harness
        .extension
        .controller()
        .cached_offsets(&uri)
        .contains(&y_offset));
    assert_eq!(harness.shown(), vec![("a.x".to_string(), "first".to_string())]);

    harness.scroll_to_lines(50, 70);
    harness.settled().await;

    assert_eq!(harness.host.quickinfo_requests(), 2);
    // the cached offscreen entry is still rendered
    assert_eq!(
        harness.shown(),
        vec![
            ("a.x".to_string(), "first".to_string()),
            ("a.y".to_string(), "second".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn a_burst_of_edits_runs_one_refresh() {
    let harness = DecoHarness::open(
        "/src/main.ts",
        "typescript",
        "const a = { /** hello */ x: 1 }; a.x",
    )
    .await;
    let before = harness.extension.controller().latest_request_id();

    for i in 0..5 {
        harness.edit(&format!("const a = {{ /** hello */ x: {} }}; a.x", i));
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
    harness.settled().await;

    assert_eq!(harness.extension.controller().latest_request_id(), before + 1);
    assert_eq!(harness.shown(), vec![("a.x".to_string(), "hello".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn switching_editors_refreshes_without_waiting() {
    let harness = DecoHarness::open(
        "/src/main.ts",
        "typescript",
        "const a = { /** hello */ x: 1 }; a.x",
    )
    .await;
    let controller = harness.extension.controller();
    let before = controller.latest_request_id();

    let other: Arc<dyn TextEditor> = SimulatedEditor::open(
        EditorId(2),
        harness.host.clone(),
        "/src/other.ts",
        "typescript",
        "const b = { /** there */ y: 1 }; b.y",
    );
    harness
        .extension
        .handle_event(EditorEvent::ActiveEditorChanged(Some(other)));
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(controller.latest_request_id(), before + 1);

    harness.settled().await;
    let shown = harness.sink.decorations(EditorId(2));
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].after.content_text, "there");
}

#[tokio::test(start_paused = true)]
async fn selection_changes_wait_for_the_debounce() {
    let harness = DecoHarness::open(
        "/src/main.ts",
        "typescript",
        "const a = { /** hello */ x: 1 }; a.x",
    )
    .await;
    let controller = harness.extension.controller();
    let before = controller.latest_request_id();

    let editor: Arc<dyn TextEditor> = harness.editor.clone();
    harness
        .extension
        .handle_event(EditorEvent::SelectionChanged(editor));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(controller.latest_request_id(), before);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(controller.latest_request_id(), before + 1);
    harness.settled().await;
    assert_eq!(harness.shown(), vec![("a.x".to_string(), "hello".to_string())]);
}

#[tokio::test]
async fn changes_to_other_documents_are_ignored() {
    let harness = DecoHarness::open(
        "/src/main.ts",
        "typescript",
        "const a = { /** hello */ x: 1 }; a.x",
    )
    .await;
    let before = harness.extension.controller().latest_request_id();

    harness.extension.handle_event(EditorEvent::ContentChanged {
        uri: "file:///src/other.ts".to_string(),
    });
    harness.settled().await;
    assert_eq!(harness.extension.controller().latest_request_id(), before);
}

#[tokio::test]
async fn closing_the_document_releases_its_cache() {
    let harness = DecoHarness::open(
        "/src/main.ts",
        "typescript",
        "const a = { /** hello */ x: 1 }; a.x",
    )
    .await;
    let uri = harness.uri();
    assert!(!harness.extension.controller().cached_offsets(&uri).is_empty());

    harness.editor.close();
    harness
        .extension
        .handle_event(EditorEvent::DocumentClosed { uri: uri.clone() });
    assert!(harness.extension.controller().cached_offsets(&uri).is_empty());
}

#[tokio::test]
async fn switching_to_an_unsupported_editor_clears_it() {
    let harness = DecoHarness::open(
        "/src/main.ts",
        "typescript",
        "const a = { /** hello */ x: 1 }; a.x",
    )
    .await;
    let other = SimulatedEditor::open(
        EditorId(2),
        harness.host.clone(),
        "/src/notes.md",
        "markdown",
        "a.x",
    );
    let requests = harness.host.quickinfo_requests();
    let other: Arc<dyn TextEditor> = other;
    harness
        .extension
        .handle_event(EditorEvent::ActiveEditorChanged(Some(other)));
    harness.settled().await;

    assert_eq!(harness.host.quickinfo_requests(), requests);
    assert!(harness.sink.decorations(EditorId(2)).is_empty());
}
