use std::sync::Once;

use backup_core::{
    update, AppState, BackupForm, BackupRequest, DownloadOrigin, DownloadOutcome,
    DownloadRequest, Effect, Msg, SessionId, SessionPhase, StreamEvent, CANCELLED_EVENT_MESSAGE,
    STATUS_CANCELLED, STATUS_COMPLETE, STATUS_CONNECTED, STATUS_CONNECTING,
    STATUS_DOWNLOAD_STARTING,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn request() -> BackupRequest {
    BackupForm {
        tenant_ids: "tenant1, tenant2".to_string(),
        to_schema: "my_backup".to_string(),
        password: "secret".to_string(),
        db: None,
    }
    .to_request()
}

fn start(state: AppState) -> (AppState, SessionId) {
    let (state, effects) = update(state, Msg::StartRequested(request()));
    let session_id = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::OpenStream { session_id, .. } => Some(*session_id),
            _ => None,
        })
        .expect("open stream effect");
    let (state, _) = update(state, Msg::StreamOpened { session_id });
    (state, session_id)
}

fn chunk(state: AppState, session_id: SessionId, text: &str) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::ChunkReceived {
            session_id,
            chunk: text.as_bytes().to_vec(),
        },
    )
}

const ARCHIVE_LOG: &str = "event: log\ndata: {\"type\":\"log\",\"level\":\"info\",\"message\":\"Archive ID: abc-123\",\"timestamp\":\"t1\"}\n\n";
const PROGRESS: &str = "event: progress\ndata: {\"type\":\"progress\",\"step\":\"archive\",\"current\":1,\"total\":2,\"message\":\"Packing\",\"timestamp\":\"t2\"}\n\n";
const COMPLETE: &str = "event: complete\ndata: {\"type\":\"complete\",\"success\":true,\"summary\":{\"schema\":\"my_backup\",\"totalFiles\":2,\"successfulDownloads\":2,\"failedDownloads\":0,\"duration\":10,\"archiveId\":\"abc-123\"},\"timestamp\":\"t3\"}\n\n";

fn download_effects(effects: &[Effect]) -> Vec<(DownloadRequest, DownloadOrigin)> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::TriggerDownload {
                request, origin, ..
            } => Some((request.clone(), *origin)),
            _ => None,
        })
        .collect()
}

#[test]
fn start_resets_and_connects() {
    init_logging();
    let (state, effects) = update(AppState::new(), Msg::StartRequested(request()));
    let view = state.view();

    assert_eq!(view.phase, SessionPhase::Connecting);
    assert_eq!(view.status, STATUS_CONNECTING);
    assert!(view.dirty);
    assert_eq!(
        effects,
        vec![Effect::OpenStream {
            session_id: 1,
            request: BackupRequest {
                tenant_ids: vec!["tenant1".to_string(), "tenant2".to_string()],
                to_schema: "my_backup".to_string(),
                password: "secret".to_string(),
                db: None,
            },
        }]
    );

    let (state, _) = update(state, Msg::StreamOpened { session_id: 1 });
    assert_eq!(state.view().phase, SessionPhase::Streaming);
    assert_eq!(state.view().status, STATUS_CONNECTED);
}

#[test]
fn archive_id_recorded_once_and_download_fires_once() {
    init_logging();
    let (state, session_id) = start(AppState::new());

    let (state, first) = chunk(state, session_id, ARCHIVE_LOG);
    let (state, second) = chunk(state, session_id, PROGRESS);
    let (state, third) = chunk(state, session_id, COMPLETE);
    let (state, ended) = update(state, Msg::StreamEnded { session_id });

    let mut all = first;
    all.extend(second);
    all.extend(third);
    all.extend(ended);
    assert_eq!(
        download_effects(&all),
        vec![(
            DownloadRequest {
                archive_id: "abc-123".to_string(),
                password: "secret".to_string(),
                file_name: "my_backup".to_string(),
            },
            DownloadOrigin::Automatic
        )]
    );

    let view = state.view();
    assert_eq!(view.phase, SessionPhase::Completed);
    assert_eq!(view.archive_id.as_deref(), Some("abc-123"));
    assert!(view.download_triggered);
    assert_eq!(view.events.len(), 3);
    assert_eq!(view.status, STATUS_COMPLETE);
    assert_eq!(view.progress_percent, Some(50.0));
}

#[test]
fn status_reflects_download_start_after_archive_log() {
    init_logging();
    let (state, session_id) = start(AppState::new());
    let (state, _) = chunk(state, session_id, ARCHIVE_LOG);
    let view = state.view();
    assert_eq!(view.status, STATUS_DOWNLOAD_STARTING);
    assert!(view.downloading);
    assert!(!view.can_download);
}

#[test]
fn events_split_across_chunks_are_applied_in_order() {
    init_logging();
    let (mut state, session_id) = start(AppState::new());
    let feed = format!("{PROGRESS}data: {{broken\n{ARCHIVE_LOG}");
    for piece in feed.as_bytes().chunks(7) {
        let (next, _) = update(
            state,
            Msg::ChunkReceived {
                session_id,
                chunk: piece.to_vec(),
            },
        );
        state = next;
    }
    let view = state.view();
    assert_eq!(view.events.len(), 2);
    assert!(matches!(view.events[0], StreamEvent::Progress(_)));
    assert!(matches!(view.events[1], StreamEvent::Log(_)));
    assert_eq!(view.archive_id.as_deref(), Some("abc-123"));
}

#[test]
fn unterminated_final_event_is_applied_at_end_of_stream() {
    init_logging();
    let (state, session_id) = start(AppState::new());
    let (state, effects) = chunk(state, session_id, COMPLETE.trim_end());
    assert!(effects.is_empty());
    assert!(state.view().events.is_empty());

    let (state, effects) = update(state, Msg::StreamEnded { session_id });
    assert_eq!(download_effects(&effects).len(), 1);
    assert_eq!(state.view().events.len(), 1);
    assert_eq!(state.view().phase, SessionPhase::Completed);
}

#[test]
fn failed_downloads_accumulate() {
    init_logging();
    let (state, session_id) = start(AppState::new());
    let line = |id: &str| {
        format!(
            "data: {{\"type\":\"log\",\"level\":\"error\",\"message\":\"Failed to download file {id} $$/data/{id}.bin$$\",\"timestamp\":\"t\"}}\n"
        )
    };
    let (state, _) = chunk(state, session_id, &line("f1"));
    let (state, _) = chunk(state, session_id, &line("f2"));
    let view = state.view();
    let ids: Vec<_> = view
        .failed_downloads
        .iter()
        .map(|failed| failed.file_id.as_str())
        .collect();
    assert_eq!(ids, vec!["f1", "f2"]);
    assert_eq!(view.failed_downloads[1].path, "/data/f2.bin");
    // Error-level logs leave the status alone.
    assert_eq!(view.status, STATUS_CONNECTED);
}

#[test]
fn cancel_mid_stream_appends_single_entry_and_stops_mutation() {
    init_logging();
    let (state, session_id) = start(AppState::new());
    let (state, _) = chunk(state, session_id, PROGRESS);

    let (state, effects) = update(
        state,
        Msg::CancelRequested {
            timestamp: "t-cancel".to_string(),
        },
    );
    assert_eq!(effects, vec![Effect::CancelStream { session_id }]);

    let (state, effects) = chunk(state, session_id, ARCHIVE_LOG);
    assert!(effects.is_empty());
    let (state, _) = update(state, Msg::StreamEnded { session_id });
    let (state, _) = update(
        state,
        Msg::StreamFailed {
            session_id,
            message: "connection reset".to_string(),
            timestamp: "t".to_string(),
        },
    );

    let view = state.view();
    assert_eq!(view.phase, SessionPhase::Cancelled);
    assert_eq!(view.status, STATUS_CANCELLED);
    assert_eq!(view.events.len(), 2);
    assert_eq!(
        view.events[1],
        StreamEvent::error(CANCELLED_EVENT_MESSAGE, "t-cancel")
    );
    assert_eq!(view.archive_id, None);
}

#[test]
fn cancel_while_connecting_is_cancelled_not_failed() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::StartRequested(request()));
    let (state, effects) = update(
        state,
        Msg::CancelRequested {
            timestamp: "t".to_string(),
        },
    );
    assert_eq!(effects, vec![Effect::CancelStream { session_id: 1 }]);
    assert_eq!(state.view().phase, SessionPhase::Cancelled);

    let (state, _) = update(state, Msg::StreamOpened { session_id: 1 });
    assert_eq!(state.view().phase, SessionPhase::Cancelled);
}

#[test]
fn cancel_when_idle_is_a_noop() {
    init_logging();
    let (mut state, effects) = update(
        AppState::new(),
        Msg::CancelRequested {
            timestamp: "t".to_string(),
        },
    );
    assert!(effects.is_empty());
    assert!(!state.consume_dirty());
    assert_eq!(state.view().phase, SessionPhase::Idle);
}

#[test]
fn transport_fault_fails_the_session() {
    init_logging();
    let (state, session_id) = start(AppState::new());
    let (state, _) = update(
        state,
        Msg::StreamFailed {
            session_id,
            message: "HTTP error! status: 500".to_string(),
            timestamp: "t9".to_string(),
        },
    );
    let view = state.view();
    assert_eq!(view.phase, SessionPhase::Failed);
    assert_eq!(view.status, "Falha na conexão: HTTP error! status: 500");
    assert_eq!(
        view.events,
        vec![StreamEvent::error("HTTP error! status: 500", "t9")]
    );
    assert!(view.can_start);
}

#[test]
fn new_start_resets_everything() {
    init_logging();
    let (state, session_id) = start(AppState::new());
    let (state, _) = chunk(state, session_id, ARCHIVE_LOG);
    let (state, _) = chunk(
        state,
        session_id,
        "data: {\"type\":\"log\",\"level\":\"error\",\"message\":\"Failed to download file f1 $$/x$$\",\"timestamp\":\"t\"}\n",
    );
    let (state, _) = update(state, Msg::StreamEnded { session_id });

    let (state, effects) = update(state, Msg::StartRequested(request()));
    assert_eq!(effects.len(), 1, "terminal session needs no cancel");
    let view = state.view();
    assert_eq!(view.session_id, 2);
    assert!(view.events.is_empty());
    assert_eq!(view.archive_id, None);
    assert!(!view.download_triggered);
    assert!(view.failed_downloads.is_empty());
    assert_eq!(view.latest_progress, None);
}

#[test]
fn start_while_streaming_cancels_previous_consumer_and_ignores_its_chunks() {
    init_logging();
    let (state, old_id) = start(AppState::new());
    let (state, effects) = update(state, Msg::StartRequested(request()));
    assert_eq!(effects[0], Effect::CancelStream { session_id: old_id });
    assert!(matches!(
        effects[1],
        Effect::OpenStream { session_id: 2, .. }
    ));

    let (state, _) = update(state, Msg::StreamOpened { session_id: 2 });
    let (state, effects) = chunk(state, old_id, ARCHIVE_LOG);
    assert!(effects.is_empty());
    assert!(state.view().events.is_empty());
    assert_eq!(state.view().phase, SessionPhase::Streaming);
}

#[test]
fn manual_download_is_independent_of_automatic_latch() {
    init_logging();
    let (state, session_id) = start(AppState::new());
    let (state, _) = update(state, Msg::DownloadRequested);
    assert!(state.view().archive_id.is_none());

    let (state, auto) = chunk(state, session_id, ARCHIVE_LOG);
    assert_eq!(download_effects(&auto)[0].1, DownloadOrigin::Automatic);
    let (state, _) = update(
        state,
        Msg::DownloadFinished {
            session_id,
            result: Ok("/tmp/my_backup.tar.gz".to_string()),
        },
    );
    assert_eq!(
        state.view().status,
        "Download concluído: /tmp/my_backup.tar.gz"
    );

    let (state, manual) = update(state, Msg::DownloadRequested);
    assert_eq!(download_effects(&manual)[0].1, DownloadOrigin::Manual);
    let (state, again) = update(
        state,
        Msg::DownloadFinished {
            session_id,
            result: Err("HTTP error! status: 404".to_string()),
        },
    );
    assert!(again.is_empty());
    let view = state.view();
    assert_eq!(view.status, "Falha no download: HTTP error! status: 404");
    assert_eq!(
        view.last_download,
        Some(DownloadOutcome::Failed {
            message: "HTTP error! status: 404".to_string()
        })
    );
    let (_state, manual) = update(state, Msg::DownloadRequested);
    assert_eq!(download_effects(&manual).len(), 1);
}

#[test]
fn download_outcome_ignored_after_cancellation() {
    init_logging();
    let (state, session_id) = start(AppState::new());
    let (state, _) = chunk(state, session_id, ARCHIVE_LOG);
    let (state, _) = update(
        state,
        Msg::CancelRequested {
            timestamp: "t".to_string(),
        },
    );
    let (state, _) = update(
        state,
        Msg::DownloadFinished {
            session_id,
            result: Ok("/tmp/x.tar.gz".to_string()),
        },
    );
    assert_eq!(state.view().status, STATUS_CANCELLED);
    assert_eq!(state.view().last_download, None);
}

#[test]
fn reset_cancels_active_stream_and_returns_to_idle() {
    init_logging();
    let (state, session_id) = start(AppState::new());
    let (state, _) = chunk(state, session_id, PROGRESS);
    let (state, effects) = update(state, Msg::Reset);
    assert_eq!(effects, vec![Effect::CancelStream { session_id }]);
    let view = state.view();
    assert_eq!(view.phase, SessionPhase::Idle);
    assert!(view.events.is_empty());

    let (_, effects) = update(state, Msg::Reset);
    assert!(effects.is_empty());
}
