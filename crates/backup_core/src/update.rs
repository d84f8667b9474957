use engine_logging::{engine_info, engine_trace, engine_warn};

use crate::{AppState, Effect, Msg, SessionPhase};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartRequested(request) => {
            let mut effects = Vec::with_capacity(2);
            let previous = state.session();
            if previous.phase().is_active() {
                // Only one consumer may feed a session; stop the old one first.
                engine_info!(
                    "Session {} superseded by a new start request",
                    previous.session_id()
                );
                effects.push(Effect::CancelStream {
                    session_id: previous.session_id(),
                });
            }
            let session_id = state.begin_session(request.clone());
            engine_info!(
                "Session {} connecting: {} tenant(s) into schema {}",
                session_id,
                request.tenant_ids.len(),
                request.to_schema
            );
            effects.push(Effect::OpenStream {
                session_id,
                request,
            });
            effects
        }
        Msg::StreamOpened { session_id } => {
            let session = state.session_mut();
            if session.accepts(session_id) && session.phase() == SessionPhase::Connecting {
                session.mark_streaming();
                state.mark_dirty();
            } else {
                engine_trace!("Ignoring stale StreamOpened for session {}", session_id);
            }
            Vec::new()
        }
        Msg::ChunkReceived { session_id, chunk } => {
            let session = state.session_mut();
            if session.accepts(session_id) && session.phase() == SessionPhase::Streaming {
                engine_trace!("Session {} chunk of {} bytes", session_id, chunk.len());
                let effects = session.ingest_chunk(&chunk);
                state.mark_dirty();
                effects
            } else {
                engine_trace!("Dropping chunk for inactive session {}", session_id);
                Vec::new()
            }
        }
        Msg::StreamEnded { session_id } => {
            let session = state.session_mut();
            if session.accepts(session_id) && session.phase() == SessionPhase::Streaming {
                let effects = session.finish_stream();
                state.mark_dirty();
                effects
            } else {
                Vec::new()
            }
        }
        Msg::StreamFailed {
            session_id,
            message,
            timestamp,
        } => {
            let session = state.session_mut();
            if session.accepts(session_id) && session.phase().is_active() {
                engine_warn!("Session {} failed: {}", session_id, message);
                session.fail(message, timestamp);
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::CancelRequested { timestamp } => {
            let session = state.session_mut();
            if session.phase().is_active() {
                let session_id = session.session_id();
                engine_info!("Session {} cancelled by operator", session_id);
                session.cancel(timestamp);
                state.mark_dirty();
                vec![Effect::CancelStream { session_id }]
            } else {
                Vec::new()
            }
        }
        Msg::DownloadRequested => match state.session_mut().request_manual_download() {
            Some(effect) => {
                state.mark_dirty();
                vec![effect]
            }
            None => Vec::new(),
        },
        Msg::DownloadFinished { session_id, result } => {
            let session = state.session_mut();
            if session.accepts(session_id) && session.phase() != SessionPhase::Cancelled {
                session.apply_download_result(result);
                state.mark_dirty();
            } else {
                engine_info!(
                    "Discarding download outcome for session {}: {:?}",
                    session_id,
                    result
                );
            }
            Vec::new()
        }
        Msg::Reset => {
            let session = state.session();
            let effects = if session.phase().is_active() {
                vec![Effect::CancelStream {
                    session_id: session.session_id(),
                }]
            } else {
                Vec::new()
            };
            state.clear_session();
            effects
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
