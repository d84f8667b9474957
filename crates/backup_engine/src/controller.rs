use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use backup_core::{
    update, AppState, BackupRequest, DbConfig, DbTestResponse, Effect, Msg, SessionId,
    SessionView,
};
use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{ArchiveDownloader, FailureKind, ReqwestTransport, ServiceSettings, Transport, TransportError};

/// Produces the ISO-8601 timestamp stamped on locally generated events.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

/// Runs backup sessions against a [`Transport`] and publishes their state.
///
/// All state changes go through [`backup_core::update`] under one lock, so
/// the stream pump, operator commands and download completions never
/// interleave inside a message. Readers get whole [`SessionView`] snapshots.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    downloader: ArchiveDownloader,
    clock: Clock,
    runtime: Handle,
    dispatch_order: Mutex<()>,
    state: Mutex<AppState>,
    active: Mutex<Option<ActiveRun>>,
    view_tx: watch::Sender<SessionView>,
}

struct ActiveRun {
    session_id: SessionId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionController {
    /// Creates a controller bound to the current Tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn new(transport: Arc<dyn Transport>, settings: &ServiceSettings, clock: Clock) -> Self {
        Self::with_runtime(transport, settings, clock, Handle::current())
    }

    pub fn with_runtime(
        transport: Arc<dyn Transport>,
        settings: &ServiceSettings,
        clock: Clock,
        runtime: Handle,
    ) -> Self {
        let state = AppState::new();
        let (view_tx, _) = watch::channel(state.view());
        let downloader = ArchiveDownloader::new(transport.clone(), settings.download_dir.clone());
        Self {
            inner: Arc::new(Inner {
                transport,
                downloader,
                clock,
                runtime,
                dispatch_order: Mutex::new(()),
                state: Mutex::new(state),
                active: Mutex::new(None),
                view_tx,
            }),
        }
    }

    /// Controller talking HTTP to the service described by `settings`.
    pub fn over_http(settings: ServiceSettings, clock: Clock) -> Self {
        let transport = Arc::new(ReqwestTransport::new(settings.clone()));
        Self::new(transport, &settings, clock)
    }

    /// Starts a new session, cancelling any active one first.
    pub fn start(&self, request: BackupRequest) -> SessionId {
        self.dispatch(Msg::StartRequested(request));
        self.view().session_id
    }

    pub fn cancel(&self) {
        let timestamp = (self.inner.clock)();
        self.dispatch(Msg::CancelRequested { timestamp });
    }

    /// Re-downloads the recorded archive. Returns `false` when there is none yet.
    pub fn download_now(&self) -> bool {
        self.dispatch(Msg::DownloadRequested)
            .iter()
            .any(|effect| matches!(effect, Effect::TriggerDownload { .. }))
    }

    /// Drops the session entirely, as when the presentation layer goes away.
    pub fn reset(&self) {
        self.dispatch(Msg::Reset);
    }

    pub fn view(&self) -> SessionView {
        self.inner.view_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.inner.view_tx.subscribe()
    }

    /// Waits until no stream is consumed and no download is in flight.
    pub async fn settled(&self) -> SessionView {
        let mut rx = self.subscribe();
        let result = rx
            .wait_for(|view| !view.phase.is_active() && !view.downloading)
            .await
            .map(|view| view.clone());
        match result {
            Ok(view) => view,
            Err(_) => self.view(),
        }
    }

    pub async fn test_connection(&self, config: &DbConfig) -> Result<DbTestResponse, TransportError> {
        self.inner.transport.test_connection(config).await
    }

    fn dispatch(&self, msg: Msg) -> Vec<Effect> {
        // Effects touch `active`, so they must run in the order `update` produced them.
        let _order = lock(&self.inner.dispatch_order);
        let effects = {
            let mut guard = lock(&self.inner.state);
            let state = std::mem::take(&mut *guard);
            let (mut state, effects) = update(state, msg);
            if state.is_dirty() {
                self.inner.view_tx.send_replace(state.view());
                state.consume_dirty();
            }
            *guard = state;
            effects
        };

        for effect in &effects {
            self.run_effect(effect.clone());
        }
        effects
    }

    fn run_effect(&self, effect: Effect) {
        match effect {
            Effect::OpenStream {
                session_id,
                request,
            } => {
                let cancel = CancellationToken::new();
                let previous = lock(&self.inner.active).take();
                let controller = self.clone();
                let token = cancel.clone();
                let task = self.inner.runtime.spawn(async move {
                    if let Some(previous) = previous {
                        // The old consumer must be gone before the new one reads.
                        previous.cancel.cancel();
                        let _ = previous.task.await;
                    }
                    controller.pump(session_id, request, token).await;
                });
                *lock(&self.inner.active) = Some(ActiveRun {
                    session_id,
                    cancel,
                    task,
                });
            }
            Effect::CancelStream { session_id } => {
                if let Some(run) = lock(&self.inner.active).as_ref() {
                    if run.session_id == session_id {
                        run.cancel.cancel();
                    }
                }
            }
            Effect::TriggerDownload {
                session_id,
                request,
                origin,
            } => {
                engine_info!(
                    "Session {} {:?} download of archive {}",
                    session_id,
                    origin,
                    request.archive_id
                );
                let controller = self.clone();
                self.inner.runtime.spawn(async move {
                    let result = controller
                        .inner
                        .downloader
                        .download(&request)
                        .await
                        .map(|saved| saved.path.display().to_string())
                        .map_err(|err| {
                            engine_warn!("Download of {} failed: {}", request.archive_id, err);
                            err.to_string()
                        });
                    controller.dispatch(Msg::DownloadFinished { session_id, result });
                });
            }
        }
    }

    async fn pump(&self, session_id: SessionId, request: BackupRequest, cancel: CancellationToken) {
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            opened = self.inner.transport.start_backup(&request, &cancel) => opened,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(err) if err.kind == FailureKind::Cancelled => return,
            Err(err) => {
                self.fail(session_id, err);
                return;
            }
        };
        self.dispatch(Msg::StreamOpened { session_id });

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    engine_debug!("Session {} stopped reading after cancellation", session_id);
                    return;
                }
                next = stream.next() => next,
            };
            match next {
                Some(Ok(chunk)) => {
                    if cancel.is_cancelled() {
                        return;
                    }
                    self.dispatch(Msg::ChunkReceived {
                        session_id,
                        chunk: chunk.to_vec(),
                    });
                }
                Some(Err(err)) => {
                    self.fail(session_id, err);
                    return;
                }
                None => {
                    self.dispatch(Msg::StreamEnded { session_id });
                    return;
                }
            }
        }
    }

    fn fail(&self, session_id: SessionId, err: TransportError) {
        let timestamp = (self.inner.clock)();
        self.dispatch(Msg::StreamFailed {
            session_id,
            message: err.message,
            timestamp,
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
