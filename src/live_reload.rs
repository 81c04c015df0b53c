use std::path::PathBuf;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use notify_debouncer_full::{
    new_debouncer,
    notify::{Error as NotifyError, RecursiveMode, Watcher},
    DebouncedEvent,
};
use tracing::{debug, error, info};

use crate::state::ReloadBroadcaster;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(tx): State<ReloadBroadcaster>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, tx))
}

async fn handle_socket(mut socket: WebSocket, tx: ReloadBroadcaster) {
    let mut rx = tx.subscribe();

    // Wait for a change signal, tell the browser to refresh, then drop the
    // socket. Content is re-read per request, so nothing else to do here.
    if rx.recv().await.is_ok() {
        if socket.send(Message::Text("reload".to_string().into())).await.is_err() {
            debug!("client disconnected before reload message could be sent");
        }
    }
}

/// Watches the content directory and broadcasts to connected browsers when
/// files change. Development only.
pub fn start_content_watcher(tx: ReloadBroadcaster, content_dir: PathBuf) {
    info!("starting content watcher for live reload");
    tokio::spawn(async move {
        let (watcher_tx, mut watcher_rx) = tokio::sync::mpsc::channel(1);

        let mut debouncer = match new_debouncer(
            Duration::from_millis(200),
            None,
            move |res: Result<Vec<DebouncedEvent>, Vec<NotifyError>>| match res {
                Ok(events) => {
                    let relevant = events.iter().any(|event| {
                        let is_relevant_kind = event.kind.is_modify()
                            || event.kind.is_create()
                            || event.kind.is_remove();
                        if !is_relevant_kind {
                            return false;
                        }
                        // Skip editor temp files (Emacs .#locks, ~ backups)
                        let is_temp_file = event.event.paths.iter().any(|path| {
                            path.file_name()
                                .and_then(|name| name.to_str())
                                .map_or(false, |s| s.starts_with(".#") || s.ends_with('~'))
                        });
                        !is_temp_file
                    });

                    if relevant {
                        debug!(
                            "content change detected: {:?}",
                            events
                                .iter()
                                .flat_map(|e| &e.event.paths)
                                .map(|p| p.display())
                                .collect::<Vec<_>>()
                        );
                        if let Err(e) = watcher_tx.blocking_send(()) {
                            error!("failed to forward watcher event: {e}");
                        }
                    }
                }
                Err(errors) => {
                    for e in errors {
                        error!("watcher error: {e}");
                    }
                }
            },
        ) {
            Ok(debouncer) => debouncer,
            Err(e) => {
                error!("failed to create content watcher: {e}");
                return;
            }
        };

        if let Err(e) = debouncer
            .watcher()
            .watch(content_dir.as_ref(), RecursiveMode::Recursive)
        {
            error!("failed to watch {}: {e}", content_dir.display());
            return;
        }

        while watcher_rx.recv().await.is_some() {
            info!("content changed, notifying connected browsers");
            if let Err(e) = tx.send(()) {
                debug!("no live-reload subscribers: {e}");
            }
        }
    });
}
