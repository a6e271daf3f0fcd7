use std::future::Future;
use std::time::Duration;

use roomshare_contract::SharedRecord;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::service::ClassroomService;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Keeps a classroom device's list current.
///
/// `on_snapshot` gets the room's records right away, on every poll tick, and
/// whenever this process shares to or clears the room. Returns once
/// `shutdown` resolves.
pub async fn watch_room<S, F>(
    service: &ClassroomService,
    room_number: &str,
    poll_interval: Duration,
    shutdown: S,
    mut on_snapshot: F,
) where
    S: Future<Output = ()>,
    F: FnMut(&[SharedRecord]),
{
    let mut updates = service.subscribe();
    let mut ticker = tokio::time::interval(poll_interval.max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    info!(room = %room_number, interval = ?poll_interval, "watching room");
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
            update = updates.recv() => match update {
                Ok(update) if update.room_number() == room_number => {}
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "room update bus lagged, reloading");
                }
                Err(RecvError::Closed) => break,
            },
        }

        let records = service.room_contents(room_number).await;
        on_snapshot(&records);
    }
    info!(room = %room_number, "stopped watching room");
}

#[cfg(test)]
mod tests {
    use super::watch_room;
    use crate::registry::RoomRegistry;
    use crate::service::{ClassroomService, ServiceTiming};
    use roomshare_contract::UploadRequest;
    use roomshare_storage::{InMemoryBlobBackend, RecordStore, StoreOptions};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{mpsc, oneshot};

    fn upload(name: &str) -> UploadRequest {
        UploadRequest::new(name, None, Vec::new())
    }

    #[tokio::test]
    async fn snapshots_follow_shares_to_the_watched_room() {
        let store = RecordStore::new(Arc::new(InMemoryBlobBackend::new()), StoreOptions::default());
        let service = ClassroomService::new(
            store,
            RoomRegistry::default(),
            true,
            ServiceTiming::immediate(),
        );
        let (snapshot_tx, mut snapshots) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let watcher = {
            let service = service.clone();
            tokio::spawn(async move {
                watch_room(
                    &service,
                    "101",
                    Duration::from_secs(3600),
                    async move {
                        let _ = stop_rx.await;
                    },
                    |records| {
                        let names: Vec<String> =
                            records.iter().map(|record| record.name.clone()).collect();
                        let _ = snapshot_tx.send(names);
                    },
                )
                .await;
            })
        };

        assert!(snapshots.recv().await.expect("initial snapshot").is_empty());

        service.share_pdf(upload("fileX.pdf"), "101").await.expect("share x");
        assert_eq!(snapshots.recv().await.expect("after x"), ["fileX.pdf"]);

        service.share_pdf(upload("fileY.pdf"), "102").await.expect("share y");
        service.share_pdf(upload("fileZ.pdf"), "101").await.expect("share z");
        assert_eq!(
            snapshots.recv().await.expect("after z"),
            ["fileX.pdf", "fileZ.pdf"]
        );

        service.clear_room("101").await.expect("clear");
        assert!(snapshots.recv().await.expect("after clear").is_empty());

        stop_tx.send(()).expect("stop watcher");
        watcher.await.expect("watcher finished");
    }
}
