//! # Worker
//!
//! Owns a current-thread tokio runtime on its own named thread. The editing thread sends it
//! [`Request`]s, and every task it runs reports exactly one [`TaskMessage`] back over a crossbeam
//! channel - unless it was cancelled first, in which case it reports nothing.
//!
//! Blocking work (decoding, the gateway's I/O) goes through `spawn_blocking`, so a slow store
//! never holds up a text recognition.

use std::sync::Arc;

use logoforge_core::gateway::{GatewayError, PersistenceGateway, RecordID};
use logoforge_core::io::Payload;
use logoforge_core::repositories::assets::Asset;
use logoforge_core::session::{Credential, OwnerID};
use logoforge_core::tasks::{AssetPurpose, TaskFailure, TaskID, TaskMessage, TaskOutcome};
use logoforge_core::ElementID;

use crate::recognizer::TextRecognizer;

#[derive(Debug)]
pub enum Request {
    LoadAsset {
        task: TaskID,
        purpose: AssetPurpose,
        path: std::path::PathBuf,
    },
    Recognize {
        task: TaskID,
        source: ElementID,
        image: Arc<Asset>,
    },
    Save {
        task: TaskID,
        credential: Credential,
        payload: Box<Payload>,
    },
    Load {
        task: TaskID,
        credential: Credential,
        id: RecordID,
    },
    List {
        task: TaskID,
        credential: Credential,
        owner: OwnerID,
    },
    /// Abort the task if it's still running. Its result is never sent.
    Cancel(TaskID),
}

#[derive(thiserror::Error, Debug)]
#[error("worker has shut down")]
pub struct WorkerGone;

pub struct Worker {
    requests: tokio::sync::mpsc::UnboundedSender<Request>,
    thread: std::thread::JoinHandle<()>,
}
impl Worker {
    /// Start the worker thread.
    ///
    /// The gateway is shared with the caller, who must keep a clone alive until [`Worker::shutdown`]
    /// returns: a blocking HTTP client can't be dropped from within the runtime.
    pub fn spawn(
        recognizer: Arc<dyn TextRecognizer>,
        gateway: Arc<dyn PersistenceGateway>,
        results: crossbeam::channel::Sender<TaskMessage>,
    ) -> anyhow::Result<Self> {
        let (requests, receiver) = tokio::sync::mpsc::unbounded_channel();
        let thread = std::thread::Builder::new()
            .name("Task worker".to_owned())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        log::error!("failed to start task runtime: {e:?}");
                        return;
                    }
                };
                runtime.block_on(serve(receiver, recognizer, gateway, results));
                log::trace!("task worker exiting");
            })?;
        Ok(Self { requests, thread })
    }
    pub fn send(&self, request: Request) -> Result<(), WorkerGone> {
        self.requests.send(request).map_err(|_| WorkerGone)
    }
    /// Stop accepting requests and wait for the thread. Tasks still running are dropped.
    pub fn shutdown(self) {
        drop(self.requests);
        if self.thread.join().is_err() {
            log::error!("task worker panicked");
        }
    }
}

async fn serve(
    mut requests: tokio::sync::mpsc::UnboundedReceiver<Request>,
    recognizer: Arc<dyn TextRecognizer>,
    gateway: Arc<dyn PersistenceGateway>,
    results: crossbeam::channel::Sender<TaskMessage>,
) {
    let mut tasks = tokio::task::JoinSet::new();
    let mut running = hashbrown::HashMap::<TaskID, tokio::task::AbortHandle>::new();
    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(request) = request else {
                    break;
                };
                let (task, job) = match request {
                    Request::Cancel(task) => {
                        if let Some(handle) = running.remove(&task) {
                            log::debug!("aborting {task}");
                            handle.abort();
                        }
                        continue;
                    }
                    Request::LoadAsset { task, purpose, path } => (task, load_asset(purpose, path).boxed()),
                    Request::Recognize { task, source, image } => {
                        (task, recognize(recognizer.clone(), source, image).boxed())
                    }
                    Request::Save { task, credential, payload } => {
                        let gateway = gateway.clone();
                        let name = payload.name.clone();
                        (task, async move {
                            let result = blocking(move || gateway.save(&credential, &payload)).await;
                            TaskOutcome::Saved { name, result }
                        }.boxed())
                    }
                    Request::Load { task, credential, id } => {
                        let gateway = gateway.clone();
                        (task, async move {
                            let result = {
                                let id = id.clone();
                                blocking(move || gateway.load(&credential, &id)).await
                            };
                            TaskOutcome::Loaded { id, result }
                        }.boxed())
                    }
                    Request::List { task, credential, owner } => {
                        let gateway = gateway.clone();
                        (task, async move {
                            let result = blocking(move || gateway.list(&credential, &owner)).await;
                            TaskOutcome::Listed { result }
                        }.boxed())
                    }
                };
                let results = results.clone();
                let handle = tasks.spawn(async move {
                    let outcome = job.await;
                    if results.send(TaskMessage { task, outcome }).is_err() {
                        log::debug!("{task} finished after the editor went away");
                    }
                    task
                });
                running.insert(task, handle);
            }
            Some(finished) = tasks.join_next() => {
                match finished {
                    Ok(task) => {
                        running.remove(&task);
                    }
                    Err(e) if e.is_cancelled() => (),
                    Err(e) => log::error!("task panicked: {e}"),
                }
            }
        }
    }
    if !running.is_empty() {
        log::debug!("dropping {} unfinished tasks", running.len());
    }
}

/// Boxing, so every request kind fits one job type.
trait BoxedOutcome {
    fn boxed(self) -> std::pin::Pin<Box<dyn std::future::Future<Output = TaskOutcome> + Send>>;
}
impl<F: std::future::Future<Output = TaskOutcome> + Send + 'static> BoxedOutcome for F {
    fn boxed(self) -> std::pin::Pin<Box<dyn std::future::Future<Output = TaskOutcome> + Send>> {
        Box::pin(self)
    }
}

async fn blocking<T: Send + 'static>(
    f: impl FnOnce() -> Result<T, GatewayError> + Send + 'static,
) -> Result<T, GatewayError> {
    tokio::task::spawn_blocking(f)
        .await
        .unwrap_or_else(|e| Err(GatewayError::Transport(format!("request panicked: {e}"))))
}

async fn load_asset(purpose: AssetPurpose, path: std::path::PathBuf) -> TaskOutcome {
    let label = path.display().to_string();
    let result = tokio::task::spawn_blocking(move || crate::loader::load_path(&path))
        .await
        .map_err(TaskFailure::new)
        .and_then(|loaded| loaded.map_err(TaskFailure::new));
    TaskOutcome::AssetLoaded {
        purpose,
        label,
        result,
    }
}

async fn recognize(
    recognizer: Arc<dyn TextRecognizer>,
    source: ElementID,
    image: Arc<Asset>,
) -> TaskOutcome {
    let result = recognizer.recognize(image).await.map_err(TaskFailure::new);
    TaskOutcome::TextRecognized { source, result }
}

#[cfg(test)]
mod test {
    use super::*;
    use logoforge_core::gateway::InMemoryGateway;

    /// Never answers, so it can be cancelled.
    struct Stalled;
    #[async_trait::async_trait]
    impl TextRecognizer for Stalled {
        async fn recognize(
            &self,
            _: Arc<Asset>,
        ) -> Result<String, crate::recognizer::RecognizeError> {
            std::future::pending().await
        }
    }

    fn worker(recognizer: Arc<dyn TextRecognizer>) -> (Worker, crossbeam::channel::Receiver<TaskMessage>) {
        let (send, recv) = crossbeam::channel::unbounded();
        let worker = Worker::spawn(recognizer, Arc::new(InMemoryGateway::new()), send).unwrap();
        (worker, recv)
    }
    fn timeout() -> std::time::Duration {
        std::time::Duration::from_secs(10)
    }
    #[test]
    fn reports_failures() {
        let (worker, results) = worker(Arc::new(crate::recognizer::NoRecognizer));
        let task = TaskID::default();
        worker
            .send(Request::LoadAsset {
                task,
                purpose: AssetPurpose::Image,
                path: "/no/such/logo.png".into(),
            })
            .unwrap();
        let message = results.recv_timeout(timeout()).unwrap();
        assert_eq!(message.task, task);
        assert!(matches!(
            message.outcome,
            TaskOutcome::AssetLoaded { result: Err(_), .. }
        ));

        let task = TaskID::default();
        worker
            .send(Request::List {
                task,
                credential: Credential::new("nobody"),
                owner: OwnerID::new("alice").unwrap(),
            })
            .unwrap();
        let message = results.recv_timeout(timeout()).unwrap();
        assert!(matches!(
            message.outcome,
            TaskOutcome::Listed {
                result: Err(GatewayError::Unauthorized)
            }
        ));
        worker.shutdown();
    }
    #[test]
    fn cancelled_tasks_stay_quiet() {
        let (worker, results) = worker(Arc::new(Stalled));
        let stalled = TaskID::default();
        worker
            .send(Request::Recognize {
                task: stalled,
                source: ElementID::generate("image"),
                image: Arc::new(Asset::from_rgba([1, 1], vec![0; 4]).unwrap()),
            })
            .unwrap();
        worker.send(Request::Cancel(stalled)).unwrap();
        // Something after it, to prove the worker is still going.
        let after = TaskID::default();
        worker
            .send(Request::LoadAsset {
                task: after,
                purpose: AssetPurpose::Backdrop,
                path: "/no/such/backdrop.png".into(),
            })
            .unwrap();
        let message = results.recv_timeout(timeout()).unwrap();
        assert_eq!(message.task, after);
        worker.shutdown();
        assert!(results.try_recv().is_err());
    }
}
