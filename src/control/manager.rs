//! Remote job control over MQTT
//!
//! The manager keeps one MQTT connection alive (reconnecting forever
//! with a fixed backoff), feeds incoming command payloads to the job
//! supervisor, and publishes every state transition on the status topic.
//! The supervisor owns the job state machine and is independent of the
//! transport, which is what the tests exercise.

use crate::config::Config;
use crate::control::{
    execute_job, Command, CommandKind, JobMode, JobOutcome, JobState, JobStatus,
};
use crate::crawler::Progress;
use crate::session::SessionFactory;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Where status payloads go: the status topic in remote mode, the log in
/// standalone mode
#[async_trait]
pub trait StatusPublisher: Send + Sync {
    async fn publish(&self, status: JobStatus);
}

/// Publishes status payloads on the MQTT status topic
///
/// The client slot is swapped on every reconnect, so a job spawned
/// before a connection loss resumes publishing once the control plane is
/// back. While disconnected, payloads are dropped with a log line.
struct MqttStatusPublisher {
    topic: String,
    client: Mutex<Option<AsyncClient>>,
}

impl MqttStatusPublisher {
    fn new(topic: String) -> Self {
        Self {
            topic,
            client: Mutex::new(None),
        }
    }

    async fn set_client(&self, client: Option<AsyncClient>) {
        *self.client.lock().await = client;
    }
}

#[async_trait]
impl StatusPublisher for MqttStatusPublisher {
    async fn publish(&self, status: JobStatus) {
        let payload = match serde_json::to_vec(&status) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to encode status payload: {}", e);
                return;
            }
        };

        let client = self.client.lock().await.clone();
        let Some(client) = client else {
            tracing::debug!("Control plane disconnected, dropping status payload");
            return;
        };
        if let Err(e) = client
            .publish(&self.topic, QoS::AtLeastOnce, false, payload)
            .await
        {
            tracing::error!("Failed to publish status: {}", e);
        }
    }
}

/// Job bookkeeping shared between the supervisor and the running job task
struct Shared {
    state: JobState,
    job_id: Option<String>,
    processed: u64,
    total_estimated: u64,
    /// Bumped on every accepted start; a job task only writes back while
    /// its own epoch is still current, so a superseded job cannot clobber
    /// the state of its successor.
    epoch: u64,
}

impl Shared {
    fn status(&self, message: impl Into<String>) -> JobStatus {
        JobStatus::now(
            self.job_id.clone(),
            self.state,
            self.processed,
            self.total_estimated,
            message,
        )
    }
}

/// The job state machine behind the command topic
///
/// `start` is accepted from any state except `running`, where it is
/// ignored with an explanatory status. `stop` cancels the running job;
/// the job task publishes the terminal state when it unwinds.
pub struct JobSupervisor {
    config: Config,
    factory: Arc<dyn SessionFactory>,
    publisher: Arc<dyn StatusPublisher>,
    shared: Arc<Mutex<Shared>>,
    cancel: CancellationToken,
    job: Option<JoinHandle<()>>,
}

impl JobSupervisor {
    pub fn new(
        config: Config,
        factory: Arc<dyn SessionFactory>,
        publisher: Arc<dyn StatusPublisher>,
    ) -> Self {
        Self {
            config,
            factory,
            publisher,
            shared: Arc::new(Mutex::new(Shared {
                state: JobState::Idle,
                job_id: None,
                processed: 0,
                total_estimated: 0,
                epoch: 0,
            })),
            cancel: CancellationToken::new(),
            job: None,
        }
    }

    /// Current job state
    pub async fn state(&self) -> JobState {
        self.shared.lock().await.state
    }

    /// Handles one raw command payload
    pub async fn handle_payload(&mut self, payload: &[u8]) {
        let command: Command = match serde_json::from_slice(payload) {
            Ok(command) => command,
            Err(e) => {
                tracing::error!("Invalid command payload: {}", e);
                let status = self
                    .shared
                    .lock()
                    .await
                    .status(format!("Invalid command format: {}", e));
                self.publisher.publish(status).await;
                return;
            }
        };

        match command.command {
            CommandKind::Start => self.start(command.job_id, command.mode).await,
            CommandKind::Stop => self.stop().await,
        }
    }

    async fn start(&mut self, job_id: Option<String>, mode: JobMode) {
        let epoch = {
            let mut shared = self.shared.lock().await;
            if shared.state == JobState::Running {
                tracing::warn!("Received start command but already running");
                let status = shared.status("Ignored: Already running");
                drop(shared);
                self.publisher.publish(status).await;
                return;
            }

            let job_id = job_id.unwrap_or_else(short_job_id);
            tracing::info!("Starting job {} in {} mode", job_id, mode);
            shared.state = JobState::Running;
            shared.job_id = Some(job_id);
            shared.processed = 0;
            shared.total_estimated = 0;
            shared.epoch += 1;
            shared.epoch
        };

        self.cancel = CancellationToken::new();
        self.job = Some(spawn_job(
            self.config.clone(),
            mode,
            self.factory.clone(),
            self.publisher.clone(),
            self.shared.clone(),
            self.cancel.clone(),
            epoch,
        ));
    }

    async fn stop(&mut self) {
        let mut shared = self.shared.lock().await;
        if shared.state != JobState::Running {
            tracing::debug!("Ignoring stop: no job running");
            return;
        }

        tracing::info!("Job stopped by command");
        self.cancel.cancel();
        shared.state = JobState::Stopped;
        let status = shared.status("Job stopped by command");
        drop(shared);
        self.publisher.publish(status).await;
    }

    /// Records loss of the control-plane connection
    ///
    /// A running job keeps its state and keeps running; only an otherwise
    /// idle crawler reports itself disconnected.
    pub async fn note_disconnected(&self) {
        let mut shared = self.shared.lock().await;
        if shared.state != JobState::Running {
            tracing::warn!("Control plane disconnected while idle");
            shared.state = JobState::Disconnected;
        }
    }

    /// Records a (re)established control-plane connection, returning the
    /// availability status to publish
    pub async fn note_connected(&self) -> JobStatus {
        let mut shared = self.shared.lock().await;
        if shared.state == JobState::Disconnected {
            shared.state = JobState::Idle;
        }
        shared.status("Crawler connected and ready")
    }

    /// Waits for the current job task to finish (used by tests and
    /// shutdown paths)
    pub async fn join_job(&mut self) {
        if let Some(job) = self.job.take() {
            if let Err(e) = job.await {
                tracing::error!("Job task panicked: {}", e);
            }
        }
    }
}

/// Runs one job in a background task, forwarding progress and publishing
/// the terminal transition
///
/// All writes back into the shared state are gated on `epoch`: once a new
/// job has been started, this task's progress and terminal transition are
/// stale and get dropped instead of applied.
fn spawn_job(
    config: Config,
    mode: JobMode,
    factory: Arc<dyn SessionFactory>,
    publisher: Arc<dyn StatusPublisher>,
    shared: Arc<Mutex<Shared>>,
    cancel: CancellationToken,
    epoch: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let status = shared.lock().await.status(format!("Starting mode: {}", mode));
        publisher.publish(status).await;

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<Progress>();
        let forwarder = {
            let shared = shared.clone();
            let publisher = publisher.clone();
            tokio::spawn(async move {
                while let Some(progress) = progress_rx.recv().await {
                    let mut shared = shared.lock().await;
                    if shared.epoch != epoch {
                        continue;
                    }
                    shared.processed = progress.processed;
                    shared.total_estimated = progress.total_estimate;
                    let status = shared.status("");
                    drop(shared);
                    publisher.publish(status).await;
                }
            })
        };

        let result = execute_job(&config, mode, factory, &cancel, progress_tx).await;
        if let Err(e) = forwarder.await {
            tracing::error!("Progress forwarder panicked: {}", e);
        }

        let mut shared = shared.lock().await;
        if shared.epoch != epoch {
            tracing::debug!("Discarding terminal status of superseded job");
            return;
        }
        let status = match result {
            Ok(JobOutcome::Completed) => {
                tracing::info!("Job completed successfully");
                shared.state = JobState::Idle;
                shared.status("Job completed successfully")
            }
            Ok(JobOutcome::Cancelled) => {
                tracing::info!("Job cancelled");
                shared.state = JobState::Cancelled;
                shared.status("Job cancelled")
            }
            Err(e) => {
                tracing::error!("Job failed: {}", e);
                shared.state = JobState::Error;
                shared.status(format!("Fatal error: {}", e))
            }
        };
        shared.job_id = None;
        drop(shared);
        publisher.publish(status).await;
    })
}

fn short_job_id() -> String {
    uuid::Uuid::new_v4().to_string()[..8].to_string()
}

/// MQTT-connected control loop
pub struct ControlManager {
    config: Config,
    factory: Arc<dyn SessionFactory>,
}

impl ControlManager {
    pub fn new(config: Config, factory: Arc<dyn SessionFactory>) -> Self {
        Self { config, factory }
    }

    /// Runs the control loop forever
    ///
    /// Each iteration opens a fresh connection; a connection error tears
    /// the session down, waits the reconnect backoff, and tries again.
    /// Loss of connectivity never cancels a running job.
    pub async fn run(&self) {
        let broker = &self.config.broker;
        tracing::info!(
            "Starting MQTT control manager against {}:{}",
            broker.host,
            broker.port
        );

        let publisher = Arc::new(MqttStatusPublisher::new(broker.status_topic.clone()));
        let mut supervisor = JobSupervisor::new(
            self.config.clone(),
            self.factory.clone(),
            publisher.clone(),
        );

        loop {
            let mut options = MqttOptions::new(&broker.client_id, &broker.host, broker.port);
            options.set_keep_alive(Duration::from_secs(30));
            if let (Some(username), Some(password)) = (&broker.username, &broker.password) {
                options.set_credentials(username, password);
            }

            let (client, mut eventloop) = AsyncClient::new(options, 16);
            publisher.set_client(Some(client.clone())).await;

            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        tracing::info!("Connected; subscribing to {}", broker.command_topic);
                        if let Err(e) = client
                            .subscribe(&broker.command_topic, QoS::AtLeastOnce)
                            .await
                        {
                            tracing::error!("Subscribe failed: {}", e);
                            break;
                        }
                        let status = supervisor.note_connected().await;
                        publisher.publish(status).await;
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        if publish.topic == broker.command_topic {
                            tracing::info!(
                                "Command received on {}: {} bytes",
                                publish.topic,
                                publish.payload.len()
                            );
                            supervisor.handle_payload(&publish.payload).await;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(
                            "MQTT connection error: {}. Reconnecting in {}s",
                            e,
                            broker.reconnect_secs
                        );
                        break;
                    }
                }
            }

            publisher.set_client(None).await;
            supervisor.note_disconnected().await;
            tokio::time::sleep(Duration::from_secs(broker.reconnect_secs)).await;
        }
    }
}
