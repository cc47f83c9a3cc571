//! MesosDriver: subscribes to a master and implements `SchedulerDriver`.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Request, Response, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Incoming};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use hostsweep_core::{FrameworkId, FrameworkInfo, OfferId, TaskInfo, TaskStatus};
use hostsweep_scheduler::{DriverEvent, DriverResult, SchedulerDriver};

use crate::error::{MesosError, MesosResult};
use crate::recordio::RecordIoDecoder;
use crate::wire::{Call, Event, EventType};

/// Port a master listens on when the address does not name one.
pub const DEFAULT_MASTER_PORT: u16 = 5050;

const SCHEDULER_PATH: &str = "/api/v1/scheduler";
const STREAM_ID_HEADER: &str = "Mesos-Stream-Id";
const APPLICATION_JSON: &str = "application/json";
const EVENT_BUFFER: usize = 64;

type HttpClient = Client<HttpConnector, Full<Bytes>>;

#[derive(Debug, Clone)]
pub struct MesosConfig {
    /// `host`, `host:port` or `http://host:port`.
    pub master: String,
    pub framework: FrameworkInfo,
    /// Refuse window sent with accepts and declines.
    pub refuse_seconds: f64,
}

impl MesosConfig {
    /// The scheduler API endpoint of the configured master.
    pub fn endpoint(&self) -> MesosResult<Uri> {
        let invalid = || MesosError::InvalidMaster(self.master.clone());

        let authority = self
            .master
            .trim()
            .trim_start_matches("http://")
            .trim_end_matches('/');
        if authority.is_empty() || authority.contains('/') || authority.contains("://") {
            return Err(invalid());
        }

        let has_port = match authority.rfind(']') {
            // Bracketed IPv6 literal: a port can only follow the bracket.
            Some(close) => authority[close..].contains(':'),
            None => authority.contains(':'),
        };
        let authority = if has_port {
            authority.to_string()
        } else {
            format!("{authority}:{DEFAULT_MASTER_PORT}")
        };

        format!("http://{authority}{SCHEDULER_PATH}")
            .parse::<Uri>()
            .map_err(|_| invalid())
    }
}

/// A live subscription: the driver for outbound calls, the inbound event
/// channel, and the task pumping the event stream.
pub struct Subscription {
    pub driver: MesosDriver,
    pub events: mpsc::Receiver<DriverEvent>,
    pub stream: JoinHandle<()>,
}

pub struct MesosDriver {
    client: HttpClient,
    endpoint: Uri,
    stream_id: String,
    framework_id: FrameworkId,
    refuse_seconds: f64,
    stopped: AtomicBool,
}

impl MesosDriver {
    /// Register with the master.
    ///
    /// Returns once SUBSCRIBED has been received. The first event on the
    /// returned channel is `DriverEvent::Registered`. Fails without retry
    /// if the master cannot be reached or refuses the subscription.
    pub async fn subscribe(config: &MesosConfig) -> MesosResult<Subscription> {
        let endpoint = config.endpoint()?;
        let client: HttpClient = Client::builder(TokioExecutor::new()).build_http();

        info!(%endpoint, framework = %config.framework.name, "subscribing to mesos master");

        let request = json_request(&endpoint, &Call::subscribe(&config.framework), None)?;
        let response = client.request(request).await?;
        if response.status() != StatusCode::OK {
            return Err(status_error(response).await);
        }

        let stream_id = response
            .headers()
            .get(STREAM_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(MesosError::MissingStreamId)?
            .to_string();

        let mut stream = EventStream::new(response.into_body());
        let (framework_id, heartbeat) = loop {
            match stream.next_event().await? {
                Some(Event {
                    kind: EventType::Subscribed,
                    subscribed: Some(subscribed),
                    ..
                }) => break (subscribed.framework_id.value, subscribed.heartbeat_interval_seconds),
                Some(other) => debug!(event = ?other.kind, "event before SUBSCRIBED, skipping"),
                None => return Err(MesosError::NotSubscribed),
            }
        };

        info!(%framework_id, %stream_id, heartbeat_secs = ?heartbeat, "subscribed");

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let _ = tx
            .send(DriverEvent::Registered {
                framework_id: framework_id.clone(),
            })
            .await;
        let pump = tokio::spawn(pump_events(stream, tx));

        Ok(Subscription {
            driver: MesosDriver {
                client,
                endpoint,
                stream_id,
                framework_id,
                refuse_seconds: config.refuse_seconds,
                stopped: AtomicBool::new(false),
            },
            events: rx,
            stream: pump,
        })
    }

    /// POST a call on the subscribed stream; the master answers 202.
    async fn call(&self, call: &Call) -> MesosResult<()> {
        let request = json_request(&self.endpoint, call, Some(&self.stream_id))?;
        let response = self.client.request(request).await?;
        if response.status() != StatusCode::ACCEPTED {
            return Err(status_error(response).await);
        }
        Ok(())
    }

    fn ensure_running(&self) -> MesosResult<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(MesosError::Stopped);
        }
        Ok(())
    }
}

#[async_trait]
impl SchedulerDriver for MesosDriver {
    async fn launch(&self, offer_id: &OfferId, task: &TaskInfo) -> DriverResult<()> {
        self.ensure_running()?;
        let call = Call::launch(&self.framework_id, offer_id, task, self.refuse_seconds);
        self.call(&call).await?;
        debug!(task_id = %task.id, %offer_id, "launch accepted by master");
        Ok(())
    }

    async fn decline(&self, offer_ids: &[OfferId]) -> DriverResult<()> {
        self.ensure_running()?;
        let call = Call::decline(&self.framework_id, offer_ids, self.refuse_seconds);
        self.call(&call).await?;
        Ok(())
    }

    async fn acknowledge(&self, status: &TaskStatus) -> DriverResult<()> {
        self.ensure_running()?;
        let Some(call) = Call::acknowledge(&self.framework_id, status) else {
            debug!(task_id = %status.task_id, "status update not acknowledgeable, skipping");
            return Ok(());
        };
        self.call(&call).await?;
        Ok(())
    }

    async fn stop(&self) -> DriverResult<()> {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.call(&Call::teardown(&self.framework_id)).await?;
        info!(framework_id = %self.framework_id, "framework torn down");
        Ok(())
    }
}

// ── Event stream ──────────────────────────────────────────────────

/// Decodes RecordIO-framed JSON events from a streaming response body.
pub struct EventStream<B> {
    body: B,
    decoder: RecordIoDecoder,
}

impl<B> EventStream<B>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: std::fmt::Display,
{
    pub fn new(body: B) -> Self {
        Self {
            body,
            decoder: RecordIoDecoder::new(),
        }
    }

    /// Next event, or `None` once the body ends.
    pub async fn next_event(&mut self) -> MesosResult<Option<Event>> {
        loop {
            if let Some(record) = self.decoder.next_record()? {
                return Ok(Some(serde_json::from_slice(&record)?));
            }

            match self.body.frame().await {
                Some(frame) => {
                    let frame = frame.map_err(|e| MesosError::Body(e.to_string()))?;
                    if let Ok(data) = frame.into_data() {
                        self.decoder.extend(&data);
                    }
                }
                None => {
                    if self.decoder.buffered() > 0 {
                        warn!(bytes = self.decoder.buffered(), "event stream ended mid-record");
                    }
                    return Ok(None);
                }
            }
        }
    }
}

async fn pump_events<B>(mut stream: EventStream<B>, tx: mpsc::Sender<DriverEvent>)
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: std::fmt::Display,
{
    loop {
        match stream.next_event().await {
            Ok(Some(event)) => {
                let Some(event) = event.into_driver_event() else {
                    continue;
                };
                if tx.send(event).await.is_err() {
                    debug!("event receiver dropped, closing stream");
                    break;
                }
            }
            Ok(None) => {
                warn!("mesos event stream closed by master");
                break;
            }
            Err(e) => {
                error!(error = %e, "mesos event stream failed");
                break;
            }
        }
    }
}

// ── Internal helpers ──────────────────────────────────────────────

fn json_request(
    endpoint: &Uri,
    call: &Call,
    stream_id: Option<&str>,
) -> MesosResult<Request<Full<Bytes>>> {
    let body = serde_json::to_vec(call)?;
    let mut builder = Request::post(endpoint.clone())
        .header(CONTENT_TYPE, APPLICATION_JSON)
        .header(ACCEPT, APPLICATION_JSON);
    if let Some(stream_id) = stream_id {
        builder = builder.header(STREAM_ID_HEADER, stream_id);
    }
    Ok(builder.body(Full::new(Bytes::from(body)))?)
}

async fn status_error(response: Response<Incoming>) -> MesosError {
    let status = response.status();
    let body = match response.into_body().collect().await {
        Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).trim().to_string(),
        Err(e) => format!("<unreadable body: {e}>"),
    };
    MesosError::Status { status, body }
}
