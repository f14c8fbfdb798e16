//! Event dispatch and worker registration.
//!
//! A [`WorkerRuntime`] is one deployed version: a controller plus its
//! lifecycle state. The [`Registration`] decides which runtime receives
//! events and moves versions through install, waiting and activation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::Error;
use crate::config::WorkerConfig;
use crate::controller::{
    ActivateReport, CacheController, Capabilities, ClickOutcome, FetchOutcome, InstallOutcome, NotificationClick,
    PushMessage, PushOutcome, ResponseSource,
};
use crate::http::{Request, Response};
use crate::lifecycle::{Lifecycle, WorkerState};
use crate::lifetime::ExtendableLifetime;

/// Events the host delivers to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    Push(PushMessage),
    NotificationClick(NotificationClick),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Push,
    NotificationClick,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Install => EventKind::Install,
            Event::Activate => EventKind::Activate,
            Event::Fetch(_) => EventKind::Fetch,
            Event::Push(_) => EventKind::Push,
            Event::NotificationClick(_) => EventKind::NotificationClick,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Installed(InstallOutcome),
    Activated(ActivateReport),
    Fetched(FetchOutcome),
    Pushed(PushOutcome),
    Clicked(ClickOutcome),
}

/// Result of a dispatched event. The event is handled once `lifetime` settles.
#[derive(Debug)]
pub struct Dispatched {
    pub outcome: EventOutcome,
    pub lifetime: ExtendableLifetime,
}

/// One deployed worker version.
#[derive(Debug)]
pub struct WorkerRuntime {
    controller: CacheController,
    lifecycle: Lifecycle,
}

impl WorkerRuntime {
    pub fn new(config: WorkerConfig, caps: Capabilities) -> Self {
        Self { controller: CacheController::new(Arc::new(config), caps), lifecycle: Lifecycle::new() }
    }

    pub fn cache_name(&self) -> &str {
        &self.controller.config().cache_name
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    pub(crate) fn retire(&self) -> Result<(), Error> {
        self.lifecycle.transition(WorkerState::Redundant)?;
        info!(cache = %self.cache_name(), "worker redundant");
        Ok(())
    }

    /// Route an event to its handler.
    ///
    /// Install and activate also drive the lifecycle. Fetch, push and click
    /// events are only accepted once the worker is activated.
    pub async fn dispatch(&self, event: Event) -> Result<Dispatched, Error> {
        let kind = event.kind();
        debug!(cache = %self.cache_name(), ?kind, "dispatch");

        let lifetime = ExtendableLifetime::new();
        let outcome = match event {
            Event::Install => EventOutcome::Installed(self.on_install().await?),
            Event::Activate => EventOutcome::Activated(self.on_activate().await?),
            Event::Fetch(request) => {
                self.ensure_active(kind)?;
                EventOutcome::Fetched(self.controller.fetch(&request, &lifetime).await?)
            }
            Event::Push(message) => {
                self.ensure_active(kind)?;
                EventOutcome::Pushed(self.controller.push(&message).await?)
            }
            Event::NotificationClick(click) => {
                self.ensure_active(kind)?;
                EventOutcome::Clicked(self.controller.notification_click(&click).await?)
            }
        };

        Ok(Dispatched { outcome, lifetime })
    }

    fn ensure_active(&self, kind: EventKind) -> Result<(), Error> {
        match self.state() {
            WorkerState::Activated => Ok(()),
            state => Err(Error::NoActiveWorker(format!(
                "{} is {state}, cannot handle {kind:?}",
                self.cache_name()
            ))),
        }
    }

    async fn on_install(&self) -> Result<InstallOutcome, Error> {
        self.lifecycle.transition(WorkerState::Installing)?;
        match self.controller.install().await {
            Ok(outcome) => {
                self.lifecycle.transition(WorkerState::Installed)?;
                Ok(outcome)
            }
            Err(e) => {
                warn!(cache = %self.cache_name(), error = %e, "install failed");
                self.lifecycle.transition(WorkerState::Redundant)?;
                Err(e)
            }
        }
    }

    async fn on_activate(&self) -> Result<ActivateReport, Error> {
        self.lifecycle.transition(WorkerState::Activating)?;
        let result = self.controller.activate().await;
        // A failing activate handler does not stop activation.
        self.lifecycle.transition(WorkerState::Activated)?;
        result
    }
}

/// Where a registration-level fetch was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    Network,
    Cache,
    /// Not intercepted; fetched straight from the network.
    Passthrough,
}

impl From<ResponseSource> for FetchSource {
    fn from(source: ResponseSource) -> Self {
        match source {
            ResponseSource::Network => FetchSource::Network,
            ResponseSource::Cache => FetchSource::Cache,
        }
    }
}

#[derive(Debug)]
pub struct FetchResult {
    pub response: Response,
    pub source: FetchSource,
    pub lifetime: ExtendableLifetime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdateOutcome {
    pub install: InstallOutcome,
    /// Present when the new version activated right away.
    pub activation: Option<ActivateReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WorkerStatus {
    pub cache_name: String,
    pub state: WorkerState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RegistrationStatus {
    pub active: Option<WorkerStatus>,
    pub waiting: Option<WorkerStatus>,
}

#[derive(Debug, Default)]
struct Slots {
    active: Option<Arc<WorkerRuntime>>,
    waiting: Option<Arc<WorkerRuntime>>,
}

/// Active and waiting workers for the application scope.
pub struct Registration {
    caps: Capabilities,
    slots: Mutex<Slots>,
    activation: Mutex<()>,
}

impl Registration {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps, slots: Mutex::new(Slots::default()), activation: Mutex::new(()) }
    }

    pub async fn active(&self) -> Option<Arc<WorkerRuntime>> {
        self.slots.lock().await.active.clone()
    }

    /// Install a new version.
    ///
    /// A failed install leaves the current workers untouched. On success the
    /// new worker replaces any waiting one, then activates at once when it
    /// asks to skip waiting. A worker superseded by a concurrent update before
    /// it activates is reported with no activation.
    pub async fn update(&self, config: WorkerConfig) -> Result<UpdateOutcome, Error> {
        let worker = Arc::new(WorkerRuntime::new(config, self.caps.clone()));
        let Dispatched { outcome, .. } = worker.dispatch(Event::Install).await?;
        let EventOutcome::Installed(install) = outcome else {
            return Err(Error::InvalidInput("install event produced no install outcome".into()));
        };

        let superseded = self.slots.lock().await.waiting.replace(Arc::clone(&worker));
        if let Some(old) = superseded {
            old.retire()?;
        }

        let activation = if install.skip_waiting {
            let report = self.activate(Arc::clone(&worker)).await?;
            if report.is_none() {
                info!(cache = %worker.cache_name(), "superseded before activation");
            }
            report
        } else {
            None
        };
        Ok(UpdateOutcome { install, activation })
    }

    /// Promote the waiting worker to active and run its activate handler.
    pub async fn activate_waiting(&self) -> Result<ActivateReport, Error> {
        let waiting = self.slots.lock().await.waiting.clone();
        let worker = waiting.ok_or_else(|| Error::NoActiveWorker("no worker is waiting".into()))?;
        self.activate(worker)
            .await?
            .ok_or_else(|| Error::NoActiveWorker("waiting worker was superseded".into()))
    }

    /// Activate `worker` if it is still the waiting one.
    ///
    /// Activations run one at a time. Returns `None` when another worker has
    /// taken the waiting slot.
    async fn activate(&self, worker: Arc<WorkerRuntime>) -> Result<Option<ActivateReport>, Error> {
        let _turn = self.activation.lock().await;

        let previous = {
            let mut slots = self.slots.lock().await;
            if !slots.waiting.as_ref().is_some_and(|waiting| Arc::ptr_eq(waiting, &worker)) {
                return Ok(None);
            }
            slots.waiting = None;
            slots.active.replace(Arc::clone(&worker))
        };

        if let Some(previous) = previous {
            previous.retire()?;
        }

        match worker.dispatch(Event::Activate).await?.outcome {
            EventOutcome::Activated(report) => Ok(Some(report)),
            _ => Err(Error::InvalidInput("activate event produced no activation report".into())),
        }
    }

    /// Fetch through the active worker, or straight from the network when
    /// nothing intercepts the request.
    ///
    /// A worker still activating does not intercept, so its requests go to
    /// the network.
    pub async fn fetch(&self, request: Request) -> Result<FetchResult, Error> {
        let Some(worker) = self.active().await else {
            return self.passthrough(&request, ExtendableLifetime::new()).await;
        };

        let Dispatched { outcome, lifetime } = match worker.dispatch(Event::Fetch(request.clone())).await {
            Ok(dispatched) => dispatched,
            Err(Error::NoActiveWorker(reason)) => {
                debug!(url = %request.url, %reason, "worker not ready, fetching from network");
                return self.passthrough(&request, ExtendableLifetime::new()).await;
            }
            Err(e) => return Err(e),
        };
        match outcome {
            EventOutcome::Fetched(FetchOutcome::Respond { response, source }) => {
                Ok(FetchResult { response, source: source.into(), lifetime })
            }
            _ => self.passthrough(&request, lifetime).await,
        }
    }

    async fn passthrough(&self, request: &Request, lifetime: ExtendableLifetime) -> Result<FetchResult, Error> {
        let response = self.caps.network.fetch(request).await?;
        Ok(FetchResult { response, source: FetchSource::Passthrough, lifetime })
    }

    pub async fn push(&self, message: PushMessage) -> Result<PushOutcome, Error> {
        match self.require_active().await?.dispatch(Event::Push(message)).await?.outcome {
            EventOutcome::Pushed(outcome) => Ok(outcome),
            _ => Err(Error::InvalidInput("push event produced no push outcome".into())),
        }
    }

    pub async fn notification_click(&self, click: NotificationClick) -> Result<ClickOutcome, Error> {
        match self.require_active().await?.dispatch(Event::NotificationClick(click)).await?.outcome {
            EventOutcome::Clicked(outcome) => Ok(outcome),
            _ => Err(Error::InvalidInput("click event produced no click outcome".into())),
        }
    }

    async fn require_active(&self) -> Result<Arc<WorkerRuntime>, Error> {
        self.active().await.ok_or_else(|| Error::NoActiveWorker("no worker is active".into()))
    }

    pub async fn status(&self) -> RegistrationStatus {
        let slots = self.slots.lock().await;
        let describe = |w: &Arc<WorkerRuntime>| WorkerStatus { cache_name: w.cache_name().to_string(), state: w.state() };
        RegistrationStatus { active: slots.active.as_ref().map(describe), waiting: slots.waiting.as_ref().map(describe) }
    }
}
