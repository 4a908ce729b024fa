use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use crate::error::DashboardError;
use crate::model::{progress_view, ProgressView, Update, ViewState};
use crate::network::DashboardApi;
use crate::poller::{self, PollPolicy, Step};

/// Polling schedule of every loop.
#[derive(Debug, Clone, Copy)]
pub struct Policies {
    pub progress: PollPolicy,
    pub ips: PollPolicy,
    pub timeline: PollPolicy,
    pub events: PollPolicy,
    /// How long the completion message stays up.
    pub completed_display: Duration,
}

impl Default for Policies {
    fn default() -> Self {
        let five_secs = Duration::from_millis(5000);
        Self {
            progress: PollPolicy::every(Duration::from_millis(1000)),
            ips: PollPolicy::every(five_secs).retry_on_empty(),
            timeline: PollPolicy::every(five_secs).retry_on_error(),
            events: PollPolicy::every(five_secs).retry_on_error(),
            completed_display: Duration::from_millis(3000),
        }
    }
}

/// `false` once the draw loop has hung up.
fn deliver(tx: &Sender<Update>, update: Update) -> bool {
    tx.send(update).is_ok()
}

pub async fn load_progress(
    api: &dyn DashboardApi,
    tx: &Sender<Update>,
    completed_display: Duration,
) -> Result<Step, DashboardError> {
    let progress = api.progress().await?;
    if !deliver(tx, Update::Progress(progress)) {
        return Ok(Step::Finished);
    }

    match progress_view(progress) {
        ProgressView::Running { .. } => Ok(Step::Continue),
        ProgressView::Completed => {
            tokio::time::sleep(completed_display).await;
            deliver(tx, Update::ProgressReset);
            Ok(Step::Finished)
        }
        _ => Ok(Step::Finished),
    }
}

pub async fn load_ips(api: &dyn DashboardApi, tx: &Sender<Update>) -> Result<Step, DashboardError> {
    let ips = api.ips().await?;
    if ips.is_empty() {
        return Ok(Step::Empty);
    }
    info!("{} IPs available", ips.len());
    deliver(tx, Update::Ips(ips));
    Ok(Step::Finished)
}

pub async fn load_protocols(
    api: &dyn DashboardApi,
    view: &ViewState,
    tx: &Sender<Update>,
) -> Result<(), DashboardError> {
    let protocols = match &view.ip {
        Some(ip) => Some(api.protocols(ip).await?),
        None => None,
    };
    deliver(
        tx,
        Update::Protocols {
            ip: view.ip.clone(),
            protocols,
        },
    );
    Ok(())
}

pub async fn load_timeline(
    api: &dyn DashboardApi,
    view: &ViewState,
    tx: &Sender<Update>,
) -> Result<Step, DashboardError> {
    let points = match &view.ip {
        Some(ip) => Some(
            api.timeline(ip, view.view, view.protocol.as_deref())
                .await?,
        ),
        None => None,
    };
    let update = Update::Timeline {
        view: view.clone(),
        points,
    };
    if deliver(tx, update) {
        Ok(Step::Continue)
    } else {
        Ok(Step::Finished)
    }
}

pub async fn load_events(
    api: &dyn DashboardApi,
    view: &ViewState,
    tx: &Sender<Update>,
) -> Result<Step, DashboardError> {
    let Some(ip) = &view.ip else {
        return Ok(Step::Continue);
    };
    let rows = api.events(ip, view.protocol.as_deref()).await?;
    debug!("{} events for {}", rows.len(), ip);
    let update = Update::Events {
        ip: ip.clone(),
        rows,
    };
    if deliver(tx, update) {
        Ok(Step::Continue)
    } else {
        Ok(Step::Finished)
    }
}

/// Starts the polling loops and turns selection changes into reloads.
pub struct Controller {
    api: Arc<dyn DashboardApi>,
    tx: Sender<Update>,
    view_tx: watch::Sender<ViewState>,
    timeline_kick: Arc<Notify>,
    policies: Policies,
}

impl Controller {
    pub fn new(api: Arc<dyn DashboardApi>, tx: Sender<Update>, policies: Policies) -> Self {
        let (view_tx, _) = watch::channel(ViewState::default());
        Self {
            api,
            tx,
            view_tx,
            timeline_kick: Arc::new(Notify::new()),
            policies,
        }
    }

    pub fn start(&self) -> Vec<JoinHandle<u32>> {
        let progress = {
            let api = self.api.clone();
            let tx = self.tx.clone();
            let display = self.policies.completed_display;
            tokio::spawn(poller::run("progress", self.policies.progress, None, move || {
                let api = api.clone();
                let tx = tx.clone();
                async move { load_progress(&*api, &tx, display).await }
            }))
        };

        let ips = {
            let api = self.api.clone();
            let tx = self.tx.clone();
            tokio::spawn(poller::run("ips", self.policies.ips, None, move || {
                let api = api.clone();
                let tx = tx.clone();
                async move { load_ips(&*api, &tx).await }
            }))
        };

        let timeline = {
            let api = self.api.clone();
            let tx = self.tx.clone();
            let view_rx = self.view_tx.subscribe();
            tokio::spawn(poller::run(
                "timeline",
                self.policies.timeline,
                Some(self.timeline_kick.clone()),
                move || {
                    let api = api.clone();
                    let tx = tx.clone();
                    let view = view_rx.borrow().clone();
                    async move { load_timeline(&*api, &view, &tx).await }
                },
            ))
        };

        let events = {
            let api = self.api.clone();
            let tx = self.tx.clone();
            let view_rx = self.view_tx.subscribe();
            tokio::spawn(poller::run("events", self.policies.events, None, move || {
                let api = api.clone();
                let tx = tx.clone();
                let view = view_rx.borrow().clone();
                async move { load_events(&*api, &view, &tx).await }
            }))
        };

        vec![progress, ips, timeline, events]
    }

    fn publish(&self, view: ViewState) {
        self.view_tx.send_replace(view);
    }

    pub fn ip_changed(&self, view: ViewState) {
        self.publish(view.clone());
        self.timeline_kick.notify_one();

        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if let Err(e) = load_protocols(&*api, &view, &tx).await {
                debug!("protocols: {}", e);
            }
        });
    }

    pub fn protocol_changed(&self, view: ViewState) {
        self.publish(view);
        self.timeline_kick.notify_one();
    }

    pub fn view_mode_changed(&self, view: ViewState) {
        self.publish(view);
        self.timeline_kick.notify_one();
    }
}
