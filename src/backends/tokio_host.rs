// In-process alarm host on tokio timers
// Each pending timer is a sleeping task; a fire is delivered as a HostEvent on an unbounded channel

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;

use crate::components::{
    AlarmHost, Clock, FireEvent, HostEvent, NotificationError, NotificationId, NotificationResult,
    TimerRequest, WeeklyNotifier,
};

#[derive(Debug)]
struct PendingTimer {
    request: TimerRequest,
    task: JoinHandle<()>,
}

/// `AlarmHost` that emulates one-shot OS alarms inside the current tokio runtime
///
/// Registering a timer for an id replaces the pending one. Timers do not
/// survive the host: [`simulate_reboot`](Self::simulate_reboot) drops them
/// all and announces `BootCompleted`, which is what a device restart does.
pub struct TokioAlarmHost {
    runtime: Handle,
    pending: Arc<DashMap<NotificationId, PendingTimer>>,
    exact_allowed: AtomicBool,
    events: UnboundedSender<HostEvent>,
}

impl TokioAlarmHost {
    /// Host bound to the runtime this is called from
    pub fn new(events: UnboundedSender<HostEvent>) -> NotificationResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| NotificationError::host_unavailable(format!("tokio runtime: {}", e)))?;
        Ok(Self::with_handle(runtime, events))
    }

    pub fn with_handle(runtime: Handle, events: UnboundedSender<HostEvent>) -> Self {
        Self {
            runtime,
            pending: Arc::new(DashMap::new()),
            exact_allowed: AtomicBool::new(true),
            events,
        }
    }

    /// Host plus the receiving end of its event channel
    pub fn channel() -> NotificationResult<(Self, UnboundedReceiver<HostEvent>)> {
        let (tx, rx) = unbounded_channel();
        Ok((Self::new(tx)?, rx))
    }

    /// Grant or revoke exact timing
    pub fn set_exact_allowed(&self, allowed: bool) {
        self.exact_allowed.store(allowed, Ordering::SeqCst);
    }

    /// Pending timers ordered by id
    pub fn pending(&self) -> Vec<TimerRequest> {
        let mut requests: Vec<_> = self
            .pending
            .iter()
            .map(|timer| timer.request.clone())
            .collect();
        requests.sort_by_key(|r| r.id);
        requests
    }

    pub fn pending_for(&self, id: NotificationId) -> Option<TimerRequest> {
        self.pending.get(&id).map(|timer| timer.request.clone())
    }

    /// Forward a host event that did not come from a timer
    pub fn send(&self, event: HostEvent) -> NotificationResult<()> {
        self.events
            .send(event)
            .map_err(|_| NotificationError::host_unavailable("host event channel"))
    }

    /// Drop every pending timer and deliver `BootCompleted`
    pub fn simulate_reboot(&self) -> NotificationResult<()> {
        self.abort_all();
        tracing::info!("Simulated reboot cleared all pending timers");
        self.send(HostEvent::BootCompleted)
    }

    fn abort_all(&self) {
        self.pending.retain(|_, timer| {
            timer.task.abort();
            false
        });
    }
}

impl AlarmHost for TokioAlarmHost {
    fn can_schedule_exact(&self) -> bool {
        self.exact_allowed.load(Ordering::SeqCst)
    }

    fn request_timer(&self, request: &TimerRequest) -> NotificationResult<()> {
        if request.precision.is_exact() && !self.can_schedule_exact() {
            return Err(NotificationError::PermissionDenied {
                id: request.id,
                capability: "exact alarms".to_string(),
            });
        }

        let delay = (request.fire_at - Utc::now()).to_std().unwrap_or_default();
        let event = FireEvent::from(request);
        let pending = Arc::clone(&self.pending);
        let events = self.events.clone();

        // The entry guard is held while spawning so a zero-delay fire cannot
        // clear the slot before the new timer is recorded
        match self.pending.entry(request.id) {
            Entry::Occupied(mut slot) => {
                let task = self.runtime.spawn(fire_after(delay, event, pending, events));
                let old = slot.insert(PendingTimer {
                    request: request.clone(),
                    task,
                });
                old.task.abort();
                tracing::debug!(id = %request.id, "Replaced pending timer");
            },
            Entry::Vacant(slot) => {
                let task = self.runtime.spawn(fire_after(delay, event, pending, events));
                slot.insert(PendingTimer {
                    request: request.clone(),
                    task,
                });
            },
        }

        tracing::debug!(
            id = %request.id,
            fire_at = %request.fire_at,
            delay_secs = delay.as_secs(),
            precision = ?request.precision,
            "Timer registered"
        );
        Ok(())
    }

    fn cancel_timer(&self, id: NotificationId) -> NotificationResult<()> {
        if let Some((_, timer)) = self.pending.remove(&id) {
            timer.task.abort();
            tracing::debug!(id = %id, "Timer cancelled");
        }
        Ok(())
    }
}

impl Drop for TokioAlarmHost {
    fn drop(&mut self) {
        self.abort_all();
    }
}

async fn fire_after(
    delay: std::time::Duration,
    event: FireEvent,
    pending: Arc<DashMap<NotificationId, PendingTimer>>,
    events: UnboundedSender<HostEvent>,
) {
    tokio::time::sleep(delay).await;
    pending.remove_if(&event.id, |_, timer| timer.request.token == event.token);
    if events.send(HostEvent::AlarmFired(event)).is_err() {
        tracing::debug!(id = %event.id, "Timer fired after the event channel closed");
    }
}

/// Feed host events to `notifier` one at a time until the channel closes
pub fn spawn_dispatcher<C>(
    notifier: Arc<WeeklyNotifier<C>>,
    mut events: UnboundedReceiver<HostEvent>,
) -> JoinHandle<()>
where
    C: Clock + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            tracing::trace!(event = ?event, "Dispatching host event");
            if let Err(e) = notifier.dispatch(event) {
                tracing::warn!(error = %e, "Host event handling failed");
            }
        }
        tracing::debug!("Host event channel closed, dispatcher stopping");
    })
}
