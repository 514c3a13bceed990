use log::trace;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

/// Notifications published by the stores and the status layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The changelist collection or its contents changed
    ChangelistsChanged,
    /// The shelf collection or its contents changed
    ShelvesChanged,
    /// A path's cached status is no longer valid
    StatusInvalidated(String),
}

/// Fan-out bus the stores publish on. Subscribers hold the receiving end of
/// an mpsc channel and drain it at their own pace; disconnected subscribers
/// are dropped on the next publish.
#[derive(Default)]
pub struct ChangeBus {
    senders: Vec<Sender<StoreEvent>>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = channel();
        self.senders.push(tx);
        rx
    }

    pub fn publish(&mut self, event: StoreEvent) {
        trace!("Publishing {:?} to {} subscriber(s)", event, self.senders.len());
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.senders.len()
    }
}

/// Trailing-edge debouncer as a pure function of (last event time, delay).
///
/// Callers feed it event timestamps and poll `fire(now)`; it reports ready
/// once the delay has elapsed with no newer event, then rearms.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_event: None,
        }
    }

    /// Record an event, restarting the quiet-period timer
    pub fn record(&mut self, now: Instant) {
        self.last_event = Some(now);
    }

    /// Whether the quiet period has elapsed
    pub fn is_ready(&self, now: Instant) -> bool {
        match self.last_event {
            Some(at) => now.duration_since(at) >= self.delay,
            None => false,
        }
    }

    /// Consume the pending event burst if the quiet period elapsed
    pub fn fire(&mut self, now: Instant) -> bool {
        if self.is_ready(now) {
            self.last_event = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_delivers_to_all_subscribers() {
        let mut bus = ChangeBus::new();
        let rx1 = bus.subscribe();
        let rx2 = bus.subscribe();

        bus.publish(StoreEvent::ChangelistsChanged);

        assert_eq!(rx1.try_recv().unwrap(), StoreEvent::ChangelistsChanged);
        assert_eq!(rx2.try_recv().unwrap(), StoreEvent::ChangelistsChanged);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut bus = ChangeBus::new();
        let rx = bus.subscribe();
        drop(rx);

        bus.publish(StoreEvent::ShelvesChanged);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn debouncer_waits_out_bursts() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        let start = Instant::now();

        assert!(!debouncer.fire(start));

        debouncer.record(start);
        assert!(!debouncer.fire(start + Duration::from_millis(50)));

        // New event inside the window restarts the wait
        debouncer.record(start + Duration::from_millis(80));
        assert!(!debouncer.fire(start + Duration::from_millis(120)));

        assert!(debouncer.fire(start + Duration::from_millis(200)));
        // Rearmed after firing
        assert!(!debouncer.fire(start + Duration::from_millis(300)));
    }
}
