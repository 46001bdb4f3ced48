use crate::history::FrameHistory;
use crate::listener::Listener;
use crate::protocol::Event;
use crate::source::EventStream;
use crate::types::{Device, Frame, Gesture, GestureKinds, Policy};
use crate::{LeapError, Result};
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long the dispatch thread waits for an event before re-checking the
/// stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Tracking state visible to listeners.
///
/// Holds the recent frame history, the known devices, connection and focus
/// state, and the settings listeners may change from inside a callback
/// (enabled gestures, policy flags).
pub struct Controller {
    history: FrameHistory,
    devices: Vec<Device>,
    gestures: AtomicU32,
    policy: AtomicU32,
    connected: bool,
    focused: bool,
}

impl Controller {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history: FrameHistory::new(history_capacity),
            devices: Vec::new(),
            gestures: AtomicU32::new(GestureKinds::empty().bits()),
            policy: AtomicU32::new(Policy::empty().bits()),
            connected: false,
            focused: true,
        }
    }

    /// Frame `back` steps before the current one (0 = current).
    pub fn frame(&self, back: usize) -> Option<&Frame> {
        self.history.get(back)
    }

    /// Gesture with `id` as reported `back` frames ago.
    pub fn gesture(&self, id: i32, back: usize) -> Option<&Gesture> {
        self.history.gesture(id, back)
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Start delivering gestures of the given kinds.
    pub fn enable_gesture(&self, kinds: GestureKinds) {
        self.gestures.fetch_or(kinds.bits(), Ordering::Relaxed);
    }

    pub fn disable_gesture(&self, kinds: GestureKinds) {
        self.gestures.fetch_and(!kinds.bits(), Ordering::Relaxed);
    }

    pub fn enabled_gestures(&self) -> GestureKinds {
        GestureKinds::from_bits_truncate(self.gestures.load(Ordering::Relaxed))
    }

    pub fn is_gesture_enabled(&self, kinds: GestureKinds) -> bool {
        self.enabled_gestures().contains(kinds)
    }

    pub fn policy(&self) -> Policy {
        Policy::from_bits_truncate(self.policy.load(Ordering::Relaxed))
    }

    /// Replace the policy flags; flags not in `policy` are cleared.
    pub fn set_policy(&self, policy: Policy) {
        self.policy.store(policy.bits(), Ordering::Relaxed);
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn accepts_frames(&self) -> bool {
        self.focused || self.policy().contains(Policy::BACKGROUND_FRAMES)
    }

    /// Drop gestures of known kinds that nobody enabled. Unknown kinds pass
    /// through untouched.
    fn filter_gestures(&self, frame: &mut Frame) {
        let enabled = self.enabled_gestures();
        frame
            .gestures
            .retain(|g| g.kind.flag().map_or(true, |flag| enabled.contains(flag)));
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(crate::history::DEFAULT_CAPACITY)
    }
}

/// Owns a [`Controller`] and the registered listeners, and turns events into
/// callbacks.
///
/// Listeners are invoked one at a time, in registration order.
#[derive(Default)]
pub struct EventLoop {
    controller: Controller,
    listeners: Vec<Box<dyn Listener>>,
}

impl EventLoop {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            controller: Controller::new(history_capacity),
            listeners: Vec::new(),
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Register a listener. It receives `on_init` right away, and
    /// `on_connect` too when a device is already connected.
    pub fn add_listener<L: Listener + 'static>(&mut self, listener: L) {
        let mut listener: Box<dyn Listener> = Box::new(listener);
        listener.on_init(&self.controller);
        if self.controller.connected {
            listener.on_connect(&self.controller);
        }
        self.listeners.push(listener);
    }

    /// Apply one event to the controller and notify every listener.
    pub fn dispatch(&mut self, event: Event) {
        log::trace!("Dispatching {}", event.name());
        let controller = &mut self.controller;
        match event {
            Event::ServiceConnect => {
                self.notify(|l, c| l.on_service_connect(c));
            }
            Event::ServiceDisconnect => {
                self.notify(|l, c| l.on_service_disconnect(c));
            }
            Event::Connect => {
                controller.connected = true;
                log::info!("Device connected");
                self.notify(|l, c| l.on_connect(c));
            }
            Event::Disconnect => {
                controller.connected = false;
                log::info!("Device disconnected");
                self.notify(|l, c| l.on_disconnect(c));
            }
            Event::FocusGained => {
                controller.focused = true;
                self.notify(|l, c| l.on_focus_gained(c));
            }
            Event::FocusLost => {
                controller.focused = false;
                self.notify(|l, c| l.on_focus_lost(c));
            }
            Event::DeviceChange { devices } => {
                log::info!("Device list changed ({} devices)", devices.len());
                controller.devices = devices;
                self.notify(|l, c| l.on_device_change(c));
            }
            Event::Frame { mut frame } => {
                if !controller.accepts_frames() {
                    log::trace!("Dropping frame {} without focus", frame.id);
                    return;
                }
                controller.filter_gestures(&mut frame);
                controller.history.push(frame);
                self.notify(|l, c| l.on_frame(c));
            }
        }
    }

    /// Dispatch every event of `stream` until it ends. Returns the number of
    /// events dispatched.
    pub fn run(&mut self, stream: &EventStream) -> u64 {
        let mut dispatched = 0;
        while let Ok(event) = stream.recv() {
            self.dispatch(event);
            dispatched += 1;
        }
        dispatched
    }

    /// Remove every listener, calling `on_exit` on each.
    pub fn finish(&mut self) {
        let controller = &self.controller;
        for mut listener in self.listeners.drain(..) {
            listener.on_exit(controller);
        }
    }

    /// Run the loop on a dedicated dispatch thread until the stream ends or
    /// the returned handle is stopped. Listeners get `on_exit` either way.
    pub fn spawn(self, stream: EventStream) -> Result<Running> {
        let stop_flag = stream.stop_flag();
        let stop_clone = stop_flag.clone();
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);

        let thread = std::thread::Builder::new()
            .name("leap-dispatch".into())
            .spawn(move || {
                dispatch_loop(self, stream, stop_clone, done_tx);
            })
            .map_err(|source| LeapError::Spawn { name: "dispatch", source })?;

        Ok(Running {
            stop_flag,
            done: done_rx,
            thread: Some(thread),
        })
    }

    fn notify<F>(&mut self, mut callback: F)
    where
        F: FnMut(&mut dyn Listener, &Controller),
    {
        for listener in self.listeners.iter_mut() {
            callback(listener.as_mut(), &self.controller);
        }
    }
}

fn dispatch_loop(
    mut event_loop: EventLoop,
    stream: EventStream,
    stop_flag: Arc<AtomicBool>,
    done: Sender<()>,
) {
    let mut dispatched: u64 = 0;

    log::info!("Dispatch loop started");

    while !stop_flag.load(Ordering::Relaxed) {
        match stream.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                event_loop.dispatch(event);
                dispatched += 1;
            }
            Err(LeapError::Timeout) => continue,
            Err(_) => break,
        }
    }

    log::info!("Dispatch loop finished after {} events", dispatched);
    event_loop.finish();
    drop(stream);
    let _ = done.send(());
}

/// Handle to an event loop running on its dispatch thread.
pub struct Running {
    stop_flag: Arc<AtomicBool>,
    done: Receiver<()>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl Running {
    /// Becomes ready once the loop has finished and listeners got `on_exit`.
    pub fn done(&self) -> &Receiver<()> {
        &self.done
    }

    /// Ask the loop to stop and wait for it.
    pub fn stop(mut self) -> Result<()> {
        self.stop_flag.store(true, Ordering::Relaxed);
        self.join()
    }

    /// Wait for the stream to run out.
    pub fn wait(mut self) -> Result<()> {
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| LeapError::DispatchPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        let _ = self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector;
    use crate::types::{GestureKind, GestureState, Hand};
    use std::sync::Mutex;

    /// Records callback names into a shared log.
    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn push(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }
    }

    impl Listener for Recorder {
        fn on_init(&mut self, _: &Controller) {
            self.push("init".into());
        }
        fn on_connect(&mut self, c: &Controller) {
            c.enable_gesture(GestureKinds::CIRCLE);
            self.push("connect".into());
        }
        fn on_exit(&mut self, _: &Controller) {
            self.push("exit".into());
        }
        fn on_frame(&mut self, c: &Controller) {
            let frame = c.frame(0).unwrap();
            self.push(format!("frame {} gestures {}", frame.id, frame.gestures.len()));
        }
        fn on_focus_lost(&mut self, _: &Controller) {
            self.push("focus_lost".into());
        }
        fn on_device_change(&mut self, c: &Controller) {
            self.push(format!("devices {}", c.devices().len()));
        }
    }

    fn recorder() -> (Recorder, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (Recorder { log: log.clone() }, log)
    }

    fn frame_with_gestures(id: i64) -> Frame {
        Frame {
            id,
            timestamp: id * 10_000,
            hands: vec![Hand { id: 1, ..Default::default() }],
            gestures: vec![
                Gesture {
                    id: 1,
                    state: GestureState::Start,
                    kind: GestureKind::Circle {
                        progress: 0.1,
                        radius: 5.0,
                        normal: Vector::new(0.0, 0.0, 1.0),
                        pointable_direction: Vector::new(0.0, 0.0, 1.0),
                    },
                },
                Gesture {
                    id: 2,
                    state: GestureState::Start,
                    kind: GestureKind::Swipe { direction: Vector::new(1.0, 0.0, 0.0), speed: 1.0 },
                },
                Gesture { id: 3, state: GestureState::Start, kind: GestureKind::Unknown },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_add_listener_calls_init_then_connect_when_connected() {
        let mut event_loop = EventLoop::default();
        event_loop.dispatch(Event::Connect);
        let (listener, log) = recorder();
        event_loop.add_listener(listener);
        assert_eq!(*log.lock().unwrap(), ["init", "connect"]);
    }

    #[test]
    fn test_only_enabled_and_unknown_gestures_are_delivered() {
        let mut event_loop = EventLoop::default();
        let (listener, log) = recorder();
        event_loop.add_listener(listener);
        event_loop.dispatch(Event::Connect);
        event_loop.dispatch(Event::Frame { frame: frame_with_gestures(1) });

        let frame = event_loop.controller().frame(0).unwrap();
        let ids: Vec<_> = frame.gestures.iter().map(|g| g.id).collect();
        assert_eq!(ids, [1, 3]);
        assert_eq!(log.lock().unwrap().last().unwrap(), "frame 1 gestures 2");
    }

    #[test]
    fn test_frames_dropped_without_focus_unless_background_policy() {
        let mut event_loop = EventLoop::default();
        let (listener, log) = recorder();
        event_loop.add_listener(listener);

        event_loop.dispatch(Event::FocusLost);
        event_loop.dispatch(Event::Frame { frame: frame_with_gestures(1) });
        assert!(event_loop.controller().frame(0).is_none());

        event_loop.controller().set_policy(Policy::BACKGROUND_FRAMES);
        event_loop.dispatch(Event::Frame { frame: frame_with_gestures(2) });
        assert_eq!(event_loop.controller().frame(0).map(|f| f.id), Some(2));
        assert_eq!(*log.lock().unwrap(), ["init", "focus_lost", "frame 2 gestures 1"]);

        event_loop.controller().set_policy(Policy::empty());
        event_loop.dispatch(Event::Frame { frame: frame_with_gestures(3) });
        assert_eq!(event_loop.controller().frame(0).map(|f| f.id), Some(2));
    }

    #[test]
    fn test_set_policy_replaces_flags() {
        let controller = Controller::default();
        controller.set_policy(Policy::BACKGROUND_FRAMES);
        assert_eq!(controller.policy(), Policy::BACKGROUND_FRAMES);
        controller.set_policy(Policy::empty());
        assert!(controller.policy().is_empty());
    }

    #[test]
    fn test_device_change_replaces_device_list() {
        let mut event_loop = EventLoop::default();
        let (listener, log) = recorder();
        event_loop.add_listener(listener);
        let devices = vec![
            Device { serial: "A".into(), streaming: true },
            Device { serial: "B".into(), streaming: false },
        ];
        event_loop.dispatch(Event::DeviceChange { devices });
        assert_eq!(event_loop.controller().devices().len(), 2);
        assert_eq!(log.lock().unwrap().last().unwrap(), "devices 2");
    }

    #[test]
    fn test_run_then_finish() {
        let mut event_loop = EventLoop::default();
        let (listener, log) = recorder();
        event_loop.add_listener(listener);
        let stream = EventStream::from_events(vec![
            Event::Connect,
            Event::Frame { frame: frame_with_gestures(1) },
            Event::Disconnect,
        ]);
        assert_eq!(event_loop.run(&stream), 3);
        assert!(!event_loop.controller().is_connected());
        event_loop.finish();
        assert_eq!(event_loop.listener_count(), 0);
        assert_eq!(
            *log.lock().unwrap(),
            ["init", "connect", "frame 1 gestures 2", "exit"]
        );
    }

    #[test]
    fn test_spawned_loop_exits_when_stream_ends() {
        let mut event_loop = EventLoop::default();
        let (listener, log) = recorder();
        event_loop.add_listener(listener);
        let stream = EventStream::from_events(vec![Event::Connect]);
        let running = event_loop.spawn(stream).unwrap();
        running.done().recv_timeout(Duration::from_secs(5)).unwrap();
        running.wait().unwrap();
        assert_eq!(*log.lock().unwrap(), ["init", "connect", "exit"]);
    }

    #[test]
    fn test_gesture_enable_disable() {
        let controller = Controller::default();
        controller.enable_gesture(GestureKinds::CIRCLE | GestureKinds::SWIPE);
        controller.disable_gesture(GestureKinds::SWIPE);
        assert!(controller.is_gesture_enabled(GestureKinds::CIRCLE));
        assert!(!controller.is_gesture_enabled(GestureKinds::SWIPE));
    }
}
