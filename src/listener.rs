use crate::controller::Controller;

/// Callbacks invoked by an [`EventLoop`](crate::EventLoop).
///
/// Every method has an empty default so a listener only implements the
/// events it cares about. Callbacks run one at a time on the dispatch thread
/// and cannot fail.
#[allow(unused_variables)]
pub trait Listener: Send {
    /// Called once when the listener is added.
    fn on_init(&mut self, controller: &Controller) {}

    /// A tracking device became available.
    fn on_connect(&mut self, controller: &Controller) {}

    fn on_disconnect(&mut self, controller: &Controller) {}

    /// Called once when the listener is removed or the event loop ends.
    fn on_exit(&mut self, controller: &Controller) {}

    /// A new frame is current; read it with `controller.frame(0)`.
    fn on_frame(&mut self, controller: &Controller) {}

    fn on_focus_gained(&mut self, controller: &Controller) {}

    fn on_focus_lost(&mut self, controller: &Controller) {}

    /// The device list changed; read it with `controller.devices()`.
    fn on_device_change(&mut self, controller: &Controller) {}

    fn on_service_connect(&mut self, controller: &Controller) {}

    fn on_service_disconnect(&mut self, controller: &Controller) {}
}
