use crate::input::InputService;
use crate::presentation::PresentationSink;
use crate::timer::TimerService;

/// Collaborators the interaction core borrows for the duration of one call.
pub struct HostServices<'a> {
    pub timers: &'a mut dyn TimerService,
    pub input: &'a mut dyn InputService,
    pub presentation: &'a dyn PresentationSink,
}
