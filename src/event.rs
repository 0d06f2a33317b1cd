use crate::driver::Driver;
use crate::error::{ClError, Result, check};
use crate::handle::{EventKind, Handle};
use crate::info;
use crate::sys::{self, cl_event, cl_int, cl_uint};
use std::fmt;
use std::sync::Arc;

/// Execution state of the command behind an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionStatus {
    Queued,
    Submitted,
    Running,
    Complete,
    /// Terminated abnormally; carries the negative status.
    Error(cl_int),
}

impl ExecutionStatus {
    pub fn from_raw(raw: cl_int) -> Self {
        match raw {
            sys::CL_QUEUED => Self::Queued,
            sys::CL_SUBMITTED => Self::Submitted,
            sys::CL_RUNNING => Self::Running,
            sys::CL_COMPLETE => Self::Complete,
            other => Self::Error(other),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error(_))
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => f.write_str("Queued"),
            Self::Submitted => f.write_str("Submitted"),
            Self::Running => f.write_str("Running"),
            Self::Complete => f.write_str("Complete"),
            Self::Error(code) => write!(f, "Error({})", code),
        }
    }
}

/// Device-clock timestamps an event can report, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfilingInfo {
    Queued,
    Submit,
    Start,
    End,
}

impl ProfilingInfo {
    fn raw(self) -> sys::cl_profiling_info {
        match self {
            Self::Queued => sys::CL_PROFILING_COMMAND_QUEUED,
            Self::Submit => sys::CL_PROFILING_COMMAND_SUBMIT,
            Self::Start => sys::CL_PROFILING_COMMAND_START,
            Self::End => sys::CL_PROFILING_COMMAND_END,
        }
    }
}

/// Completion state of one enqueued command, or a user event.
#[derive(Debug)]
pub struct Event {
    handle: Handle<EventKind>,
}

impl Event {
    pub(crate) fn new(driver: Arc<dyn Driver>, raw: cl_event) -> Self {
        Event {
            handle: Handle::new(driver, raw),
        }
    }

    pub fn raw(&self) -> cl_event {
        self.handle.raw()
    }

    /// Blocks until this event reaches a terminal state.
    pub fn wait(&self) -> Result<()> {
        wait_for_events(&[self])
    }

    pub fn execution_status(&self) -> Result<ExecutionStatus> {
        info::value(|size, value, size_ret| unsafe {
            self.handle.driver().get_event_info(
                self.raw(),
                sys::CL_EVENT_COMMAND_EXECUTION_STATUS,
                size,
                value,
                size_ret,
            )
        })
        .map(ExecutionStatus::from_raw)
    }

    /// Completes a user event. `status` is `CL_COMPLETE` or a negative
    /// code, which fails every command waiting on the event. The runtime
    /// accepts this only once per event.
    pub fn set_user_event_status(&self, status: cl_int) -> Result<()> {
        check(unsafe {
            self.handle
                .driver()
                .set_user_event_status(self.raw(), status)
        })
    }

    /// Only available for commands on a queue created with profiling
    /// enabled; otherwise `ProfilingInfoNotAvailable`.
    pub fn profiling_info(&self, info: ProfilingInfo) -> Result<u64> {
        info::value(|size, value, size_ret| unsafe {
            self.handle.driver().get_event_profiling_info(
                self.raw(),
                info.raw(),
                size,
                value,
                size_ret,
            )
        })
    }

    /// Releases the event now instead of on drop. Consuming the
    /// wrapper guarantees no other borrow can still be using the handle.
    pub fn release(self) -> Result<()> {
        self.handle.release()
    }

    pub(crate) fn driver(&self) -> &Arc<dyn Driver> {
        self.handle.driver()
    }
}

unsafe impl Send for Event {}
unsafe impl Sync for Event {}

/// Blocks until every event in `events` reaches a terminal state.
///
/// An empty list is rejected with `InvalidValue` without calling into the
/// runtime.
pub fn wait_for_events(events: &[&Event]) -> Result<()> {
    let Some(first) = events.first() else {
        return Err(ClError::InvalidValue);
    };
    let raw = raw_events(events);
    check(unsafe {
        first
            .driver()
            .wait_for_events(raw.len() as cl_uint, raw.as_ptr())
    })
}

/// Native handles of a wait-list, in order.
pub(crate) fn raw_events(events: &[&Event]) -> Vec<cl_event> {
    events.iter().map(|e| e.raw()).collect()
}
