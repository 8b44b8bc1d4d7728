mod driver;
mod machine;
mod scheduler;
mod snapshot;

pub use driver::{DriverError, SessionCommand, SessionDriver, SessionHandle};
pub use machine::{LessonSession, SessionError};
pub use scheduler::{
    AdvanceDispatch, AdvanceScheduler, AdvanceTicket, ImmediateScheduler, TokioScheduler,
};
pub use snapshot::{Phase, RemediationOffer, SessionSnapshot, SessionState};
