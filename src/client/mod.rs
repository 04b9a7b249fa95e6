//! Client management system
//!
//! Per-connection state, the control transport, the session loop and the
//! registry of live sessions.

pub mod events;
pub mod registry;
pub mod session;
pub mod state;
pub mod transport;

pub use events::{LoggingObserver, SessionObserver};
pub use registry::{ClientRegistry, RegistrationGuard, SessionHandle};
pub use session::{Session, SessionEnd};
pub use state::{ClientState, ResumeOrigin, SessionInfo, TransferControl};
pub use transport::{ControlStream, ControlTransport, ReadLine};
