pub mod atomic;
pub mod command;
pub mod error;
pub mod group;
pub mod queued;

pub use atomic::AtomicGroup;
pub use command::{FiniteCommand, InfiniteCommand, Runnable};
pub use error::{Interrupted, TaskError, cancellable};
pub use group::Group;
pub use queued::QueuedAtomicGroup;
