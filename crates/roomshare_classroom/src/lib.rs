pub mod registry;
pub mod service;
pub mod watch;

pub use registry::{RoomRegistry, DEFAULT_CLASSROOMS};
pub use service::{ClassroomService, RoomUpdate, ServiceTiming, ShareError};
pub use watch::watch_room;
