pub mod booking;
pub mod lifecycle;
pub mod room;

pub use booking::AppointmentService;
pub use lifecycle::AppointmentLifecycleService;
