// Services layer
//
// Business logic between the HTTP handlers and doorstate-core.

pub mod door;

pub use door::{DoorService, DoorStats};
