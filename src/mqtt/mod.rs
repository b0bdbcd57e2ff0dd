pub mod connection;
pub mod publisher;

pub use connection::connect;
pub use publisher::{publish_envelope, MqttPublisher, Publisher};
