pub mod credentials;
pub mod lifecycle;
pub mod posts;
pub mod uploads;
