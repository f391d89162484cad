pub mod auth;
pub mod lifecycle;
pub mod payments;
pub mod scheduling;
pub mod session;
pub mod storage;
