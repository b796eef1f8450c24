//! Guard-side client for ClipControl benefit deliveries: scan an employee's
//! QR token, validate it, photograph the hand-off and record the delivery.

#[macro_use]
extern crate lazy_static;

pub mod api;
pub mod camera;
pub mod checkin;
pub mod config;
pub mod error;
pub mod model;
pub mod scanner;
pub mod session;
pub mod stats;
pub mod token;
