//! Background service logic invoked outside the request path

pub mod escalation;
