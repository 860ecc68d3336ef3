//! tourfind-trigger
//!
//! Locates an element in the live viewer and activates it, retrying with
//! capped exponential backoff while the freshly selected panorama loads.

pub mod locate;
pub mod trigger;

pub use locate::{activate, locate, ActivationMethod, LookupStrategy};
pub use trigger::{backoff_delay, ElementTrigger, TriggerHandle, TriggerOutcome, TriggerState, TriggerStatus};
