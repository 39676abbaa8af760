//! These models represent the objects passed around by the agent
//!
//! There are two wire formats we need to interact with:
//! - chat platform messages, sent from the platform to the agent endpoint
//! - chat completion messages/tools, sent from the agent to the completion API
//!
//! The two overlap almost entirely (the platform relays the completion API's
//! message shape), so a single set of serde structs covers both directions.
pub mod message;
pub mod tool;
