//! These models represent the objects passed around during a tool-calling exchange
//!
//! There are two related formats we need to interact with:
//! - anthropic messages/tools, sent from the agent to the LLM
//! - tool requests and results, sent from the agent to the system providing tools
//!
//! We always immediately convert those wire formats into the internal structs using
//! to/from helpers, so the internal models are not an exact match to either format.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
