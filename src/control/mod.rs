//! Control surface module
//! 
//! The ephemeral client side: reconciles with the authority on every open and
//! forwards user commands over the command channel.

pub mod link;
pub mod surface;

pub use link::{AuthorityLink, Command, HttpLink, LocalLink, QUERY_TIMEOUT};
pub use surface::{ControlSurface, View, ViewSource};
