//! Host-side collaborator interfaces consumed by the `screen-layout`
//! engine: a window host abstraction with its transient failure mode, a
//! shared screen descriptor handle, and a content-layout handle.
//!
//! The engine never talks to a real windowing system directly; embedders
//! implement [`WindowHost`] over whatever toolkit hosts the window, and
//! tests use [`MockWindowHost`].

mod content;
mod error;
mod geom;
mod ops;
mod screen;

pub use content::{ContentEvent, LayoutContent};
pub use error::{HostError, Result};
pub use geom::{Rect, Size, Transform, within_tolerance};
pub use ops::{HostEvent, MockWindowHost, SessionSwitchReason, WindowHost};
pub use screen::{Screen, ScreenChange};
