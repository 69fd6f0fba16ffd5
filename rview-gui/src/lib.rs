//! # rview-gui: remote desktop viewer window
//!
//! Hosts the presentation side of a session: a native Win32 window, the
//! GDI renderer, local clipboard access and the presentation shell that
//! connects them to the `rview-core` runtime bridge.

pub mod clipboard;
pub mod config;
pub mod display;
pub mod shell;
pub mod window;
