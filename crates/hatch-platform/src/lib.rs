//! Host platform detection and on-disk layout for the hatch launcher.
//!
//! - Resolving the running operating system into a [`PlatformProfile`].
//! - Release endpoint URLs per platform.
//! - Host directories ([`AppPaths`]) and the artifact repository layout
//!   ([`RepoPaths`]).

mod paths;
mod platform;

pub use paths::{AppPaths, AppPathsError, RepoPaths};
pub use platform::{
    DEFAULT_RELEASE_BASE_URL, Platform, PlatformProfile, ReleaseEndpoints, UnsupportedPlatform,
    host_os_name,
};
