// lrctl-sdk: Foundation layer for the lrctl launcher.
// This crate has no dependencies on other lrctl crates and provides the
// process, proxy, PATH lookup and trace primitives the launcher builds on.

pub mod build_constants;
pub mod process_invoker;
pub mod string_util;
pub mod trace;
pub mod web_proxy;
pub mod which_util;

// Re-export commonly used items at crate root
pub use build_constants::{LauncherPackage, Source};
pub use process_invoker::{ProcessExitCodeError, ProcessInvoker, ProcessOutput};
pub use string_util::StringUtil;
pub use trace::TraceWriter;
pub use web_proxy::LauncherWebProxy;
pub use which_util::WhichUtil;
