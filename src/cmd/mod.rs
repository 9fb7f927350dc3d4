//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled                                                 |
//! |------------|------------------------------------------------------------------|
//! | `workflow` | `Analyze`, `Apply`, `Crosscheck`, `Fix`, `Vision`, `Submit`, `Run` |
//! | `capture`  | `Capture`                                                        |
//! | `session`  | `Session`                                                        |
//! | `config`   | `Config`                                                         |

pub mod capture;
pub mod config;
pub mod session;
pub mod workflow;

pub use capture::cmd_capture;
pub use config::cmd_config;
pub use session::cmd_session;
pub use workflow::{
    cmd_analyze, cmd_apply, cmd_crosscheck, cmd_fix, cmd_run, cmd_submit, cmd_vision,
};
