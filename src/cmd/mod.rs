//! CLI command implementations.
//!
//! | Module    | Commands handled        |
//! |-----------|-------------------------|
//! | `run`     | `Run`                   |
//! | `status`  | `Status`, `Metrics`     |
//! | `guard`   | `Guard`                 |
//! | `config`  | `Config`                |
//! | `reset`   | `Reset`                 |

pub mod config;
pub mod guard;
pub mod reset;
pub mod run;
pub mod status;

pub use config::cmd_config;
pub use guard::cmd_guard;
pub use reset::cmd_reset;
pub use run::cmd_run;
pub use status::{cmd_metrics, cmd_status};
