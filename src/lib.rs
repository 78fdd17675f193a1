pub mod architecture;
pub mod cmd;
pub mod config;
pub mod decisions;
pub mod errors;
pub mod evaluation;
pub mod features;
pub mod guard;
pub mod history;
pub mod metrics;
pub mod policy;
pub mod resolver;
pub mod session;
pub mod stack;
pub mod ui;
pub mod util;
pub mod verdict;
