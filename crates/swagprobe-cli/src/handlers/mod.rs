//! Command handlers - kept out of main.rs for testability

pub mod check;
pub mod clean;
pub mod list;
pub mod report;

pub use check::{execute_check, run_checks, CheckItem};
pub use clean::{clean_under, execute_clean, is_safe_target};
pub use list::{execute_list, render_list};
pub use report::{allure_executable, generate_report};
