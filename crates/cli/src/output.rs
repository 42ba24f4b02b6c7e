//! Output formatting for CLI

use colored::Colorize;
use tracecheck_runner::TestSuiteResult;

/// Final summary line
pub fn print_summary(results: &TestSuiteResult) {
    let (failed, total) = results.summary();
    if failed == 0 {
        println!("{}", format!("TEST PASSED ({})", total).green().bold());
    } else {
        println!(
            "{}",
            format!("TEST FAILED ({}/{})", failed, total).red().bold()
        );
    }
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "ERROR:".red().bold(), message);
}
