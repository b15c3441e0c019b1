#![no_main]

use babeltest::Command;
use babeltest::protocol::{Action, TestResult};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Convert bytes to UTF-8 string (ignore invalid UTF-8)
    if let Ok(line) = std::str::from_utf8(data) {
        match Command::parse(line) {
            Ok(command) => {
                let _ = Action::parse(&command.action);
            }
            // Every parse failure must still render as a single response line
            Err(err) => assert!(!TestResult::error(&err).to_line().contains('\n')),
        }
    }
});
