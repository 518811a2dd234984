mod common;
mod docs_suite_tests;
mod runner_tests;
