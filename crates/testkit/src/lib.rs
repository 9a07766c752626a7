mod yaml_runner;

pub use yaml_runner::{
    RunnerError, RunnerResult, TestCase, TestResult, load_test_cases_from_str, run_offline_test,
    run_online_test,
};
