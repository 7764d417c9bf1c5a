mod protocol_tests;
mod scenario_tests;
