mod common;
mod project_api_tests;
