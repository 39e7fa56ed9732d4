mod calls_tests;
mod health_tests;
