mod call_tests;
mod connection_tests;
mod notification_tests;
mod typing_tests;
