mod health_tests;
mod notification_tests;
