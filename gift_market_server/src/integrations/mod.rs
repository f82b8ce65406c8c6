pub mod steam;
