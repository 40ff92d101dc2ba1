pub mod check;
pub mod secret;
pub mod token;
