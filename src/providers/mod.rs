pub mod gitlab;
pub mod telegram;
