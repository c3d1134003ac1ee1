pub mod achievement;
pub mod score;
pub mod user_achievement;
