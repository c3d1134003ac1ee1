pub const ENV_DB_URL: &str = "DB_URL";
pub const ENV_USER_VERIFICATION_ADDRESS: &str = "USER_VERIFICATION_ADDRESS";

/// Games the platform hosts. Score submissions for anything else are rejected
/// at the ingress boundary.
pub const VALID_GAMES: [&str; 4] = ["snake", "space-invaders", "tetris", "pacman"];
