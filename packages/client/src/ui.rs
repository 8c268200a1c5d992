//! UI utilities for the client.

use std::io::Write;

/// Redisplay the prompt after printing server output
pub fn redisplay_prompt(username: &str) {
    print!("{}> ", username);
    std::io::stdout().flush().ok();
}
