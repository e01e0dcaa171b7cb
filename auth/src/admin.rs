use anyhow::{Context, Result};
use authd_store::{CredentialStore, SqliteStore};
use owo_colors::OwoColorize;
use rand::Rng;

use crate::config::Config;

/// Alphabet for generated passwords, excluding visually confusable
/// characters (`I`, `O`, `L`, `i`, `o`, `l`, `0`, `1`). Matches the upstream
/// admin tool's `passwordLetters` constant byte for byte.
const PASSWORD_ALPHABET: &[u8] =
    b"abcdefghjkmnpqrstuvwxyzABCDEFGHJKMNPQRSTUVWXYZ23456789";
const PASSWORD_LENGTH: usize = 12;

/// `account create <username> <email>`: generates a password, derives its
/// salt/verifier, and persists the row. Fails on a duplicate username. The
/// password is printed to stdout exactly once and never stored in
/// plaintext anywhere.
pub async fn create(config_path: &std::path::Path, username: &str, email: &str) -> Result<()> {
    let config = Config::load(config_path).context("loading config")?;
    let store = SqliteStore::connect(&config.database_filename)
        .await
        .context("connecting to credential store")?;

    let password = generate_password();

    store
        .add_user(username, email, &password)
        .await
        .context("adding user")?;

    println!("{}", "User successfully added.".green());
    println!("\tUsername: {}", username.green());
    println!("\tPassword: {}", password.yellow());
    Ok(())
}

fn generate_password() -> String {
    let mut rng = rand::rng();
    (0..PASSWORD_LENGTH)
        .map(|_| PASSWORD_ALPHABET[rng.random_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_password_is_right_length_and_alphabet() {
        for _ in 0..200 {
            let password = generate_password();
            assert_eq!(password.len(), PASSWORD_LENGTH);
            for c in password.chars() {
                assert!(PASSWORD_ALPHABET.contains(&(c as u8)), "unexpected char {c}");
            }
            for excluded in ['I', 'O', 'L', 'i', 'o', 'l', '0', '1'] {
                assert!(!password.contains(excluded));
            }
        }
    }
}
