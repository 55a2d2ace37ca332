use std::io::{BufRead, IsTerminal};

use anyhow::Result;

/// Read one password line from stdin and print its argon2 PHC hash, ready to
/// paste into `[[auth.accounts]]`.
pub fn hash_password() -> Result<()> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprint!("Password: ");
    }

    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        anyhow::bail!("refusing to hash an empty password");
    }

    let hash = smsrelay_auth::hash_password(password)?;
    println!("{hash}");
    Ok(())
}
