use anyhow::Result;
use std::io::{self, BufRead, Write};

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().lock().read_line(&mut username)?;
    Ok(username.trim().to_string())
}

/// Username from the settings, or asked for; the password is always asked
/// for and never stored.
pub fn get_credentials(login: Option<&str>) -> Result<(String, String)> {
    let username = match login {
        Some(login) => login.to_string(),
        None => prompt_username()?,
    };
    if username.is_empty() {
        anyhow::bail!("No username given");
    }

    let password = rpassword::prompt_password(format!("Password for {}: ", username))?;
    Ok((username, password))
}
