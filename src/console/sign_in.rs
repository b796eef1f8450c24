use super::prompt;
use anyhow::{bail, Context, Result};
use clipcontrol_guard::api::ApiClient;
use clipcontrol_guard::session::{SessionStore, StoredSession};

pub fn login(
    client: &ApiClient,
    store: &SessionStore,
    username: Option<String>,
) -> Result<StoredSession> {
    let username = match username {
        Some(username) => username,
        None => match prompt("Username: ")? {
            Some(username) => username,
            None => bail!("no username given"),
        },
    };
    let password = rpassword::prompt_password_stdout("Password: ")
        .context("Failed to read password")?;
    if username.is_empty() || password.is_empty() {
        bail!("please fill in both username and password");
    }

    let session = client
        .login(&username, &password)
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .context("Login failed")?;
    // Keep the benefit the guard had picked last time, if it was the same guard
    let session = match store.load() {
        Ok(Some(previous)) if previous.guard.guard_id == session.guard.guard_id => StoredSession {
            benefit: previous.benefit,
            ..session
        },
        _ => session,
    };
    store.save(&session).context("Failed to save session")?;
    println!("Welcome, {}", session.guard.full_name);
    Ok(session)
}
