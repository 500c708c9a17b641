use satchel_core::util::is_http_url;

use crate::error::CliError;
use crate::profile::CliConfig;

/// Store the account email (and optionally the API base URL) in the CLI
/// config. Pending rows captured under the previous owner are claimed by
/// the new one on the next fetch or sync.
pub fn run_login(email: &str, api_url: Option<&str>) -> Result<(), CliError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(CliError::EmptyEmail);
    }

    let mut config = CliConfig::load().map_err(CliError::Config)?;
    if let Some(api_url) = api_url {
        let api_url = api_url.trim().trim_end_matches('/');
        if !is_http_url(api_url) {
            return Err(CliError::Config(format!(
                "API base URL must start with http:// or https://, got '{api_url}'"
            )));
        }
        config.api_base_url = Some(api_url.to_string());
    }
    config.email = Some(email.to_string());
    config.save().map_err(CliError::Config)?;

    println!("Signed in as {email}");
    if config.api_base_url().is_none() {
        println!("No API base URL configured yet; pass --api-url before the first sync.");
    }
    Ok(())
}

/// Clear the stored email. The cache keeps attributing offline work to
/// the last owner until someone else signs in.
pub fn run_logout() -> Result<(), CliError> {
    let mut config = CliConfig::load().map_err(CliError::Config)?;
    let Some(email) = config.email() else {
        println!("No account is signed in.");
        return Ok(());
    };
    config.email = None;
    config.save().map_err(CliError::Config)?;
    println!("Signed out {email}");
    Ok(())
}
