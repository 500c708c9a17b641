use crate::commands::common::{build_client, format_status_lines, status_report, ClientEnv};
use crate::error::CliError;

/// Replay pending rows, reconcile against the full collection, then
/// refresh the first page.
pub async fn run_sync(resource: &str, client_env: &ClientEnv) -> Result<(), CliError> {
    let mut client = build_client(resource, client_env, None)?;
    let report = client.on_online().await?;

    if report.attempted > 0 {
        println!(
            "Replayed {} of {} pending rows",
            report.succeeded, report.attempted
        );
        for failure in &report.failures {
            println!("  row {}: {}", failure.key, failure.error);
        }
    }
    if report.is_clean() {
        println!("Sync completed");
    } else {
        println!(
            "{} rows still pending; run `satchel sync {resource}` again once the server accepts them",
            report.failed()
        );
    }
    Ok(())
}

/// Cache inspection only; the API is never contacted, so status works
/// before login and without a configured base URL.
pub fn run_status(resource: &str, as_json: bool, client_env: &ClientEnv) -> Result<(), CliError> {
    let local_env = ClientEnv {
        offline: true,
        data_dir: client_env.data_dir.clone(),
    };
    let client = build_client(resource, &local_env, None)?;
    let report = status_report(&client);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    for line in format_status_lines(&report) {
        println!("{line}");
    }
    Ok(())
}
