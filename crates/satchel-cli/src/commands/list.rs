use crate::commands::common::{build_client, format_record_lines, ClientEnv};
use crate::error::CliError;

pub async fn run_list(
    resource: &str,
    page: usize,
    per_page: Option<usize>,
    search: &str,
    as_json: bool,
    client_env: &ClientEnv,
) -> Result<(), CliError> {
    let mut client = build_client(resource, client_env, per_page)?;
    client.set_search(search);
    client.fetch_data().await?;
    client.set_page(page);

    if as_json {
        println!("{}", serde_json::to_string_pretty(client.paged_items())?);
        return Ok(());
    }

    let rows = client.paged_items();
    if rows.is_empty() {
        println!("No records.");
        return Ok(());
    }
    for line in format_record_lines(rows, client.options()) {
        println!("{line}");
    }
    let pagination = client.pagination();
    println!(
        "page {} ({} of {} rows)",
        pagination.page,
        rows.len(),
        pagination.total
    );
    Ok(())
}
