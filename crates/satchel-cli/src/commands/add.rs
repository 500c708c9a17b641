use crate::commands::common::{build_client, build_form, print_save_receipt, ClientEnv};
use crate::error::CliError;

pub async fn run_add(
    resource: &str,
    fields: &[String],
    client_env: &ClientEnv,
) -> Result<(), CliError> {
    let mut client = build_client(resource, client_env, None)?;
    let form = build_form(fields, None, client.options())?;

    let receipt = client.save_data(&form).await?;
    print_save_receipt(&receipt);
    Ok(())
}
