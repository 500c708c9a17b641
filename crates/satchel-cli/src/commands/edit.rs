use crate::commands::common::{
    build_client, build_form, normalize_record_id, print_save_receipt, ClientEnv,
};
use crate::error::CliError;

pub async fn run_edit(
    resource: &str,
    id: &str,
    fields: &[String],
    client_env: &ClientEnv,
) -> Result<(), CliError> {
    let id = normalize_record_id(id)?;
    let mut client = build_client(resource, client_env, None)?;
    let form = build_form(fields, Some(&id), client.options())?;

    let receipt = client.save_data(&form).await?;
    print_save_receipt(&receipt);
    Ok(())
}
