use std::io::Write;

use super::command::Command;
use super::util::seed_file;
use crate::api::list_response;
use crate::errors::ApiError;
use crate::resources::Service;

/// Executes one command, writing its JSON output to `out`.
///
/// # Errors
/// Whatever the underlying service call reports, plus write failures.
pub fn run(service: &Service, cmd: Command, out: &mut dyn Write) -> Result<(), ApiError> {
    match cmd {
        Command::Query { resource, params, seed } => {
            if let Some(path) = seed {
                seed_file(service, &path)?;
            }
            let page = service.list(&resource, &params)?;
            let body = list_response(&page).body;
            writeln!(out, "{}", serde_json::to_string_pretty(&body)?)?;
        }
        Command::Seed { file } => {
            let counts = seed_file(service, &file)?;
            writeln!(out, "{}", serde_json::json!({"seeded": counts}))?;
        }
        Command::Dependencies => {
            let table = service.maintainer().table();
            writeln!(out, "{}", serde_json::to_string_pretty(table)?)?;
        }
    }
    Ok(())
}
