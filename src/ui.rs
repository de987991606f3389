// UI layer: a simple interactive menu using `dialoguer`. Each flow asks for
// its inputs, runs one request behind a spinner and reports the outcome.

use crate::api::{file_form, ApiClient};
use crate::config::ConfigError;
use crate::error::{DispatchError, ErrorSlot};
use crate::session::SESSION_COOKIE;
use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::{Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Main interactive menu. Runs until the user chooses "Exit".
pub fn main_menu(api: &ApiClient) -> Result<()> {
    let mut slot = ErrorSlot::new();
    loop {
        let items = vec![
            "Fetch (GET)",
            "Send JSON (POST)",
            "Upload file",
            "Log in",
            "Log out",
            "Exit",
        ];
        let selection = Select::new().items(&items).default(0).interact()?;
        match selection {
            0 => handle_fetch(api, &mut slot)?,
            1 => handle_post(api, &mut slot)?,
            2 => handle_upload(api, &mut slot)?,
            3 => {
                let token: String = Password::new().with_prompt("Session token").interact()?;
                api.cookies().set(SESSION_COOKIE, token.trim())?;
                println!("Session saved to {}", api.cookies().path().display());
            }
            4 => {
                api.cookies().remove(SESSION_COOKIE)?;
                println!("Logged out.");
            }
            5 => break,
            _ => {}
        }
    }
    Ok(())
}

fn handle_fetch(api: &ApiClient, slot: &mut ErrorSlot) -> Result<()> {
    let path = prompt_path()?;
    let result = with_spinner("Fetching...", || api.fetch_data(&path))?;
    if let Some(data) = report(result, slot)? {
        println!("{}", serde_json::to_string_pretty(&data)?);
    }
    Ok(())
}

fn handle_post(api: &ApiClient, slot: &mut ErrorSlot) -> Result<()> {
    let path = prompt_path()?;
    let raw: String = Input::new()
        .with_prompt("JSON body")
        .default("{}".into())
        .interact_text()?;
    let body: Value = match serde_json::from_str(&raw) {
        Ok(body) => body,
        Err(e) => {
            println!("{}", format!("Invalid JSON: {}", e).red());
            return Ok(());
        }
    };
    let result = with_spinner("Sending...", || api.post_data(&path, &body))?;
    if report(result, slot)?.is_some() {
        println!("Sent.");
    }
    Ok(())
}

fn handle_upload(api: &ApiClient, slot: &mut ErrorSlot) -> Result<()> {
    let path = prompt_path()?;
    let file: String = Input::new().with_prompt("File path").interact_text()?;
    let field: String = Input::new()
        .with_prompt("Form field")
        .default("file".into())
        .interact_text()?;
    let form = match file_form(&field, &PathBuf::from(file)) {
        Ok(form) => form,
        Err(e) => {
            println!("{}", format!("{:#}", e).red());
            return Ok(());
        }
    };
    let result = with_spinner("Uploading...", || api.upload_data(&path, form))?;
    if report(result, slot)?.is_some() {
        println!("Upload successful");
    }
    Ok(())
}

fn prompt_path() -> Result<String> {
    let path: String = Input::new()
        .with_prompt("Path (appended to API_URL)")
        .interact_text()?;
    Ok(path)
}

/// Show a spinner while `f` runs.
fn with_spinner<T>(msg: &'static str, f: impl FnOnce() -> T) -> Result<T> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(msg);
    spinner.enable_steady_tick(Duration::from_millis(80));
    let out = f();
    spinner.finish_and_clear();
    Ok(out)
}

/// Present a dispatch outcome. Failures go through the error slot; a
/// missing configuration blocks on an alert until the user acknowledges.
fn report<T>(result: Result<T, DispatchError>, slot: &mut ErrorSlot) -> Result<Option<T>> {
    if let Some(e) = result.as_ref().err().filter(|e| e.is_skipped()) {
        match e {
            DispatchError::Config(config) => alert(config)?,
            _ => println!("You should log in first."),
        }
    }
    let value = slot.record(result);
    if !slot.is_empty() {
        println!("{}", slot.value().red().bold());
        slot.clear();
    }
    Ok(value)
}

fn alert(err: &ConfigError) -> Result<()> {
    println!("{}", err.to_string().white().on_red().bold());
    let _: String = Input::new()
        .with_prompt("Press Enter to continue")
        .allow_empty(true)
        .interact_text()?;
    Ok(())
}
