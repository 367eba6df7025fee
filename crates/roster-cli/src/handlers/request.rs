//! Backend call handlers: `me` and `request`

use super::Session;
use crate::cli::{MeArgs, OutputFormat, RequestArgs};
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::{format_value_compact, OutputFormatter, OutputWriter};
use roster_core::{RequestOptions, ResponseBody};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Handle the me command
pub async fn handle_me(args: MeArgs, session: Session, output: &mut OutputWriter) -> Result<()> {
    let spinner = output.spinner("Fetching profile");
    let timer = Timer::new("me");

    let outcome = session.client().me().await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    timer.finish();

    let profile = session.conclude(output, outcome)?;

    if let Some(path) = args.save_to {
        let body = ResponseBody::Json(profile);
        return save_body(&path, &body, output);
    }

    match (output.format(), &profile) {
        (OutputFormat::Human, Value::Object(fields)) => {
            output.section("Profile")?;
            for (key, value) in fields {
                output.writeln(&format!("  {}: {}", key, format_value_compact(value)))?;
            }
            Ok(())
        }
        _ => output.data(&profile),
    }
}

/// Handle the request command
pub async fn handle_request(args: RequestArgs, session: Session, output: &mut OutputWriter) -> Result<()> {
    let options = build_options(&args)?;

    let spinner = output.spinner(&format!("{} {}", options.method, args.path));
    let timer = Timer::with_details("request", &args.path);

    let outcome = session.client().request_raw(&args.path, &options).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    timer.finish();

    let response = session.conclude(output, outcome)?;
    tracing::debug!(status = response.status, "request succeeded");

    if let Some(path) = &args.save_to {
        return save_body(path, &response.body, output);
    }

    output.info(&format!("HTTP {}", response.status))?;
    output.body(&response.body)
}

/// Translate command-line arguments into request options
fn build_options(args: &RequestArgs) -> Result<RequestOptions> {
    let mut options = RequestOptions::new(args.method.into());
    for (name, value) in &args.headers {
        options = options.header(name.clone(), value.clone());
    }

    let body = match (&args.data, &args.data_file) {
        (Some(data), _) => Some(data.clone().into_bytes()),
        (None, Some(path)) => {
            if !path.exists() {
                return Err(Error::FileNotFound { path: path.clone() });
            }
            Some(fs::read(path)?)
        }
        (None, None) => None,
    };

    if args.json {
        if let Some(body) = &body {
            serde_json::from_slice::<Value>(body)
                .map_err(|e| Error::invalid_args(format!("--json body is not valid JSON: {}", e)))?;
        }
        let has_content_type = options
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("content-type"));
        if !has_content_type {
            options = options.header("Content-Type", "application/json");
        }
    }

    if let Some(body) = body {
        options = options.body(body);
    }

    Ok(options)
}

fn save_body(path: &Path, body: &ResponseBody, output: &mut OutputWriter) -> Result<()> {
    let content = match body {
        ResponseBody::Json(_) => OutputFormat::JsonPretty.format_body(body)?,
        ResponseBody::Text(text) => text.clone(),
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;

    output.success(&format!("Saved response to {}", path.display()))
}
