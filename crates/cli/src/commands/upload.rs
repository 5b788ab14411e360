//! upload - Walk the source directory and upload it to the bucket
//!
//! Resolves configuration from flags, environment and config file, plans one
//! task per file and empty directory, then runs every task and reports.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use cosup_core::{
    plan_uploads, ConfigManager, ConfigOverrides, Error, UploadConfig, UploadPlan, UploadReport,
    Uploader, WalkIssue,
};
use cosup_s3::S3Client;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Upload arguments; every flag can also be given through its env variable
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// COS SecretId (access key id)
    #[arg(long, env = "COS_SECRET_ID", hide_env_values = true)]
    pub secret_id: Option<String>,

    /// COS SecretKey
    #[arg(long, env = "COS_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Bucket name, e.g. site-1250000000
    #[arg(long, env = "COS_BUCKET")]
    pub bucket: Option<String>,

    /// Bucket region, e.g. ap-guangzhou
    #[arg(long, env = "COS_REGION")]
    pub region: Option<String>,

    /// Endpoint URL (defaults to https://cos.<region>.myqcloud.com)
    #[arg(long, env = "COS_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Use path-style addressing instead of virtual-hosted buckets
    #[arg(long, env = "COS_PATH_STYLE", value_parser = clap::builder::FalseyValueParser::new())]
    pub path_style: bool,

    /// Directory to upload [default: docs/.vitepress/dist]
    #[arg(short, long, env = "COSUP_SOURCE")]
    pub source: Option<PathBuf>,

    /// Key prefix to upload under
    #[arg(short, long, env = "COSUP_PREFIX")]
    pub prefix: Option<String>,

    /// Configuration file [default: <config dir>/cosup/config.toml]
    #[arg(long, env = "COSUP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only show what would be uploaded
    #[arg(long)]
    pub dry_run: bool,
}

impl UploadArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            secret_id: self.secret_id.clone(),
            secret_key: self.secret_key.clone(),
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            path_style: self.path_style.then_some(true),
            source_dir: self.source.clone(),
            prefix: self.prefix.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PlannedTask {
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    directory_marker: bool,
}

#[derive(Debug, Serialize)]
struct DryRunOutput {
    status: &'static str,
    bucket: String,
    prefix: String,
    source_dir: String,
    tasks: Vec<PlannedTask>,
    walk_issues: Vec<WalkIssue>,
}

#[derive(Debug, Serialize)]
struct UploadOutput<'a> {
    status: &'static str,
    bucket: String,
    prefix: String,
    files: usize,
    directory_markers: usize,
    failed: usize,
    total_bytes: u64,
    total_human: String,
    elapsed_ms: i64,
    #[serde(flatten)]
    report: &'a UploadReport,
}

/// Execute the upload
pub async fn execute(args: UploadArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let config = match load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    let plan = match plan_uploads(&config.source_dir, &config.prefix) {
        Ok(p) => p,
        Err(e) => {
            formatter.error(&format!("Failed to read source directory: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    if args.dry_run {
        return print_plan(&config, plan, &formatter);
    }

    let client = match S3Client::new(&config.store).await {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!("Failed to create S3 client: {e}"));
            return ExitCode::NetworkError;
        }
    };

    let report = Uploader::new(Arc::new(client)).run(plan).await;
    print_report(&config, &report, &formatter)
}

fn load_config(args: &UploadArgs) -> cosup_core::Result<UploadConfig> {
    let manager = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(Error::NotFound(format!(
                    "Configuration file {}",
                    path.display()
                )));
            }
            ConfigManager::with_path(path.clone())
        }
        None => ConfigManager::new()?,
    };

    let file = manager.load()?;
    UploadConfig::resolve(file, args.overrides())
}

fn destination(config: &UploadConfig) -> String {
    if config.prefix.is_empty() {
        config.store.bucket.clone()
    } else {
        format!("{}/{}", config.store.bucket, config.prefix)
    }
}

fn print_plan(config: &UploadConfig, plan: UploadPlan, formatter: &Formatter) -> ExitCode {
    let exit_code = if plan.issues.is_empty() {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    };

    if formatter.is_json() {
        let output = DryRunOutput {
            status: "dry_run",
            bucket: config.store.bucket.clone(),
            prefix: config.prefix.to_string(),
            source_dir: config.source_dir.display().to_string(),
            tasks: plan
                .tasks
                .iter()
                .map(|task| PlannedTask {
                    key: task.key.clone(),
                    source: task.source_path().map(|p| p.display().to_string()),
                    directory_marker: task.is_directory_marker(),
                })
                .collect(),
            walk_issues: plan.issues,
        };
        formatter.json(&output);
        return exit_code;
    }

    for task in &plan.tasks {
        match task.source_path() {
            Some(source) => formatter.println(&format!(
                "Would upload: {} -> {}/{}",
                source.display(),
                config.store.bucket,
                task.key
            )),
            None => formatter.println(&format!(
                "Would create: {}/{} (directory marker)",
                config.store.bucket, task.key
            )),
        }
    }
    for issue in &plan.issues {
        formatter.skipped(issue);
    }

    let planned = format!(
        "{} file(s) and {} directory marker(s) planned for {}",
        plan.file_count(),
        plan.marker_count(),
        destination(config)
    );
    if plan.issues.is_empty() {
        formatter.summary(&format!("{planned}."));
    } else {
        formatter.incomplete(&format!("{planned}, {} entry(ies) skipped.", plan.issues.len()));
    }

    exit_code
}

fn print_report(config: &UploadConfig, report: &UploadReport, formatter: &Formatter) -> ExitCode {
    let exit_code = if report.is_success() {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    };

    if formatter.is_json() {
        let output = UploadOutput {
            status: if report.is_success() { "success" } else { "partial" },
            bucket: config.store.bucket.clone(),
            prefix: config.prefix.to_string(),
            files: report.file_count(),
            directory_markers: report.marker_count(),
            failed: report.failures.len(),
            total_bytes: report.total_bytes(),
            total_human: humansize::format_size(report.total_bytes(), humansize::BINARY),
            elapsed_ms: report.elapsed().as_millis() as i64,
            report,
        };
        formatter.json(&output);
        return exit_code;
    }

    for object in &report.uploaded {
        formatter.uploaded(&config.store.bucket, object);
    }
    for failure in &report.failures {
        formatter.failure(failure);
    }
    for issue in &report.walk_issues {
        formatter.skipped(issue);
    }

    let elapsed = report.elapsed().as_secs_f64();
    if report.is_success() {
        formatter.summary(&format!(
            "Uploaded {} file(s) and {} directory marker(s) to {} ({} in {elapsed:.1}s).",
            report.file_count(),
            report.marker_count(),
            destination(config),
            humansize::format_size(report.total_bytes(), humansize::BINARY),
        ));
    } else {
        formatter.incomplete(&format!(
            "Completed with errors: {} succeeded, {} failed, {} skipped",
            report.uploaded.len(),
            report.failures.len(),
            report.walk_issues.len()
        ));
    }

    exit_code
}
