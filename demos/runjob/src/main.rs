use std::{sync::Arc, time::Duration};

use anyhow::{Context, bail};
use tracing::info;

use qjob_core::{AsyncJobRunner, JobPool, PoolConfig, RunnerConfig, RunnerSet};
use qjob_model::{JobDescription, ResourceRequest};
use qjob_observe::{JournalSink, LoggerConfig, init_logger};

const USAGE: &str = "usage: runjob [--out FILE] [--err FILE] [--cores N] [--mem GB] \
                     [--hours H] [--qos NAME] [--delay SECS] -- PROGRAM [ARGS...]";

fn value(flag: &str, args: &mut impl Iterator<Item = String>) -> anyhow::Result<String> {
    args.next()
        .with_context(|| format!("{flag} needs a value\n{USAGE}"))
}

fn parse_job() -> anyhow::Result<JobDescription> {
    let mut args = std::env::args().skip(1);
    let mut out = String::from("runjob.out");
    let mut err = None;
    let mut delay = None;
    let mut res = ResourceRequest::new();

    let program = loop {
        let Some(arg) = args.next() else {
            bail!(USAGE);
        };
        match arg.as_str() {
            "--out" => out = value("--out", &mut args)?,
            "--err" => err = Some(value("--err", &mut args)?),
            "--cores" => res = res.with_cores(value("--cores", &mut args)?.parse()?),
            "--mem" => res = res.with_memory_gb(value("--mem", &mut args)?.parse()?),
            "--hours" => res = res.with_wall_time_hours(value("--hours", &mut args)?.parse()?),
            "--qos" => res = res.with_qos(value("--qos", &mut args)?),
            "--delay" => delay = Some(value("--delay", &mut args)?.parse()?),
            "--" => break args.next().context(USAGE)?,
            other if other.starts_with("--") => bail!("unknown flag {other}\n{USAGE}"),
            _ => break arg,
        }
    };

    let mut builder = JobDescription::builder(program, out)
        .args(args)
        .resources(res);
    if let Some(err) = err {
        builder = builder.error_file(err);
    }
    if let Some(delay) = delay {
        builder = builder.start_delay_secs(delay);
    }
    Ok(builder.build()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Logger
    init_logger(&LoggerConfig::from_env()?)?;

    // 2) Job + runner
    let job = parse_job()?;
    let config = RunnerConfig::from_env()?;
    let pool = JobPool::current()?.with_config(&PoolConfig::default())?;

    let runner = AsyncJobRunner::new(job, &config, pool, Arc::new(JournalSink::new()));
    let runners = RunnerSet::new();
    runners.insert(runner.clone());

    runner.start()?;
    if let Some(native) = runner.native_spec() {
        info!(job = %runner.id(), native = %native.to_spec_string(), "native spec");
    }

    // 3) Poll until done; Ctrl+C stops every job
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if runners.query_all().contains(runner.id()) {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("interrupted; stopping jobs");
                runners.stop_all();
                runner.wait().await;
                break;
            }
        }
    }

    let completion = runner.wait().await;
    let info = runner.run_info();
    info!(
        job = %runner.id(),
        status = %runner.status(),
        elapsed_ms = info.elapsed().map(|d| d.as_millis() as u64).unwrap_or(0),
        "finished"
    );

    match completion.exit_code() {
        Some(0) => Ok(()),
        _ => bail!(
            "job failed: {}",
            completion.describe().unwrap_or_else(|| "unknown".into())
        ),
    }
}
