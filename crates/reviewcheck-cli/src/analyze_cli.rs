use anyhow::bail;
use clap::Args;
use reviewcheck_api_client::ReviewCheckApi;
use reviewcheck_client_core::{AnalysisReport, AnalysisTracker, InputError, JobOutcome, JobUpdate};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Product page URL whose reviews should be analyzed
    pub url: String,
}

pub async fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let api = ReviewCheckApi::from_env()?;
    let tracker = AnalysisTracker::new(api);

    let mut watch = match tracker.submit(&args.url) {
        Ok(watch) => watch,
        Err(InputError::EmptyInput) => bail!("please enter a product URL"),
        Err(err) => bail!(err.to_string()),
    };

    while let Some(update) = watch.next_update().await {
        match update {
            JobUpdate::Accepted { analysis_id } => {
                println!("analysis accepted (id {analysis_id}), waiting for results...");
            }
            JobUpdate::Polling { attempt } => {
                println!("still analyzing (poll {attempt})");
            }
            JobUpdate::Terminal(outcome) => {
                return report(outcome);
            }
        }
    }
    bail!("analysis was cancelled before it finished")
}

fn report(outcome: JobOutcome) -> anyhow::Result<()> {
    match outcome {
        JobOutcome::Completed { report, attempts } => {
            print_report(&report, attempts);
            Ok(())
        }
        other => bail!(other.user_message()),
    }
}

fn print_report(report: &AnalysisReport, attempts: u32) {
    println!("analysis complete after {attempts} poll(s)");
    if let Some(verdict) = &report.verdict {
        println!("  verdict:      {verdict}");
    }
    if let Some(confidence) = report.confidence {
        println!("  trust score:  {confidence:.1}");
    }
    if let Some(review_count) = report.review_count {
        println!("  reviews read: {review_count}");
    }
}
