use sql_testbed::container::{format_error_message, AvailabilityChecker, Platform};

pub async fn run(runtime: String, json: bool) -> anyhow::Result<()> {
    let checker = AvailabilityChecker::new(runtime);
    let report = checker.check_availability().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.ready {
        println!(
            "✓ {} is ready ({})",
            checker.binary(),
            report.version.as_deref().unwrap_or("unknown version")
        );
    } else {
        eprint!("{}", format_error_message(&report, Platform::current()));
    }

    if !report.ready {
        std::process::exit(1);
    }
    Ok(())
}
