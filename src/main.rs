use std::process::ExitCode;

use stepwise::config::CONFIG;
use stepwise::demo::{self, DemoReport};

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(CONFIG.log.filter.as_str())
                             .with_target(false)
                             .init();

    log::debug!("stepwise-demo started with {:?}", *CONFIG);

    match demo::run(&CONFIG.demo) {
        Ok(outcome) => {
            println!("{}", outcome.value);
            if CONFIG.demo.show_events {
                for event in &outcome.events {
                    match serde_json::to_string(event) {
                        Ok(line) => println!("{line}"),
                        Err(err) => log::warn!("cannot serialize event {}: {err}", event.seq),
                    }
                }
            }
            match serde_json::to_string_pretty(&DemoReport::from(&outcome)) {
                Ok(report) => log::info!("report:\n{report}"),
                Err(err) => log::warn!("cannot serialize report: {err}"),
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err.report());
            ExitCode::FAILURE
        }
    }
}
