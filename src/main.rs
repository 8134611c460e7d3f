use log::error;
use recipe_harvest::search_recipes;
use std::env;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(term) = args.get(1) else {
        eprintln!("Usage: recipe-harvest <search term> [max-results]");
        return ExitCode::from(2);
    };
    let max_results: usize = args
        .get(2)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0);

    match search_recipes(term, max_results).await {
        Ok(outcomes) => match serde_json::to_string_pretty(&outcomes) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!("failed to serialize results: {err}");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            error!("search failed: {err}");
            ExitCode::FAILURE
        }
    }
}
