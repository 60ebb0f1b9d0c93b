use parley::commands::dispatcher::Dispatcher;
use parley::commands::{default_registry, CommandContext, Outcome};

fn main() {
    init_tracing();
    let code = tokio::runtime::Runtime::new()
        .expect("Failed to start async runtime")
        .block_on(run());
    std::process::exit(code);
}

/// Diagnostics go to stderr and are filtered by `RUST_LOG`; the transcript
/// and command output own stdout.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let registry = match default_registry() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("❌ {} error: {e}", e.label());
            return 1;
        }
    };
    let context = match CommandContext::load() {
        Ok(context) => context,
        Err(e) => {
            eprintln!("❌ {} error: {e}", e.label());
            return 1;
        }
    };

    let mut dispatcher = Dispatcher::new(registry, context);
    match dispatcher.run(&args).await {
        Ok(Outcome::Rendered(text)) => {
            println!("{}", text.trim_end());
            0
        }
        Ok(Outcome::Done) => 0,
        Err(e) => {
            eprintln!("❌ {} error: {e}", e.label());
            1
        }
    }
}
