#[tokio::main]
async fn main() {
    std::process::exit(jsoncheck_cli::main_entry().await);
}
