#[tokio::main]
async fn main() {
    if let Err(e) = nua_lib::run().await {
        eprintln!("nua failed to start: {}", e);
        std::process::exit(1);
    }
}
