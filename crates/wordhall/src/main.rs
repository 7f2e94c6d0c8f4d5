//! Wordhall server binary entry point.

#[tokio::main]
async fn main() {
    if let Err(e) = lib_wordhall::init().await {
        eprintln!("❌ Fatal error: {e}");
        std::process::exit(1);
    }
}
