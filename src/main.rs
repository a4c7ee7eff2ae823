use std::process::exit;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let exit_code = bucket_reaper::async_main_rs().await;

    exit(exit_code);
}
