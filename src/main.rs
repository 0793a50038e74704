#[tokio::main]
async fn main() {
    repufi_drs_lib::run().await
}
