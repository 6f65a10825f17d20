#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use resource_capacity::{AllocationBook, ServiceConfig, http_api, logging};

    logging::init();
    let config = ServiceConfig::from_env()?;

    let book = match config.snapshot_path.as_deref() {
        Some(path) => {
            let allocations = resource_capacity::load_allocations_from_json(path)?;
            tracing::info!(path = %path.display(), count = allocations.len(), "loaded allocations");
            AllocationBook::from_allocations(allocations)?
        }
        None => AllocationBook::new(),
    };

    http_api::serve(config.http_addr, book).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
