//! services/gateway/src/bin/openapi.rs
//!
//! This binary generates the OpenAPI 3.0 specification for the gateway
//! and saves it to a file named `openapi.json`.

use gateway_lib::web::ApiDoc;
use utoipa::OpenApi;

const OUTPUT_PATH: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let spec_json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(OUTPUT_PATH, spec_json)?;
    println!("OpenAPI specification generated at {}", OUTPUT_PATH);
    Ok(())
}
